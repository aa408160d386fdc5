//! HTTP surface for notes: one resource path, one handler per method.

pub mod error;
pub mod handlers;
pub mod payload;
pub mod routes;

pub use error::{MessageBody, NotesError};
pub use handlers::AppState;
pub use routes::{HEALTH, NOTES, router};
