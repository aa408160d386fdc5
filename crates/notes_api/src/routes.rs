use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use core_types::NoteStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{AppState, create_note, delete_note, health, list_notes, update_note};

pub const HEALTH: &str = "/health";
pub const NOTES: &str = "/notes";

/// Builds the router. Note identifiers travel in the request body for every
/// verb, so `/notes` has no path parameters.
pub fn router(store: Arc<dyn NoteStore>, cors: bool) -> Router {
    let mut router = Router::new()
        .route(HEALTH, get(health))
        .route(
            NOTES,
            get(list_notes)
                .post(create_note)
                .patch(update_note)
                .delete(delete_note),
        )
        .with_state(AppState::new(store))
        .layer(TraceLayer::new_for_http());

    if cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}
