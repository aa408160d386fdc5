use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use core_types::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

pub const ALL_FIELDS_REQUIRED: &str = "All fields are required";
pub const NOTE_ID_REQUIRED: &str = "Note ID required";

#[derive(Debug, Error)]
pub enum NotesError {
    #[error("{0}")]
    Validation(String),

    #[error("Note not found")]
    NotFound,

    #[error("Duplicate note title")]
    Conflict,

    #[error("Invalid note data received")]
    InvalidData,

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl NotesError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidData => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for NotesError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateTitle => Self::Conflict,
            StoreError::NotFound => Self::NotFound,
            StoreError::Rejected { message } => {
                warn!(reason = %message, "store rejected note write");
                Self::InvalidData
            }
            StoreError::Backend(err) => Self::Internal(err),
        }
    }
}

impl From<JsonRejection> for NotesError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// Body shape shared by every non-string response.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IntoResponse for NotesError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(err) => {
                error!(error = ?err, "notes request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(MessageBody::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_store_errors_to_statuses() {
        assert_eq!(
            NotesError::from(StoreError::DuplicateTitle).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            NotesError::from(StoreError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            NotesError::from(StoreError::Rejected {
                message: "FOREIGN KEY constraint failed".to_string()
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            NotesError::from(StoreError::Backend(anyhow::anyhow!("disk full"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rejected_writes_use_the_generic_message() {
        let err = NotesError::from(StoreError::Rejected {
            message: "FOREIGN KEY constraint failed".to_string(),
        });
        assert_eq!(err.to_string(), "Invalid note data received");
    }
}
