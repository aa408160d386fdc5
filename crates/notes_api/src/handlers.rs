use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use core_types::{Note, NoteStore, NoteWithUsername};
use tracing::{debug, info};

use crate::error::{MessageBody, NOTE_ID_REQUIRED, NotesError};
use crate::payload::{CreateNoteRequest, DeleteNoteRequest, UpdateNoteRequest};

/// State shared by every handler. The store is the only shared resource.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NoteStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn list_notes(
    State(state): State<AppState>,
) -> Result<Json<Vec<NoteWithUsername>>, NotesError> {
    let notes = state.store.list_notes_with_username().await?;
    debug!(count = notes.len(), "listed notes");
    Ok(Json(notes))
}

pub async fn create_note(
    State(state): State<AppState>,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageBody>), NotesError> {
    let Json(request) = payload?;
    let new_note = request.validate()?;

    // Fast path only; the store's unique constraint catches concurrent creates.
    if state
        .store
        .find_note_by_title(&new_note.title)
        .await?
        .is_some()
    {
        return Err(NotesError::Conflict);
    }

    let note = Note::new(new_note);
    state.store.insert_note(&note).await?;
    info!(note_id = %note.id, user_id = %note.user, "created note");

    Ok((StatusCode::CREATED, Json(MessageBody::new("New note created"))))
}

pub async fn update_note(
    State(state): State<AppState>,
    payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> Result<Json<String>, NotesError> {
    let Json(request) = payload?;
    let update = request.validate()?;

    let mut note = state
        .store
        .find_note(update.id)
        .await?
        .ok_or(NotesError::NotFound)?;

    let duplicate = state.store.find_note_by_title(&update.title).await?;
    if duplicate.is_some_and(|other| other.id != note.id) {
        return Err(NotesError::Conflict);
    }

    note.overwrite(update.user, update.title, update.text, update.completed);
    state.store.save_note(&note).await?;
    info!(note_id = %note.id, completed = note.completed, "updated note");

    Ok(Json(format!("'{}' updated", note.title)))
}

pub async fn delete_note(
    State(state): State<AppState>,
    payload: Result<Json<DeleteNoteRequest>, JsonRejection>,
) -> Result<Json<String>, NotesError> {
    let id = match payload {
        Ok(Json(request)) => request.validate()?,
        Err(JsonRejection::MissingJsonContentType(_)) => {
            return Err(NotesError::validation(NOTE_ID_REQUIRED));
        }
        Err(rejection) => return Err(rejection.into()),
    };

    let note = state
        .store
        .find_note(id)
        .await?
        .ok_or(NotesError::NotFound)?;

    // Captured before the delete; the delete itself reports only a count.
    let (title, id) = (note.title, note.id);
    if !state.store.delete_note(id).await? {
        return Err(NotesError::NotFound);
    }
    info!(note_id = %id, "deleted note");

    Ok(Json(format!("Note '{title}' with ID {id} deleted")))
}
