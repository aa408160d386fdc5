use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type NoteId = Uuid;
pub type UserId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: UserId::new_v4(),
            username: username.into(),
            created_at: Utc::now(),
        }
    }
}

/// Validated input for a note that does not exist yet.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NewNote {
    pub user: UserId,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub user: UserId,
    pub title: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(new: NewNote) -> Self {
        let now = Utc::now();
        Self {
            id: NoteId::new_v4(),
            user: new.user,
            title: new.title,
            text: new.text,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rewrites every mutable field. Updates never merge.
    pub fn overwrite(&mut self, user: UserId, title: String, text: String, completed: bool) {
        self.user = user;
        self.title = title;
        self.text = text;
        self.completed = completed;
        self.updated_at = Utc::now();
    }
}

/// A note with its owner's username resolved alongside it.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct NoteWithUsername {
    #[serde(flatten)]
    pub note: Note,
    pub username: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a note with this title already exists")]
    DuplicateTitle,

    #[error("record not found")]
    NotFound,

    #[error("write rejected by store: {message}")]
    Rejected { message: String },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence seam for notes and the users they reference.
///
/// Implementations must enforce title uniqueness and the note → user
/// reference themselves; callers only pre-check for friendlier errors.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn list_notes_with_username(&self) -> StoreResult<Vec<NoteWithUsername>>;
    async fn find_note(&self, id: NoteId) -> StoreResult<Option<Note>>;
    async fn find_note_by_title(&self, title: &str) -> StoreResult<Option<Note>>;
    async fn insert_note(&self, note: &Note) -> StoreResult<()>;
    /// Persists every field of an existing note in a single write.
    async fn save_note(&self, note: &Note) -> StoreResult<()>;
    /// Returns `false` when no note had this id.
    async fn delete_note(&self, id: NoteId) -> StoreResult<bool>;
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn create_user(&self, username: &str) -> StoreResult<User>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_note_starts_incomplete() {
        let note = Note::new(NewNote {
            user: UserId::new_v4(),
            title: "Buy milk".to_string(),
            text: "2%".to_string(),
        });
        assert!(!note.completed);
        assert_eq!(note.created_at, note.updated_at);
    }

    #[test]
    fn overwrite_replaces_all_fields() {
        let mut note = Note::new(NewNote {
            user: UserId::new_v4(),
            title: "a".to_string(),
            text: "b".to_string(),
        });
        let id = note.id;
        let owner = UserId::new_v4();
        note.overwrite(owner, "c".to_string(), "d".to_string(), true);

        assert_eq!(note.id, id);
        assert_eq!(note.user, owner);
        assert_eq!(note.title, "c");
        assert_eq!(note.text, "d");
        assert!(note.completed);
        assert!(note.updated_at >= note.created_at);
    }

    #[test]
    fn note_with_username_serializes_flat() {
        let note = Note::new(NewNote {
            user: UserId::new_v4(),
            title: "t".to_string(),
            text: "x".to_string(),
        });
        let value = serde_json::to_value(NoteWithUsername {
            note,
            username: "dave".to_string(),
        })
        .expect("serialize");
        assert_eq!(value["title"], "t");
        assert_eq!(value["username"], "dave");
        assert_eq!(value["completed"], false);
    }
}
