//! Request bodies for `/notes` and their validation.
//!
//! Every field is optional at the serde layer so that a missing field is
//! reported as a validation error rather than a deserialization failure.
//! Wrongly typed fields (e.g. `"completed": "true"`) still fail to
//! deserialize and surface as validation errors through the JSON rejection.

use core_types::{NewNote, NoteId, UserId};
use serde::Deserialize;

use crate::error::{ALL_FIELDS_REQUIRED, NOTE_ID_REQUIRED, NotesError};

#[derive(Debug, Default, Deserialize)]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    pub text: Option<String>,
    pub user: Option<UserId>,
}

impl CreateNoteRequest {
    pub fn validate(self) -> Result<NewNote, NotesError> {
        match (self.user, non_blank(self.title), non_blank(self.text)) {
            (Some(user), Some(title), Some(text)) => Ok(NewNote { user, title, text }),
            _ => Err(NotesError::validation(ALL_FIELDS_REQUIRED)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateNoteRequest {
    pub id: Option<NoteId>,
    pub user: Option<UserId>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NoteUpdate {
    pub id: NoteId,
    pub user: UserId,
    pub title: String,
    pub text: String,
    pub completed: bool,
}

impl UpdateNoteRequest {
    pub fn validate(self) -> Result<NoteUpdate, NotesError> {
        match (
            self.id,
            self.user,
            non_blank(self.title),
            non_blank(self.text),
            self.completed,
        ) {
            (Some(id), Some(user), Some(title), Some(text), Some(completed)) => Ok(NoteUpdate {
                id,
                user,
                title,
                text,
                completed,
            }),
            _ => Err(NotesError::validation(ALL_FIELDS_REQUIRED)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteNoteRequest {
    pub id: Option<NoteId>,
}

impl DeleteNoteRequest {
    pub fn validate(self) -> Result<NoteId, NotesError> {
        self.id
            .ok_or_else(|| NotesError::validation(NOTE_ID_REQUIRED))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<T: for<'de> Deserialize<'de>>(raw: &str) -> serde_json::Result<T> {
        serde_json::from_str(raw)
    }

    #[test]
    fn create_requires_every_field() {
        let user = UserId::new_v4();
        let ok: CreateNoteRequest =
            parse(&format!(r#"{{"title":"A","text":"t","user":"{user}"}}"#)).expect("parse");
        let new = ok.validate().expect("valid");
        assert_eq!(new.user, user);
        assert_eq!(new.title, "A");

        let missing_user: CreateNoteRequest =
            parse(r#"{"title":"A","text":"t"}"#).expect("parse");
        assert!(matches!(
            missing_user.validate(),
            Err(NotesError::Validation(_))
        ));

        let blank_title: CreateNoteRequest =
            parse(&format!(r#"{{"title":"  ","text":"t","user":"{user}"}}"#)).expect("parse");
        assert!(blank_title.validate().is_err());
    }

    #[test]
    fn completed_must_be_a_json_boolean() {
        let id = NoteId::new_v4();
        let user = UserId::new_v4();
        for completed in [r#""true""#, "1"] {
            let raw = format!(
                r#"{{"id":"{id}","user":"{user}","title":"A","text":"t","completed":{completed}}}"#
            );
            assert!(parse::<UpdateNoteRequest>(&raw).is_err(), "{completed}");
        }

        let missing = format!(r#"{{"id":"{id}","user":"{user}","title":"A","text":"t"}}"#);
        let request: UpdateNoteRequest = parse(&missing).expect("parse");
        assert!(request.validate().is_err());

        let valid = format!(
            r#"{{"id":"{id}","user":"{user}","title":"A","text":"t","completed":false}}"#
        );
        let update = parse::<UpdateNoteRequest>(&valid)
            .expect("parse")
            .validate()
            .expect("valid");
        assert!(!update.completed);
        assert_eq!(update.id, id);
    }

    #[test]
    fn delete_requires_an_id() {
        let err = DeleteNoteRequest::default()
            .validate()
            .expect_err("missing id");
        assert_eq!(err.to_string(), NOTE_ID_REQUIRED);
    }
}
