use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{
    Note, NoteId, NoteStore, NoteWithUsername, StoreError, StoreResult, User, UserId,
};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

pub const CURRENT_DB_SCHEMA_VERSION: u32 = 1;

const NOTE_COLUMNS: &str = "id, user_id, title, text, completed, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!(
            "sqlite://{}",
            path.as_ref().to_string_lossy()
        ))?
        .create_if_missing(true)
        .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open {}", path.as_ref().display()))?;
        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        // The UNIQUE constraint on title is what actually guarantees
        // uniqueness; handlers only pre-check it.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL UNIQUE,
                text TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE RESTRICT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_notes_user_id ON notes(user_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO metadata(key, value)
            VALUES ('schema_version', ?1)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(CURRENT_DB_SCHEMA_VERSION.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn schema_version(&self) -> Result<u32> {
        let row = sqlx::query("SELECT value FROM metadata WHERE key = 'schema_version'")
            .fetch_one(&self.pool)
            .await?;
        let version = row.get::<String, _>("value").parse::<u32>()?;
        Ok(version)
    }

    pub async fn count_notes(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM notes")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }
}

#[async_trait]
impl NoteStore for SqliteStorage {
    async fn list_notes_with_username(&self) -> StoreResult<Vec<NoteWithUsername>> {
        let rows = sqlx::query(
            r#"
            SELECT n.id, n.user_id, n.title, n.text, n.completed, n.created_at, n.updated_at,
                   u.username
            FROM notes n
            JOIN users u ON u.id = n.user_id
            ORDER BY n.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list notes")?;

        let notes = rows
            .into_iter()
            .map(|row| {
                Ok(NoteWithUsername {
                    username: row.get("username"),
                    note: map_note_row(&row)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(notes)
    }

    async fn find_note(&self, id: NoteId) -> StoreResult<Option<Note>> {
        let row = sqlx::query(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("failed to look up note by id")?;

        Ok(row.as_ref().map(map_note_row).transpose()?)
    }

    async fn find_note_by_title(&self, title: &str) -> StoreResult<Option<Note>> {
        let row = sqlx::query(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE title = ?1"))
            .bind(title)
            .fetch_optional(&self.pool)
            .await
            .context("failed to look up note by title")?;

        Ok(row.as_ref().map(map_note_row).transpose()?)
    }

    async fn insert_note(&self, note: &Note) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notes(id, user_id, title, text, completed, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(note.id.to_string())
        .bind(note.user.to_string())
        .bind(&note.title)
        .bind(&note.text)
        .bind(note.completed)
        .bind(note.created_at.to_rfc3339())
        .bind(note.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|err| map_write_error(err, StoreError::DuplicateTitle))?;

        debug!(note_id = %note.id, "inserted note");
        Ok(())
    }

    async fn save_note(&self, note: &Note) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notes
            SET user_id = ?2, title = ?3, text = ?4, completed = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(note.id.to_string())
        .bind(note.user.to_string())
        .bind(&note.title)
        .bind(&note.text)
        .bind(note.completed)
        .bind(note.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|err| map_write_error(err, StoreError::DuplicateTitle))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_note(&self, id: NoteId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("failed to delete note")?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("failed to look up user")?;

        Ok(row.as_ref().map(map_user_row).transpose()?)
    }

    async fn create_user(&self, username: &str) -> StoreResult<User> {
        let user = User::new(username);
        sqlx::query(r#"INSERT INTO users(id, username, created_at) VALUES (?1, ?2, ?3)"#)
            .bind(user.id.to_string())
            .bind(&user.username)
            .bind(user.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|err| {
                map_write_error(
                    err,
                    StoreError::Rejected {
                        message: format!("username `{username}` is taken"),
                    },
                )
            })?;
        Ok(user)
    }
}

/// Translates constraint violations into the store's typed errors.
/// `on_unique` is returned for UNIQUE violations since only the caller
/// knows which column it was writing.
fn map_write_error(err: sqlx::Error, on_unique: StoreError) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.kind() {
            ErrorKind::UniqueViolation => return on_unique,
            ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => {
                return StoreError::Rejected {
                    message: db_err.message().to_string(),
                };
            }
            _ => {}
        }
    }
    StoreError::Backend(anyhow::Error::new(err).context("note write failed"))
}

fn map_note_row(row: &SqliteRow) -> Result<Note> {
    Ok(Note {
        id: Uuid::parse_str(row.get::<String, _>("id").as_str()).context("invalid note id")?,
        user: Uuid::parse_str(row.get::<String, _>("user_id").as_str())
            .context("invalid note owner id")?,
        title: row.get("title"),
        text: row.get("text"),
        completed: row.get("completed"),
        created_at: parse_rfc3339(row.get::<String, _>("created_at"))?,
        updated_at: parse_rfc3339(row.get::<String, _>("updated_at"))?,
    })
}

fn map_user_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: Uuid::parse_str(row.get::<String, _>("id").as_str()).context("invalid user id")?,
        username: row.get("username"),
        created_at: parse_rfc3339(row.get::<String, _>("created_at"))?,
    })
}

fn parse_rfc3339(value: String) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(&value)?.with_timezone(&Utc))
}
