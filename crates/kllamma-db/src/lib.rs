//! Persistence gateway for kllamma.
//!
//! Provides a `Database` struct that owns the single SQLite connection for the
//! lifetime of the process and hands out short-lived, domain-specific stores.
//!
//! ## Lifecycle
//!
//! - [`Database::connect`] opens the connection and creates the schema. A
//!   failure here is fatal to startup.
//! - [`Database::disconnect`] consumes the handle and closes the connection.

mod feedback;
mod refinements;

pub use feedback::{Feedback, FeedbackRecord};
pub use refinements::{PromptRefinementRecord, PromptRefinements};
pub use rusqlite::Error as SqliteError;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use thiserror::Error;

/// Errors raised by the persistence gateway.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to connect to database at {location}: {source}")]
    Connection {
        location: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Unsupported database URL '{0}' (expected sqlite://<path>, a file path or :memory:)")]
    UnsupportedUrl(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Where the database lives, parsed from a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

impl DatabaseLocation {
    /// Parse a connection string.
    ///
    /// Accepts `sqlite://<path>`, `sqlite:<path>`, a bare path, `:memory:` and
    /// `sqlite::memory:`.
    pub fn parse(url: &str) -> Result<Self, DbError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(DbError::UnsupportedUrl(url.to_string()));
        }

        let rest = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        if rest == ":memory:" {
            return Ok(DatabaseLocation::Memory);
        }

        // Anything else carrying a scheme is a store we can't talk to.
        if rest.is_empty() || rest.contains("://") {
            return Err(DbError::UnsupportedUrl(url.to_string()));
        }

        Ok(DatabaseLocation::File(PathBuf::from(rest)))
    }
}

impl std::fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseLocation::Memory => write!(f, ":memory:"),
            DatabaseLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The main database struct that owns the SQLite connection.
pub struct Database {
    conn: Mutex<Connection>,
    location: DatabaseLocation,
}

impl Database {
    /// Connect to the database named by `url` and make sure the schema exists.
    pub fn connect(url: &str) -> Result<Self, DbError> {
        let location = DatabaseLocation::parse(url)?;
        Self::open_location(location)
    }

    /// Open or create a database at a specific path.
    pub fn open_at(path: &Path) -> Result<Self, DbError> {
        Self::open_location(DatabaseLocation::File(path.to_path_buf()))
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::open_location(DatabaseLocation::Memory)
    }

    fn open_location(location: DatabaseLocation) -> Result<Self, DbError> {
        let connection_error = |source| DbError::Connection {
            location: location.to_string(),
            source,
        };

        let conn = match &location {
            DatabaseLocation::Memory => Connection::open_in_memory(),
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).ok();
                }
                Connection::open(path)
            }
        }
        .map_err(connection_error)?;

        Self::init_schema(&conn).map_err(connection_error)?;

        tracing::debug!(location = %location, "database connected");

        Ok(Self {
            conn: Mutex::new(conn),
            location,
        })
    }

    /// Where this database lives.
    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    /// Access the prompt refinements store.
    pub fn refinements(&self) -> PromptRefinements<'_> {
        PromptRefinements::new(self.lock())
    }

    /// Access the user feedback store.
    pub fn feedback(&self) -> Feedback<'_> {
        Feedback::new(self.lock())
    }

    /// Close the connection, reporting any error SQLite raises while doing so.
    pub fn disconnect(self) -> Result<(), DbError> {
        let location = self.location;
        let conn = self
            .conn
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        conn.close().map_err(|(_, e)| DbError::Sqlite(e))?;
        tracing::debug!(location = %location, "database disconnected");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave SQLite itself in a
        // half-written state, so keep serving.
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Initialize the database schema.
    ///
    /// `user_feedback.prompt_refinement_id` carries no foreign key: whether a
    /// dangling reference is accepted is decided by the feedback service.
    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS prompt_refinements (
                id TEXT PRIMARY KEY,
                original_prompt TEXT NOT NULL,
                refined_prompt TEXT NOT NULL,
                model TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_feedback (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                prompt_refinement_id TEXT NOT NULL,
                rating INTEGER NOT NULL,
                comments TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_prompt_refinements_created_at ON prompt_refinements(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_user_feedback_refinement ON user_feedback(prompt_refinement_id);
            "#,
        )
    }
}

/// Format a timestamp with fixed precision so stored values sort lexically.
pub(crate) fn format_timestamp(value: &chrono::DateTime<chrono::Utc>) -> String {
    value.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 timestamp column, surfacing bad data as a conversion error.
pub(crate) fn parse_timestamp(
    idx: usize,
    value: &str,
) -> Result<chrono::DateTime<chrono::Utc>, rusqlite::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locations() {
        assert_eq!(
            DatabaseLocation::parse(":memory:").unwrap(),
            DatabaseLocation::Memory
        );
        assert_eq!(
            DatabaseLocation::parse("sqlite::memory:").unwrap(),
            DatabaseLocation::Memory
        );
        assert_eq!(
            DatabaseLocation::parse("sqlite:///var/lib/kllamma.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("/var/lib/kllamma.db"))
        );
        assert_eq!(
            DatabaseLocation::parse("sqlite:data/kllamma.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("data/kllamma.db"))
        );
        assert_eq!(
            DatabaseLocation::parse("kllamma.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("kllamma.db"))
        );
    }

    #[test]
    fn test_parse_rejects_other_stores() {
        assert!(matches!(
            DatabaseLocation::parse("postgres://localhost/kllamma"),
            Err(DbError::UnsupportedUrl(_))
        ));
        assert!(matches!(
            DatabaseLocation::parse("   "),
            Err(DbError::UnsupportedUrl(_))
        ));
    }

    #[test]
    fn test_connect_unreachable_path_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        // A directory cannot be opened as a database file.
        let result = Database::open_at(dir.path());
        assert!(matches!(result, Err(DbError::Connection { .. })));
    }

    #[test]
    fn test_connect_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("kllamma.db");
        let url = format!("sqlite://{}", path.display());

        let db = Database::connect(&url).unwrap();
        let created = db
            .refinements()
            .create("write a haiku", "Write a haiku about autumn.", "template")
            .unwrap();
        db.disconnect().unwrap();

        let db = Database::connect(&url).unwrap();
        let loaded = db.refinements().get(&created.id).unwrap().unwrap();
        assert_eq!(loaded.original_prompt, "write a haiku");
        assert_eq!(loaded.refined_prompt, "Write a haiku about autumn.");
        db.disconnect().unwrap();
    }

    #[test]
    fn test_create_and_get_refinement() {
        let db = Database::open_in_memory().unwrap();

        let record = db
            .refinements()
            .create("summarize this", "Summarize the text below.", "gpt-4")
            .unwrap();
        assert!(record.id.starts_with("ref-"));

        let retrieved = db.refinements().get(&record.id).unwrap().unwrap();
        assert_eq!(retrieved.id, record.id);
        assert_eq!(retrieved.original_prompt, "summarize this");
        assert_eq!(retrieved.model, "gpt-4");
        assert_eq!(retrieved, record);
        assert!(db.refinements().exists(&record.id).unwrap());
        assert!(!db.refinements().exists("ref-missing").unwrap());
        assert!(db.refinements().get("ref-missing").unwrap().is_none());
    }

    #[test]
    fn test_list_refinements_newest_first() {
        let db = Database::open_in_memory().unwrap();

        let first = db.refinements().create("one", "One.", "template").unwrap();
        let second = db.refinements().create("two", "Two.", "template").unwrap();
        let third = db.refinements().create("three", "Three.", "template").unwrap();

        let all = db.refinements().list(None, None).unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![third.id.as_str(), second.id.as_str(), first.id.as_str()]);

        let page = db.refinements().list(Some(1), Some(1)).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, second.id);
    }

    #[test]
    fn test_create_feedback() {
        let db = Database::open_in_memory().unwrap();
        let refinement = db.refinements().create("p", "P.", "template").unwrap();

        let record = db
            .feedback()
            .create("u1", &refinement.id, 5, Some("great"))
            .unwrap()
            .unwrap();

        assert!(record.id.starts_with("fb-"));
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.prompt_refinement_id, refinement.id);
        assert_eq!(record.rating, 5);
        assert_eq!(record.comments, Some("great".to_string()));
    }

    #[test]
    fn test_feedback_is_not_deduplicated() {
        let db = Database::open_in_memory().unwrap();
        let refinement = db.refinements().create("p", "P.", "template").unwrap();

        let a = db
            .feedback()
            .create("u1", &refinement.id, 4, None)
            .unwrap()
            .unwrap();
        let b = db
            .feedback()
            .create("u1", &refinement.id, 4, None)
            .unwrap()
            .unwrap();
        assert_ne!(a.id, b.id);

        let listed = db.feedback().list_for(&refinement.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, a.id);
        assert_eq!(listed[1].id, b.id);
        assert_eq!(listed[0].comments, None);
    }

    #[test]
    fn test_feedback_allows_dangling_reference_at_storage_level() {
        let db = Database::open_in_memory().unwrap();

        let record = db.feedback().create("u1", "ref-nowhere", 3, None).unwrap();
        assert!(record.is_some());
        assert_eq!(db.feedback().count().unwrap(), 1);
    }
}
