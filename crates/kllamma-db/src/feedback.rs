//! User feedback store.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;
use uuid::Uuid;

use crate::{format_timestamp, parse_timestamp};

const COLUMNS: &str = "id, user_id, prompt_refinement_id, rating, comments, created_at";

/// A user's rating of a refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub id: String,
    pub user_id: String,
    pub prompt_refinement_id: String,
    pub rating: i64,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Feedback store with a borrowed connection.
pub struct Feedback<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> Feedback<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Persist a feedback entry.
    ///
    /// The row is read back after the insert; `None` means the write did not
    /// produce a record.
    pub fn create(
        &self,
        user_id: &str,
        prompt_refinement_id: &str,
        rating: i64,
        comments: Option<&str>,
    ) -> Result<Option<FeedbackRecord>, rusqlite::Error> {
        let id = format!("fb-{}", Uuid::new_v4());

        let inserted = self.conn.execute(
            "INSERT INTO user_feedback (id, user_id, prompt_refinement_id, rating, comments, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                user_id,
                prompt_refinement_id,
                rating,
                comments,
                format_timestamp(&Utc::now()),
            ],
        )?;

        if inserted == 0 {
            return Ok(None);
        }

        self.get(&id)
    }

    /// Get a feedback entry by ID.
    pub fn get(&self, id: &str) -> Result<Option<FeedbackRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM user_feedback WHERE id = ?1", COLUMNS),
                params![id],
                Self::row_to_record,
            )
            .optional()
    }

    /// All feedback for one refinement, oldest first.
    pub fn list_for(
        &self,
        prompt_refinement_id: &str,
    ) -> Result<Vec<FeedbackRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM user_feedback WHERE prompt_refinement_id = ?1 ORDER BY created_at ASC, rowid ASC",
            COLUMNS
        ))?;
        let rows = stmt.query_map(params![prompt_refinement_id], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(records)
    }

    /// Total number of feedback entries.
    pub fn count(&self) -> Result<usize, rusqlite::Error> {
        self.conn
            .query_row("SELECT COUNT(*) FROM user_feedback", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as usize)
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<FeedbackRecord, rusqlite::Error> {
        let created_at: String = row.get(5)?;

        Ok(FeedbackRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            prompt_refinement_id: row.get(2)?,
            rating: row.get(3)?,
            comments: row.get(4)?,
            created_at: parse_timestamp(5, &created_at)?,
        })
    }
}
