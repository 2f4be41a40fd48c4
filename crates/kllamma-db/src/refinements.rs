//! Prompt refinement store.

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;
use uuid::Uuid;

use crate::{format_timestamp, parse_timestamp};

const COLUMNS: &str = "id, original_prompt, refined_prompt, model, created_at";

/// A stored refinement of a user prompt. Never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRefinementRecord {
    pub id: String,
    pub original_prompt: String,
    pub refined_prompt: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

/// Prompt refinements store with a borrowed connection.
pub struct PromptRefinements<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> PromptRefinements<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Persist a new refinement and return the stored record.
    ///
    /// `created_at` is truncated to the stored precision so the returned
    /// record matches later reads.
    pub fn create(
        &self,
        original_prompt: &str,
        refined_prompt: &str,
        model: &str,
    ) -> Result<PromptRefinementRecord, rusqlite::Error> {
        let record = PromptRefinementRecord {
            id: format!("ref-{}", Uuid::new_v4()),
            original_prompt: original_prompt.to_string(),
            refined_prompt: refined_prompt.to_string(),
            model: model.to_string(),
            created_at: Utc::now().trunc_subsecs(6),
        };

        self.conn.execute(
            "INSERT INTO prompt_refinements (id, original_prompt, refined_prompt, model, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.original_prompt,
                record.refined_prompt,
                record.model,
                format_timestamp(&record.created_at),
            ],
        )?;

        Ok(record)
    }

    /// Get a refinement by ID.
    pub fn get(&self, id: &str) -> Result<Option<PromptRefinementRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM prompt_refinements WHERE id = ?1", COLUMNS),
                params![id],
                Self::row_to_record,
            )
            .optional()
    }

    /// Whether a refinement with this ID has been stored.
    pub fn exists(&self, id: &str) -> Result<bool, rusqlite::Error> {
        self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM prompt_refinements WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )
    }

    /// List refinements, newest first.
    pub fn list(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<PromptRefinementRecord>, rusqlite::Error> {
        let mut sql = format!(
            "SELECT {} FROM prompt_refinements ORDER BY created_at DESC, rowid DESC",
            COLUMNS
        );

        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
        match (limit, offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(records)
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<PromptRefinementRecord, rusqlite::Error> {
        let created_at: String = row.get(4)?;

        Ok(PromptRefinementRecord {
            id: row.get(0)?,
            original_prompt: row.get(1)?,
            refined_prompt: row.get(2)?,
            model: row.get(3)?,
            created_at: parse_timestamp(4, &created_at)?,
        })
    }
}
