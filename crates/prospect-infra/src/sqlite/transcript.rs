//! SQLite transcript store implementation.
//!
//! Implements `TranscriptStore` from `prospect-core` using sqlx with split
//! read/write pools. Every salesperson message and customer reply lands
//! here exactly once, in send order, for after-session review.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use prospect_core::store::TranscriptStore;
use prospect_types::chat::{ChatId, MessageRecord, Role};
use prospect_types::error::StoreError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `TranscriptStore`.
pub struct SqliteTranscriptStore {
    pool: DatabasePool,
}

impl SqliteTranscriptStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct TranscriptRow {
    id: String,
    run_id: String,
    chat_id: i64,
    role: String,
    text: String,
    sent_at: String,
}

impl TranscriptRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            run_id: row.try_get("run_id")?,
            chat_id: row.try_get("chat_id")?,
            role: row.try_get("role")?,
            text: row.try_get("text")?,
            sent_at: row.try_get("sent_at")?,
        })
    }

    fn into_record(self) -> Result<MessageRecord, StoreError> {
        let role = self.role.parse::<Role>().map_err(StoreError::Query)?;

        Ok(MessageRecord {
            id: parse_uuid(&self.id)?,
            run_id: parse_uuid(&self.run_id)?,
            chat_id: ChatId(self.chat_id),
            role,
            text: self.text,
            sent_at: parse_datetime(&self.sent_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    s.parse::<Uuid>()
        .map_err(|e| StoreError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// TranscriptStore impl
// ---------------------------------------------------------------------------

impl TranscriptStore for SqliteTranscriptStore {
    async fn append(&self, record: &MessageRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO transcript_messages (id, run_id, chat_id, role, text, sent_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(record.run_id.to_string())
        .bind(record.chat_id.0)
        .bind(record.role.to_string())
        .bind(&record.text)
        .bind(format_datetime(&record.sent_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_by_run(&self, run_id: &Uuid) -> Result<Vec<MessageRecord>, StoreError> {
        // rowid breaks ties between records sharing a timestamp, keeping
        // insertion order.
        let rows = sqlx::query(
            r#"SELECT * FROM transcript_messages
               WHERE run_id = ?
               ORDER BY sent_at ASC, rowid ASC"#,
        )
        .bind(run_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = TranscriptRow::from_row(row).map_err(|e| StoreError::Query(e.to_string()))?;
            records.push(r.into_record()?);
        }
        Ok(records)
    }

    async fn count_all(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM transcript_messages")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let n: i64 = row.try_get("n").map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(n as u64)
    }

    async fn count_runs(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(DISTINCT run_id) AS n FROM transcript_messages")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let n: i64 = row.try_get("n").map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(n as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
