//! TranscriptStore trait definition.

use prospect_types::chat::MessageRecord;
use prospect_types::error::StoreError;
use uuid::Uuid;

/// Port for the append-only transcript log.
///
/// Implementations live in prospect-infra (e.g., `SqliteTranscriptStore`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait TranscriptStore: Send + Sync {
    /// Append one record.
    ///
    /// Records are never updated or deleted, and duplicate timestamps are
    /// accepted (bursts can land within one clock tick).
    fn append(
        &self,
        record: &MessageRecord,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// All records for a run, ordered by sent_at ASC (insertion order on
    /// equal timestamps).
    fn list_by_run(
        &self,
        run_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<MessageRecord>, StoreError>> + Send;

    /// Count all persisted records.
    fn count_all(&self) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;

    /// Count distinct runs with at least one record.
    fn count_runs(&self) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;
}
