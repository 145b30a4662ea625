use async_trait::async_trait;
use chrono::{DateTime, Utc};
use remitdesk_core::AppResult;
use remitdesk_domain::{IdempotencyRecord, IdempotencyScope};
use uuid::Uuid;

/// Repository port for idempotency records.
#[async_trait]
pub trait IdempotencyRepository: Send + Sync {
    /// Inserts a new record.
    ///
    /// Must fail with `AppError::Conflict` when a record with the same scope
    /// already exists. This is the only arbiter of concurrent claims.
    async fn insert_record(&self, record: &IdempotencyRecord) -> AppResult<()>;

    /// Loads the record for a natural key.
    async fn find_record(&self, scope: &IdempotencyScope)
    -> AppResult<Option<IdempotencyRecord>>;

    /// Marks a claimed record completed with the captured response.
    async fn complete_record(
        &self,
        record_id: Uuid,
        completion: &IdempotencyCompletion,
    ) -> AppResult<()>;

    /// Deletes a record by id. Deleting a missing record is not an error.
    async fn delete_record(&self, record_id: Uuid) -> AppResult<()>;

    /// Deletes every record that expired before the cutoff.
    async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Captured outcome written when a claimed request succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyCompletion {
    /// Response status code.
    pub status_code: u16,
    /// Response body bytes.
    pub response_body: Vec<u8>,
    /// Completion time.
    pub completed_at: DateTime<Utc>,
    /// New expiry, measured from completion.
    pub expires_at: DateTime<Utc>,
}
