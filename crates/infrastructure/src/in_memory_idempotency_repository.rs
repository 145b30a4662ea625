use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use remitdesk_application::{IdempotencyCompletion, IdempotencyRepository};
use remitdesk_core::{AppError, AppResult};
use remitdesk_domain::{IdempotencyRecord, IdempotencyScope, IdempotencyState};
use tokio::sync::RwLock;
use uuid::Uuid;


/// In-memory idempotency record store with insert-or-fail semantics.
///
/// Only suitable for a single process; replicas need the PostgreSQL store.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyRepository {
    records: RwLock<HashMap<IdempotencyScope, IdempotencyRecord>>,
}

impl InMemoryIdempotencyRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyRepository for InMemoryIdempotencyRepository {
    async fn insert_record(&self, record: &IdempotencyRecord) -> AppResult<()> {
        let mut records = self.records.write().await;

        if records.contains_key(&record.scope) {
            return Err(AppError::Conflict(format!(
                "idempotency key '{}' already claimed for tenant '{}'",
                record.scope.key.as_str(),
                record.scope.tenant_id
            )));
        }

        records.insert(record.scope.clone(), record.clone());
        Ok(())
    }

    async fn find_record(
        &self,
        scope: &IdempotencyScope,
    ) -> AppResult<Option<IdempotencyRecord>> {
        Ok(self.records.read().await.get(scope).cloned())
    }

    async fn complete_record(
        &self,
        record_id: Uuid,
        completion: &IdempotencyCompletion,
    ) -> AppResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .values_mut()
            .find(|record| record.id == record_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("idempotency record '{record_id}' does not exist"))
            })?;

        record.state = IdempotencyState::Completed;
        record.status_code = Some(completion.status_code);
        record.response_body = Some(completion.response_body.clone());
        record.completed_at = Some(completion.completed_at);
        record.expires_at = completion.expires_at;

        Ok(())
    }

    async fn delete_record(&self, record_id: Uuid) -> AppResult<()> {
        self.records
            .write()
            .await
            .retain(|_, record| record.id != record_id);
        Ok(())
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut records = self.records.write().await;
        let initial = records.len();
        records.retain(|_, record| record.expires_at > before);

        Ok(u64::try_from(initial - records.len()).unwrap_or(u64::MAX))
    }
}
