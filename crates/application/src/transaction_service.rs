use std::sync::Arc;

use async_trait::async_trait;

use remitdesk_core::{AppError, AppResult, TenantId, UserIdentity};
use remitdesk_domain::{LedgerTransaction, NewTransaction, TransactionId};

use crate::clock::{Clock, SystemClock};

/// Upper bound for a single ledger listing page.
pub const MAX_TRANSACTION_PAGE_SIZE: usize = 200;

/// Repository port for tenant ledger entries.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Persists a new entry.
    async fn insert_transaction(&self, transaction: &LedgerTransaction) -> AppResult<()>;

    /// Lists the newest entries for a tenant.
    async fn list_transactions(
        &self,
        tenant_id: TenantId,
        limit: usize,
    ) -> AppResult<Vec<LedgerTransaction>>;
}

/// Application service for the tenant ledger.
#[derive(Clone)]
pub struct TransactionService {
    repository: Arc<dyn TransactionRepository>,
    clock: Arc<dyn Clock>,
}

impl TransactionService {
    /// Creates a service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn TransactionRepository>) -> Self {
        Self {
            repository,
            clock: Arc::new(SystemClock),
        }
    }

    /// Books a new entry in the actor's tenant ledger.
    pub async fn create_transaction(
        &self,
        actor: &UserIdentity,
        input: NewTransaction,
    ) -> AppResult<LedgerTransaction> {
        let tenant_id = tenant_of(actor)?;
        let transaction = LedgerTransaction {
            id: TransactionId::new(),
            tenant_id,
            amount_minor: input.amount_minor(),
            currency: input.currency().clone(),
            branch_code: input.branch_code().map(ToOwned::to_owned),
            note: input.note().map(ToOwned::to_owned),
            created_by: actor.subject().to_owned(),
            created_at: self.clock.now(),
        };

        self.repository.insert_transaction(&transaction).await?;
        Ok(transaction)
    }

    /// Lists recent entries of the actor's tenant ledger.
    pub async fn list_transactions(
        &self,
        actor: &UserIdentity,
        limit: Option<usize>,
    ) -> AppResult<Vec<LedgerTransaction>> {
        let tenant_id = tenant_of(actor)?;
        let limit = limit
            .unwrap_or(50)
            .clamp(1, MAX_TRANSACTION_PAGE_SIZE);

        self.repository.list_transactions(tenant_id, limit).await
    }
}

fn tenant_of(actor: &UserIdentity) -> AppResult<TenantId> {
    actor.tenant_id().ok_or_else(|| {
        AppError::Forbidden("ledger operations require a tenant-scoped identity".to_owned())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use remitdesk_core::{AppError, AppResult, TenantId, TenantScope, UserIdentity};
    use remitdesk_domain::{CurrencyCode, LedgerTransaction, NewTransaction};

    use super::{TransactionRepository, TransactionService};

    #[derive(Default)]
    struct RecordingRepository {
        stored: Mutex<Vec<LedgerTransaction>>,
    }

    #[async_trait]
    impl TransactionRepository for RecordingRepository {
        async fn insert_transaction(&self, transaction: &LedgerTransaction) -> AppResult<()> {
            self.stored
                .lock()
                .map_err(|error| AppError::Internal(format!("failed to lock ledger: {error}")))?
                .push(transaction.clone());
            Ok(())
        }

        async fn list_transactions(
            &self,
            tenant_id: TenantId,
            limit: usize,
        ) -> AppResult<Vec<LedgerTransaction>> {
            Ok(self
                .stored
                .lock()
                .map_err(|error| AppError::Internal(format!("failed to lock ledger: {error}")))?
                .iter()
                .filter(|transaction| transaction.tenant_id == tenant_id)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    fn new_transaction() -> NewTransaction {
        let currency = CurrencyCode::new("USD").unwrap_or_else(|_| unreachable!());
        NewTransaction::new(100, currency, None, None).unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn transactions_are_booked_in_actor_tenant() {
        let service = TransactionService::new(Arc::new(RecordingRepository::default()));
        let tenant_id = TenantId::new();
        let actor = UserIdentity::new(
            "teller-1",
            "Teller",
            None,
            Some(TenantScope::new(tenant_id, false)),
        );

        let created = service.create_transaction(&actor, new_transaction()).await;
        assert!(created.is_ok());
        let created = created.unwrap_or_else(|_| unreachable!());
        assert_eq!(created.tenant_id, tenant_id);
        assert_eq!(created.created_by, "teller-1");

        let other_tenant = UserIdentity::new(
            "teller-2",
            "Teller",
            None,
            Some(TenantScope::new(TenantId::new(), false)),
        );
        let listed = service.list_transactions(&other_tenant, None).await;
        assert_eq!(listed.map(|items| items.len()).ok(), Some(0));
    }

    #[tokio::test]
    async fn unscoped_identity_cannot_book() {
        let service = TransactionService::new(Arc::new(RecordingRepository::default()));
        let operator = UserIdentity::new("operator", "Operator", None, None);

        let result = service.create_transaction(&operator, new_transaction()).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
