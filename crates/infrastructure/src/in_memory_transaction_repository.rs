use std::collections::HashMap;

use async_trait::async_trait;
use remitdesk_application::TransactionRepository;
use remitdesk_core::{AppResult, TenantId};
use remitdesk_domain::LedgerTransaction;
use tokio::sync::RwLock;

/// In-memory tenant ledger used when running without PostgreSQL and in tests.
#[derive(Debug, Default)]
pub struct InMemoryTransactionRepository {
    ledgers: RwLock<HashMap<TenantId, Vec<LedgerTransaction>>>,
}

impl InMemoryTransactionRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn insert_transaction(&self, transaction: &LedgerTransaction) -> AppResult<()> {
        self.ledgers
            .write()
            .await
            .entry(transaction.tenant_id)
            .or_default()
            .push(transaction.clone());
        Ok(())
    }

    async fn list_transactions(
        &self,
        tenant_id: TenantId,
        limit: usize,
    ) -> AppResult<Vec<LedgerTransaction>> {
        let ledgers = self.ledgers.read().await;
        Ok(ledgers
            .get(&tenant_id)
            .map(|entries| entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use remitdesk_application::TransactionRepository;
    use remitdesk_core::TenantId;
    use remitdesk_domain::{CurrencyCode, LedgerTransaction, TransactionId};

    use super::InMemoryTransactionRepository;

    fn entry(tenant_id: TenantId, amount_minor: i64) -> LedgerTransaction {
        LedgerTransaction {
            id: TransactionId::new(),
            tenant_id,
            amount_minor,
            currency: CurrencyCode::new("USD").unwrap_or_else(|_| unreachable!()),
            branch_code: None,
            note: None,
            created_by: "alice".to_owned(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn lists_newest_first_and_isolates_tenants() {
        let repository = InMemoryTransactionRepository::new();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();

        for amount in [100, 200, 300] {
            assert!(
                repository
                    .insert_transaction(&entry(tenant_a, amount))
                    .await
                    .is_ok()
            );
        }
        assert!(repository.insert_transaction(&entry(tenant_b, 999)).await.is_ok());

        let listed = repository
            .list_transactions(tenant_a, 2)
            .await
            .unwrap_or_default();
        let amounts: Vec<i64> = listed.iter().map(|entry| entry.amount_minor).collect();
        assert_eq!(amounts, vec![300, 200]);
    }
}
