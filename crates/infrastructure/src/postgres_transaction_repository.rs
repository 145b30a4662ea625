use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use remitdesk_application::TransactionRepository;
use remitdesk_core::{AppError, AppResult, TenantId};
use remitdesk_domain::{CurrencyCode, LedgerTransaction, TransactionId};

/// PostgreSQL-backed tenant ledger.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    tenant_id: Uuid,
    amount_minor: i64,
    currency: String,
    branch_code: Option<String>,
    note: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_transaction(self) -> AppResult<LedgerTransaction> {
        Ok(LedgerTransaction {
            id: TransactionId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            amount_minor: self.amount_minor,
            currency: CurrencyCode::new(self.currency)?,
            branch_code: self.branch_code,
            note: self.note,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn insert_transaction(&self, transaction: &LedgerTransaction) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_transactions (
                id,
                tenant_id,
                amount_minor,
                currency,
                branch_code,
                note,
                created_by,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.tenant_id.as_uuid())
        .bind(transaction.amount_minor)
        .bind(transaction.currency.as_str())
        .bind(transaction.branch_code.as_deref())
        .bind(transaction.note.as_deref())
        .bind(transaction.created_by.as_str())
        .bind(transaction.created_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to insert ledger transaction: {error}"))
        })?;

        Ok(())
    }

    async fn list_transactions(
        &self,
        tenant_id: TenantId,
        limit: usize,
    ) -> AppResult<Vec<LedgerTransaction>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, tenant_id, amount_minor, currency, branch_code, note, created_by, created_at
            FROM ledger_transactions
            WHERE tenant_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list ledger transactions: {error}"))
        })?;

        rows.into_iter()
            .map(TransactionRow::into_transaction)
            .collect()
    }
}
