//! PostgreSQL-backed idempotency repository using the `idempotency_keys` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use remitdesk_application::{IdempotencyCompletion, IdempotencyRepository};
use remitdesk_core::{AppError, AppResult, TenantId};
use remitdesk_domain::{
    IdempotencyKey, IdempotencyRecord, IdempotencyScope, IdempotencyState, RequestHash,
};


/// PostgreSQL implementation of the idempotency repository port.
#[derive(Clone)]
pub struct PostgresIdempotencyRepository {
    pool: PgPool,
}

impl PostgresIdempotencyRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct IdempotencyRow {
    id: Uuid,
    tenant_id: Uuid,
    idempotency_key: String,
    route_template: String,
    method: String,
    request_hash: String,
    state: String,
    status_code: Option<i32>,
    response_body: Option<Vec<u8>>,
    user_id: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl IdempotencyRow {
    fn into_record(self) -> AppResult<IdempotencyRecord> {
        let status_code = self
            .status_code
            .map(u16::try_from)
            .transpose()
            .map_err(|error| {
                AppError::Internal(format!(
                    "invalid stored status code for idempotency record '{}': {error}",
                    self.id
                ))
            })?;

        Ok(IdempotencyRecord {
            id: self.id,
            scope: IdempotencyScope {
                tenant_id: TenantId::from_uuid(self.tenant_id),
                key: IdempotencyKey::new(self.idempotency_key)?,
                route_template: self.route_template,
                method: self.method,
            },
            request_hash: RequestHash::from_stored(self.request_hash),
            state: IdempotencyState::from_stored(self.state.as_str()),
            status_code,
            response_body: self.response_body,
            user_id: self.user_id,
            created_at: self.created_at,
            expires_at: self.expires_at,
            completed_at: self.completed_at,
        })
    }
}

#[async_trait]
impl IdempotencyRepository for PostgresIdempotencyRepository {
    async fn insert_record(&self, record: &IdempotencyRecord) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO idempotency_keys (
                id,
                tenant_id,
                idempotency_key,
                route_template,
                method,
                request_hash,
                state,
                user_id,
                created_at,
                expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(record.scope.tenant_id.as_uuid())
        .bind(record.scope.key.as_str())
        .bind(record.scope.route_template.as_str())
        .bind(record.scope.method.as_str())
        .bind(record.request_hash.as_str())
        .bind(record.state.as_str())
        .bind(record.user_id.as_deref())
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) => {
                if let sqlx::Error::Database(database_error) = &error
                    && database_error.code().as_deref() == Some("23505")
                {
                    return Err(AppError::Conflict(format!(
                        "idempotency key '{}' already claimed for tenant '{}'",
                        record.scope.key.as_str(),
                        record.scope.tenant_id
                    )));
                }

                Err(AppError::Internal(format!(
                    "failed to claim idempotency key: {error}"
                )))
            }
        }
    }

    async fn find_record(
        &self,
        scope: &IdempotencyScope,
    ) -> AppResult<Option<IdempotencyRecord>> {
        let row = sqlx::query_as::<_, IdempotencyRow>(
            r#"
            SELECT
                id,
                tenant_id,
                idempotency_key,
                route_template,
                method,
                request_hash,
                state,
                status_code,
                response_body,
                user_id,
                created_at,
                expires_at,
                completed_at
            FROM idempotency_keys
            WHERE tenant_id = $1
              AND idempotency_key = $2
              AND route_template = $3
              AND method = $4
            "#,
        )
        .bind(scope.tenant_id.as_uuid())
        .bind(scope.key.as_str())
        .bind(scope.route_template.as_str())
        .bind(scope.method.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load idempotency record: {error}"))
        })?;

        row.map(IdempotencyRow::into_record).transpose()
    }

    async fn complete_record(
        &self,
        record_id: Uuid,
        completion: &IdempotencyCompletion,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE idempotency_keys
            SET
                state = $2,
                status_code = $3,
                response_body = $4,
                completed_at = $5,
                expires_at = $6
            WHERE id = $1
            "#,
        )
        .bind(record_id)
        .bind(IdempotencyState::Completed.as_str())
        .bind(i32::from(completion.status_code))
        .bind(completion.response_body.as_slice())
        .bind(completion.completed_at)
        .bind(completion.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to complete idempotency record: {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "idempotency record '{record_id}' does not exist"
            )));
        }

        Ok(())
    }

    async fn delete_record(&self, record_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM idempotency_keys
            WHERE id = $1
            "#,
        )
        .bind(record_id)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete idempotency record: {error}"))
        })?;

        Ok(())
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM idempotency_keys
            WHERE expires_at <= $1
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to purge expired idempotency keys: {error}"))
        })?;

        Ok(result.rows_affected())
    }
}
