use async_trait::async_trait;
use sqlx::PgPool;

use remitdesk_application::{SecurityEvent, SecurityEventRepository};
use remitdesk_core::{AppError, AppResult};

/// PostgreSQL-backed repository for security events.
#[derive(Clone)]
pub struct PostgresSecurityEventRepository {
    pool: PgPool,
}

impl PostgresSecurityEventRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecurityEventRepository for PostgresSecurityEventRepository {
    async fn append_event(&self, event: SecurityEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO security_events (
                subject,
                tenant_id,
                event_type,
                outcome,
                ip_address,
                user_agent,
                detail
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.subject)
        .bind(event.tenant_id.map(|tenant_id| tenant_id.as_uuid()))
        .bind(event.event_type)
        .bind(event.outcome)
        .bind(event.ip_address)
        .bind(event.user_agent)
        .bind(event.detail)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to append security event: {error}"))
        })?;

        Ok(())
    }
}
