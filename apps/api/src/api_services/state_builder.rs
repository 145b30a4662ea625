use std::sync::Arc;

use remitdesk_application::{
    IdempotencyRepository, IdempotencyService, RateLimitService, SecurityEventService,
    TransactionService,
};
use remitdesk_infrastructure::{
    InMemoryIdempotencyRepository, InMemoryRateLimitRepository, PostgresIdempotencyRepository,
    PostgresSecurityEventRepository, PostgresTransactionRepository,
};
use sqlx::PgPool;
use tracing::info;

use crate::api_config::{ApiConfig, IdempotencyStoreConfig};
use crate::state::{AppState, RateLimitPolicies};

pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> AppState {
    let idempotency_repository: Arc<dyn IdempotencyRepository> = match config.idempotency_store
    {
        IdempotencyStoreConfig::Postgres => {
            Arc::new(PostgresIdempotencyRepository::new(pool.clone()))
        }
        IdempotencyStoreConfig::Memory => {
            info!("using in-memory idempotency store; keys are not shared between replicas");
            Arc::new(InMemoryIdempotencyRepository::new())
        }
    };

    let settings = &config.rate_limits;

    AppState {
        transaction_service: TransactionService::new(Arc::new(
            PostgresTransactionRepository::new(pool.clone()),
        )),
        idempotency_service: IdempotencyService::new(
            idempotency_repository,
            config.idempotency_ttl_seconds,
        ),
        rate_limit_service: RateLimitService::new(Arc::new(InMemoryRateLimitRepository::new())),
        security_event_service: SecurityEventService::new(Arc::new(
            PostgresSecurityEventRepository::new(pool),
        )),
        rate_limits: RateLimitPolicies {
            ip: settings.ip.clone(),
            user: settings.user.clone(),
            tenant: settings.tenant.clone(),
            sensitive: settings.sensitive.clone(),
            verified_tenant_multiplier: settings.verified_tenant_multiplier,
        },
    }
}
