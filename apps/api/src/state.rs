use remitdesk_application::{
    IdempotencyService, RateLimitRule, RateLimitService, SecurityEventService, TransactionService,
};

/// Rules applied by the rate limit middleware.
#[derive(Debug, Clone)]
pub struct RateLimitPolicies {
    pub ip: RateLimitRule,
    pub user: RateLimitRule,
    pub tenant: RateLimitRule,
    pub sensitive: RateLimitRule,
    pub verified_tenant_multiplier: f64,
}

/// Shared application state.
///
/// `rate_limit_service` wraps the single limiter table of the process; every
/// policy checks against it with its own identifier namespace.
#[derive(Clone)]
pub struct AppState {
    pub transaction_service: TransactionService,
    pub idempotency_service: IdempotencyService,
    pub rate_limit_service: RateLimitService,
    pub security_event_service: SecurityEventService,
    pub rate_limits: RateLimitPolicies,
}
