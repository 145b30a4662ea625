//! Application services and ports.

#![forbid(unsafe_code)]

mod clock;
mod idempotency_service;
mod rate_limit_service;
mod security_event_service;
mod transaction_service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use idempotency_service::{
    DEFAULT_IDEMPOTENCY_TTL_SECONDS, IdempotencyClaim, IdempotencyCompletion,
    IdempotencyConflict, IdempotencyDecision, IdempotencyRepository, IdempotencyService,
    IdempotentRequest, StoredResponse,
};
pub use rate_limit_service::{
    RateLimitDecision, RateLimitRepository, RateLimitRule, RateLimitService, client_ip,
    ip_identifier, sensitive_identifier, tenant_identifier, user_identifier,
};
pub use security_event_service::{SecurityEvent, SecurityEventRepository, SecurityEventService};
pub use transaction_service::{
    MAX_TRANSACTION_PAGE_SIZE, TransactionRepository, TransactionService,
};
