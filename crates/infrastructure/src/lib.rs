//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_idempotency_repository;
mod in_memory_rate_limit_repository;
mod in_memory_transaction_repository;
mod postgres_idempotency_repository;
mod postgres_security_event_repository;
mod postgres_transaction_repository;

pub use in_memory_idempotency_repository::InMemoryIdempotencyRepository;
pub use in_memory_rate_limit_repository::InMemoryRateLimitRepository;
pub use in_memory_transaction_repository::InMemoryTransactionRepository;
pub use postgres_idempotency_repository::PostgresIdempotencyRepository;
pub use postgres_security_event_repository::PostgresSecurityEventRepository;
pub use postgres_transaction_repository::PostgresTransactionRepository;
