//! Idempotency key protocol for retried write requests.
//!
//! A key is claimed by inserting an `IN_PROGRESS` record. The store's unique
//! constraint on `(tenant, key, route template, method)` decides which caller
//! wins a race; no in-process lock is involved.

mod ports;
mod service;


pub use ports::{IdempotencyCompletion, IdempotencyRepository};
pub use service::{
    DEFAULT_IDEMPOTENCY_TTL_SECONDS, IdempotencyClaim, IdempotencyConflict, IdempotencyDecision,
    IdempotencyService, IdempotentRequest, StoredResponse,
};
