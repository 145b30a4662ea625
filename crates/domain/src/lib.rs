//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod idempotency;
mod rate_limit;
mod transaction;

pub use idempotency::{
    IDEMPOTENCY_KEY_MAX_LENGTH, IdempotencyKey, IdempotencyRecord, IdempotencyScope,
    IdempotencyState, RequestHash,
};
pub use rate_limit::RateWindow;
pub use transaction::{CurrencyCode, LedgerTransaction, NewTransaction, TransactionId};
