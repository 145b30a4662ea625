//! Rate limiting ports and application service.
//!
//! Implements a fixed-start sliding window per identifier. All policies in a
//! process share one repository, so identifiers are namespaced (`ip_`,
//! `user_`, `tenant_`, `sensitive_user_`) to keep their buckets apart.

mod config;
mod identifiers;
mod ports;
mod service;

#[cfg(test)]
mod tests;

pub use config::RateLimitRule;
pub use identifiers::{
    client_ip, ip_identifier, sensitive_identifier, tenant_identifier, user_identifier,
};
pub use ports::{RateLimitDecision, RateLimitRepository};
pub use service::RateLimitService;
