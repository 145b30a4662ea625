//! Idempotency key records guarding retried write requests.

use std::fmt::Write;

use chrono::{DateTime, Duration, Utc};
use remitdesk_core::{AppError, AppResult, TenantId};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Maximum accepted length of a client supplied idempotency key.
pub const IDEMPOTENCY_KEY_MAX_LENGTH: usize = 255;

/// Client supplied key identifying one logical write operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Creates a key from a raw header value.
    ///
    /// Surrounding whitespace is trimmed. Empty or oversized keys are rejected.
    pub fn new(value: impl AsRef<str>) -> AppResult<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "idempotency key must not be empty".to_owned(),
            ));
        }

        if trimmed.chars().count() > IDEMPOTENCY_KEY_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "idempotency key must not exceed {IDEMPOTENCY_KEY_MAX_LENGTH} characters"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Lowercase hex SHA-256 digest of a raw request body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestHash(String);

impl RequestHash {
    /// Hashes the raw body bytes.
    #[must_use]
    pub fn of_body(body: &[u8]) -> Self {
        let digest = Sha256::digest(body);
        let hex = digest
            .iter()
            .fold(String::with_capacity(64), |mut acc, byte| {
                let _ = write!(acc, "{byte:02x}");
                acc
            });

        Self(hex)
    }

    /// Wraps a digest previously produced by [`RequestHash::of_body`].
    #[must_use]
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Persisted lifecycle state of an idempotency record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyState {
    /// The original request is still executing.
    InProgress,
    /// The original request finished successfully and its response is stored.
    Completed,
    /// A stored value this build does not understand.
    Unrecognized(String),
}

impl IdempotencyState {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Unrecognized(value) => value.as_str(),
        }
    }

    /// Parses a storage value.
    #[must_use]
    pub fn from_stored(value: &str) -> Self {
        match value {
            "IN_PROGRESS" => Self::InProgress,
            "COMPLETED" => Self::Completed,
            other => Self::Unrecognized(other.to_owned()),
        }
    }
}

/// Natural key of an idempotency record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyScope {
    /// Tenant owning the key space.
    pub tenant_id: TenantId,
    /// Client key.
    pub key: IdempotencyKey,
    /// Matched route pattern, e.g. `/api/clients/{client_id}`.
    pub route_template: String,
    /// Upper-case HTTP method.
    pub method: String,
}

/// Stored outcome of one idempotent write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    /// Row identifier.
    pub id: Uuid,
    /// Natural key.
    pub scope: IdempotencyScope,
    /// Digest of the request body that claimed the key.
    pub request_hash: RequestHash,
    /// Lifecycle state.
    pub state: IdempotencyState,
    /// Captured response status once completed.
    pub status_code: Option<u16>,
    /// Captured response body once completed.
    pub response_body: Option<Vec<u8>>,
    /// Authenticated user that claimed the key, if known.
    pub user_id: Option<String>,
    /// Claim time.
    pub created_at: DateTime<Utc>,
    /// Instant after which the record is treated as absent.
    pub expires_at: DateTime<Utc>,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
}

impl IdempotencyRecord {
    /// Builds a freshly claimed record.
    #[must_use]
    pub fn in_progress(
        scope: IdempotencyScope,
        request_hash: RequestHash,
        user_id: Option<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            scope,
            request_hash,
            state: IdempotencyState::InProgress,
            status_code: None,
            response_body: None,
            user_id,
            created_at: now,
            expires_at: now
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            completed_at: None,
        }
    }

    /// Returns whether the record expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Returns whether the stored digest matches a new request.
    #[must_use]
    pub fn matches_request(&self, request_hash: &RequestHash) -> bool {
        &self.request_hash == request_hash
    }
}
