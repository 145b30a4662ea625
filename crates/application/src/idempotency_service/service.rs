use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use remitdesk_core::{AppError, AppResult};
use remitdesk_domain::{IdempotencyRecord, IdempotencyScope, IdempotencyState, RequestHash};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};

use super::ports::{IdempotencyCompletion, IdempotencyRepository};

/// Retention applied when no positive value is configured (24 hours).
pub const DEFAULT_IDEMPOTENCY_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Attempts to reclaim a key whose record expired or vanished before giving up.
const MAX_RECLAIM_ATTEMPTS: u32 = 3;

/// A write request that opted into idempotency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotentRequest {
    /// Natural key of the record.
    pub scope: IdempotencyScope,
    /// Digest of the raw request body.
    pub request_hash: RequestHash,
    /// Authenticated user, if any.
    pub user_id: Option<String>,
}

/// Exclusive right to execute the request for a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyClaim {
    record_id: Uuid,
    scope: IdempotencyScope,
}

impl IdempotencyClaim {
    /// Returns the claimed record id.
    #[must_use]
    pub fn record_id(&self) -> Uuid {
        self.record_id
    }

    /// Returns the claimed scope.
    #[must_use]
    pub fn scope(&self) -> &IdempotencyScope {
        &self.scope
    }
}

/// Response stored by the first successful execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    /// Status code, 200 when none was recorded.
    pub status_code: u16,
    /// Body bytes, verbatim.
    pub body: Vec<u8>,
}

/// Why a request could not claim or replay its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdempotencyConflict {
    /// The key was used with a different request body.
    KeyReused,
    /// The original request is still executing.
    InProgress,
    /// The key is held in a state that allows neither replay nor claim.
    Unavailable,
}

impl IdempotencyConflict {
    /// Returns the client-facing message.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::KeyReused => "idempotency key reuse with different request",
            Self::InProgress => "request in progress",
            Self::Unavailable => "idempotency key not available",
        }
    }
}

/// Result of [`IdempotencyService::begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyDecision {
    /// The caller owns the key and must run the handler, then call `finish`.
    Claimed(IdempotencyClaim),
    /// Return the stored response without running the handler.
    Replay(StoredResponse),
    /// Reject the request.
    Conflict(IdempotencyConflict),
}

/// Application service implementing the idempotency key protocol.
#[derive(Clone)]
pub struct IdempotencyService {
    repository: Arc<dyn IdempotencyRepository>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl IdempotencyService {
    /// Creates a service. Non-positive retention falls back to 24 hours.
    #[must_use]
    pub fn new(repository: Arc<dyn IdempotencyRepository>, ttl_seconds: i64) -> Self {
        let ttl_seconds = if ttl_seconds > 0 {
            ttl_seconds
        } else {
            DEFAULT_IDEMPOTENCY_TTL_SECONDS
        };

        Self {
            repository,
            clock: Arc::new(SystemClock),
            ttl: Duration::try_seconds(ttl_seconds)
                .unwrap_or_else(|| Duration::seconds(DEFAULT_IDEMPOTENCY_TTL_SECONDS)),
        }
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configured retention.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Claims the key or resolves the request against the existing record.
    pub async fn begin(&self, request: IdempotentRequest) -> AppResult<IdempotencyDecision> {
        let now = self.clock.now();

        if let Some(claim) = self.try_claim(&request, now).await? {
            return Ok(IdempotencyDecision::Claimed(claim));
        }

        let mut existing = self.repository.find_record(&request.scope).await?;
        let mut reclaim_attempts = 0;

        loop {
            match existing {
                Some(record) if !record.is_expired(now) => {
                    return Ok(resolve_existing(&record, &request.request_hash));
                }
                Some(record) => {
                    debug!(
                        record_id = %record.id,
                        key = request.scope.key.as_str(),
                        "reclaiming expired idempotency key"
                    );
                    self.repository.delete_record(record.id).await?;
                }
                None => {}
            }

            if reclaim_attempts >= MAX_RECLAIM_ATTEMPTS {
                info!(
                    key = request.scope.key.as_str(),
                    route = request.scope.route_template.as_str(),
                    "idempotency key reclaim attempts exhausted"
                );
                return Ok(IdempotencyDecision::Conflict(
                    IdempotencyConflict::Unavailable,
                ));
            }
            reclaim_attempts += 1;

            if let Some(claim) = self.try_claim(&request, now).await? {
                return Ok(IdempotencyDecision::Claimed(claim));
            }

            existing = self.repository.find_record(&request.scope).await?;
        }
    }

    /// Records the handler outcome for a claimed key.
    ///
    /// 2xx responses are stored for replay; anything else deletes the record so
    /// the operation can be retried from a clean slate.
    pub async fn finish(
        &self,
        claim: IdempotencyClaim,
        status_code: u16,
        response_body: Vec<u8>,
    ) -> AppResult<()> {
        if !(200..300).contains(&status_code) {
            return self.release(claim).await;
        }

        let completed_at = self.clock.now();
        let completion = IdempotencyCompletion {
            status_code,
            response_body,
            completed_at,
            expires_at: completed_at
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        self.repository
            .complete_record(claim.record_id, &completion)
            .await
    }

    /// Gives up a claim without storing an outcome.
    pub async fn release(&self, claim: IdempotencyClaim) -> AppResult<()> {
        self.repository.delete_record(claim.record_id).await
    }

    /// Removes expired records. Intended for periodic cleanup.
    pub async fn purge_expired(&self) -> AppResult<u64> {
        self.repository.purge_expired(self.clock.now()).await
    }

    async fn try_claim(
        &self,
        request: &IdempotentRequest,
        now: DateTime<Utc>,
    ) -> AppResult<Option<IdempotencyClaim>> {
        let record = IdempotencyRecord::in_progress(
            request.scope.clone(),
            request.request_hash.clone(),
            request.user_id.clone(),
            now,
            self.ttl,
        );

        match self.repository.insert_record(&record).await {
            Ok(()) => Ok(Some(IdempotencyClaim {
                record_id: record.id,
                scope: record.scope,
            })),
            Err(AppError::Conflict(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }
}

fn resolve_existing(record: &IdempotencyRecord, request_hash: &RequestHash) -> IdempotencyDecision {
    if !record.matches_request(request_hash) {
        return IdempotencyDecision::Conflict(IdempotencyConflict::KeyReused);
    }

    match record.state {
        IdempotencyState::InProgress => {
            IdempotencyDecision::Conflict(IdempotencyConflict::InProgress)
        }
        IdempotencyState::Completed => IdempotencyDecision::Replay(StoredResponse {
            status_code: record.status_code.unwrap_or(200),
            body: record.response_body.clone().unwrap_or_default(),
        }),
        IdempotencyState::Unrecognized(_) => {
            IdempotencyDecision::Conflict(IdempotencyConflict::Unavailable)
        }
    }
}
