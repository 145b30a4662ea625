use std::sync::Arc;

use async_trait::async_trait;

use remitdesk_core::{AppResult, TenantId};

/// Security event payload for audit and abuse analytics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityEvent {
    /// Subject if available.
    pub subject: Option<String>,
    /// Tenant if available.
    pub tenant_id: Option<TenantId>,
    /// Stable event type identifier.
    pub event_type: String,
    /// Event outcome label.
    pub outcome: String,
    /// Caller IP address if available.
    pub ip_address: Option<String>,
    /// Caller user-agent if available.
    pub user_agent: Option<String>,
    /// Free-form detail, e.g. the route that was throttled.
    pub detail: Option<String>,
}

impl SecurityEvent {
    /// Builds the event emitted when the authentication limiter rejects a caller.
    #[must_use]
    pub fn auth_rate_limit_exceeded(
        subject: Option<String>,
        tenant_id: Option<TenantId>,
        ip_address: Option<String>,
        user_agent: Option<String>,
        route: &str,
    ) -> Self {
        Self {
            subject,
            tenant_id,
            event_type: "auth_rate_limit_exceeded".to_owned(),
            outcome: "blocked".to_owned(),
            ip_address,
            user_agent,
            detail: Some(route.to_owned()),
        }
    }
}

/// Repository port for security event persistence.
#[async_trait]
pub trait SecurityEventRepository: Send + Sync {
    /// Appends a security event entry.
    async fn append_event(&self, event: SecurityEvent) -> AppResult<()>;
}

/// Application service for security event recording.
#[derive(Clone)]
pub struct SecurityEventService {
    repository: Arc<dyn SecurityEventRepository>,
}

impl SecurityEventService {
    /// Creates a service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn SecurityEventRepository>) -> Self {
        Self { repository }
    }

    /// Persists a security event.
    pub async fn record_event(&self, event: SecurityEvent) -> AppResult<()> {
        self.repository.append_event(event).await
    }
}
