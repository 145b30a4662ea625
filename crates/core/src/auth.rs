use serde::{Deserialize, Serialize};

use crate::TenantId;

/// Tenant membership attached to an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantScope {
    tenant_id: TenantId,
    verified: bool,
}

impl TenantScope {
    /// Creates a tenant scope.
    #[must_use]
    pub fn new(tenant_id: TenantId, verified: bool) -> Self {
        Self {
            tenant_id,
            verified,
        }
    }

    /// Returns the scoped tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns whether the tenant completed verification.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verified
    }
}

/// User information persisted in the authenticated session.
///
/// Identities without a tenant scope belong to platform operators that act
/// across tenants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    subject: String,
    display_name: String,
    email: Option<String>,
    tenant: Option<TenantScope>,
}

impl UserIdentity {
    /// Creates a user identity from authentication and tenancy data.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        display_name: impl Into<String>,
        email: Option<String>,
        tenant: Option<TenantScope>,
    ) -> Self {
        Self {
            subject: subject.into(),
            display_name: display_name.into(),
            email,
            tenant,
        }
    }

    /// Returns the stable subject claim from the identity provider.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the tenant scope, if the identity is tenant-bound.
    #[must_use]
    pub fn tenant(&self) -> Option<TenantScope> {
        self.tenant
    }

    /// Returns the tenant linked to the identity.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant.map(|scope| scope.tenant_id())
    }
}

#[cfg(test)]
mod tests {
    use crate::TenantId;

    use super::{TenantScope, UserIdentity};

    #[test]
    fn identity_round_trips_through_session_json() {
        let identity = UserIdentity::new(
            "user-42",
            "Teller",
            Some("teller@example.com".to_owned()),
            Some(TenantScope::new(TenantId::new(), true)),
        );

        let encoded = serde_json::to_string(&identity).unwrap_or_default();
        let decoded = serde_json::from_str::<UserIdentity>(&encoded);
        assert!(decoded.is_ok());
        assert_eq!(decoded.ok(), Some(identity));
    }

    #[test]
    fn unscoped_identity_has_no_tenant() {
        let identity = UserIdentity::new("operator", "Operator", None, None);
        assert!(identity.tenant_id().is_none());
    }
}
