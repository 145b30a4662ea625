use axum::extract::{MatchedPath, Request};

mod idempotency;
mod identity;
mod rate_limit;


pub use idempotency::{IDEMPOTENCY_KEY_HEADER, idempotency};
pub use identity::{SESSION_USER_KEY, attach_identity, require_auth};
pub use rate_limit::{
    SensitiveRouteClass, rate_limit_by_ip, rate_limit_by_user_and_tenant, rate_limit_sensitive,
};

/// Matched route pattern, or the literal path outside of a routed service.
fn route_template(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(
            || request.uri().path().to_owned(),
            |path| path.as_str().to_owned(),
        )
}
