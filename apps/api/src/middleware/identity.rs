use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use remitdesk_core::{AppError, UserIdentity};
use tower_sessions::Session;

use crate::error::ApiResult;

/// Session key under which the sign-in flow stores the [`UserIdentity`].
pub const SESSION_USER_KEY: &str = "user_identity";

/// Copies the session identity into request extensions. Never rejects.
pub async fn attach_identity(mut request: Request, next: Next) -> ApiResult<Response> {
    if request.extensions().get::<UserIdentity>().is_some() {
        return Ok(next.run(request).await);
    }

    if let Some(session) = request.extensions().get::<Session>().cloned() {
        let identity = session
            .get::<UserIdentity>(SESSION_USER_KEY)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read session identity: {error}"))
            })?;

        if let Some(identity) = identity {
            request.extensions_mut().insert(identity);
        }
    }

    Ok(next.run(request).await)
}

pub async fn require_auth(request: Request, next: Next) -> ApiResult<Response> {
    if request.extensions().get::<UserIdentity>().is_none() {
        return Err(AppError::Unauthorized("authentication required".to_owned()).into());
    }

    Ok(next.run(request).await)
}
