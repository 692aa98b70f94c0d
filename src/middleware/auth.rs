//! Auth gate — bearer session verification in front of protected routes.
//!
//! Runs as router middleware, so a handler mounted behind it cannot be
//! reached without a verified token. The verified identity is attached to the
//! request as an [`AuthContext`] extension; handlers take it as an extractor,
//! which itself rejects if the gate did not run.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;

use crate::errors::AppError;
use crate::AppState;

/// Identity of a verified session, scoped to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub subject_id: String,
    pub email: String,
    pub roles: BTreeSet<String>,
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// `None` when the header is absent, not UTF-8, uses another scheme, or the
/// token part is empty or contains whitespace.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}

/// Middleware: rejects the request with 401 unless it carries a valid session token.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !req.headers().contains_key(header::AUTHORIZATION) {
        tracing::debug!(path = %req.uri().path(), "auth gate: missing authorization header");
        return Err(AppError::Unauthorized);
    }

    let Some(token) = bearer_token(req.headers()) else {
        tracing::debug!(path = %req.uri().path(), "auth gate: invalid authorization format");
        return Err(AppError::Unauthorized);
    };

    let claims = state.codec.verify(token).map_err(|e| {
        // SECURITY: log the failure kind only, never the token
        tracing::warn!(path = %req.uri().path(), reason = e.kind(), "auth gate: session token rejected");
        AppError::from(e)
    })?;

    req.extensions_mut().insert(AuthContext {
        subject_id: claims.subject_id,
        email: claims.email,
        roles: claims.roles,
    });
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
