use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Fatal startup faults. The process refuses to start on any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("KEYSMITH_SIGNING_KEY must be at least {min} bytes, got {len}")]
    WeakSigningKey { len: usize, min: usize },

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Failures of the credential persistence contract.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("credential already exists")]
    Conflict,

    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    #[error("credential not found")]
    NotFound,
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Conflict,
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Session token rejection reasons.
///
/// The distinction is for diagnostics only: every variant surfaces to an
/// untrusted caller as the same `unauthorized` response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("token could not be signed: {0}")]
    Signing(String),
}

impl TokenError {
    /// Stable short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::SignatureInvalid => "signature_invalid",
            TokenError::Expired => "expired",
            TokenError::Signing(_) => "signing",
        }
    }
}

/// Slow-hash or entropy failure. Treated as fatal for the operation, never retried.
#[derive(Debug, Error)]
pub enum HashingError {
    #[error("hash algorithm failure: {0}")]
    Algorithm(String),

    #[error("hashing task aborted: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hashing(#[from] HashingError),
}

/// Failures of the login exchange with the external identity provider.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("identity provider rejected the login (status {status})")]
    Rejected { status: u16 },

    #[error("identity provider unreachable: {0}")]
    Unavailable(String),

    #[error("identity provider returned an unreadable response: {0}")]
    InvalidResponse(String),
}

/// Outermost request-boundary error. Converts component errors into a
/// user-facing status without echoing secrets, hashes or token internals.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("login failed")]
    LoginRejected { status: u16 },

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(msg) => AppError::Internal(anyhow::anyhow!(msg)),
            _ => AppError::Unauthorized,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => AppError::Conflict,
            StoreError::NotFound => AppError::NotFound,
            StoreError::Unavailable(msg) => AppError::Unavailable(msg),
        }
    }
}

impl From<IssuanceError> for AppError {
    fn from(e: IssuanceError) -> Self {
        match e {
            IssuanceError::Store(s) => s.into(),
            IssuanceError::Hashing(h) => AppError::Internal(anyhow::Error::new(h)),
        }
    }
}

impl From<LoginError> for AppError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::Rejected { status } => AppError::LoginRejected { status },
            LoginError::Unavailable(msg) | LoginError::InvalidResponse(msg) => {
                AppError::Upstream(msg)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "unauthorized",
                "invalid or missing session token".to_string(),
            ),
            AppError::BadRequest(reason) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "bad_request",
                reason.clone(),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "invalid_request_error",
                "not_found",
                "resource not found".to_string(),
            ),
            AppError::Conflict => (
                StatusCode::CONFLICT,
                "invalid_request_error",
                "conflict",
                "resource already exists".to_string(),
            ),
            AppError::Unavailable(e) => {
                tracing::error!("Credential store unavailable: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "internal_error",
                    "service_unavailable",
                    "service temporarily unavailable".to_string(),
                )
            }
            AppError::LoginRejected { status } => {
                let status = StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error())
                    .unwrap_or(StatusCode::UNAUTHORIZED);
                (
                    status,
                    "authentication_error",
                    "login_failed",
                    "login failed".to_string(),
                )
            }
            AppError::Upstream(e) => {
                tracing::warn!("Identity provider error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    "upstream_failed",
                    "identity provider error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        let mut response = (status, body).into_response();

        if matches!(self, AppError::Unauthorized) {
            response.headers_mut().insert(
                "www-authenticate",
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_token_errors_collapse_to_unauthorized() {
        for err in [
            TokenError::Malformed,
            TokenError::SignatureInvalid,
            TokenError::Expired,
        ] {
            let resp = AppError::from(err).into_response();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(resp.headers()["www-authenticate"], "Bearer");
        }
    }

    #[test]
    fn test_store_errors_map_to_statuses() {
        assert_eq!(
            AppError::from(StoreError::Conflict).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(StoreError::NotFound).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(StoreError::Unavailable("pool timed out".into()))
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_login_rejection_keeps_client_status_only() {
        let resp = AppError::LoginRejected { status: 403 }.into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // A 5xx from the identity provider is not echoed as-is
        let resp = AppError::LoginRejected { status: 500 }.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
