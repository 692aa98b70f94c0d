use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::RawSecret;
use crate::errors::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::credential::PublicKeyRef;
use crate::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: i64,
}

#[derive(Deserialize)]
pub struct IssueKeyRequest {
    pub owner_id: String,
    pub note: Option<String>,
}

#[derive(Serialize)]
pub struct IssueKeyResponse {
    pub id: Uuid,
    pub owner_id: String,
    pub public_key: String,
    /// Shown once. Not retrievable afterwards. Zeroed when the response is dropped.
    pub secret: RawSecret,
    pub display_secret: String,
}

#[derive(Deserialize)]
pub struct VerifyKeyRequest {
    pub secret: String,
}

#[derive(Serialize)]
pub struct VerifyKeyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────

/// POST /api/login — exchange credentials with the identity provider for a session token
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<LoginResponse>, AppError> {
    if !payload.is_object() {
        return Err(AppError::BadRequest("login body must be a JSON object".into()));
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    let identity = state.identity.login(payload, user_agent).await?;
    let (token, claims) = state.codec.issue(identity)?;

    tracing::info!(subject_id = %claims.subject_id, expires_at = claims.expires_at, "session issued");
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_at: claims.expires_at,
    }))
}

/// GET /api/v1/session — identity of the verified caller
pub async fn current_session(auth: AuthContext) -> Json<AuthContext> {
    Json(auth)
}

/// POST /api/v1/keys — issue a new API credential for an owner
pub async fn issue_key(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(payload): Json<IssueKeyRequest>,
) -> Result<(StatusCode, Json<IssueKeyResponse>), AppError> {
    let owner_id = payload.owner_id.trim();
    if owner_id.is_empty() {
        return Err(AppError::BadRequest("owner_id is required".into()));
    }

    let issued = state.issuer.issue(owner_id, payload.note).await?;
    tracing::info!(
        subject_id = %auth.subject_id,
        owner_id = %owner_id,
        credential_id = %issued.id,
        "api key issued via API"
    );

    Ok((
        StatusCode::CREATED,
        Json(IssueKeyResponse {
            id: issued.id,
            owner_id: owner_id.to_string(),
            public_key: issued.public_key,
            secret: issued.secret,
            display_secret: issued.display_secret,
        }),
    ))
}

/// GET /api/v1/keys/owner/:owner_id — public reference of the owner's latest key
pub async fn find_key_by_owner(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
) -> Result<Json<PublicKeyRef>, AppError> {
    let key = state.issuer.find_by_owner(&owner_id).await?;
    Ok(Json(key))
}

/// POST /api/v1/keys/verify — check a presented raw secret
pub async fn verify_key(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyKeyRequest>,
) -> Result<Json<VerifyKeyResponse>, AppError> {
    let verified = state.issuer.authenticate(&payload.secret).await?;
    Ok(Json(match verified {
        Some(c) => VerifyKeyResponse {
            valid: true,
            id: Some(c.id),
            owner_id: Some(c.owner_id),
            public_key: Some(c.public_key),
        },
        None => VerifyKeyResponse {
            valid: false,
            id: None,
            owner_id: None,
            public_key: None,
        },
    }))
}
