//! Login exchange with the external identity provider.
//!
//! Keysmith never checks user passwords itself. The caller's login body is
//! forwarded verbatim to `<auth_service_url>/login`; a successful response
//! yields the `{subject_id, email, roles}` triple that session claims are
//! built from. Cookies are never forwarded: sessions travel only as bearer
//! tokens.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::LoginError;
use crate::models::session::Identity;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn login(
        &self,
        credentials: serde_json::Value,
        user_agent: Option<&str>,
    ) -> Result<Identity, LoginError>;
}

// ── Response shape ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LoginEnvelope {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(default)]
    user: Option<LoginUser>,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    roles: Vec<serde_json::Value>,
}

impl LoginUser {
    fn into_identity(self) -> Result<Identity, LoginError> {
        let subject_id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| LoginError::InvalidResponse("user id missing".into()))?;
        // Non-string role entries are dropped
        let roles: BTreeSet<String> = self
            .roles
            .into_iter()
            .filter_map(|r| r.as_str().map(String::from))
            .collect();
        Ok(Identity {
            subject_id,
            email: self.email.unwrap_or_default(),
            roles,
        })
    }
}

// ── HTTP client ──────────────────────────────────────────────

pub struct HttpIdentityProvider {
    client: reqwest::Client,
    login_url: String,
}

impl HttpIdentityProvider {
    pub fn new(auth_service_url: &str) -> Result<Self, LoginError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LoginError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            login_url: format!("{}/login", auth_service_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn login(
        &self,
        credentials: serde_json::Value,
        user_agent: Option<&str>,
    ) -> Result<Identity, LoginError> {
        let mut req = self
            .client
            .post(&self.login_url)
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
            .json(&credentials);
        if let Some(ua) = user_agent {
            req = req.header(reqwest::header::USER_AGENT, ua);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::warn!("identity provider request failed: {}", e);
            LoginError::Unavailable(e.to_string())
        })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::info!(status = status.as_u16(), "identity provider rejected login");
            return Err(LoginError::Rejected {
                status: status.as_u16(),
            });
        }

        let envelope: LoginEnvelope = resp
            .json()
            .await
            .map_err(|e| LoginError::InvalidResponse(e.to_string()))?;

        if !envelope.status {
            tracing::info!(
                message = envelope.message.as_deref().unwrap_or(""),
                "identity provider returned status=false"
            );
            return Err(LoginError::Rejected {
                status: reqwest::StatusCode::UNAUTHORIZED.as_u16(),
            });
        }

        envelope
            .data
            .and_then(|d| d.user)
            .ok_or_else(|| LoginError::InvalidResponse("user object missing".into()))?
            .into_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: serde_json::Value) -> Result<Identity, LoginError> {
        let envelope: LoginEnvelope = serde_json::from_value(body).unwrap();
        envelope
            .data
            .and_then(|d| d.user)
            .ok_or_else(|| LoginError::InvalidResponse("user object missing".into()))?
            .into_identity()
    }

    #[test]
    fn test_user_extraction() {
        let identity = parse(json!({
            "status": true,
            "message": "ok",
            "data": {"user": {"id": "u-1", "email": "a@b.c", "roles": ["admin", 7, "qa", "admin"]}}
        }))
        .unwrap();
        assert_eq!(identity.subject_id, "u-1");
        assert_eq!(identity.email, "a@b.c");
        assert_eq!(
            identity.roles,
            BTreeSet::from(["admin".to_string(), "qa".to_string()])
        );
    }

    #[test]
    fn test_missing_user_is_invalid() {
        assert!(matches!(
            parse(json!({"status": true, "data": {}})),
            Err(LoginError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse(json!({"status": true, "data": {"user": {"email": "a@b.c"}}})),
            Err(LoginError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_login_url_normalized() {
        let idp = HttpIdentityProvider::new("https://idp.example.com/api/v1/auth/").unwrap();
        assert_eq!(idp.login_url, "https://idp.example.com/api/v1/auth/login");
    }
}
