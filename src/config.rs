use std::fmt;
use std::str::FromStr;

use crate::crypto::hasher::HashConfig;
use crate::errors::ConfigError;

/// Minimum accepted length of the HS256 signing key, in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Longest accepted session lifetime: ten years.
pub const MAX_SESSION_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posture {
    Production,
    Development,
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Base URL of the external identity provider. Login posts to `<base>/login`.
    pub auth_service_url: String,
    pub signing_key: Vec<u8>,
    pub posture: Posture,
    /// Session token lifetime. Set via KEYSMITH_SESSION_TTL_SECS. Default: 24h.
    pub session_ttl_secs: i64,
    pub token_issuer: String,
    pub hash: HashConfig,
    /// Allowed CORS origin in production posture.
    pub dashboard_origin: Option<String>,
    pub json_logs: bool,
}

impl Config {
    pub fn is_development(&self) -> bool {
        self.posture == Posture::Development
    }
}

// SECURITY: the signing key and database URL never reach a log line
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database_url", &"<redacted>")
            .field("auth_service_url", &self.auth_service_url)
            .field("signing_key", &"<redacted>")
            .field("posture", &self.posture)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("token_issuer", &self.token_issuer)
            .field("hash", &self.hash)
            .field("dashboard_origin", &self.dashboard_origin)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

/// Load configuration from the process environment (after reading `.env`).
pub fn load() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    from_lookup(|name| std::env::var(name).ok())
}

/// Load only the signing key. Token inspection needs nothing else.
pub fn load_signing_key() -> Result<Vec<u8>, ConfigError> {
    dotenvy::dotenv().ok();
    signing_key(&|name: &str| std::env::var(name).ok())
}

/// Build a [`Config`] from an arbitrary variable lookup.
///
/// Missing required values and unparsable numbers are errors; nothing is
/// silently substituted.
pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let signing_key = signing_key(&lookup)?;
    let database_url = required(&lookup, "DATABASE_URL")?;
    let auth_service_url = required(&lookup, "KEYSMITH_AUTH_SERVICE_URL")?
        .trim_end_matches('/')
        .to_string();

    let posture = match lookup("KEYSMITH_ENV").as_deref().map(str::trim) {
        None | Some("") | Some("production") => Posture::Production,
        Some("development") | Some("dev") => Posture::Development,
        Some(other) => {
            return Err(ConfigError::Invalid {
                var: "KEYSMITH_ENV",
                reason: format!("expected 'production' or 'development', got '{}'", other),
            })
        }
    };

    let session_ttl_secs: i64 = parsed(&lookup, "KEYSMITH_SESSION_TTL_SECS", 86_400)?;
    if !(1..=MAX_SESSION_TTL_SECS).contains(&session_ttl_secs) {
        return Err(ConfigError::Invalid {
            var: "KEYSMITH_SESSION_TTL_SECS",
            reason: format!("must be between 1 and {}", MAX_SESSION_TTL_SECS),
        });
    }

    let defaults = HashConfig::default();
    let hash = HashConfig {
        m_cost: parsed(&lookup, "KEYSMITH_ARGON2_M", defaults.m_cost)?,
        t_cost: parsed(&lookup, "KEYSMITH_ARGON2_T", defaults.t_cost)?,
        p_cost: parsed(&lookup, "KEYSMITH_ARGON2_P", defaults.p_cost)?,
    };
    // Reject an impossible work factor here rather than on the first issuance
    hash.params().map_err(|e| ConfigError::Invalid {
        var: "KEYSMITH_ARGON2_*",
        reason: e.to_string(),
    })?;

    Ok(Config {
        port: parsed(&lookup, "KEYSMITH_PORT", 8000)?,
        database_url,
        auth_service_url,
        signing_key,
        posture,
        session_ttl_secs,
        token_issuer: lookup("KEYSMITH_TOKEN_ISSUER")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "keysmith".into()),
        hash,
        dashboard_origin: lookup("DASHBOARD_ORIGIN").filter(|s| !s.is_empty()),
        json_logs: lookup("KEYSMITH_LOG_FORMAT").as_deref() == Some("json"),
    })
}

fn signing_key<F>(lookup: &F) -> Result<Vec<u8>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let key = lookup("KEYSMITH_SIGNING_KEY")
        .filter(|k| !k.is_empty())
        .ok_or(ConfigError::Missing("KEYSMITH_SIGNING_KEY"))?
        .into_bytes();
    if key.len() < MIN_SIGNING_KEY_LEN {
        return Err(ConfigError::WeakSigningKey {
            len: key.len(),
            min: MIN_SIGNING_KEY_LEN,
        });
    }
    Ok(key)
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn parsed<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}
