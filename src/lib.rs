//! Keysmith — API credential issuance and session token service.
//!
//! Library crate shared by the `keysmith` binary and the integration tests.

pub mod api;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod identity;
pub mod issuance;
pub mod middleware;
pub mod models;
pub mod session;
pub mod store;

use std::sync::Arc;

use identity::IdentityProvider;
use issuance::Issuer;
use session::SessionCodec;

/// Shared application state passed to handlers and middleware.
///
/// Read-only after startup: the signing key and hash work factor never change
/// while the process runs.
pub struct AppState {
    pub issuer: Issuer,
    pub codec: SessionCodec,
    pub identity: Arc<dyn IdentityProvider>,
}
