use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth, security};
use crate::AppState;

pub mod handlers;

/// Build the full HTTP router.
///
/// Everything under `/api/v1` sits behind the auth gate; `/healthz` and
/// `/api/login` are the only public routes.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/session", get(handlers::current_session))
        .route("/keys", post(handlers::issue_key))
        .route("/keys/owner/:owner_id", get(handlers::find_key_by_owner))
        .route("/keys/verify", post(handlers::verify_key))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/login", post(handlers::login))
        .nest("/api/v1", protected)
        .fallback(fallback_404)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(security::request_id))
        .layer(middleware::from_fn(security::security_headers))
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}
