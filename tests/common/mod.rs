#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use tower::ServiceExt;

use keysmith::crypto::{CredentialHasher, HashConfig};
use keysmith::identity::{HttpIdentityProvider, IdentityProvider};
use keysmith::issuance::Issuer;
use keysmith::models::session::Identity;
use keysmith::session::SessionCodec;
use keysmith::store::memory::InMemoryStore;
use keysmith::AppState;

pub const SIGNING_KEY: &[u8] = b"integration-signing-key-0123456789";

pub fn cheap_hasher() -> CredentialHasher {
    CredentialHasher::new(HashConfig {
        m_cost: 1024,
        t_cost: 1,
        p_cost: 1,
    })
    .unwrap()
}

pub fn codec() -> SessionCodec {
    SessionCodec::new(SIGNING_KEY, "keysmith", 86_400)
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
}

/// Router over an in-memory store. The identity provider points at
/// `idp_url` (a wiremock server) or an unroutable address when unused.
pub fn app(idp_url: Option<&str>) -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let identity: Arc<dyn IdentityProvider> = Arc::new(
        HttpIdentityProvider::new(idp_url.unwrap_or("http://127.0.0.1:9")).unwrap(),
    );
    let state = Arc::new(AppState {
        issuer: Issuer::new(store.clone(), cheap_hasher()),
        codec: codec(),
        identity,
    });
    TestApp {
        router: keysmith::api::router(state),
        store,
    }
}

pub fn session_token() -> String {
    let identity = Identity {
        subject_id: "user-123".into(),
        email: "qa@example.com".into(),
        roles: ["admin".to_string()].into_iter().collect(),
    };
    codec().issue(identity).unwrap().0
}

pub async fn send(router: &Router, req: Request<Body>) -> (Response<Body>, serde_json::Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let (parts, body) = resp.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (Response::from_parts(parts, Body::empty()), json)
}

pub fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, bearer: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
