use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keysmith::config::{self, Config};
use keysmith::crypto::CredentialHasher;
use keysmith::identity::HttpIdentityProvider;
use keysmith::issuance::Issuer;
use keysmith::session::SessionCodec;
use keysmith::store::postgres::PgStore;
use keysmith::AppState;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Token inspection only needs the signing key
    let command = match args.command {
        Some(cli::Commands::Session { command }) => {
            let signing_key = config_or_exit(config::load_signing_key());
            init_tracing(std::env::var("KEYSMITH_LOG_FORMAT").as_deref() == Ok("json"));
            return report(handle_session_command(&signing_key, command));
        }
        other => other,
    };

    // Configuration faults are fatal: refuse to start rather than run with a weak default
    let cfg = config_or_exit(config::load());
    init_tracing(cfg.json_logs);

    let result = match command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Key { command }) => handle_key_command(&cfg, command).await,
        _ => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };
    report(result)
}

fn config_or_exit<T>(loaded: Result<T, keysmith::errors::ConfigError>) -> T {
    match loaded {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    }
}

fn report(result: anyhow::Result<()>) -> anyhow::Result<()> {
    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn init_tracing(json_logs: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "keysmith=debug,tower_http=debug".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_issuer(cfg: &Config) -> anyhow::Result<(Issuer, PgStore)> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url)
        .await
        .context("failed to connect to credential store")?;
    let hasher = CredentialHasher::new(cfg.hash)?;
    Ok((Issuer::new(Arc::new(db.clone()), hasher), db))
}

async fn run_server(cfg: Config, port: u16) -> anyhow::Result<()> {
    let (issuer, db) = build_issuer(&cfg).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let identity = HttpIdentityProvider::new(&cfg.auth_service_url)?;
    let codec = SessionCodec::new(&cfg.signing_key, cfg.token_issuer.clone(), cfg.session_ttl_secs);

    let state = Arc::new(AppState {
        issuer,
        codec,
        identity: Arc::new(identity),
    });

    let app = keysmith::api::router(state);
    let app = match cors_layer(&cfg) {
        Some(cors) => app.layer(cors),
        None => app,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(posture = ?cfg.posture, "Keysmith listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Development posture allows any origin; production allows only
/// DASHBOARD_ORIGIN, or nothing cross-origin when it is unset.
fn cors_layer(cfg: &Config) -> Option<CorsLayer> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT];

    if cfg.is_development() {
        tracing::warn!("development posture: CORS allows any origin");
        return Some(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(methods)
                .allow_headers(headers),
        );
    }

    let origin = cfg.dashboard_origin.as_deref()?;
    let origin = match HeaderValue::from_str(origin) {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(origin = %origin, "DASHBOARD_ORIGIN is not a valid header value; CORS disabled");
            return None;
        }
    };
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods(methods)
            .allow_headers(headers),
    )
}

async fn handle_key_command(cfg: &Config, cmd: cli::KeyCommands) -> anyhow::Result<()> {
    let (issuer, _) = build_issuer(cfg).await?;
    match cmd {
        cli::KeyCommands::Issue { owner, note } => {
            let note = note.or_else(|| Some("Created by keysmith CLI".to_string()));
            let issued = issuer.issue(&owner, note).await?;
            println!("Credential issued:");
            println!("  ID:         {}", issued.id);
            println!("  Owner:      {}", owner);
            println!("  Public key: {}", issued.public_key);
            println!("  Secret:     {}", issued.secret.expose());
            println!();
            println!("Store the secret now. It cannot be shown again.");
        }
        cli::KeyCommands::Show { owner } => match issuer.find_by_owner(&owner).await {
            Ok(key) => {
                println!("{:<38} PUBLIC KEY", "ID");
                println!("{:<38} {}", key.id, key.public_key);
            }
            Err(keysmith::errors::StoreError::NotFound) => {
                println!("No credential found for owner {}.", owner);
            }
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

fn handle_session_command(signing_key: &[u8], cmd: cli::SessionCommands) -> anyhow::Result<()> {
    match cmd {
        cli::SessionCommands::Verify { token } => {
            // Issuer and lifetime play no part in verification
            let codec = SessionCodec::new(signing_key, "keysmith", 1);
            let token = token.strip_prefix("Bearer ").unwrap_or(&token).trim();
            match codec.verify(token) {
                Ok(claims) => println!("{}", serde_json::to_string_pretty(&claims)?),
                Err(e) => anyhow::bail!("token rejected: {}", e),
            }
        }
    }
    Ok(())
}
