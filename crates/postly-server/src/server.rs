use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{Json, Router, routing::get};
use postly_auth::{
    AuthState, GoogleIdTokenVerifier, SessionAuthenticator, UserStore, auth_router,
};
use postly_db_mongo::MongoUserStore;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, StorageBackend};

pub struct PostlyServer {
    addr: SocketAddr,
    app: Router,
}

/// Opens the configured user store.
pub async fn build_user_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn UserStore>> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory user store; users are lost on restart");
            Ok(postly_db_memory::create_user_store())
        }
        StorageBackend::Mongo => {
            let uri = cfg
                .storage
                .mongo
                .uri
                .as_deref()
                .context("storage.mongo.uri is not set")?;
            let store = MongoUserStore::connect(uri, &cfg.storage.mongo.database)
                .await
                .context("failed to connect to MongoDB")?;
            Ok(Arc::new(store))
        }
    }
}

/// Wires the authenticator, user store and optional Google verifier.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AuthState> {
    let users = build_user_store(cfg).await?;
    let authenticator = Arc::new(SessionAuthenticator::new(&cfg.auth.token, users));
    let mut state = AuthState::new(authenticator);

    match GoogleIdTokenVerifier::from_config(&cfg.auth.google)? {
        Some(verifier) => {
            tracing::info!(jwks_url = %cfg.auth.google.jwks_url, "Google sign-in enabled");
            state = state.with_identity_verifier(Arc::new(verifier));
        }
        None => {
            tracing::warn!("Google sign-in disabled: auth.google.client_id is not set");
        }
    }

    Ok(state)
}

pub fn build_router(state: AuthState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .merge(auth_router(state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
}

pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    Ok(build_router(build_state(cfg).await?))
}

async fn root() -> Json<Value> {
    Json(json!({ "service": "Postly", "status": "ok" }))
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<PostlyServer> {
        let app = build_app(&self.config).await?;
        Ok(PostlyServer {
            addr: self.addr,
            app,
        })
    }
}

impl PostlyServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
