//!
//! teller HTTP server
//! ------------------
//! Wires configuration, storage and the identity services into an axum `Router`.
//! Handlers live in `server::handlers`; request/response bodies in `server::payloads`.
//! The `/account/{id}` routes sit behind the authorization guard middleware, so their
//! handlers only ever run for a request already bound to the account in the path.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::config::AppConfig;
use crate::identity::{
    require_account_owner, AuthProvider, AuthorizationGuard, IdentityProvisioner, LocalAuthProvider, TokenService,
};
use crate::security::CredentialManager;
use crate::storage::{SqliteStore, StorageGateway};

pub mod handlers;
pub mod payloads;

/// Shared, read-only service handles. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StorageGateway>,
    pub credentials: Arc<CredentialManager>,
    pub provisioner: Arc<IdentityProvisioner>,
    pub auth: Arc<dyn AuthProvider>,
    pub guard: Arc<AuthorizationGuard>,
}

impl AppState {
    pub fn new(config: &AppConfig, store: Arc<dyn StorageGateway>) -> anyhow::Result<Self> {
        let credentials = Arc::new(CredentialManager::new(&config.password).context("building credential manager")?);
        let tokens = Arc::new(TokenService::new(&config.token).context("building token service")?);
        let provisioner = Arc::new(IdentityProvisioner::new(
            store.clone(),
            credentials.clone(),
            config.provisioning.max_attempts,
        ));
        let auth: Arc<dyn AuthProvider> = Arc::new(LocalAuthProvider::new(store.clone(), credentials.clone(), tokens.clone()));
        let guard = Arc::new(AuthorizationGuard::new(tokens, store.clone()));
        Ok(Self { store, credentials, provisioner, auth, guard })
    }
}

pub fn router(state: AppState) -> Router {
    let guarded = Router::new()
        .route(
            "/account/{id}",
            get(handlers::get_account).delete(handlers::delete_account).patch(handlers::update_account),
        )
        .route_layer(from_fn_with_state(state.guard.clone(), require_account_owner));

    Router::new()
        .route("/", get(|| async { "teller ok" }))
        .route("/login", post(handlers::login))
        .route("/account", get(handlers::list_accounts).post(handlers::create_account))
        .route("/transfer", post(handlers::transfer))
        .merge(guarded)
        .with_state(state)
}

/// Open the store, seed the default admin when a seed password is given, and serve
/// until Ctrl-C.
pub async fn run(config: AppConfig, seed_password: Option<String>) -> anyhow::Result<()> {
    info!(target: "startup", "database: {}", config.db_path.display());
    let store = SqliteStore::open(&config.db_path, config.pool_size)
        .with_context(|| format!("While opening database at {}", config.db_path.display()))?;
    let state = AppState::new(&config, Arc::new(store))?;

    if let Some(password) = seed_password {
        let provisioner = state.provisioner.clone();
        tokio::task::spawn_blocking(move || crate::tools::seed::seed_admin(&provisioner, &password))
            .await
            .context("seed task panicked")?
            .context("While seeding the default admin")?;
    }

    let app = router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("While binding HTTP listener on {addr}"))?;
    info!(target: "startup", "teller listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!(target: "startup", "shutdown requested");
        })
        .await?;
    Ok(())
}
