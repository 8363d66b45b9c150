//! HTTP surface of the gateway
//!
//! - `/message` and `/message/{id}` authenticate as a client application
//! - `/admin/...` authenticates as an admin user
//! - `/health` and `/metrics` are open

pub mod admin;
pub mod extract;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Config;
use crate::credentials::AdminUsers;
use crate::directory::{ApplicationDirectory, InMemoryDirectory};
use crate::dispatch::Dispatcher;
use crate::message::InMemoryMessageStore;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub directory: Arc<dyn ApplicationDirectory>,
    pub admins: AdminUsers,
    /// Limit given to applications created through the admin API
    pub default_limit: u64,
    /// Whether `/metrics` is served
    pub metrics_enabled: bool,
}

impl AppState {
    /// State backed by in-process stores. Admin users still have to be bootstrapped.
    pub fn in_memory(config: &Config) -> Self {
        let directory: Arc<dyn ApplicationDirectory> = Arc::new(InMemoryDirectory::new());
        let messages = Arc::new(InMemoryMessageStore::new());
        let dispatcher = Dispatcher::new(directory.clone(), messages, config.quota.strategy);

        Self {
            dispatcher: Arc::new(dispatcher),
            directory,
            admins: AdminUsers::new(),
            default_limit: config.quota.default_limit,
            metrics_enabled: config.metrics.enabled,
        }
    }
}

/// Build the full router
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let admin = Router::new()
        .route(
            "/application",
            get(admin::list_applications).post(admin::create_application),
        )
        .route("/application/{name}", get(admin::get_application))
        .route("/application/{name}/enable", post(admin::enable_application))
        .route("/application/{name}/disable", post(admin::disable_application))
        .route("/application/{name}/limit", post(admin::set_limit))
        .route("/password", post(admin::change_password))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin::require_admin,
        ));

    let mut router = Router::new()
        .route("/message", post(handlers::submit_message))
        .route("/message/{id}", get(handlers::get_message))
        .nest("/admin", admin)
        .route("/health", get(handlers::health_handler));
    if state.metrics_enabled {
        router = router.route("/metrics", get(handlers::metrics_handler));
    }

    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
