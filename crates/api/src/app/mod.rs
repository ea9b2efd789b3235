//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/auth backends and the workspace view caches
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::FromRef,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::cookies::create_cookie_key;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// State shared by the middleware and the cookie extractors.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<AppServices>,
    pub cookie_key: Key,
    pub secure_cookies: bool,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(config).await?);
    let key = create_cookie_key(&config.cookie_secret);
    Ok(build_router(services, key, config.secure_cookies))
}

/// Router over already-built services. Tests use this directly.
pub fn build_router(services: Arc<AppServices>, cookie_key: Key, secure_cookies: bool) -> Router {
    let state = AppState {
        services: services.clone(),
        cookie_key,
        secure_cookies,
    };

    // Workspace-scoped routes: need a session and a checked active workspace.
    let scoped = routes::workspace_router().route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware::require_workspace,
    ));

    // Session routes: everything below requires a signed-in user.
    let protected = routes::session_router()
        .merge(scoped)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/sign-in", post(routes::auth::sign_in))
        .merge(protected)
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
        .with_state(state)
}
