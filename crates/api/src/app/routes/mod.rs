use axum::{
    Router,
    routing::{get, post},
};

use crate::app::AppState;

pub mod accounts;
pub mod auth;
pub mod categories;
pub mod import_export;
pub mod summary;
pub mod system;
pub mod transactions;
pub mod workspaces;

/// Endpoints that need a signed-in user but no active workspace.
pub fn session_router() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/whoami", get(system::whoami))
        .nest("/workspaces", workspaces::router())
}

/// Endpoints scoped to the active workspace.
pub fn workspace_router() -> Router<AppState> {
    Router::new()
        .nest("/accounts", accounts::router())
        .nest("/categories", categories::router())
        .nest("/transactions", transactions::router())
        .route("/summary", get(summary::financial_summary))
        .merge(import_export::router())
}
