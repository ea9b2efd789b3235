use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::app::services::AppServices;
use crate::app::{AppState, dto, errors};
use crate::context::WorkspaceContext;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_accounts).post(create_account))
}

pub async fn list_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(workspace): Extension<WorkspaceContext>,
) -> axum::response::Response {
    match services.accounts(workspace.workspace_id()).await {
        Ok(accounts) => {
            let items = accounts.into_iter().map(dto::account_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(workspace): Extension<WorkspaceContext>,
    Json(body): Json<dto::CreateAccountRequest>,
) -> axum::response::Response {
    let account = match dto::to_new_account(body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.create_account(workspace.workspace_id(), account).await {
        Ok(created) => (StatusCode::CREATED, Json(dto::account_to_json(created))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
