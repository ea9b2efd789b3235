use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::SignedCookieJar;

use jurnal_core::WorkspaceId;

use crate::app::services::AppServices;
use crate::app::{AppState, dto, errors};
use crate::context::SessionContext;
use crate::workspace;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_workspaces))
        .route("/select", post(select_workspace))
}

pub async fn list_workspaces(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    jar: SignedCookieJar,
) -> axum::response::Response {
    let workspaces = match services.workspaces(session.user_id()).await {
        Ok(v) => v,
        Err(e) => return errors::store_error_to_response(e),
    };
    let active = workspace::active_workspace_id(&jar);

    let items = workspaces
        .into_iter()
        .map(|ws| {
            serde_json::json!({
                "id": ws.id.to_string(),
                "name": ws.name,
                "role": ws.role.as_str(),
                "active": Some(ws.id) == active,
            })
        })
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn select_workspace(
    State(state): State<AppState>,
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    jar: SignedCookieJar,
    Json(body): Json<dto::SelectWorkspaceRequest>,
) -> axum::response::Response {
    let workspace_id: WorkspaceId = match body.workspace_id.trim().parse() {
        Ok(id) => id,
        Err(_) => return errors::bad_request("workspace_id must be a UUID"),
    };

    match workspace::select_workspace(
        services.store(),
        services.caches(),
        jar,
        workspace_id,
        session.user_id(),
        state.secure_cookies,
    )
    .await
    {
        Ok(jar) => (
            StatusCode::OK,
            jar,
            Json(serde_json::json!({ "active_workspace_id": workspace_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::workspace_error_to_response(e),
    }
}
