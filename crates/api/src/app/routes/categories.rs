use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};

use crate::app::services::AppServices;
use crate::app::{AppState, dto, errors};
use crate::context::WorkspaceContext;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", delete(delete_category))
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(workspace): Extension<WorkspaceContext>,
) -> axum::response::Response {
    match services.categories(workspace.workspace_id()).await {
        Ok(categories) => {
            let items = categories.into_iter().map(dto::category_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(workspace): Extension<WorkspaceContext>,
    Json(body): Json<dto::CreateCategoryRequest>,
) -> axum::response::Response {
    let category = match dto::to_new_category(body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.create_category(workspace.workspace_id(), category).await {
        Ok(created) => (StatusCode::CREATED, Json(dto::category_to_json(created))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(workspace): Extension<WorkspaceContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let category_id = match dto::parse_category_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_category(workspace.workspace_id(), category_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
