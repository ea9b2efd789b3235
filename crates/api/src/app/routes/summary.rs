use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::WorkspaceContext;

pub async fn financial_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(workspace): Extension<WorkspaceContext>,
    Query(range): Query<dto::RangeQuery>,
) -> axum::response::Response {
    let range = match dto::to_date_range(range.start_date.as_deref(), range.end_date.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.summary(workspace.workspace_id(), range).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
