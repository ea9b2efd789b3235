use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use jurnal_accounting::validate;
use jurnal_infra::SubmitKind;

use crate::app::services::AppServices;
use crate::app::{AppState, dto, errors};
use crate::context::{SessionContext, WorkspaceContext};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions).post(create_transaction))
        .route("/validate", post(validate_draft))
        .route(
            "/:id",
            get(get_transaction).put(update_transaction).delete(delete_transaction),
        )
}

pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(workspace): Extension<WorkspaceContext>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> axum::response::Response {
    let query = match dto::to_transaction_query(dto::ListQuery::from_pairs(pairs)) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.transactions(workspace.workspace_id(), query).await {
        Ok(page) => (StatusCode::OK, Json(dto::page_to_json(page))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(workspace): Extension<WorkspaceContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let transaction_id = match dto::parse_transaction_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.transaction(workspace.workspace_id(), transaction_id).await {
        Ok(transaction) => (StatusCode::OK, Json(dto::transaction_to_json(&transaction))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Live feedback while a draft is being edited: running totals plus the first
/// reason it would be rejected, if any. Nothing is persisted.
pub async fn validate_draft(Json(body): Json<dto::DraftRequest>) -> axum::response::Response {
    let draft = match dto::to_draft(body, None) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let totals = dto::TotalsResponse::from(draft.totals());
    let body = match validate(&draft) {
        Ok(()) => serde_json::json!({ "valid": true, "totals": totals }),
        Err(reason) => serde_json::json!({
            "valid": false,
            "totals": totals,
            "error": reason.code(),
            "message": reason.to_string(),
        }),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub async fn create_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Extension(workspace): Extension<WorkspaceContext>,
    Json(body): Json<dto::DraftRequest>,
) -> axum::response::Response {
    let draft = match dto::to_draft(body, None) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    submit(&services, &draft, &session, workspace).await
}

pub async fn update_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Extension(workspace): Extension<WorkspaceContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::DraftRequest>,
) -> axum::response::Response {
    let transaction_id = match dto::parse_transaction_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let draft = match dto::to_draft(body, Some(transaction_id)) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    submit(&services, &draft, &session, workspace).await
}

async fn submit(
    services: &AppServices,
    draft: &jurnal_accounting::JournalDraft,
    session: &SessionContext,
    workspace: WorkspaceContext,
) -> axum::response::Response {
    match services
        .submit(draft, Some(workspace.workspace_id()), session.user_id())
        .await
    {
        Ok(submitted) => {
            let status = match submitted.kind {
                SubmitKind::Created => StatusCode::CREATED,
                SubmitKind::Updated => StatusCode::OK,
            };
            (
                status,
                Json(serde_json::json!({
                    "message": submitted.message,
                    "transaction": dto::transaction_to_json(&submitted.transaction),
                })),
            )
                .into_response()
        }
        Err(e) => errors::submit_error_to_response(e),
    }
}

pub async fn delete_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(workspace): Extension<WorkspaceContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let transaction_id = match dto::parse_transaction_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_transaction(workspace.workspace_id(), transaction_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
