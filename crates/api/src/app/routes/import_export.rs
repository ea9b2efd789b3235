use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Query},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use jurnal_infra::{export::ExportOutcome, import, spreadsheet};

use crate::app::services::AppServices;
use crate::app::{AppState, dto, errors};
use crate::context::{SessionContext, WorkspaceContext};

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/import/template", get(download_template))
        .route("/import/preview", post(preview_import))
        .route("/import", post(run_import))
        .route("/export", get(export_transactions))
}

fn csv_attachment(filename: &str, bytes: Vec<u8>) -> axum::response::Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

pub async fn download_template() -> axum::response::Response {
    match spreadsheet::template() {
        Ok(bytes) => csv_attachment("template_import_transaksi.csv", bytes),
        Err(e) => errors::import_error_to_response(e.into()),
    }
}

pub async fn preview_import(body: Bytes) -> axum::response::Response {
    let preview = match import::preview(&body) {
        Ok(v) => v,
        Err(e) => return errors::import_error_to_response(e),
    };

    let has_errors = preview.has_errors();
    let diagnostics = preview
        .diagnostics
        .iter()
        .map(|d| {
            serde_json::json!({
                "row_number": d.row_number,
                "issues": d.issues.iter().map(|issue| issue.message()).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "candidates": preview.candidates,
            "diagnostics": diagnostics,
            "has_errors": has_errors,
        })),
    )
        .into_response()
}

pub async fn run_import(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Extension(workspace): Extension<WorkspaceContext>,
    body: Bytes,
) -> axum::response::Response {
    match services.import(workspace.workspace_id(), session.user(), &body).await {
        Ok(report) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": report.summary(),
                "succeeded": report.succeeded,
                "failed": report.failed,
            })),
        )
            .into_response(),
        Err(e) => errors::import_error_to_response(e),
    }
}

pub async fn export_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(workspace): Extension<WorkspaceContext>,
    Query(range): Query<dto::RangeQuery>,
) -> axum::response::Response {
    let range = match dto::to_date_range(range.start_date.as_deref(), range.end_date.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.export(workspace.workspace_id(), range).await {
        Ok(ExportOutcome::Empty) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "no transactions to export" })),
        )
            .into_response(),
        Ok(ExportOutcome::Workbook { bytes, .. }) => csv_attachment("transaksi.csv", bytes),
        Err(e) => errors::export_error_to_response(e),
    }
}
