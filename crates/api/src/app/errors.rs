use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use jurnal_accounting::ValidationError;
use jurnal_auth::AuthError;
use jurnal_core::DomainError;
use jurnal_infra::{
    SubmitError,
    export::ExportError,
    import::ImportError,
    spreadsheet::SpreadsheetError,
    store::StoreError,
};

use crate::workspace::WorkspaceError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn validation_error_to_response(err: ValidationError) -> axum::response::Response {
    json_error(StatusCode::UNPROCESSABLE_ENTITY, err.code(), err.to_string())
}

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::Provider(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "auth_error", msg),
        other => json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", other.to_string()),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::TenantIsolation(msg) => json_error(StatusCode::FORBIDDEN, "not_a_member", msg),
        StoreError::Rejected(msg) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "persistence_error", msg),
        StoreError::Backend(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", msg),
    }
}

pub fn submit_error_to_response(err: SubmitError) -> axum::response::Response {
    match err {
        SubmitError::Rejected(reason) => validation_error_to_response(reason),
        SubmitError::NoActiveWorkspace => no_active_workspace(),
        SubmitError::Persistence(store) => store_error_to_response(store),
        closed @ SubmitError::Closed => json_error(StatusCode::CONFLICT, closed.code(), closed.to_string()),
    }
}

pub fn workspace_error_to_response(err: WorkspaceError) -> axum::response::Response {
    match err {
        WorkspaceError::NotAMember => not_a_member(),
        WorkspaceError::Persistence(store) => store_error_to_response(store),
    }
}

pub fn import_error_to_response(err: ImportError) -> axum::response::Response {
    match err {
        ImportError::Spreadsheet(e) => spreadsheet_error_to_response(e),
        missing @ ImportError::MissingColumns(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", missing.to_string())
        }
        ImportError::Rows(e) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", e.to_string()),
        ImportError::NothingToImport => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", "no valid rows to import")
        }
        ImportError::NoActiveWorkspace => no_active_workspace(),
        ImportError::Persistence(e) => store_error_to_response(e),
    }
}

pub fn export_error_to_response(err: ExportError) -> axum::response::Response {
    match err {
        ExportError::Persistence(e) => store_error_to_response(e),
        ExportError::Spreadsheet(e) => spreadsheet_error_to_response(e),
    }
}

fn spreadsheet_error_to_response(err: SpreadsheetError) -> axum::response::Response {
    match err {
        SpreadsheetError::Write(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "spreadsheet_error", msg),
        other => json_error(StatusCode::BAD_REQUEST, "validation_error", other.to_string()),
    }
}

pub fn no_active_workspace() -> axum::response::Response {
    json_error(
        StatusCode::CONFLICT,
        "no_active_workspace",
        "select a workspace first",
    )
}

pub fn not_a_member() -> axum::response::Response {
    json_error(
        StatusCode::FORBIDDEN,
        "not_a_member",
        "you are not a member of this workspace",
    )
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}
