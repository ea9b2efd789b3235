//! Bulk import workflow: workbook bytes → validated candidates → per-row
//! statuses from the store.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use jurnal_accounting::{
    IMPORT_COLUMNS, ImportPreview, ImportRow, ImportRowsError, ReadRow, RowIssue, validate_rows,
};
use jurnal_auth::CurrentUser;
use jurnal_core::WorkspaceId;

use crate::spreadsheet::{RowReadError, SpreadsheetError, headers, parse_workbook};
use crate::store::{ImportOutcome, ImportStatus, LedgerStore, StoreError};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),

    #[error(transparent)]
    Rows(#[from] ImportRowsError),

    #[error("the sheet is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("no valid rows to import")]
    NothingToImport,

    #[error("no active workspace selected")]
    NoActiveWorkspace,

    #[error("{0}")]
    Persistence(#[from] StoreError),
}

/// Rows sorted by outcome, each keeping its spreadsheet row number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub succeeded: Vec<ImportStatus>,
    pub failed: Vec<ImportStatus>,
}

impl ImportReport {
    pub fn from_statuses(statuses: Vec<ImportStatus>) -> Self {
        let (succeeded, failed) = statuses
            .into_iter()
            .partition(|status| status.status == ImportOutcome::Success);
        Self { succeeded, failed }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} transactions imported, {} failed",
            self.succeeded.len(),
            self.failed.len()
        )
    }
}

/// Parse and validate a workbook without touching the store.
///
/// Only a missing or unreadable header fails the whole sheet; every data row
/// is diagnosed on its own.
pub fn preview(bytes: &[u8]) -> Result<ImportPreview, ImportError> {
    let present = headers(bytes)?;
    let missing: Vec<String> = IMPORT_COLUMNS
        .iter()
        .filter(|column| !present.iter().any(|header| header.trim() == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    let rows: Vec<ReadRow> = parse_workbook::<ImportRow>(bytes)?
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|err| {
                debug!(index, error = %err, "sheet row could not be read");
                match err {
                    RowReadError::Encoding => RowIssue::InvalidEncoding,
                    RowReadError::Malformed(_) => RowIssue::Unreadable,
                }
            })
        })
        .collect();
    Ok(validate_rows(&rows)?)
}

/// Import every valid row of a workbook into the workspace.
///
/// Invalid rows are reported as failures next to the store's own per-row
/// results; only valid candidates are sent.
#[instrument(
    skip(store, creator, bytes),
    fields(workspace_id = ?workspace_id, user_id = %creator.id, bytes = bytes.len()),
    err
)]
pub async fn import<S: LedgerStore>(
    store: &S,
    workspace_id: Option<WorkspaceId>,
    creator: &CurrentUser,
    bytes: &[u8],
) -> Result<ImportReport, ImportError> {
    let workspace_id = workspace_id.ok_or(ImportError::NoActiveWorkspace)?;
    let preview = preview(bytes)?;
    if preview.candidates.is_empty() {
        return Err(ImportError::NothingToImport);
    }

    let mut statuses = store
        .import_transactions(workspace_id, &preview.candidates, creator)
        .await?;
    statuses.extend(preview.diagnostics.iter().map(|diagnostic| {
        let message = diagnostic
            .issues
            .iter()
            .map(|issue| issue.message())
            .collect::<Vec<_>>()
            .join("; ");
        ImportStatus::error(diagnostic.row_number, message)
    }));
    statuses.sort_by_key(|status| status.row_number);

    let report = ImportReport::from_statuses(statuses);
    if report.failed.is_empty() {
        info!(imported = report.succeeded.len(), "import finished");
    } else {
        warn!(
            imported = report.succeeded.len(),
            failed = report.failed.len(),
            "import finished with failed rows"
        );
    }
    Ok(report)
}
