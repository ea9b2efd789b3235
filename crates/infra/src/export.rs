//! Export transactions as a workbook, one row per entry line.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use jurnal_accounting::{EntryRole, Transaction};
use jurnal_core::{AccountId, WorkspaceId};

use crate::spreadsheet::{SpreadsheetError, build_workbook};
use crate::store::{DateRange, LedgerStore, StoreError};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{0}")]
    Persistence(#[from] StoreError),

    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Tanggal")]
    pub date: String,
    #[serde(rename = "Deskripsi")]
    pub description: String,
    #[serde(rename = "Akun")]
    pub account: String,
    #[serde(rename = "Posisi")]
    pub position: &'static str,
    #[serde(rename = "Jumlah")]
    pub amount: String,
}

fn position(role: EntryRole) -> &'static str {
    match role {
        EntryRole::Debit => "Debit",
        EntryRole::Credit => "Kredit",
    }
}

/// An empty range is not an error; the caller tells the user there was
/// nothing to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Empty,
    Workbook { bytes: Vec<u8>, rows: usize },
}

/// Flatten transactions into export rows. Unknown account ids are written
/// as the raw id.
pub fn export_rows(transactions: &[Transaction], account_names: &HashMap<AccountId, String>) -> Vec<ExportRow> {
    transactions
        .iter()
        .flat_map(|transaction| {
            transaction.entries.iter().map(move |entry| ExportRow {
                date: transaction.date.format("%Y-%m-%d").to_string(),
                description: transaction.description.clone(),
                account: account_names
                    .get(&entry.account_id)
                    .cloned()
                    .unwrap_or_else(|| entry.account_id.to_string()),
                position: position(entry.role),
                amount: entry.amount.to_string(),
            })
        })
        .collect()
}

#[instrument(skip(store), fields(workspace_id = %workspace_id), err)]
pub async fn export<S: LedgerStore>(
    store: &S,
    workspace_id: WorkspaceId,
    range: DateRange,
) -> Result<ExportOutcome, ExportError> {
    let transactions = store.transactions_in_range(workspace_id, range).await?;
    if transactions.is_empty() {
        return Ok(ExportOutcome::Empty);
    }

    let names: HashMap<AccountId, String> = store
        .get_accounts(workspace_id)
        .await?
        .into_iter()
        .map(|account| (account.id, account.name))
        .collect();
    let rows = export_rows(&transactions, &names);
    let bytes = build_workbook(&rows)?;

    info!(transactions = transactions.len(), rows = rows.len(), "export built");
    Ok(ExportOutcome::Workbook {
        bytes,
        rows: rows.len(),
    })
}
