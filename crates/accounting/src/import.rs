//! Bulk import rows.
//!
//! Spreadsheet rows arrive loosely typed (every cell optional text) and are
//! validated here into two-line journal candidates. Invalid rows are
//! reported with their spreadsheet row number, never coerced.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use jurnal_core::Amount;

use crate::validation::parse_entry_date;

/// Header row of the import template, in order.
pub const IMPORT_COLUMNS: [&str; 5] = ["Tanggal", "Deskripsi", "Akun Debit", "Akun Kredit", "Jumlah"];

/// One template row as read from the sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    #[serde(rename = "Tanggal", default)]
    pub date: Option<String>,
    #[serde(rename = "Deskripsi", default)]
    pub description: Option<String>,
    #[serde(rename = "Akun Debit", default)]
    pub debit_account: Option<String>,
    #[serde(rename = "Akun Kredit", default)]
    pub credit_account: Option<String>,
    #[serde(rename = "Jumlah", default)]
    pub amount: Option<String>,
}

impl ImportRow {
    /// The example row shipped in the downloadable template.
    pub fn template_example() -> Self {
        Self {
            date: Some("2025-08-17".into()),
            description: Some("Pembelian ATK dari Toko ABC".into()),
            debit_account: Some("Beban ATK".into()),
            credit_account: Some("Kas Tunai".into()),
            amount: Some("500000".into()),
        }
    }
}

/// Spreadsheet row number of the first data row (row 1 is the header).
pub const fn first_data_row_number() -> usize {
    2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowIssue {
    MissingDate,
    InvalidDate,
    MissingDescription,
    MissingDebitAccount,
    MissingCreditAccount,
    MissingAmount,
    InvalidAmount,
    /// The row's bytes are not UTF-8 (often a Latin-1 export).
    InvalidEncoding,
    /// The row could not be split into the template's cells.
    Unreadable,
}

impl RowIssue {
    pub fn message(self) -> &'static str {
        match self {
            RowIssue::MissingDate => "Tanggal is required",
            RowIssue::InvalidDate => "Tanggal must be a date in YYYY-MM-DD form",
            RowIssue::MissingDescription => "Deskripsi is required",
            RowIssue::MissingDebitAccount => "Akun Debit is required",
            RowIssue::MissingCreditAccount => "Akun Kredit is required",
            RowIssue::MissingAmount => "Jumlah is required",
            RowIssue::InvalidAmount => {
                "Jumlah must be a positive number with at most 16 digits before the decimal point"
            }
            RowIssue::InvalidEncoding => "the row is not UTF-8 text; save the sheet as CSV UTF-8",
            RowIssue::Unreadable => "the row could not be read",
        }
    }
}

impl core::fmt::Display for RowIssue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

/// Every problem found on one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDiagnostic {
    pub row_number: usize,
    pub issues: Vec<RowIssue>,
}

/// A row that passed validation: debit and credit the same amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCandidate {
    pub row_number: usize,
    pub date: NaiveDate,
    pub description: String,
    pub debit_account: String,
    pub credit_account: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportPreview {
    pub candidates: Vec<ImportCandidate>,
    pub diagnostics: Vec<RowDiagnostic>,
}

impl ImportPreview {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportRowsError {
    #[error("the sheet contains no data rows")]
    Empty,
}

/// A sheet row as read: its cells, or the reason they could not be read.
pub type ReadRow = Result<ImportRow, RowIssue>;

/// Validate every row independently. A row that could not be read is
/// reported like any other invalid row.
pub fn validate_rows(rows: &[ReadRow]) -> Result<ImportPreview, ImportRowsError> {
    if rows.is_empty() {
        return Err(ImportRowsError::Empty);
    }

    let mut preview = ImportPreview::default();
    for (index, row) in rows.iter().enumerate() {
        let row_number = index + first_data_row_number();
        let checked = match row {
            Ok(row) => validate_row(row, row_number),
            Err(issue) => Err(vec![*issue]),
        };
        match checked {
            Ok(candidate) => preview.candidates.push(candidate),
            Err(issues) => preview.diagnostics.push(RowDiagnostic { row_number, issues }),
        }
    }
    Ok(preview)
}

fn cell(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn validate_row(row: &ImportRow, row_number: usize) -> Result<ImportCandidate, Vec<RowIssue>> {
    let mut issues = Vec::new();

    let date = match cell(&row.date) {
        None => {
            issues.push(RowIssue::MissingDate);
            None
        }
        Some(text) => {
            let parsed = parse_entry_date(text);
            if parsed.is_none() {
                issues.push(RowIssue::InvalidDate);
            }
            parsed
        }
    };

    let description = cell(&row.description);
    if description.is_none() {
        issues.push(RowIssue::MissingDescription);
    }
    let debit_account = cell(&row.debit_account);
    if debit_account.is_none() {
        issues.push(RowIssue::MissingDebitAccount);
    }
    let credit_account = cell(&row.credit_account);
    if credit_account.is_none() {
        issues.push(RowIssue::MissingCreditAccount);
    }

    let amount = match cell(&row.amount) {
        None => {
            issues.push(RowIssue::MissingAmount);
            None
        }
        Some(text) => {
            let parsed = Amount::parse(text).ok();
            if parsed.is_none() {
                issues.push(RowIssue::InvalidAmount);
            }
            parsed
        }
    };

    match (date, description, debit_account, credit_account, amount) {
        (Some(date), Some(description), Some(debit), Some(credit), Some(amount))
            if issues.is_empty() =>
        {
            Ok(ImportCandidate {
                row_number,
                date,
                description: description.to_string(),
                debit_account: debit.to_string(),
                credit_account: credit.to_string(),
                amount,
            })
        }
        _ => Err(issues),
    }
}
