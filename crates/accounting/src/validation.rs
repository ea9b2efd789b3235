//! Balance Validator.
//!
//! One pure function decides whether a draft may be submitted. It backs live
//! feedback in the editor, the submit gate, and the in-memory store's own
//! authoritative check.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use thiserror::Error;

use jurnal_core::Amount;

use crate::draft::{DraftLine, JournalDraft, MIN_LINES, Totals};
use crate::entry::EntryLine;
use crate::transaction::JournalPayload;

/// Why a draft cannot be submitted. Checked in declaration order; the first
/// failing rule wins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("description is required")]
    EmptyDescription,

    #[error("date is required (YYYY-MM-DD)")]
    MissingDate,

    #[error("a transaction needs at least two entry lines with an account and an amount")]
    InsufficientEntries,

    /// Index into the draft's lines.
    #[error("line {} has an invalid amount; amounts must be positive numbers", .0 + 1)]
    InvalidAmount(usize),

    #[error("transaction is not balanced: debit {debit} vs credit {credit}")]
    Unbalanced { debit: BigDecimal, credit: BigDecimal },
}

impl ValidationError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyDescription => "empty_description",
            ValidationError::MissingDate => "missing_date",
            ValidationError::InsufficientEntries => "insufficient_entries",
            ValidationError::InvalidAmount(_) => "invalid_amount",
            ValidationError::Unbalanced { .. } => "unbalanced",
        }
    }
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub fn parse_entry_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

/// Check a draft without building anything.
pub fn validate(draft: &JournalDraft) -> Result<(), ValidationError> {
    prepare(draft).map(|_| ())
}

/// Validate a draft and shape it into the payload the persistence service
/// expects. Lines missing an account or an amount are left out.
pub fn prepare(draft: &JournalDraft) -> Result<JournalPayload, ValidationError> {
    let description = draft.description.trim();
    if description.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }

    let date = parse_entry_date(&draft.date).ok_or(ValidationError::MissingDate)?;

    let specified: Vec<(usize, &DraftLine)> = draft
        .lines()
        .iter()
        .enumerate()
        .filter(|(_, line)| line.is_specified())
        .collect();
    if specified.len() < MIN_LINES {
        return Err(ValidationError::InsufficientEntries);
    }

    let mut entries = Vec::with_capacity(specified.len());
    for (index, line) in specified {
        // is_specified guarantees both are present.
        let (Some(account_id), Some(role)) = (line.account, line.role) else {
            return Err(ValidationError::InsufficientEntries);
        };
        let amount = Amount::parse(&line.amount).map_err(|_| ValidationError::InvalidAmount(index))?;
        entries.push(EntryLine {
            account_id,
            amount,
            role,
        });
    }

    check_balance(&entries)?;

    Ok(JournalPayload {
        description: description.to_string(),
        date,
        entries,
    })
}

/// Debits equal credits at currency precision.
pub fn check_balance(entries: &[EntryLine]) -> Result<Totals, ValidationError> {
    let totals = Totals::accumulate(entries.iter().map(|e| (e.role, e.amount.as_decimal())));
    if totals.is_balanced() {
        Ok(totals)
    } else {
        Err(ValidationError::Unbalanced {
            debit: totals.debit,
            credit: totals.credit,
        })
    }
}
