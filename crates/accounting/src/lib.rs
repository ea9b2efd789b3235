//! Accounting module (double-entry journal composition and validation).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod account;
pub mod category;
pub mod draft;
pub mod entry;
pub mod import;
pub mod summary;
pub mod transaction;
pub mod validation;

pub use account::{Account, AccountKind, NewAccount};
pub use category::{Category, CategoryKind, NewCategory};
pub use draft::{DraftError, DraftLine, JournalDraft, LineEdit, MIN_LINES, Totals};
pub use entry::{EntryLine, EntryRole};
pub use import::{
    IMPORT_COLUMNS, ImportCandidate, ImportPreview, ImportRow, ImportRowsError, ReadRow, RowDiagnostic,
    RowIssue, first_data_row_number, validate_rows,
};
pub use summary::{FinancialSummary, KindTotal};
pub use transaction::{JournalPayload, Transaction};
pub use validation::{ValidationError, check_balance, parse_entry_date, prepare, validate};
