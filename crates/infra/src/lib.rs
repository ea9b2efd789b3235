//! Infrastructure layer: persistence and auth adapters, view caches, the
//! spreadsheet codec, and the submit/import/export workflows built on them.

pub mod auth;
pub mod cache;
pub mod export;
pub mod import;
pub mod spreadsheet;
pub mod store;
pub mod submitter;

pub use submitter::{EditSession, SubmitError, SubmitKind, SubmitState, Submitted, TransactionSubmitter};
