//! Persistence service boundary.
//!
//! `LedgerStore` is the one seam between the journal workflow and whatever
//! holds accounts, categories, transactions and memberships. Every operation takes the
//! workspace explicitly; implementations must never read or write across
//! workspaces.

pub mod in_memory;
pub mod postgres;
pub mod query;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use jurnal_accounting::{
    Account, Category, FinancialSummary, ImportCandidate, JournalPayload, NewAccount, NewCategory,
    Transaction,
};
use jurnal_auth::{CurrentUser, WorkspaceSummary};
use jurnal_core::{CategoryId, TransactionId, UserId, WorkspaceId};

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use query::{
    DateRange, Pagination, Sort, SortColumn, SortOrder, TransactionFilter, TransactionPage,
    TransactionQuery, TransactionRow,
};

/// Persistence failure.
///
/// Messages are shown to the user verbatim, so they are written for people.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The service refused the write (its own validation failed).
    #[error("{0}")]
    Rejected(String),

    #[error("not found")]
    NotFound,

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("persistence backend error: {0}")]
    Backend(String),
}

/// Request for a new transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub workspace_id: WorkspaceId,
    pub created_by: UserId,
    pub payload: JournalPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportOutcome {
    Success,
    Error,
}

/// Per-row result of a bulk import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatus {
    pub row_number: usize,
    pub status: ImportOutcome,
    pub message: String,
}

impl ImportStatus {
    pub fn success(row_number: usize) -> Self {
        Self {
            row_number,
            status: ImportOutcome::Success,
            message: "imported".to_string(),
        }
    }

    pub fn error(row_number: usize, message: impl Into<String>) -> Self {
        Self {
            row_number,
            status: ImportOutcome::Error,
            message: message.into(),
        }
    }
}

/// Workspace-scoped persistence service.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create a transaction with its entries in one step.
    async fn create_transaction(&self, request: NewTransaction) -> Result<Transaction, StoreError>;

    /// Full replace of description, date and entries.
    async fn update_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
        payload: JournalPayload,
    ) -> Result<Transaction, StoreError>;

    /// Delete a transaction and its entries. A transaction of another
    /// workspace is `NotFound`.
    async fn delete_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
    ) -> Result<(), StoreError>;

    async fn get_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, StoreError>;

    async fn list_transactions(
        &self,
        workspace_id: WorkspaceId,
        query: &TransactionQuery,
    ) -> Result<TransactionPage, StoreError>;

    /// Every transaction in the range, oldest first.
    async fn transactions_in_range(
        &self,
        workspace_id: WorkspaceId,
        range: DateRange,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn get_accounts(&self, workspace_id: WorkspaceId) -> Result<Vec<Account>, StoreError>;

    async fn create_account(
        &self,
        workspace_id: WorkspaceId,
        account: NewAccount,
    ) -> Result<Account, StoreError>;

    /// The workspace's categories ordered by name.
    async fn list_categories(&self, workspace_id: WorkspaceId) -> Result<Vec<Category>, StoreError>;

    /// Names are unique per workspace, ignoring case.
    async fn create_category(
        &self,
        workspace_id: WorkspaceId,
        category: NewCategory,
    ) -> Result<Category, StoreError>;

    /// A category of another workspace is `NotFound`.
    async fn delete_category(
        &self,
        workspace_id: WorkspaceId,
        category_id: CategoryId,
    ) -> Result<(), StoreError>;

    /// Create one two-line transaction per candidate, resolving account names
    /// inside the workspace. Each row succeeds or fails on its own.
    async fn import_transactions(
        &self,
        workspace_id: WorkspaceId,
        rows: &[ImportCandidate],
        creator: &CurrentUser,
    ) -> Result<Vec<ImportStatus>, StoreError>;

    async fn is_member(&self, user_id: UserId, workspace_id: WorkspaceId) -> Result<bool, StoreError>;

    async fn list_workspaces(&self, user_id: UserId) -> Result<Vec<WorkspaceSummary>, StoreError>;

    async fn financial_summary(
        &self,
        workspace_id: WorkspaceId,
        range: DateRange,
    ) -> Result<FinancialSummary, StoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn create_transaction(&self, request: NewTransaction) -> Result<Transaction, StoreError> {
        (**self).create_transaction(request).await
    }

    async fn update_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
        payload: JournalPayload,
    ) -> Result<Transaction, StoreError> {
        (**self)
            .update_transaction(workspace_id, transaction_id, payload)
            .await
    }

    async fn delete_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
    ) -> Result<(), StoreError> {
        (**self).delete_transaction(workspace_id, transaction_id).await
    }

    async fn get_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, StoreError> {
        (**self).get_transaction(workspace_id, transaction_id).await
    }

    async fn list_transactions(
        &self,
        workspace_id: WorkspaceId,
        query: &TransactionQuery,
    ) -> Result<TransactionPage, StoreError> {
        (**self).list_transactions(workspace_id, query).await
    }

    async fn transactions_in_range(
        &self,
        workspace_id: WorkspaceId,
        range: DateRange,
    ) -> Result<Vec<Transaction>, StoreError> {
        (**self).transactions_in_range(workspace_id, range).await
    }

    async fn get_accounts(&self, workspace_id: WorkspaceId) -> Result<Vec<Account>, StoreError> {
        (**self).get_accounts(workspace_id).await
    }

    async fn create_account(
        &self,
        workspace_id: WorkspaceId,
        account: NewAccount,
    ) -> Result<Account, StoreError> {
        (**self).create_account(workspace_id, account).await
    }

    async fn list_categories(&self, workspace_id: WorkspaceId) -> Result<Vec<Category>, StoreError> {
        (**self).list_categories(workspace_id).await
    }

    async fn create_category(
        &self,
        workspace_id: WorkspaceId,
        category: NewCategory,
    ) -> Result<Category, StoreError> {
        (**self).create_category(workspace_id, category).await
    }

    async fn delete_category(
        &self,
        workspace_id: WorkspaceId,
        category_id: CategoryId,
    ) -> Result<(), StoreError> {
        (**self).delete_category(workspace_id, category_id).await
    }

    async fn import_transactions(
        &self,
        workspace_id: WorkspaceId,
        rows: &[ImportCandidate],
        creator: &CurrentUser,
    ) -> Result<Vec<ImportStatus>, StoreError> {
        (**self).import_transactions(workspace_id, rows, creator).await
    }

    async fn is_member(&self, user_id: UserId, workspace_id: WorkspaceId) -> Result<bool, StoreError> {
        (**self).is_member(user_id, workspace_id).await
    }

    async fn list_workspaces(&self, user_id: UserId) -> Result<Vec<WorkspaceSummary>, StoreError> {
        (**self).list_workspaces(user_id).await
    }

    async fn financial_summary(
        &self,
        workspace_id: WorkspaceId,
        range: DateRange,
    ) -> Result<FinancialSummary, StoreError> {
        (**self).financial_summary(workspace_id, range).await
    }
}
