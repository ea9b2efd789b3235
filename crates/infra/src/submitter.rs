//! Transaction submission workflow.
//!
//! `TransactionSubmitter` turns a journal draft into a persistence call:
//!
//! ```text
//! JournalDraft
//!   ↓
//! 1. Validate + shape entries (pure, never touches the store)
//!   ↓
//! 2. Resolve the active workspace (absent → NoActiveWorkspace, no store call)
//!   ↓
//! 3. create_transaction (new draft) or update_transaction (edit draft)
//!   ↓
//! Submitted | SubmitError::Persistence (service message kept verbatim)
//! ```
//!
//! `EditSession` wraps one draft with the submit state machine. A failed or
//! locally rejected submission keeps the draft for another attempt; a
//! successful one discards it.

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use jurnal_accounting::{JournalDraft, Transaction, ValidationError, prepare};
use jurnal_core::{UserId, WorkspaceId};

use crate::store::{LedgerStore, NewTransaction, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The draft failed local validation. Nothing was sent.
    #[error("{0}")]
    Rejected(#[from] ValidationError),

    #[error("no active workspace selected")]
    NoActiveWorkspace,

    /// The persistence service refused or failed the write.
    #[error("{0}")]
    Persistence(StoreError),

    #[error("this draft has already been submitted")]
    Closed,
}

impl SubmitError {
    pub fn code(&self) -> &'static str {
        match self {
            SubmitError::Rejected(reason) => reason.code(),
            SubmitError::NoActiveWorkspace => "no_active_workspace",
            SubmitError::Persistence(StoreError::NotFound) => "not_found",
            SubmitError::Persistence(_) => "persistence_error",
            SubmitError::Closed => "draft_closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitKind {
    Created,
    Updated,
}

/// A successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub transaction: Transaction,
    pub kind: SubmitKind,
    pub message: String,
}

/// Validates drafts and hands them to a `LedgerStore`.
#[derive(Debug, Clone)]
pub struct TransactionSubmitter<S> {
    store: S,
}

impl<S> TransactionSubmitter<S>
where
    S: LedgerStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Submit a draft on behalf of `user_id`.
    ///
    /// Validation runs before the workspace is looked at, so a bad draft
    /// reports its own reason even without a workspace. Neither failure
    /// reaches the store.
    #[instrument(
        skip(self, draft),
        fields(workspace_id = ?workspace_id, user_id = %user_id, edit = draft.is_edit()),
        err
    )]
    pub async fn submit(
        &self,
        draft: &JournalDraft,
        workspace_id: Option<WorkspaceId>,
        user_id: UserId,
    ) -> Result<Submitted, SubmitError> {
        let payload = prepare(draft).inspect_err(|reason| {
            debug!(code = reason.code(), %reason, "draft rejected locally");
        })?;

        let Some(workspace_id) = workspace_id else {
            debug!("submit without an active workspace");
            return Err(SubmitError::NoActiveWorkspace);
        };

        let result = match draft.transaction_id {
            None => self
                .store
                .create_transaction(NewTransaction {
                    workspace_id,
                    created_by: user_id,
                    payload,
                })
                .await
                .map(|transaction| Submitted {
                    transaction,
                    kind: SubmitKind::Created,
                    message: "Transaction saved.".to_string(),
                }),
            Some(transaction_id) => self
                .store
                .update_transaction(workspace_id, transaction_id, payload)
                .await
                .map(|transaction| Submitted {
                    transaction,
                    kind: SubmitKind::Updated,
                    message: "Transaction updated.".to_string(),
                }),
        };

        match result {
            Ok(submitted) => {
                info!(transaction_id = %submitted.transaction.id, "transaction submitted");
                Ok(submitted)
            }
            Err(err) => {
                match &err {
                    StoreError::TenantIsolation(message) => {
                        warn!(%workspace_id, %user_id, %message, "tenant boundary violation on submit");
                    }
                    other => {
                        error!(%workspace_id, %user_id, error = %other, "persistence service failed the submission");
                    }
                }
                Err(SubmitError::Persistence(err))
            }
        }
    }
}

/// Where an edit session is in its submit cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitState {
    Editing,
    Validating,
    Submitting,
    Succeeded,
    Failed(String),
    RejectedLocally(ValidationError),
}

/// One add/edit workflow: a draft plus its submit state.
#[derive(Debug, Clone)]
pub struct EditSession {
    draft: Option<JournalDraft>,
    state: SubmitState,
}

impl EditSession {
    pub fn open(draft: JournalDraft) -> Self {
        Self {
            draft: Some(draft),
            state: SubmitState::Editing,
        }
    }

    pub fn state(&self) -> &SubmitState {
        &self.state
    }

    /// `None` once the draft was submitted successfully.
    pub fn draft(&self) -> Option<&JournalDraft> {
        self.draft.as_ref()
    }

    /// Editing after a failure returns the session to `Editing`.
    pub fn draft_mut(&mut self) -> Option<&mut JournalDraft> {
        let draft = self.draft.as_mut()?;
        self.state = SubmitState::Editing;
        Some(draft)
    }

    pub async fn submit<S: LedgerStore>(
        &mut self,
        submitter: &TransactionSubmitter<S>,
        workspace_id: Option<WorkspaceId>,
        user_id: UserId,
    ) -> Result<Submitted, SubmitError> {
        let Some(draft) = self.draft.as_ref() else {
            return Err(SubmitError::Closed);
        };

        self.state = SubmitState::Validating;
        if let Err(reason) = prepare(draft) {
            self.state = SubmitState::RejectedLocally(reason.clone());
            return Err(SubmitError::Rejected(reason));
        }

        self.state = SubmitState::Submitting;
        match submitter.submit(draft, workspace_id, user_id).await {
            Ok(submitted) => {
                self.state = SubmitState::Succeeded;
                self.draft = None;
                Ok(submitted)
            }
            Err(err) => {
                self.state = SubmitState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Discard the draft without submitting.
    pub fn cancel(self) {}
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bigdecimal::BigDecimal;

    use jurnal_accounting::{
        Account, AccountKind, Category, DraftLine, EntryLine, EntryRole, FinancialSummary,
        ImportCandidate, JournalPayload, NewAccount, NewCategory,
    };
    use jurnal_auth::{CurrentUser, WorkspaceSummary};
    use jurnal_core::{AccountId, Amount, CategoryId, TransactionId};

    use super::*;
    use crate::store::{DateRange, ImportStatus, InMemoryLedgerStore, TransactionPage, TransactionQuery};

    /// Counts every call and fails writes with a fixed message.
    #[derive(Debug, Default)]
    struct FailingStore {
        calls: AtomicUsize,
    }

    impl FailingStore {
        fn touch<T>(&self) -> Result<T, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Rejected("entries do not balance (backend)".to_string()))
        }
    }

    #[async_trait]
    impl LedgerStore for FailingStore {
        async fn create_transaction(&self, _: NewTransaction) -> Result<Transaction, StoreError> {
            self.touch()
        }
        async fn update_transaction(
            &self,
            _: WorkspaceId,
            _: TransactionId,
            _: JournalPayload,
        ) -> Result<Transaction, StoreError> {
            self.touch()
        }
        async fn delete_transaction(&self, _: WorkspaceId, _: TransactionId) -> Result<(), StoreError> {
            self.touch()
        }
        async fn get_transaction(&self, _: WorkspaceId, _: TransactionId) -> Result<Transaction, StoreError> {
            self.touch()
        }
        async fn list_transactions(
            &self,
            _: WorkspaceId,
            _: &TransactionQuery,
        ) -> Result<TransactionPage, StoreError> {
            self.touch()
        }
        async fn transactions_in_range(&self, _: WorkspaceId, _: DateRange) -> Result<Vec<Transaction>, StoreError> {
            self.touch()
        }
        async fn get_accounts(&self, _: WorkspaceId) -> Result<Vec<Account>, StoreError> {
            self.touch()
        }
        async fn create_account(&self, _: WorkspaceId, _: NewAccount) -> Result<Account, StoreError> {
            self.touch()
        }
        async fn list_categories(&self, _: WorkspaceId) -> Result<Vec<Category>, StoreError> {
            self.touch()
        }
        async fn create_category(&self, _: WorkspaceId, _: NewCategory) -> Result<Category, StoreError> {
            self.touch()
        }
        async fn delete_category(&self, _: WorkspaceId, _: CategoryId) -> Result<(), StoreError> {
            self.touch()
        }
        async fn import_transactions(
            &self,
            _: WorkspaceId,
            _: &[ImportCandidate],
            _: &CurrentUser,
        ) -> Result<Vec<ImportStatus>, StoreError> {
            self.touch()
        }
        async fn is_member(&self, _: UserId, _: WorkspaceId) -> Result<bool, StoreError> {
            self.touch()
        }
        async fn list_workspaces(&self, _: UserId) -> Result<Vec<WorkspaceSummary>, StoreError> {
            self.touch()
        }
        async fn financial_summary(&self, _: WorkspaceId, _: DateRange) -> Result<FinancialSummary, StoreError> {
            self.touch()
        }
    }

    fn gaji_draft(cash: AccountId, salary: AccountId) -> JournalDraft {
        JournalDraft::with_lines(
            "Gaji",
            "2025-01-01",
            vec![DraftLine::debit(salary, "8000000"), DraftLine::credit(cash, "8000000")],
        )
    }

    async fn seeded() -> (Arc<InMemoryLedgerStore>, WorkspaceId, UserId, AccountId, AccountId) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let user = UserId::new();
        let ws = store.add_workspace("Fakultas Teknik", user).unwrap().id;
        let cash = store
            .create_account(ws, NewAccount::new("Kas", AccountKind::Asset, EntryRole::Debit, None).unwrap())
            .await
            .unwrap()
            .id;
        let salary = store
            .create_account(ws, NewAccount::new("Beban Gaji", AccountKind::Expense, EntryRole::Debit, None).unwrap())
            .await
            .unwrap()
            .id;
        (store, ws, user, cash, salary)
    }

    #[tokio::test]
    async fn gaji_scenario_reaches_the_store_unchanged() {
        let (store, ws, user, cash, salary) = seeded().await;
        let submitter = TransactionSubmitter::new(store.clone());

        let submitted = submitter.submit(&gaji_draft(cash, salary), Some(ws), user).await.unwrap();

        assert_eq!(submitted.kind, SubmitKind::Created);
        let amount = Amount::parse("8000000").unwrap();
        assert_eq!(
            submitted.transaction.entries,
            vec![
                EntryLine::debit(salary, amount.clone()),
                EntryLine::credit(cash, amount),
            ]
        );
        assert_eq!(submitted.transaction.workspace_id, ws);
        assert_eq!(submitted.transaction.created_by, user);
        assert_eq!(submitted.transaction.totals().debit, "8000000".parse::<BigDecimal>().unwrap());
    }

    #[tokio::test]
    async fn no_active_workspace_makes_no_store_calls() {
        let store = Arc::new(FailingStore::default());
        let submitter = TransactionSubmitter::new(store.clone());

        let err = submitter
            .submit(&gaji_draft(AccountId::new(), AccountId::new()), None, UserId::new())
            .await
            .unwrap_err();

        assert_eq!(err, SubmitError::NoActiveWorkspace);
        assert_eq!(err.code(), "no_active_workspace");
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_drafts_never_reach_the_store() {
        let store = Arc::new(FailingStore::default());
        let submitter = TransactionSubmitter::new(store.clone());
        let (a, b) = (AccountId::new(), AccountId::new());
        let draft = JournalDraft::with_lines(
            "Gaji",
            "2025-01-01",
            vec![DraftLine::debit(a, "5000"), DraftLine::credit(b, "4999.99")],
        );

        let err = submitter.submit(&draft, Some(WorkspaceId::new()), UserId::new()).await.unwrap_err();

        assert!(matches!(err, SubmitError::Rejected(ValidationError::Unbalanced { .. })));
        assert_eq!(err.code(), "unbalanced");
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn persistence_failures_carry_the_service_message() {
        let store = Arc::new(FailingStore::default());
        let submitter = TransactionSubmitter::new(store.clone());

        let err = submitter
            .submit(&gaji_draft(AccountId::new(), AccountId::new()), Some(WorkspaceId::new()), UserId::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "entries do not balance (backend)");
        assert_eq!(err.code(), "persistence_error");
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn edit_drafts_update_in_place() {
        let (store, ws, user, cash, salary) = seeded().await;
        let submitter = TransactionSubmitter::new(store.clone());
        let created = submitter.submit(&gaji_draft(cash, salary), Some(ws), user).await.unwrap();

        let mut draft = JournalDraft::edit(&created.transaction);
        draft.description = "Gaji Januari".to_string();
        let updated = submitter.submit(&draft, Some(ws), user).await.unwrap();

        assert_eq!(updated.kind, SubmitKind::Updated);
        assert_eq!(updated.transaction.id, created.transaction.id);
        assert_eq!(updated.transaction.description, "Gaji Januari");
    }

    #[tokio::test]
    async fn failed_session_keeps_the_draft_and_success_discards_it() {
        let (store, ws, user, cash, salary) = seeded().await;
        let failing = TransactionSubmitter::new(Arc::new(FailingStore::default()));
        let working = TransactionSubmitter::new(store);

        let mut session = EditSession::open(gaji_draft(cash, salary));
        assert!(session.submit(&failing, Some(ws), user).await.is_err());
        assert!(matches!(session.state(), SubmitState::Failed(_)));
        assert!(session.draft().is_some());

        session.draft_mut().unwrap().description = "Gaji (ulang)".to_string();
        assert_eq!(session.state(), &SubmitState::Editing);

        session.submit(&working, Some(ws), user).await.unwrap();
        assert_eq!(session.state(), &SubmitState::Succeeded);
        assert!(session.draft().is_none());
        let closed = session.submit(&working, Some(ws), user).await.unwrap_err();
        assert_eq!(closed, SubmitError::Closed);
        assert_eq!(closed.code(), "draft_closed");
    }

    #[tokio::test]
    async fn local_rejection_is_recorded_on_the_session() {
        let working = TransactionSubmitter::new(Arc::new(FailingStore::default()));
        let mut session = EditSession::open(JournalDraft::new());

        let err = session.submit(&working, Some(WorkspaceId::new()), UserId::new()).await.unwrap_err();

        assert_eq!(err, SubmitError::Rejected(ValidationError::EmptyDescription));
        assert_eq!(
            session.state(),
            &SubmitState::RejectedLocally(ValidationError::EmptyDescription)
        );
        assert!(session.draft().is_some());
    }
}
