use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;

use jurnal_accounting::{
    Account, Category, EntryLine, FinancialSummary, ImportCandidate, JournalPayload, KindTotal,
    MIN_LINES, NewAccount, NewCategory, Transaction, ValidationError, check_balance,
};
use jurnal_auth::{CurrentUser, Role, Workspace, WorkspaceSummary};
use jurnal_core::{AccountId, CategoryId, TransactionId, UserId, WorkspaceId};

use super::query::{DateRange, SortColumn, SortOrder, TransactionPage, TransactionQuery, TransactionRow};
use super::{ImportStatus, LedgerStore, NewTransaction, StoreError};

#[derive(Debug, Default)]
struct State {
    workspaces: HashMap<WorkspaceId, Workspace>,
    members: HashMap<(WorkspaceId, UserId), Role>,
    accounts: HashMap<AccountId, Account>,
    categories: HashMap<CategoryId, Category>,
    transactions: HashMap<TransactionId, Transaction>,
}

impl State {
    fn ensure_workspace(&self, workspace_id: WorkspaceId) -> Result<(), StoreError> {
        if self.workspaces.contains_key(&workspace_id) {
            Ok(())
        } else {
            Err(StoreError::Rejected(format!("workspace {workspace_id} does not exist")))
        }
    }

    fn workspace_accounts(&self, workspace_id: WorkspaceId) -> impl Iterator<Item = &Account> {
        self.accounts
            .values()
            .filter(move |a| a.workspace_id == workspace_id)
    }

    fn account_named(&self, workspace_id: WorkspaceId, name: &str) -> Option<&Account> {
        let wanted = name.trim().to_lowercase();
        self.workspace_accounts(workspace_id)
            .find(|a| a.name.to_lowercase() == wanted)
    }

    /// The store's own check, independent of whatever the caller validated.
    fn check_payload(&self, workspace_id: WorkspaceId, payload: &JournalPayload) -> Result<(), StoreError> {
        if payload.description.trim().is_empty() {
            return Err(StoreError::Rejected(ValidationError::EmptyDescription.to_string()));
        }
        if payload.entries.len() < MIN_LINES {
            return Err(StoreError::Rejected(ValidationError::InsufficientEntries.to_string()));
        }
        check_balance(&payload.entries).map_err(|e| StoreError::Rejected(e.to_string()))?;

        for entry in &payload.entries {
            match self.accounts.get(&entry.account_id) {
                Some(account) if account.workspace_id == workspace_id => {}
                Some(_) => {
                    return Err(StoreError::TenantIsolation(format!(
                        "account {} belongs to another workspace",
                        entry.account_id
                    )));
                }
                None => {
                    return Err(StoreError::Rejected(format!(
                        "account {} does not exist",
                        entry.account_id
                    )));
                }
            }
        }
        Ok(())
    }

    fn insert_transaction(
        &mut self,
        workspace_id: WorkspaceId,
        created_by: UserId,
        payload: JournalPayload,
    ) -> Result<Transaction, StoreError> {
        self.ensure_workspace(workspace_id)?;
        self.check_payload(workspace_id, &payload)?;

        let transaction = Transaction {
            id: TransactionId::new(),
            workspace_id,
            created_by,
            description: payload.description,
            date: payload.date,
            entries: payload.entries,
            created_at: Utc::now(),
        };
        self.transactions.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    fn scoped_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
    ) -> Result<&Transaction, StoreError> {
        self.transactions
            .get(&transaction_id)
            .filter(|t| t.workspace_id == workspace_id)
            .ok_or(StoreError::NotFound)
    }

    fn import_row(
        &mut self,
        workspace_id: WorkspaceId,
        row: &ImportCandidate,
        creator: UserId,
    ) -> Result<(), String> {
        let debit = self
            .account_named(workspace_id, &row.debit_account)
            .ok_or_else(|| format!("debit account '{}' not found", row.debit_account))?
            .id;
        let credit = self
            .account_named(workspace_id, &row.credit_account)
            .ok_or_else(|| format!("credit account '{}' not found", row.credit_account))?
            .id;

        let payload = JournalPayload {
            description: row.description.clone(),
            date: row.date,
            entries: vec![
                EntryLine::debit(debit, row.amount.clone()),
                EntryLine::credit(credit, row.amount.clone()),
            ],
        };
        self.insert_transaction(workspace_id, creator, payload)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// In-memory persistence service for tests/dev.
///
/// Enforces the same rules a real backend would: balance re-validation,
/// account ownership and workspace scoping on every read and write.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<State>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("ledger store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("ledger store lock poisoned".to_string()))
    }

    /// Create a workspace owned (and joined) by `owner`.
    pub fn add_workspace(&self, name: &str, owner: UserId) -> Result<Workspace, StoreError> {
        let workspace = Workspace {
            id: WorkspaceId::new(),
            name: name.to_string(),
            owner_id: owner,
        };
        let mut state = self.write()?;
        state.workspaces.insert(workspace.id, workspace.clone());
        state.members.insert((workspace.id, owner), Role::OWNER);
        Ok(workspace)
    }

    pub fn add_member(&self, workspace_id: WorkspaceId, user_id: UserId, role: Role) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.ensure_workspace(workspace_id)?;
        state.members.insert((workspace_id, user_id), role);
        Ok(())
    }

    pub fn remove_member(&self, workspace_id: WorkspaceId, user_id: UserId) -> Result<(), StoreError> {
        self.write()?.members.remove(&(workspace_id, user_id));
        Ok(())
    }
}

fn compare_rows(a: &TransactionRow, b: &TransactionRow, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Date => a.transaction.date.cmp(&b.transaction.date),
        SortColumn::Description => a
            .transaction
            .description
            .to_lowercase()
            .cmp(&b.transaction.description.to_lowercase()),
        SortColumn::IsBalanced => a.is_balanced.cmp(&b.is_balanced),
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_transaction(&self, request: NewTransaction) -> Result<Transaction, StoreError> {
        let mut state = self.write()?;
        state.insert_transaction(request.workspace_id, request.created_by, request.payload)
    }

    async fn update_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
        payload: JournalPayload,
    ) -> Result<Transaction, StoreError> {
        let mut state = self.write()?;
        state.scoped_transaction(workspace_id, transaction_id)?;
        state.check_payload(workspace_id, &payload)?;

        let transaction = state
            .transactions
            .get_mut(&transaction_id)
            .ok_or(StoreError::NotFound)?;
        transaction.replace(payload);
        Ok(transaction.clone())
    }

    async fn delete_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.scoped_transaction(workspace_id, transaction_id)?;
        state.transactions.remove(&transaction_id);
        Ok(())
    }

    async fn get_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, StoreError> {
        self.read()?
            .scoped_transaction(workspace_id, transaction_id)
            .cloned()
    }

    async fn list_transactions(
        &self,
        workspace_id: WorkspaceId,
        query: &TransactionQuery,
    ) -> Result<TransactionPage, StoreError> {
        let state = self.read()?;
        let mut rows: Vec<TransactionRow> = state
            .transactions
            .values()
            .filter(|t| t.workspace_id == workspace_id && query.filter.matches(t))
            .cloned()
            .map(TransactionRow::from)
            .collect();

        let column = query.sort.column;
        let descending = query.sort.order == SortOrder::Desc;
        rows.sort_by(|a, b| {
            let primary = compare_rows(a, b, column);
            let primary = if descending { primary.reverse() } else { primary };
            primary
                .then_with(|| b.transaction.created_at.cmp(&a.transaction.created_at))
                .then_with(|| a.transaction.id.cmp(&b.transaction.id))
        });

        let total = rows.len() as u64;
        let pagination = query.pagination;
        let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
        let rows = rows
            .into_iter()
            .skip(offset)
            .take(pagination.per_page as usize)
            .collect();

        Ok(TransactionPage::new(rows, total, pagination))
    }

    async fn transactions_in_range(
        &self,
        workspace_id: WorkspaceId,
        range: DateRange,
    ) -> Result<Vec<Transaction>, StoreError> {
        let state = self.read()?;
        let mut transactions: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| t.workspace_id == workspace_id && range.contains(t.date))
            .cloned()
            .collect();
        transactions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.created_at.cmp(&b.created_at)));
        Ok(transactions)
    }

    async fn get_accounts(&self, workspace_id: WorkspaceId) -> Result<Vec<Account>, StoreError> {
        let state = self.read()?;
        let mut accounts: Vec<Account> = state.workspace_accounts(workspace_id).cloned().collect();
        accounts.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
        Ok(accounts)
    }

    async fn create_account(
        &self,
        workspace_id: WorkspaceId,
        account: NewAccount,
    ) -> Result<Account, StoreError> {
        let mut state = self.write()?;
        state.ensure_workspace(workspace_id)?;

        if state.account_named(workspace_id, &account.name).is_some() {
            return Err(StoreError::Rejected(format!(
                "an account named '{}' already exists",
                account.name
            )));
        }
        if let Some(parent_id) = account.parent_id {
            let parent_ok = state
                .accounts
                .get(&parent_id)
                .is_some_and(|p| p.workspace_id == workspace_id);
            if !parent_ok {
                return Err(StoreError::Rejected(format!("parent account {parent_id} does not exist")));
            }
        }

        let created = Account {
            id: AccountId::new(),
            workspace_id,
            name: account.name,
            kind: account.kind,
            normal_balance: account.normal_balance,
            parent_id: account.parent_id,
        };
        state.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_categories(&self, workspace_id: WorkspaceId) -> Result<Vec<Category>, StoreError> {
        let state = self.read()?;
        let mut categories: Vec<Category> = state
            .categories
            .values()
            .filter(|c| c.workspace_id == workspace_id)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn create_category(
        &self,
        workspace_id: WorkspaceId,
        category: NewCategory,
    ) -> Result<Category, StoreError> {
        let mut state = self.write()?;
        state.ensure_workspace(workspace_id)?;

        let wanted = category.name.to_lowercase();
        let taken = state
            .categories
            .values()
            .any(|c| c.workspace_id == workspace_id && c.name.to_lowercase() == wanted);
        if taken {
            return Err(StoreError::Rejected(format!(
                "a category named '{}' already exists",
                category.name
            )));
        }

        let created = Category {
            id: CategoryId::new(),
            workspace_id,
            name: category.name,
            kind: category.kind,
        };
        state.categories.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_category(
        &self,
        workspace_id: WorkspaceId,
        category_id: CategoryId,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let owned = state
            .categories
            .get(&category_id)
            .is_some_and(|c| c.workspace_id == workspace_id);
        if !owned {
            return Err(StoreError::NotFound);
        }
        state.categories.remove(&category_id);
        Ok(())
    }

    async fn import_transactions(
        &self,
        workspace_id: WorkspaceId,
        rows: &[ImportCandidate],
        creator: &CurrentUser,
    ) -> Result<Vec<ImportStatus>, StoreError> {
        let mut state = self.write()?;
        state.ensure_workspace(workspace_id)?;

        let statuses = rows
            .iter()
            .map(|row| match state.import_row(workspace_id, row, creator.id) {
                Ok(()) => ImportStatus::success(row.row_number),
                Err(message) => ImportStatus::error(row.row_number, message),
            })
            .collect();
        Ok(statuses)
    }

    async fn is_member(&self, user_id: UserId, workspace_id: WorkspaceId) -> Result<bool, StoreError> {
        Ok(self.read()?.members.contains_key(&(workspace_id, user_id)))
    }

    async fn list_workspaces(&self, user_id: UserId) -> Result<Vec<WorkspaceSummary>, StoreError> {
        let state = self.read()?;
        let mut summaries: Vec<WorkspaceSummary> = state
            .members
            .iter()
            .filter(|((_, member), _)| *member == user_id)
            .filter_map(|((workspace_id, _), role)| {
                state.workspaces.get(workspace_id).map(|w| WorkspaceSummary {
                    id: w.id,
                    name: w.name.clone(),
                    role: role.clone(),
                })
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    async fn financial_summary(
        &self,
        workspace_id: WorkspaceId,
        range: DateRange,
    ) -> Result<FinancialSummary, StoreError> {
        let state = self.read()?;
        let mut totals: Vec<KindTotal> = Vec::new();

        for transaction in state
            .transactions
            .values()
            .filter(|t| t.workspace_id == workspace_id && range.contains(t.date))
        {
            for entry in &transaction.entries {
                let Some(account) = state.accounts.get(&entry.account_id) else {
                    continue;
                };
                let signed: BigDecimal = account.signed(entry.role, entry.amount.as_decimal());
                totals.push(KindTotal {
                    kind: account.kind,
                    total: signed,
                });
            }
        }

        Ok(FinancialSummary::from_totals(totals))
    }
}
