//! Postgres-backed persistence service.
//!
//! Tenant scoping is part of every statement: reads filter on
//! `workspace_id`, writes verify that each referenced account belongs to the
//! workspace before anything is inserted. Multi-statement writes (transaction
//! header + entries) run inside one SQL transaction.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Rejected` |
//! | Database (foreign key violation) | `23503` | `Rejected` |
//! | Database (check constraint violation) | `23514` | `Rejected` |
//! | Database (data exception, e.g. numeric overflow) | `22xxx` | `Rejected` |
//! | Database (other) | Any other | `Backend` |
//! | RowNotFound | N/A | `NotFound` |
//! | PoolClosed / Other | N/A | `Backend` |

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use jurnal_accounting::{
    Account, AccountKind, Category, EntryLine, EntryRole, FinancialSummary, ImportCandidate,
    JournalPayload, KindTotal, MIN_LINES, NewAccount, NewCategory, Transaction, ValidationError,
    check_balance,
};
use jurnal_auth::{CurrentUser, Role, Workspace, WorkspaceSummary};
use jurnal_core::{AccountId, Amount, CategoryId, TransactionId, UserId, WorkspaceId};

use super::query::{
    DateRange, SortColumn, TransactionFilter, TransactionPage, TransactionQuery, TransactionRow,
};
use super::{ImportStatus, LedgerStore, NewTransaction, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_schema.sql");

const TRANSACTION_COLUMNS: &str =
    "t.id, t.workspace_id, t.created_by, t.description, t.date, t.created_at";

/// Postgres-backed `LedgerStore`.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    /// Create a workspace owned (and joined) by `owner`.
    #[instrument(skip(self), fields(owner_id = %owner), err)]
    pub async fn create_workspace(&self, name: &str, owner: UserId) -> Result<Workspace, StoreError> {
        let workspace = Workspace {
            id: WorkspaceId::new(),
            name: name.to_string(),
            owner_id: owner,
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("create_workspace", e))?;
        sqlx::query("INSERT INTO workspaces (id, name, owner_id) VALUES ($1, $2, $3)")
            .bind(workspace.id.as_uuid())
            .bind(&workspace.name)
            .bind(owner.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_workspace", e))?;
        sqlx::query("INSERT INTO workspace_members (workspace_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(workspace.id.as_uuid())
            .bind(owner.as_uuid())
            .bind(Role::OWNER.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_workspace", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_workspace", e))?;

        Ok(workspace)
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id, user_id = %user_id), err)]
    pub async fn add_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        role: Role,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO workspace_members (workspace_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (workspace_id, user_id) DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(workspace_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(role.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_member", e))?;
        Ok(())
    }

    async fn load_entries(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<EntryLine>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT transaction_id, account_id, amount, role
            FROM entries
            WHERE transaction_id = ANY($1)
            ORDER BY transaction_id, position ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_entries", e))?;

        let mut by_transaction: HashMap<Uuid, Vec<EntryLine>> = HashMap::new();
        for row in rows {
            let entry = EntryRow::from_row(&row).map_err(|e| map_sqlx_error("load_entries", e))?;
            let transaction_id = entry.transaction_id;
            by_transaction
                .entry(transaction_id)
                .or_default()
                .push(entry.try_into()?);
        }
        Ok(by_transaction)
    }

    async fn assemble(&self, headers: Vec<TransactionHeaderRow>) -> Result<Vec<Transaction>, StoreError> {
        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let mut entries = self.load_entries(&ids).await?;
        Ok(headers
            .into_iter()
            .map(|header| {
                let lines = entries.remove(&header.id).unwrap_or_default();
                header.into_transaction(lines)
            })
            .collect())
    }

    async fn insert_transaction(
        &self,
        workspace_id: WorkspaceId,
        created_by: UserId,
        payload: &JournalPayload,
    ) -> Result<TransactionId, StoreError> {
        check_payload(payload)?;

        let id = TransactionId::new();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        ensure_accounts_in_workspace(&mut tx, workspace_id, &payload.entries).await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, workspace_id, created_by, description, date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id.as_uuid())
        .bind(workspace_id.as_uuid())
        .bind(created_by.as_uuid())
        .bind(&payload.description)
        .bind(payload.date)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_transaction", e))?;

        insert_entries(&mut tx, id, &payload.entries).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(id)
    }

    async fn account_id_named(
        &self,
        workspace_id: WorkspaceId,
        name: &str,
    ) -> Result<Option<AccountId>, StoreError> {
        let row = sqlx::query(
            "SELECT id FROM accounts WHERE workspace_id = $1 AND lower(name) = lower($2)",
        )
        .bind(workspace_id.as_uuid())
        .bind(name.trim())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("account_id_named", e))?;

        row.map(|r| r.try_get::<Uuid, _>("id").map(AccountId::from_uuid))
            .transpose()
            .map_err(|e| map_sqlx_error("account_id_named", e))
    }

    async fn import_row(
        &self,
        workspace_id: WorkspaceId,
        row: &ImportCandidate,
        creator: UserId,
    ) -> Result<(), StoreError> {
        let debit = self
            .account_id_named(workspace_id, &row.debit_account)
            .await?
            .ok_or_else(|| {
                StoreError::Rejected(format!("debit account '{}' not found", row.debit_account))
            })?;
        let credit = self
            .account_id_named(workspace_id, &row.credit_account)
            .await?
            .ok_or_else(|| {
                StoreError::Rejected(format!("credit account '{}' not found", row.credit_account))
            })?;

        let payload = JournalPayload {
            description: row.description.clone(),
            date: row.date,
            entries: vec![
                EntryLine::debit(debit, row.amount.clone()),
                EntryLine::credit(credit, row.amount.clone()),
            ],
        };
        self.insert_transaction(workspace_id, creator, &payload)
            .await
            .map(|_| ())
    }
}

/// The store's own check, independent of whatever the caller validated.
fn check_payload(payload: &JournalPayload) -> Result<(), StoreError> {
    if payload.description.trim().is_empty() {
        return Err(StoreError::Rejected(ValidationError::EmptyDescription.to_string()));
    }
    if payload.entries.len() < MIN_LINES {
        return Err(StoreError::Rejected(ValidationError::InsufficientEntries.to_string()));
    }
    check_balance(&payload.entries).map_err(|e| StoreError::Rejected(e.to_string()))?;
    Ok(())
}

async fn ensure_accounts_in_workspace(
    conn: &mut PgConnection,
    workspace_id: WorkspaceId,
    entries: &[EntryLine],
) -> Result<(), StoreError> {
    let mut ids: Vec<Uuid> = entries.iter().map(|e| *e.account_id.as_uuid()).collect();
    ids.sort();
    ids.dedup();

    let owned: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM accounts WHERE workspace_id = $1 AND id = ANY($2)",
    )
    .bind(workspace_id.as_uuid())
    .bind(&ids)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("ensure_accounts_in_workspace", e))?;

    if owned != ids.len() as i64 {
        return Err(StoreError::TenantIsolation(
            "entries reference accounts outside this workspace".to_string(),
        ));
    }
    Ok(())
}

async fn insert_entries(
    conn: &mut PgConnection,
    transaction_id: TransactionId,
    entries: &[EntryLine],
) -> Result<(), StoreError> {
    for (position, entry) in entries.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO entries (transaction_id, account_id, amount, role, position)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(transaction_id.as_uuid())
        .bind(entry.account_id.as_uuid())
        .bind(entry.amount.as_decimal())
        .bind(entry.role.as_str())
        .bind(position as i32)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("insert_entries", e))?;
    }
    Ok(())
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, workspace_id: WorkspaceId, filter: &TransactionFilter) {
    builder
        .push(" WHERE t.workspace_id = ")
        .push_bind(*workspace_id.as_uuid());
    if let Some(start) = filter.range.start {
        builder.push(" AND t.date >= ").push_bind(start);
    }
    if let Some(end) = filter.range.end {
        builder.push(" AND t.date <= ").push_bind(end);
    }
    if !filter.account_ids.is_empty() {
        let ids: Vec<Uuid> = filter.account_ids.iter().map(|id| *id.as_uuid()).collect();
        builder
            .push(" AND EXISTS (SELECT 1 FROM entries f WHERE f.transaction_id = t.id AND f.account_id = ANY(")
            .push_bind(ids)
            .push("))");
    }
}

fn order_column(column: SortColumn) -> &'static str {
    match column {
        SortColumn::Date => "t.date",
        SortColumn::Description => "lower(t.description)",
        SortColumn::IsBalanced => "is_balanced",
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(
        skip(self, request),
        fields(workspace_id = %request.workspace_id, user_id = %request.created_by),
        err
    )]
    async fn create_transaction(&self, request: NewTransaction) -> Result<Transaction, StoreError> {
        let id = self
            .insert_transaction(request.workspace_id, request.created_by, &request.payload)
            .await?;
        self.get_transaction(request.workspace_id, id).await
    }

    #[instrument(skip(self, payload), fields(workspace_id = %workspace_id, transaction_id = %transaction_id), err)]
    async fn update_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
        payload: JournalPayload,
    ) -> Result<Transaction, StoreError> {
        check_payload(&payload)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let exists = sqlx::query("SELECT id FROM transactions WHERE id = $1 AND workspace_id = $2 FOR UPDATE")
            .bind(transaction_id.as_uuid())
            .bind(workspace_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_transaction", e))?;
        if exists.is_none() {
            return Err(StoreError::NotFound);
        }

        ensure_accounts_in_workspace(&mut tx, workspace_id, &payload.entries).await?;

        sqlx::query("UPDATE transactions SET description = $1, date = $2 WHERE id = $3")
            .bind(&payload.description)
            .bind(payload.date)
            .bind(transaction_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_transaction", e))?;
        sqlx::query("DELETE FROM entries WHERE transaction_id = $1")
            .bind(transaction_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_transaction", e))?;
        insert_entries(&mut tx, transaction_id, &payload.entries).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        self.get_transaction(workspace_id, transaction_id).await
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id, transaction_id = %transaction_id), err)]
    async fn delete_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1 AND workspace_id = $2")
            .bind(transaction_id.as_uuid())
            .bind(workspace_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_transaction", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id, transaction_id = %transaction_id), err)]
    async fn get_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions t WHERE t.id = $1 AND t.workspace_id = $2"
        ))
        .bind(transaction_id.as_uuid())
        .bind(workspace_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_transaction", e))?
        .ok_or(StoreError::NotFound)?;

        let header = TransactionHeaderRow::from_row(&row).map_err(|e| map_sqlx_error("get_transaction", e))?;
        self.assemble(vec![header])
            .await?
            .pop()
            .ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self, query), fields(workspace_id = %workspace_id), err)]
    async fn list_transactions(
        &self,
        workspace_id: WorkspaceId,
        query: &TransactionQuery,
    ) -> Result<TransactionPage, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM transactions t");
        push_filter(&mut count, workspace_id, &query.filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_transactions", e))?;

        let pagination = query.pagination;
        let mut page = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT {TRANSACTION_COLUMNS},
                COALESCE((
                    SELECT SUM(CASE WHEN e.role = 'debit' THEN e.amount ELSE -e.amount END)
                    FROM entries e WHERE e.transaction_id = t.id
                ), 0) = 0 AS is_balanced
            FROM transactions t
            "#
        ));
        push_filter(&mut page, workspace_id, &query.filter);
        page.push(format!(
            " ORDER BY {} {}, t.created_at DESC, t.id ASC",
            order_column(query.sort.column),
            query.sort.order.as_sql()
        ));
        page.push(" LIMIT ")
            .push_bind(i64::from(pagination.per_page))
            .push(" OFFSET ")
            .push_bind(i64::try_from(pagination.offset()).unwrap_or(i64::MAX));

        let rows = page
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_transactions", e))?;

        let mut headers = Vec::with_capacity(rows.len());
        let mut balanced = Vec::with_capacity(rows.len());
        for row in &rows {
            headers.push(TransactionHeaderRow::from_row(row).map_err(|e| map_sqlx_error("list_transactions", e))?);
            balanced.push(
                row.try_get::<bool, _>("is_balanced")
                    .map_err(|e| map_sqlx_error("list_transactions", e))?,
            );
        }

        let rows = self
            .assemble(headers)
            .await?
            .into_iter()
            .zip(balanced)
            .map(|(transaction, is_balanced)| TransactionRow {
                transaction,
                is_balanced,
            })
            .collect();

        Ok(TransactionPage::new(rows, total.max(0) as u64, pagination))
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id), err)]
    async fn transactions_in_range(
        &self,
        workspace_id: WorkspaceId,
        range: DateRange,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions t"
        ));
        push_filter(
            &mut builder,
            workspace_id,
            &TransactionFilter {
                range,
                account_ids: Vec::new(),
            },
        );
        builder.push(" ORDER BY t.date ASC, t.created_at ASC");

        let rows = builder
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("transactions_in_range", e))?;
        let headers = rows
            .iter()
            .map(TransactionHeaderRow::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("transactions_in_range", e))?;

        self.assemble(headers).await
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id), err)]
    async fn get_accounts(&self, workspace_id: WorkspaceId) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, workspace_id, name, type, balance_type, parent_id
            FROM accounts
            WHERE workspace_id = $1
            ORDER BY CASE type
                WHEN 'asset' THEN 1
                WHEN 'liability' THEN 2
                WHEN 'equity' THEN 3
                WHEN 'revenue' THEN 4
                ELSE 5
            END, name ASC
            "#,
        )
        .bind(workspace_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_accounts", e))?;

        rows.iter()
            .map(|row| {
                AccountRow::from_row(row)
                    .map_err(|e| map_sqlx_error("get_accounts", e))?
                    .try_into()
            })
            .collect()
    }

    #[instrument(skip(self, account), fields(workspace_id = %workspace_id), err)]
    async fn create_account(
        &self,
        workspace_id: WorkspaceId,
        account: NewAccount,
    ) -> Result<Account, StoreError> {
        if self.account_id_named(workspace_id, &account.name).await?.is_some() {
            return Err(StoreError::Rejected(format!(
                "an account named '{}' already exists",
                account.name
            )));
        }
        if let Some(parent_id) = account.parent_id {
            let parent_ok: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM accounts WHERE id = $1 AND workspace_id = $2)",
            )
            .bind(parent_id.as_uuid())
            .bind(workspace_id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_account", e))?;
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
        sqlx::query(
            r#"
            INSERT INTO accounts (id, workspace_id, name, type, balance_type, parent_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(created.id.as_uuid())
        .bind(workspace_id.as_uuid())
        .bind(&created.name)
        .bind(created.kind.as_str())
        .bind(created.normal_balance.as_str())
        .bind(created.parent_id.map(Uuid::from))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_account", e))?;

        Ok(created)
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id), err)]
    async fn list_categories(&self, workspace_id: WorkspaceId) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, workspace_id, name, type FROM categories WHERE workspace_id = $1 ORDER BY name ASC",
        )
        .bind(workspace_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;

        rows.iter()
            .map(|row| {
                CategoryRow::from_row(row)
                    .map_err(|e| map_sqlx_error("list_categories", e))?
                    .try_into()
            })
            .collect()
    }

    #[instrument(skip(self, category), fields(workspace_id = %workspace_id), err)]
    async fn create_category(
        &self,
        workspace_id: WorkspaceId,
        category: NewCategory,
    ) -> Result<Category, StoreError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM categories WHERE workspace_id = $1 AND lower(name) = lower($2))",
        )
        .bind(workspace_id.as_uuid())
        .bind(&category.name)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_category", e))?;
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
        sqlx::query("INSERT INTO categories (id, workspace_id, name, type) VALUES ($1, $2, $3, $4)")
            .bind(created.id.as_uuid())
            .bind(workspace_id.as_uuid())
            .bind(&created.name)
            .bind(created.kind.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_category", e))?;

        Ok(created)
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id, category_id = %category_id), err)]
    async fn delete_category(
        &self,
        workspace_id: WorkspaceId,
        category_id: CategoryId,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND workspace_id = $2")
            .bind(category_id.as_uuid())
            .bind(workspace_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(
        skip(self, rows, creator),
        fields(workspace_id = %workspace_id, user_id = %creator.id, creator_email = %creator.email, row_count = rows.len()),
        err
    )]
    async fn import_transactions(
        &self,
        workspace_id: WorkspaceId,
        rows: &[ImportCandidate],
        creator: &CurrentUser,
    ) -> Result<Vec<ImportStatus>, StoreError> {
        let mut statuses = Vec::with_capacity(rows.len());
        for row in rows {
            let status = match self.import_row(workspace_id, row, creator.id).await {
                Ok(()) => ImportStatus::success(row.row_number),
                Err(StoreError::Backend(message)) => {
                    // Connection-level trouble aborts the whole batch.
                    return Err(StoreError::Backend(message));
                }
                Err(err) => ImportStatus::error(row.row_number, err.to_string()),
            };
            statuses.push(status);
        }
        Ok(statuses)
    }

    #[instrument(skip(self), fields(user_id = %user_id, workspace_id = %workspace_id), err)]
    async fn is_member(&self, user_id: UserId, workspace_id: WorkspaceId) -> Result<bool, StoreError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM workspace_members WHERE workspace_id = $1 AND user_id = $2)",
        )
        .bind(workspace_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("is_member", e))
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list_workspaces(&self, user_id: UserId) -> Result<Vec<WorkspaceSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT w.id, w.name, m.role
            FROM workspace_members m
            JOIN workspaces w ON w.id = m.workspace_id
            WHERE m.user_id = $1
            ORDER BY w.name ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_workspaces", e))?;

        rows.iter()
            .map(|row| {
                Ok(WorkspaceSummary {
                    id: WorkspaceId::from_uuid(row.try_get("id")?),
                    name: row.try_get("name")?,
                    role: Role::new(row.try_get::<String, _>("role")?),
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("list_workspaces", e))
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id), err)]
    async fn financial_summary(
        &self,
        workspace_id: WorkspaceId,
        range: DateRange,
    ) -> Result<FinancialSummary, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT a.type AS kind,
                COALESCE(SUM(CASE WHEN e.role = a.balance_type THEN e.amount ELSE -e.amount END), 0) AS total
            FROM entries e
            JOIN transactions t ON t.id = e.transaction_id
            JOIN accounts a ON a.id = e.account_id
            WHERE t.workspace_id = $1
              AND ($2::date IS NULL OR t.date >= $2)
              AND ($3::date IS NULL OR t.date <= $3)
            GROUP BY a.type
            "#,
        )
        .bind(workspace_id.as_uuid())
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("financial_summary", e))?;

        let mut totals = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: String = row
                .try_get("kind")
                .map_err(|e| map_sqlx_error("financial_summary", e))?;
            let total: BigDecimal = row
                .try_get("total")
                .map_err(|e| map_sqlx_error("financial_summary", e))?;
            let kind = kind
                .parse::<AccountKind>()
                .map_err(|e| StoreError::Backend(format!("stored account type is invalid: {e}")))?;
            totals.push(KindTotal { kind, total });
        }
        Ok(FinancialSummary::from_totals(totals))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            if db_err.code().as_deref().is_some_and(refuses_data) {
                StoreError::Rejected(msg)
            } else {
                StoreError::Backend(msg)
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// SQLSTATEs meaning the backend refused this row's data rather than failed:
/// unique, foreign key and check violations plus the whole data exception
/// class (numeric overflow, invalid datetime and so on).
fn refuses_data(code: &str) -> bool {
    matches!(code, "23505" | "23503" | "23514") || code.starts_with("22")
}

// SQLx row types

#[derive(Debug)]
struct TransactionHeaderRow {
    id: Uuid,
    workspace_id: Uuid,
    created_by: Uuid,
    description: String,
    date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for TransactionHeaderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransactionHeaderRow {
            id: row.try_get("id")?,
            workspace_id: row.try_get("workspace_id")?,
            created_by: row.try_get("created_by")?,
            description: row.try_get("description")?,
            date: row.try_get("date")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TransactionHeaderRow {
    fn into_transaction(self, entries: Vec<EntryLine>) -> Transaction {
        Transaction {
            id: TransactionId::from_uuid(self.id),
            workspace_id: WorkspaceId::from_uuid(self.workspace_id),
            created_by: UserId::from_uuid(self.created_by),
            description: self.description,
            date: self.date,
            entries,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug)]
struct EntryRow {
    transaction_id: Uuid,
    account_id: Uuid,
    amount: BigDecimal,
    role: String,
}

impl<'r> FromRow<'r, PgRow> for EntryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(EntryRow {
            transaction_id: row.try_get("transaction_id")?,
            account_id: row.try_get("account_id")?,
            amount: row.try_get("amount")?,
            role: row.try_get("role")?,
        })
    }
}

impl TryFrom<EntryRow> for EntryLine {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let amount = Amount::try_from(row.amount)
            .map_err(|e| StoreError::Backend(format!("stored amount is invalid: {e}")))?;
        let role = row
            .role
            .parse::<EntryRole>()
            .map_err(|e| StoreError::Backend(format!("stored entry role is invalid: {e}")))?;
        Ok(EntryLine {
            account_id: AccountId::from_uuid(row.account_id),
            amount,
            role,
        })
    }
}

#[derive(Debug)]
struct AccountRow {
    id: Uuid,
    workspace_id: Uuid,
    name: String,
    kind: String,
    balance_type: String,
    parent_id: Option<Uuid>,
}

impl<'r> FromRow<'r, PgRow> for AccountRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccountRow {
            id: row.try_get("id")?,
            workspace_id: row.try_get("workspace_id")?,
            name: row.try_get("name")?,
            kind: row.try_get("type")?,
            balance_type: row.try_get("balance_type")?,
            parent_id: row.try_get("parent_id")?,
        })
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: AccountId::from_uuid(row.id),
            workspace_id: WorkspaceId::from_uuid(row.workspace_id),
            name: row.name,
            kind: row
                .kind
                .parse()
                .map_err(|e| StoreError::Backend(format!("stored account type is invalid: {e}")))?,
            normal_balance: row
                .balance_type
                .parse()
                .map_err(|e| StoreError::Backend(format!("stored balance type is invalid: {e}")))?,
            parent_id: row.parent_id.map(AccountId::from_uuid),
        })
    }
}

#[derive(Debug)]
struct CategoryRow {
    id: Uuid,
    workspace_id: Uuid,
    name: String,
    kind: String,
}

impl<'r> FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CategoryRow {
            id: row.try_get("id")?,
            workspace_id: row.try_get("workspace_id")?,
            name: row.try_get("name")?,
            kind: row.try_get("type")?,
        })
    }
}

impl TryFrom<CategoryRow> for Category {
    type Error = StoreError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(Category {
            id: CategoryId::from_uuid(row.id),
            workspace_id: WorkspaceId::from_uuid(row.workspace_id),
            name: row.name,
            kind: row
                .kind
                .parse()
                .map_err(|e| StoreError::Backend(format!("stored category type is invalid: {e}")))?,
        })
    }
}
