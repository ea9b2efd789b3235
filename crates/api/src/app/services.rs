//! Service wiring: which store and auth provider back the API, plus the
//! workspace-scoped view caches that sit in front of the store.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use jurnal_accounting::{
    Account, AccountKind, Category, FinancialSummary, JournalDraft, NewAccount, NewCategory,
};
use jurnal_auth::{AuthError, AuthProvider, CurrentUser, WorkspaceSummary};
use jurnal_core::{CategoryId, TransactionId, UserId, WorkspaceId};
use jurnal_infra::{
    Submitted, SubmitError, TransactionSubmitter,
    auth::{InMemoryAuthProvider, PostgresAuthProvider},
    cache::ViewCaches,
    export::{self, ExportError, ExportOutcome},
    import::{self, ImportError, ImportReport},
    store::{
        DateRange, InMemoryLedgerStore, LedgerStore, PostgresLedgerStore, StoreError,
        TransactionPage, TransactionQuery,
    },
};

use crate::config::{ApiConfig, BootstrapUser};

pub const DEMO_EMAIL: &str = "demo@jurnal.local";
pub const DEMO_PASSWORD: &str = "demo-password";
pub const DEMO_WORKSPACE: &str = "Demo";

/// Chart of accounts every new workspace starts with.
const STARTER_ACCOUNTS: [(&str, AccountKind); 7] = [
    ("Kas Tunai", AccountKind::Asset),
    ("Bank", AccountKind::Asset),
    ("Utang Usaha", AccountKind::Liability),
    ("Modal", AccountKind::Equity),
    ("Pendapatan Jasa", AccountKind::Revenue),
    ("Beban Gaji", AccountKind::Expense),
    ("Beban ATK", AccountKind::Expense),
];

pub struct AppServices {
    store: Arc<dyn LedgerStore>,
    auth: Arc<dyn AuthProvider>,
    caches: ViewCaches,
    submitter: TransactionSubmitter<Arc<dyn LedgerStore>>,
}

impl AppServices {
    pub fn new(store: Arc<dyn LedgerStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            submitter: TransactionSubmitter::new(store.clone()),
            store,
            auth,
            caches: ViewCaches::new(),
        }
    }

    pub fn store(&self) -> &dyn LedgerStore {
        self.store.as_ref()
    }

    pub fn auth(&self) -> &dyn AuthProvider {
        self.auth.as_ref()
    }

    pub fn caches(&self) -> &ViewCaches {
        &self.caches
    }

    pub async fn current_user(&self, token: &jurnal_auth::SessionToken) -> Result<CurrentUser, AuthError> {
        self.auth.current_user(token).await
    }

    pub async fn workspaces(&self, user_id: UserId) -> Result<Vec<WorkspaceSummary>, StoreError> {
        self.store.list_workspaces(user_id).await
    }

    pub async fn is_member(&self, user_id: UserId, workspace_id: WorkspaceId) -> Result<bool, StoreError> {
        self.store.is_member(user_id, workspace_id).await
    }

    pub async fn accounts(&self, workspace_id: WorkspaceId) -> Result<Vec<Account>, StoreError> {
        if let Some(accounts) = self.caches.accounts(workspace_id) {
            debug!(%workspace_id, "account list served from cache");
            return Ok(accounts);
        }
        let accounts = self.store.get_accounts(workspace_id).await?;
        self.caches.store_accounts(workspace_id, accounts.clone());
        Ok(accounts)
    }

    pub async fn create_account(&self, workspace_id: WorkspaceId, account: NewAccount) -> Result<Account, StoreError> {
        let created = self.store.create_account(workspace_id, account).await?;
        self.caches.invalidate_accounts(workspace_id);
        Ok(created)
    }

    pub async fn categories(&self, workspace_id: WorkspaceId) -> Result<Vec<Category>, StoreError> {
        self.store.list_categories(workspace_id).await
    }

    pub async fn create_category(
        &self,
        workspace_id: WorkspaceId,
        category: NewCategory,
    ) -> Result<Category, StoreError> {
        self.store.create_category(workspace_id, category).await
    }

    pub async fn delete_category(&self, workspace_id: WorkspaceId, category_id: CategoryId) -> Result<(), StoreError> {
        self.store.delete_category(workspace_id, category_id).await
    }

    pub async fn transactions(
        &self,
        workspace_id: WorkspaceId,
        query: TransactionQuery,
    ) -> Result<TransactionPage, StoreError> {
        if let Some(page) = self.caches.listing(workspace_id, &query) {
            debug!(%workspace_id, "transaction listing served from cache");
            return Ok(page);
        }
        let page = self.store.list_transactions(workspace_id, &query).await?;
        self.caches.store_listing(workspace_id, query, page.clone());
        Ok(page)
    }

    pub async fn transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
    ) -> Result<jurnal_accounting::Transaction, StoreError> {
        self.store.get_transaction(workspace_id, transaction_id).await
    }

    /// Create or update, then refresh the workspace's listings.
    pub async fn submit(
        &self,
        draft: &JournalDraft,
        workspace_id: Option<WorkspaceId>,
        user_id: UserId,
    ) -> Result<Submitted, SubmitError> {
        let submitted = self.submitter.submit(draft, workspace_id, user_id).await?;
        self.caches.invalidate_listings(submitted.transaction.workspace_id);
        Ok(submitted)
    }

    pub async fn delete_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: TransactionId,
    ) -> Result<(), StoreError> {
        self.store.delete_transaction(workspace_id, transaction_id).await?;
        self.caches.invalidate_listings(workspace_id);
        Ok(())
    }

    pub async fn import(
        &self,
        workspace_id: WorkspaceId,
        creator: &CurrentUser,
        bytes: &[u8],
    ) -> Result<ImportReport, ImportError> {
        let report = import::import(&self.store, Some(workspace_id), creator, bytes).await?;
        if !report.succeeded.is_empty() {
            self.caches.invalidate_listings(workspace_id);
        }
        Ok(report)
    }

    pub async fn export(&self, workspace_id: WorkspaceId, range: DateRange) -> Result<ExportOutcome, ExportError> {
        export::export(&self.store, workspace_id, range).await
    }

    pub async fn summary(&self, workspace_id: WorkspaceId, range: DateRange) -> Result<FinancialSummary, StoreError> {
        self.store.financial_summary(workspace_id, range).await
    }
}

/// Pick the backend from configuration: Postgres when `DATABASE_URL` is set,
/// otherwise in-memory stores seeded with a demo user.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => build_persistent_services(url, config).await,
        None => build_in_memory_services(config).await,
    }
}

async fn build_persistent_services(database_url: &str, config: &ApiConfig) -> anyhow::Result<AppServices> {
    let store = PostgresLedgerStore::connect(database_url)
        .await
        .context("connecting to postgres")?;
    store.migrate().await.context("running schema migration")?;
    let auth = PostgresAuthProvider::new(store.pool().clone(), config.session_ttl);

    if let Some(bootstrap) = &config.bootstrap {
        match auth.register(&bootstrap.email, &bootstrap.password).await {
            Ok(user) => {
                let workspace = store
                    .create_workspace(&bootstrap.workspace, user.id)
                    .await
                    .context("creating bootstrap workspace")?;
                seed_accounts(&store, workspace.id).await?;
                info!(email = %user.email, workspace_id = %workspace.id, "bootstrap user created");
            }
            Err(err) => info!(error = %err, "bootstrap user not created"),
        }
    }

    info!("using postgres stores");
    Ok(AppServices::new(Arc::new(store), Arc::new(auth)))
}

async fn build_in_memory_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let store = Arc::new(InMemoryLedgerStore::new());
    let auth = Arc::new(InMemoryAuthProvider::new(config.session_ttl));

    let demo = config.bootstrap.clone().unwrap_or_else(|| BootstrapUser {
        email: DEMO_EMAIL.to_string(),
        password: DEMO_PASSWORD.to_string(),
        workspace: DEMO_WORKSPACE.to_string(),
    });
    let user = auth
        .register(&demo.email, &demo.password)
        .await
        .context("registering demo user")?;
    let workspace = store
        .add_workspace(&demo.workspace, user.id)
        .context("creating demo workspace")?;
    seed_accounts(store.as_ref(), workspace.id).await?;

    info!(email = %user.email, workspace_id = %workspace.id, "using in-memory stores with demo data");
    Ok(AppServices::new(store, auth))
}

/// Give a fresh workspace the starter chart of accounts.
pub async fn seed_accounts<S: LedgerStore + ?Sized>(store: &S, workspace_id: WorkspaceId) -> anyhow::Result<()> {
    for (name, kind) in STARTER_ACCOUNTS {
        let account = NewAccount::new(name, kind, kind.normal_balance(), None)?;
        store
            .create_account(workspace_id, account)
            .await
            .with_context(|| format!("creating account {name}"))?;
    }
    Ok(())
}
