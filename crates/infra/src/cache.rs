//! Workspace-scoped view caches.
//!
//! The only shared mutable state that crosses requests. Entries live under
//! their workspace so a lookup can never return another workspace's data,
//! and invalidation always clears a whole workspace at once. Each workspace
//! holds a bounded number of entries.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::warn;

use jurnal_accounting::Account;
use jurnal_core::WorkspaceId;

use crate::store::{TransactionPage, TransactionQuery};

/// Listing pages kept per workspace. Older pages are evicted first.
pub const LISTING_PAGES_PER_WORKSPACE: usize = 32;

/// Workspace-isolated key/value cache abstraction.
pub trait TenantCache<K, V>: Send + Sync {
    fn get(&self, workspace_id: WorkspaceId, key: &K) -> Option<V>;
    fn upsert(&self, workspace_id: WorkspaceId, key: K, value: V);
    /// Drop every cached view of a workspace.
    fn clear_tenant(&self, workspace_id: WorkspaceId);
}

impl<K, V, S> TenantCache<K, V> for Arc<S>
where
    S: TenantCache<K, V> + ?Sized,
{
    fn get(&self, workspace_id: WorkspaceId, key: &K) -> Option<V> {
        (**self).get(workspace_id, key)
    }

    fn upsert(&self, workspace_id: WorkspaceId, key: K, value: V) {
        (**self).upsert(workspace_id, key, value)
    }

    fn clear_tenant(&self, workspace_id: WorkspaceId) {
        (**self).clear_tenant(workspace_id)
    }
}

/// In-memory workspace-isolated cache holding at most `capacity` entries per
/// workspace, least recently used first out.
#[derive(Debug)]
pub struct InMemoryTenantCache<K, V> {
    capacity: usize,
    // Per workspace, ordered from least to most recently used.
    inner: RwLock<HashMap<WorkspaceId, Vec<(K, V)>>>,
}

impl<K, V> InMemoryTenantCache<K, V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> TenantCache<K, V> for InMemoryTenantCache<K, V>
where
    K: Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, workspace_id: WorkspaceId, key: &K) -> Option<V> {
        let Ok(mut map) = self.inner.write() else {
            warn!(%workspace_id, "view cache lock poisoned; treating as a miss");
            return None;
        };
        let entries = map.get_mut(&workspace_id)?;
        let position = entries.iter().position(|(k, _)| k == key)?;
        let entry = entries.remove(position);
        let value = entry.1.clone();
        entries.push(entry);
        Some(value)
    }

    fn upsert(&self, workspace_id: WorkspaceId, key: K, value: V) {
        let Ok(mut map) = self.inner.write() else {
            warn!(%workspace_id, "view cache lock poisoned; entry not stored");
            return;
        };
        let entries = map.entry(workspace_id).or_default();
        entries.retain(|(k, _)| *k != key);
        if entries.len() >= self.capacity {
            entries.remove(0);
        }
        entries.push((key, value));
    }

    fn clear_tenant(&self, workspace_id: WorkspaceId) {
        match self.inner.write() {
            Ok(mut map) => {
                map.remove(&workspace_id);
            }
            Err(_) => warn!(%workspace_id, "view cache lock poisoned; invalidation skipped"),
        }
    }
}

/// The cached views the application keeps: the account list and the most
/// recently used listing pages.
#[derive(Debug)]
pub struct ViewCaches {
    accounts: InMemoryTenantCache<(), Vec<Account>>,
    listings: InMemoryTenantCache<TransactionQuery, TransactionPage>,
}

impl Default for ViewCaches {
    fn default() -> Self {
        Self {
            accounts: InMemoryTenantCache::with_capacity(1),
            listings: InMemoryTenantCache::with_capacity(LISTING_PAGES_PER_WORKSPACE),
        }
    }
}

impl ViewCaches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accounts(&self, workspace_id: WorkspaceId) -> Option<Vec<Account>> {
        self.accounts.get(workspace_id, &())
    }

    pub fn store_accounts(&self, workspace_id: WorkspaceId, accounts: Vec<Account>) {
        self.accounts.upsert(workspace_id, (), accounts);
    }

    pub fn listing(&self, workspace_id: WorkspaceId, query: &TransactionQuery) -> Option<TransactionPage> {
        self.listings.get(workspace_id, query)
    }

    pub fn store_listing(&self, workspace_id: WorkspaceId, query: TransactionQuery, page: TransactionPage) {
        self.listings.upsert(workspace_id, query, page);
    }

    /// After a transaction was created, updated, deleted or imported.
    pub fn invalidate_listings(&self, workspace_id: WorkspaceId) {
        self.listings.clear_tenant(workspace_id);
    }

    /// After an account was created.
    pub fn invalidate_accounts(&self, workspace_id: WorkspaceId) {
        self.accounts.clear_tenant(workspace_id);
    }

    /// After switching away from a workspace.
    pub fn invalidate_workspace(&self, workspace_id: WorkspaceId) {
        self.invalidate_listings(workspace_id);
        self.invalidate_accounts(workspace_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Pagination, TransactionPage};

    fn page_query(page: u32) -> TransactionQuery {
        TransactionQuery {
            pagination: Pagination::new(Some(page), None),
            ..TransactionQuery::default()
        }
    }

    #[test]
    fn entries_are_isolated_per_workspace() {
        let cache: InMemoryTenantCache<&'static str, u32> = InMemoryTenantCache::with_capacity(4);
        let a = WorkspaceId::new();
        let b = WorkspaceId::new();

        cache.upsert(a, "k", 1);
        cache.upsert(b, "k", 2);

        assert_eq!(cache.get(a, &"k"), Some(1));
        assert_eq!(cache.get(b, &"k"), Some(2));

        cache.clear_tenant(a);
        assert_eq!(cache.get(a, &"k"), None);
        assert_eq!(cache.get(b, &"k"), Some(2));
    }

    #[test]
    fn least_recently_used_entry_is_evicted_first() {
        let cache: InMemoryTenantCache<u32, u32> = InMemoryTenantCache::with_capacity(3);
        let ws = WorkspaceId::new();

        for key in 1..=3 {
            cache.upsert(ws, key, key * 10);
        }
        assert_eq!(cache.get(ws, &1), Some(10));
        cache.upsert(ws, 4, 40);

        assert_eq!(cache.get(ws, &2), None);
        assert_eq!(cache.get(ws, &1), Some(10));
        assert_eq!(cache.get(ws, &3), Some(30));
        assert_eq!(cache.get(ws, &4), Some(40));

        // Replacing a key does not count twice.
        cache.upsert(ws, 4, 41);
        assert_eq!(cache.get(ws, &1), Some(10));
        assert_eq!(cache.get(ws, &4), Some(41));
    }

    #[test]
    fn poisoned_lock_degrades_to_misses() {
        let cache: InMemoryTenantCache<u32, u32> = InMemoryTenantCache::with_capacity(4);
        let ws = WorkspaceId::new();
        cache.upsert(ws, 1, 10);

        std::thread::scope(|scope| {
            let poisoner = scope.spawn(|| {
                let _guard = cache.inner.write().unwrap();
                panic!("poison the cache lock");
            });
            assert!(poisoner.join().is_err());
        });

        assert_eq!(cache.get(ws, &1), None);
        cache.upsert(ws, 2, 20);
        cache.clear_tenant(ws);
        assert_eq!(cache.get(ws, &2), None);
    }

    #[test]
    fn walking_many_pages_keeps_the_listing_cache_bounded() {
        let caches = ViewCaches::new();
        let ws = WorkspaceId::new();
        let other = WorkspaceId::new();
        let pages = LISTING_PAGES_PER_WORKSPACE as u32 * 10;

        caches.store_listing(other, page_query(1), TransactionPage::new(vec![], 0, Pagination::default()));
        for page in 1..=pages {
            let query = page_query(page);
            caches.store_listing(ws, query.clone(), TransactionPage::new(vec![], 0, query.pagination));
        }

        let cached = (1..=pages)
            .filter(|page| caches.listing(ws, &page_query(*page)).is_some())
            .count();
        assert_eq!(cached, LISTING_PAGES_PER_WORKSPACE);
        assert!(caches.listing(ws, &page_query(pages)).is_some());
        assert!(caches.listing(ws, &page_query(1)).is_none());
        assert!(caches.listing(other, &page_query(1)).is_some());
    }

    #[test]
    fn switching_workspace_clears_both_views() {
        let caches = ViewCaches::new();
        let ws = WorkspaceId::new();
        let query = TransactionQuery::default();

        caches.store_accounts(ws, vec![]);
        caches.store_listing(ws, query.clone(), TransactionPage::new(vec![], 0, Pagination::default()));
        assert!(caches.accounts(ws).is_some());
        assert!(caches.listing(ws, &query).is_some());

        caches.invalidate_workspace(ws);
        assert!(caches.accounts(ws).is_none());
        assert!(caches.listing(ws, &query).is_none());
    }

    #[test]
    fn creating_an_account_keeps_listings() {
        let caches = ViewCaches::new();
        let ws = WorkspaceId::new();
        let query = TransactionQuery::default();

        caches.store_accounts(ws, vec![]);
        caches.store_listing(ws, query.clone(), TransactionPage::new(vec![], 0, Pagination::default()));
        caches.invalidate_accounts(ws);

        assert!(caches.accounts(ws).is_none());
        assert!(caches.listing(ws, &query).is_some());
    }
}
