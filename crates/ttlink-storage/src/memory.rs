use async_trait::async_trait;
use jiff::Timestamp;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, trace};
use ttlink_core::error::StorageResult;
use ttlink_core::{LinkRepository, LinkStatus, ReadRepository, ShortKey, ShortLink, StorageError};

/// Primary map plus the owner index derived from it.
///
/// Both maps change together under one write lock, so every reader sees an
/// owner index that matches the primary map.
#[derive(Debug, Default)]
struct LinkTable {
    links: HashMap<ShortKey, ShortLink>,
    by_owner: HashMap<String, BTreeSet<ShortKey>>,
}

impl LinkTable {
    fn put(&mut self, link: ShortLink) {
        let key = link.short_key().clone();
        let owner = link.owner_id().to_owned();

        if let Some(previous) = self.links.insert(key.clone(), link) {
            if previous.owner_id() != owner {
                self.unindex(previous.owner_id(), &key);
            }
        }

        self.by_owner.entry(owner).or_default().insert(key);
    }

    fn remove(&mut self, key: &ShortKey) -> Option<ShortLink> {
        let mut removed = self.links.remove(key)?;
        self.unindex(removed.owner_id(), key);
        removed.mark_deleted();
        Some(removed)
    }

    fn unindex(&mut self, owner_id: &str, key: &ShortKey) {
        if let Some(keys) = self.by_owner.get_mut(owner_id) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_owner.remove(owner_id);
            }
        }
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let indexed: usize = self.by_owner.values().map(BTreeSet::len).sum();
        indexed == self.links.len()
            && self.by_owner.iter().all(|(owner, keys)| {
                !keys.is_empty()
                    && keys.iter().all(|key| {
                        self.links
                            .get(key)
                            .is_some_and(|link| link.owner_id() == owner)
                    })
            })
    }
}

/// In-memory implementation of the repository traits.
///
/// A single `RwLock` guards the primary map and the owner index. This is a
/// low-traffic control-plane structure, so one coarse lock is preferred over
/// sharded maps that could expose a half-updated index.
#[derive(Debug, Default)]
pub struct InMemoryLinkStore {
    table: RwLock<LinkTable>,
}

impl InMemoryLinkStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadRepository for InMemoryLinkStore {
    async fn find_by_key(&self, key: &ShortKey) -> StorageResult<Option<ShortLink>> {
        trace!(key = %key, "looking up link");
        Ok(self.table.read().links.get(key).cloned())
    }

    async fn exists(&self, key: &ShortKey) -> StorageResult<bool> {
        Ok(self.table.read().links.contains_key(key))
    }

    async fn find_by_owner(&self, owner_id: &str) -> StorageResult<Vec<ShortLink>> {
        let table = self.table.read();
        let Some(keys) = table.by_owner.get(owner_id) else {
            return Ok(Vec::new());
        };

        Ok(keys
            .iter()
            .filter_map(|key| table.links.get(key).cloned())
            .collect())
    }

    async fn find_all(&self) -> StorageResult<Vec<ShortLink>> {
        let mut links: Vec<ShortLink> = self.table.read().links.values().cloned().collect();
        links.sort_by(|a, b| {
            a.owner_id()
                .cmp(b.owner_id())
                .then_with(|| a.short_key().cmp(b.short_key()))
        });
        Ok(links)
    }

    async fn len(&self) -> StorageResult<usize> {
        Ok(self.table.read().links.len())
    }
}

#[async_trait]
impl LinkRepository for InMemoryLinkStore {
    async fn save(&self, link: ShortLink) -> StorageResult<()> {
        let mut table = self.table.write();

        if link.status() == LinkStatus::Deleted {
            debug!(key = %link.short_key(), "saving a deleted link removes it");
            table.remove(link.short_key());
            return Ok(());
        }

        table.put(link);
        Ok(())
    }

    async fn insert(&self, link: ShortLink) -> StorageResult<()> {
        if link.status() == LinkStatus::Deleted {
            return Err(StorageError::InvalidData(format!(
                "cannot insert deleted link {}",
                link.short_key()
            )));
        }

        let mut table = self.table.write();
        if table.links.contains_key(link.short_key()) {
            return Err(StorageError::Conflict(link.short_key().to_string()));
        }

        table.put(link);
        Ok(())
    }

    async fn modify<F, T>(&self, key: &ShortKey, f: F) -> StorageResult<Option<T>>
    where
        F: FnOnce(&mut ShortLink) -> T + Send,
        T: Send,
    {
        let mut table = self.table.write();
        let Some(link) = table.links.get_mut(key) else {
            return Ok(None);
        };

        // key and owner are fixed at construction, so only a deletion can
        // leave the owner index stale
        let output = f(link);
        if link.status() == LinkStatus::Deleted {
            table.remove(key);
            debug!(key = %key, "link deleted during modify");
        }

        Ok(Some(output))
    }

    async fn delete_by_key(&self, key: &ShortKey) -> StorageResult<bool> {
        let removed = self.table.write().remove(key);
        if let Some(link) = &removed {
            debug!(key = %key, owner = %link.owner_id(), "link removed");
        }
        Ok(removed.is_some())
    }

    async fn find_expired(&self, now: Timestamp) -> StorageResult<Vec<ShortLink>> {
        let mut table = self.table.write();
        let mut expired = Vec::new();

        for link in table.links.values_mut() {
            if link.is_expired_at(now) {
                link.mark_expired_by_ttl();
                expired.push(link.clone());
            } else if link.status() == LinkStatus::ExpiredByClicks {
                expired.push(link.clone());
            }
        }

        expired.sort_by(|a, b| a.short_key().cmp(b.short_key()));
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use std::sync::Arc;

    fn key(s: &str) -> ShortKey {
        ShortKey::new_unchecked(s)
    }

    fn now() -> Timestamp {
        "2026-01-06T10:00:00Z".parse().unwrap()
    }

    fn link(code: &str, owner: &str, expires_at: Timestamp) -> ShortLink {
        ShortLink::new(
            key(code),
            "https://example.com",
            owner,
            expires_at - SignedDuration::from_hours(1),
            expires_at,
            3,
        )
    }

    fn live(code: &str, owner: &str) -> ShortLink {
        link(code, owner, now() + SignedDuration::from_hours(1))
    }

    #[tokio::test]
    async fn save_find_delete() {
        let store = InMemoryLinkStore::new();

        store.save(live("ABC123", "owner-a")).await.unwrap();

        assert!(store.find_by_key(&key("ABC123")).await.unwrap().is_some());
        assert_eq!(store.find_by_owner("owner-a").await.unwrap().len(), 1);

        assert!(store.delete_by_key(&key("ABC123")).await.unwrap());
        assert!(store.find_by_key(&key("ABC123")).await.unwrap().is_none());
        assert!(store.find_by_owner("owner-a").await.unwrap().is_empty());
        assert!(store.table.read().by_owner.is_empty());
    }

    #[tokio::test]
    async fn delete_nonexistent() {
        let store = InMemoryLinkStore::new();
        assert!(!store.delete_by_key(&key("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn save_upserts_without_duplicating_index() {
        let store = InMemoryLinkStore::new();
        let mut link = live("ABC123", "owner-a");

        store.save(link.clone()).await.unwrap();
        link.register_click(now()).unwrap();
        store.save(link).await.unwrap();

        let owned = store.find_by_owner("owner-a").await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].clicks(), 1);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn save_of_deleted_link_removes_it() {
        let store = InMemoryLinkStore::new();
        let mut link = live("ABC123", "owner-a");
        store.save(link.clone()).await.unwrap();

        link.mark_deleted();
        store.save(link).await.unwrap();

        assert!(!store.exists(&key("ABC123")).await.unwrap());
        assert!(store.table.read().is_consistent());
    }

    #[tokio::test]
    async fn insert_conflict() {
        let store = InMemoryLinkStore::new();

        store.insert(live("ABC123", "owner-a")).await.unwrap();
        let err = store.insert(live("ABC123", "owner-b")).await.unwrap_err();

        assert!(matches!(err, StorageError::Conflict(_)));
        let stored = store.find_by_key(&key("ABC123")).await.unwrap().unwrap();
        assert_eq!(stored.owner_id(), "owner-a");
        assert!(store.find_by_owner("owner-b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_by_owner_is_ordered_and_scoped() {
        let store = InMemoryLinkStore::new();
        for code in ["k3", "k1", "k2"] {
            store.save(live(code, "owner-a")).await.unwrap();
        }
        store.save(live("k0", "owner-b")).await.unwrap();

        let keys: Vec<_> = store
            .find_by_owner("owner-a")
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.short_key().to_string())
            .collect();
        assert_eq!(keys, ["k1", "k2", "k3"]);
        assert!(store.find_by_owner("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_all_orders_by_owner_then_key() {
        let store = InMemoryLinkStore::new();
        store.save(live("b", "owner-b")).await.unwrap();
        store.save(live("z", "owner-a")).await.unwrap();
        store.save(live("a", "owner-b")).await.unwrap();

        let pairs: Vec<_> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|l| (l.owner_id().to_string(), l.short_key().to_string()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("owner-a".to_string(), "z".to_string()),
                ("owner-b".to_string(), "a".to_string()),
                ("owner-b".to_string(), "b".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn find_expired_marks_ttl_and_includes_click_expired() {
        let store = InMemoryLinkStore::new();

        store
            .save(link("TTL001", "a", now() - SignedDuration::from_secs(1)))
            .await
            .unwrap();

        let mut used_up = live("CLK001", "a");
        used_up.mark_expired_by_clicks();
        store.save(used_up).await.unwrap();

        store.save(live("LIVE01", "a")).await.unwrap();

        let expired = store.find_expired(now()).await.unwrap();
        let summary: Vec<_> = expired
            .iter()
            .map(|l| (l.short_key().to_string(), l.status()))
            .collect();
        assert_eq!(
            summary,
            [
                ("CLK001".to_string(), LinkStatus::ExpiredByClicks),
                ("TTL001".to_string(), LinkStatus::ExpiredByTtl),
            ]
        );

        // the TTL flip is kept in the store
        let stored = store.find_by_key(&key("TTL001")).await.unwrap().unwrap();
        assert_eq!(stored.status(), LinkStatus::ExpiredByTtl);
    }

    #[tokio::test]
    async fn modify_keeps_changes() {
        let store = InMemoryLinkStore::new();
        store.save(live("ABC123", "owner-a")).await.unwrap();

        let outcome = store
            .modify(&key("ABC123"), |link| link.register_click(now()))
            .await
            .unwrap()
            .unwrap();
        assert!(outcome.is_ok());

        let stored = store.find_by_key(&key("ABC123")).await.unwrap().unwrap();
        assert_eq!(stored.clicks(), 1);
    }

    #[tokio::test]
    async fn modify_missing_key() {
        let store = InMemoryLinkStore::new();
        let outcome = store.modify(&key("nope"), |_| ()).await.unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn modify_that_deletes_unindexes() {
        let store = InMemoryLinkStore::new();
        store.save(live("ABC123", "owner-a")).await.unwrap();

        store
            .modify(&key("ABC123"), ShortLink::mark_deleted)
            .await
            .unwrap();

        assert!(!store.exists(&key("ABC123")).await.unwrap());
        assert!(store.table.read().is_consistent());
    }

    #[tokio::test]
    async fn concurrent_access() {
        let store = Arc::new(InMemoryLinkStore::new());
        let mut handles = vec![];

        for i in 0..50u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let owner = format!("owner-{}", i % 5);
                store
                    .save(live(&format!("code-{:03}", i), &owner))
                    .await
                    .unwrap();
            }));
        }

        for i in (0..50u64).step_by(2) {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let _ = store.delete_by_key(&key(&format!("code-{:03}", i))).await;
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(store.table.read().is_consistent());

        let total: usize = {
            let mut total = 0;
            for i in 0..5 {
                total += store
                    .find_by_owner(&format!("owner-{}", i))
                    .await
                    .unwrap()
                    .len();
            }
            total
        };
        assert_eq!(total, store.len().await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_clicks_are_not_lost() {
        let store = Arc::new(InMemoryLinkStore::new());
        let mut link = live("HOT001", "owner-a");
        link.change_max_clicks("owner-a", 1_000).unwrap();
        store.save(link).await.unwrap();

        let mut handles = vec![];
        for _ in 0..100 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .modify(&key("HOT001"), |link| link.register_click(now()))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = store.find_by_key(&key("HOT001")).await.unwrap().unwrap();
        assert_eq!(stored.clicks(), 100);
    }
}
