use crate::error::StorageResult;
use crate::link::ShortLink;
use crate::shortkey::ShortKey;
use async_trait::async_trait;
use jiff::Timestamp;

/// A read-only view of a link repository.
///
/// This trait provides only the read operations from [`LinkRepository`],
/// for front ends that list links without mutating them.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves a snapshot of the link stored under `key`.
    /// Returns `None` if the key does not exist.
    async fn find_by_key(&self, key: &ShortKey) -> StorageResult<Option<ShortLink>>;

    /// Checks whether a key is currently taken.
    async fn exists(&self, key: &ShortKey) -> StorageResult<bool>;

    /// Returns every link owned by `owner_id`, ordered by short key.
    async fn find_by_owner(&self, owner_id: &str) -> StorageResult<Vec<ShortLink>>;

    /// Returns every stored link, ordered by owner and then short key.
    async fn find_all(&self) -> StorageResult<Vec<ShortLink>>;

    /// Number of stored links.
    async fn len(&self) -> StorageResult<usize>;
}

#[async_trait]
pub trait LinkRepository: ReadRepository {
    /// Inserts or replaces the link under its key and keeps the owner index
    /// in step. A link whose status is `Deleted` is removed instead.
    async fn save(&self, link: ShortLink) -> StorageResult<()>;

    /// Inserts a new link. Returns `Err(Conflict)` if the key is already taken.
    async fn insert(&self, link: ShortLink) -> StorageResult<()>;

    /// Runs `f` against the stored link under the repository's write lock and
    /// keeps whatever `f` changed. Returns `None` if the key does not exist.
    ///
    /// A link that `f` marks `Deleted` is removed from every index.
    async fn modify<F, T>(&self, key: &ShortKey, f: F) -> StorageResult<Option<T>>
    where
        F: FnOnce(&mut ShortLink) -> T + Send,
        T: Send;

    /// Deletes the link stored under `key` from every index.
    /// Returns `true` if the link existed and was removed.
    async fn delete_by_key(&self, key: &ShortKey) -> StorageResult<bool>;

    /// Returns every link whose TTL passed at `now`, marking active ones
    /// `ExpiredByTtl` on the way, together with every link already
    /// `ExpiredByClicks`.
    async fn find_expired(&self, now: Timestamp) -> StorageResult<Vec<ShortLink>>;
}
