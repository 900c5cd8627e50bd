//! Read cache for wallet and transaction snapshots.
//!
//! The cache is best-effort: every backend or decoding error is logged and
//! treated as a miss, so losing the cache only costs latency.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tally_shared::UserId;
use tracing::{debug, warn};

use super::error::CacheError;
use super::types::{LedgerEntry, Wallet};

/// Default time-to-live for snapshots (60 seconds).
pub const DEFAULT_TTL_SECS: u64 = 60;

/// Default cache capacity (number of entries).
const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Key/value store with per-entry expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the value stored under `key`, or `None` on miss or after expiry.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key` for `ttl`.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Backend that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCacheBackend;

#[async_trait]
impl CacheBackend for NoopCacheBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set_ex(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

#[derive(Clone)]
struct Snapshot {
    payload: String,
    ttl: Duration,
}

struct SnapshotExpiry;

impl Expiry<String, Snapshot> for SnapshotExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Snapshot,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Snapshot,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-local backend using Moka.
///
/// Thread-safe and suitable for concurrent access. Expiry is per entry,
/// honoring the TTL passed to [`CacheBackend::set_ex`].
#[derive(Clone)]
pub struct MokaCacheBackend {
    cache: Cache<String, Snapshot>,
}

impl MokaCacheBackend {
    /// Creates a backend holding at most `max_capacity` entries.
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(SnapshotExpiry)
            .build();

        Self { cache }
    }
}

impl Default for MokaCacheBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[async_trait]
impl CacheBackend for MokaCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.cache.get(key).await.map(|snapshot| snapshot.payload))
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.cache
            .insert(key.to_string(), Snapshot { payload: value, ttl })
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}

/// Cache-aside helper that serializes snapshots as JSON.
#[derive(Clone)]
pub struct ReadCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl std::fmt::Debug for ReadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadCache").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl ReadCache {
    /// Wraps a backend with the given snapshot TTL.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    /// A cache that always misses.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(
            Arc::new(NoopCacheBackend),
            Duration::from_secs(DEFAULT_TTL_SECS),
        )
    }

    /// Key of a wallet snapshot.
    #[must_use]
    pub fn wallet_key(user_id: UserId) -> String {
        format!("wallet:{user_id}")
    }

    /// Key of a transaction list snapshot.
    #[must_use]
    pub fn transactions_key(user_id: UserId) -> String {
        format!("transactions:{user_id}")
    }

    /// Cached wallet of a user, if any.
    pub async fn wallet(&self, user_id: UserId) -> Option<Wallet> {
        self.read(&Self::wallet_key(user_id)).await
    }

    /// Stores a wallet snapshot.
    pub async fn put_wallet(&self, wallet: &Wallet) {
        self.write(&Self::wallet_key(wallet.user_id), wallet).await;
    }

    /// Cached transaction list of a user, if any.
    pub async fn transactions(&self, user_id: UserId) -> Option<Vec<LedgerEntry>> {
        self.read(&Self::transactions_key(user_id)).await
    }

    /// Stores a transaction list snapshot.
    pub async fn put_transactions(&self, user_id: UserId, entries: &[LedgerEntry]) {
        self.write(&Self::transactions_key(user_id), entries).await;
    }

    /// Drops every snapshot of a user.
    pub async fn invalidate_user(&self, user_id: UserId) {
        for key in [Self::wallet_key(user_id), Self::transactions_key(user_id)] {
            if let Err(e) = self.backend.delete(&key).await {
                warn!(error = %e, key = %key, "Failed to invalidate cache entry");
            }
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Cache read failed, falling back to store");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = match serde_json::to_string(value) {
            Ok(payload) => self.backend.set_ex(key, payload, self.ttl).await,
            Err(e) => Err(CacheError::from(e)),
        };
        if let Err(e) = result {
            warn!(error = %e, key = %key, "Cache write failed");
        }
    }
}
