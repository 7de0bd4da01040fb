//! Per-client resource cache
//!
//! Region and bucket lists rarely change, so clients keep them in a
//! [`ResourceCache`] and clear it from any call that changes membership.
//! The lock is never held across an await: two tasks missing the cache at
//! the same time both fetch and the last write wins.

use crate::error::Result;
use std::future::Future;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;

struct CacheEntry<T> {
    value: T,
    stored_at: Instant,
}

pub struct ResourceCache<T> {
    name: String,
    ttl: Option<Duration>,
    entry: RwLock<Option<CacheEntry<T>>>,
}

impl<T: Clone> ResourceCache<T> {
    /// Cache that keeps its value until invalidated
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl: None,
            entry: RwLock::new(None),
        }
    }

    /// Cache whose value also expires `ttl` after it was stored
    pub fn with_ttl(name: impl Into<String>, ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::new(name)
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<CacheEntry<T>>> {
        self.entry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<CacheEntry<T>>> {
        self.entry.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached value, if present and not expired
    pub fn get(&self) -> Option<T> {
        let guard = self.read();
        let entry = guard.as_ref()?;
        match self.ttl {
            Some(ttl) if entry.stored_at.elapsed() >= ttl => None,
            _ => Some(entry.value.clone()),
        }
    }

    pub fn set(&self, value: T) {
        *self.write() = Some(CacheEntry {
            value,
            stored_at: Instant::now(),
        });
    }

    pub fn invalidate(&self) {
        if self.write().take().is_some() {
            tracing::debug!("{} cache invalidated", self.name);
        }
    }

    /// Return the cached value or fetch and store a fresh one.
    ///
    /// Fetch errors are returned and leave the cache empty.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get() {
            return Ok(value);
        }
        tracing::debug!("{} cache miss, fetching", self.name);
        let value = fetch().await?;
        self.set(value.clone());
        Ok(value)
    }
}

impl<T> std::fmt::Debug for ResourceCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
