//! Execution-scoped memoization using moka
//!
//! Two key namespaces share one [`MemoCache`]:
//!
//! - **Owner keys** (`{identity}|attributehash:{hash}`) address values that are
//!   pure functions of the item's identity and attribute content, such as the
//!   attribute set of a scenario. They stay valid across refresh passes.
//! - **Execution keys** (`{owner}|executionKey:{token}`) address values that
//!   must not outlive one refresh pass, such as invalid-field counts. Each
//!   refresh mints its own token and passes it down; callers outside a
//!   refresh use the cache's token, regenerated by
//!   [`MemoCache::reset_execution_key`]. A new token never sees an earlier
//!   token's entries.
//!
//! Nothing is evicted explicitly; capacity bounds memory and the random token
//! retires execution entries.

use crate::error::{QaError, QaResult};
use indexmap::IndexSet;
use moka::sync::Cache;
use parking_lot::Mutex;
use qa_model::Item;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Content-addressed key for an item state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerKey(String);

impl OwnerKey {
    /// Derive key from item identity and attribute content
    ///
    /// # Errors
    /// Returns error if attribute values cannot be hashed
    pub fn for_item(item: &Item) -> QaResult<Self> {
        let hash = item.content_hash()?;
        Ok(Self(format!("{}|attributehash:{hash}", item.identity_key())))
    }

    /// Key text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn scoped(&self, suffix: &str) -> String {
        format!("{}|{suffix}", self.0)
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owner key bound to one refresh pass
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionKey(String);

impl ExecutionKey {
    /// Bind `owner` to the epoch identified by `token`
    #[must_use]
    pub fn new(owner: &OwnerKey, token: Uuid) -> Self {
        Self(format!("{owner}|executionKey:{}", token.simple()))
    }

    /// Key text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn scoped(&self, suffix: &str) -> String {
        format!("{}|{suffix}", self.0)
    }
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries in the owner namespace
    pub owner_entries: u64,
    /// Entries in the execution namespace
    pub execution_entries: u64,
}

/// Memoization cache with owner and execution namespaces
///
/// Cloning shares the underlying namespaces *and* the execution token. Use
/// [`MemoCache::fork`] to share cached values between engines while keeping
/// an independent execution token per engine.
#[derive(Clone)]
pub struct MemoCache {
    owner: Cache<String, Arc<IndexSet<String>>>,
    execution: Cache<String, usize>,
    token: Arc<Mutex<Option<Uuid>>>,
}

impl fmt::Debug for MemoCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCache")
            .field("stats", &self.stats())
            .field("execution_token", &*self.token.lock())
            .finish()
    }
}

impl MemoCache {
    /// Create cache; `max_capacity` applies to each namespace
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            owner: Cache::new(max_capacity),
            execution: Cache::new(max_capacity),
            token: Arc::new(Mutex::new(None)),
        }
    }

    /// Share cached values but start without an execution token
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            execution: self.execution.clone(),
            token: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a new execution epoch; returns the fresh token
    pub fn reset_execution_key(&self) -> Uuid {
        let token = Uuid::new_v4();
        *self.token.lock() = Some(token);
        tracing::debug!(token = %token.simple(), "execution key reset");
        token
    }

    /// Current execution token, `None` before the first reset
    #[inline]
    #[must_use]
    pub fn token(&self) -> Option<Uuid> {
        *self.token.lock()
    }

    /// Execution key for `owner` in the current epoch
    ///
    /// # Errors
    /// `QaError::ExecutionKeyNotInitialized` before the first reset
    pub fn execution_key(&self, owner: &OwnerKey) -> QaResult<ExecutionKey> {
        let token = self.token().ok_or(QaError::ExecutionKeyNotInitialized)?;
        Ok(ExecutionKey::new(owner, token))
    }

    /// Get or compute an attribute set in the owner namespace
    ///
    /// # Errors
    /// Propagates errors from `compute`; failures are not cached
    pub fn attributes_or_try_insert_with<F>(
        &self,
        owner: &OwnerKey,
        scope: &str,
        compute: F,
    ) -> QaResult<Arc<IndexSet<String>>>
    where
        F: FnOnce() -> QaResult<IndexSet<String>>,
    {
        let key = owner.scoped(scope);
        if let Some(cached) = self.owner.get(&key) {
            tracing::debug!(key = %key, "owner cache hit");
            return Ok(cached);
        }

        let value = Arc::new(compute()?);
        self.owner.insert(key, Arc::clone(&value));
        Ok(value)
    }

    /// Get or compute a count in the execution namespace
    ///
    /// # Errors
    /// Propagates errors from `compute`; failures are not cached
    pub fn count_or_try_insert_with<F>(
        &self,
        execution: &ExecutionKey,
        scope: &str,
        compute: F,
    ) -> QaResult<usize>
    where
        F: FnOnce() -> QaResult<usize>,
    {
        let key = execution.scoped(scope);
        if let Some(cached) = self.execution.get(&key) {
            tracing::debug!(key = %key, "execution cache hit");
            return Ok(cached);
        }

        let value = compute()?;
        self.execution.insert(key, value);
        Ok(value)
    }

    /// Approximate occupancy
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.owner.run_pending_tasks();
        self.execution.run_pending_tasks();
        CacheStats {
            owner_entries: self.owner.entry_count(),
            execution_entries: self.execution.entry_count(),
        }
    }
}

impl Default for MemoCache {
    /// Create cache with default capacity (10,000 entries per namespace)
    fn default() -> Self {
        Self::new(10_000)
    }
}
