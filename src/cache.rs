//! Compute-once memo of per-call-target resolutions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::ConfigError;
use crate::target::{CallTarget, TargetId};

type Entry<T> = Result<Arc<T>, ConfigError>;

/// Thread-safe cache of resolutions keyed by [`TargetId`].
///
/// Lookups of an existing entry only take a shared read lock. A miss takes
/// the resolve lock, checks again and runs the resolver, so each call target
/// is resolved at most once no matter how many threads race on first use.
///
/// A failed resolution is stored as a broken entry and the same
/// [`ConfigError`] is returned on every later lookup without resolving again.
/// Entries are never evicted.
///
/// # Examples
///
/// ```
/// use paging_core::{CallTarget, ParamType, ResolutionCache};
///
/// let cache: ResolutionCache<usize> = ResolutionCache::new();
/// let target = CallTarget::builder("svc::m").param(ParamType::Int).build();
///
/// let first = cache.get_or_resolve(&target, |t| Ok(t.param_count())).unwrap();
/// let second = cache.get_or_resolve(&target, |_| unreachable!()).unwrap();
///
/// assert_eq!(*first, 1);
/// assert_eq!(*second, 1);
/// assert_eq!(cache.stats().resolutions, 1);
/// ```
#[derive(Debug)]
pub struct ResolutionCache<T> {
    entries: RwLock<HashMap<TargetId, Entry<T>>>,
    resolve_lock: Mutex<()>,
    hits: AtomicUsize,
    resolutions: AtomicUsize,
    failures: AtomicUsize,
}

/// Counters describing cache activity.
///
/// Counters are best-effort; they are not used for correctness.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    /// Lookups answered from an existing entry
    pub hits: usize,
    /// Resolver runs
    pub resolutions: usize,
    /// Resolver runs that failed
    pub failures: usize,
    /// Number of cached entries, broken ones included
    pub size: usize,
}

impl<T> ResolutionCache<T> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            resolve_lock: Mutex::new(()),
            hits: AtomicUsize::new(0),
            resolutions: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Returns the cached resolution for `target`, running `resolve` on first use.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error, now and on every later lookup.
    pub fn get_or_resolve<F>(
        &self,
        target: &CallTarget,
        resolve: F,
    ) -> Result<Arc<T>, ConfigError>
    where
        F: FnOnce(&CallTarget) -> Result<T, ConfigError>,
    {
        if let Some(entry) = self.lookup(target.id()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return entry;
        }

        let _resolving = self.resolve_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = self.lookup(target.id()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return entry;
        }

        self.resolutions.fetch_add(1, Ordering::Relaxed);
        let entry = resolve(target).map(Arc::new);
        if entry.is_err() {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(target.id().clone(), entry.clone());
        entry
    }

    /// Returns the entry for `id` without resolving.
    pub fn get(&self, id: &TargetId) -> Option<Result<Arc<T>, ConfigError>> {
        self.lookup(id)
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns activity counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            resolutions: self.resolutions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            size: self.len(),
        }
    }

    fn lookup(&self, id: &TargetId) -> Option<Entry<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

impl<T> Default for ResolutionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
