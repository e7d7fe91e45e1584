//! Expiry hooks: callbacks consulted when an entry's TTL runs out.
//!
//! A hook sees the key and value of an entry that is about to be evicted and
//! returns how many more ticks the entry should live.  `0` lets the eviction
//! go ahead.  When several hooks are registered they all run and the largest
//! grant wins, so the order in which they run does not matter.
//!
//! # Example
//! ```
//! use tickcache::Cache;
//!
//! let cache: Cache<&str, u32> = Cache::builder().default_ttl(2).build();
//!
//! // Keep entries holding a non-zero value around for one more tick.
//! let id = cache.set_hook(|_key, value| if *value > 0 { 1 } else { 0 });
//!
//! cache.set("busy", 1);
//! cache.elapse(2);
//! assert!(cache.get(&"busy").is_some());
//! assert!(cache.del_hook(id));
//! cache.elapse(1);
//! assert!(cache.get(&"busy").is_none());
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::{debug, error};

use crate::expiry::Tick;

// ---------------------------------------------------------------------------
// HookId
// ---------------------------------------------------------------------------

/// Handle returned by [`Cache::set_hook`](crate::Cache::set_hook), used to
/// remove the hook again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ExpiryHook trait
// ---------------------------------------------------------------------------

/// A callback invoked when an entry's TTL has elapsed.
///
/// Returns the number of extra ticks to grant; `0` allows the eviction.
/// A grant is consumed when it runs out: the hook is asked again at the end
/// of it.
///
/// **Do not call any cache method from inside a hook.**  Hooks run on the
/// thread executing [`Cache::elapse`](crate::Cache::elapse) while it holds
/// the cache's table lock, and re-entering the cache would deadlock.  The
/// signature deliberately carries no cache handle.
///
/// A hook that panics is treated as granting 0 ticks.
pub trait ExpiryHook<K, V>: Send + Sync + 'static {
    fn on_expire(&self, key: &K, value: &V) -> Tick;
}

/// An [`ExpiryHook`] backed by a closure.
///
/// Created via [`Cache::set_hook`](crate::Cache::set_hook).
pub struct FnHook<F>(pub F);

impl<K, V, F> ExpiryHook<K, V> for FnHook<F>
where
    F: Fn(&K, &V) -> Tick + Send + Sync + 'static,
{
    #[inline]
    fn on_expire(&self, key: &K, value: &V) -> Tick {
        (self.0)(key, value)
    }
}

// ---------------------------------------------------------------------------
// HookRegistry
// ---------------------------------------------------------------------------

/// The set of registered hooks, guarded by its own lock.
///
/// Firing takes the lock shared; registration and removal take it
/// exclusively.  The registry never touches the cache's table lock.
pub(crate) struct HookRegistry<K, V> {
    hooks: RwLock<AHashMap<HookId, Box<dyn ExpiryHook<K, V>>>>,
    next_id: AtomicU64,
}

impl<K: 'static, V: 'static> HookRegistry<K, V> {
    pub(crate) fn new() -> Self {
        HookRegistry {
            hooks: RwLock::new(AHashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub(crate) fn register(&self, hook: Box<dyn ExpiryHook<K, V>>) -> HookId {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.hooks.write().insert(id, hook);
        debug!(%id, "registered expiry hook");
        id
    }

    pub(crate) fn unregister(&self, id: HookId) -> bool {
        let removed = self.hooks.write().remove(&id).is_some();
        if removed {
            debug!(%id, "removed expiry hook");
        }
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.read().len()
    }

    /// Runs every hook against one expired entry and returns the largest
    /// extension requested.
    pub(crate) fn fire(&self, key: &K, value: &V) -> Tick {
        let hooks = self.hooks.read();
        let mut max_extend: Tick = 0;
        for (id, hook) in hooks.iter() {
            let granted =
                panic::catch_unwind(AssertUnwindSafe(|| hook.on_expire(key, value)))
                    .unwrap_or_else(|_| {
                        error!(%id, "expiry hook panicked; treating as no extension");
                        0
                    });
            max_extend = max_extend.max(granted);
        }
        max_extend
    }
}

impl<K: 'static, V: 'static> Default for HookRegistry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> HookRegistry<u32, u32> {
        HookRegistry::new()
    }

    fn grant(n: Tick) -> Box<dyn ExpiryHook<u32, u32>> {
        Box::new(FnHook(move |_: &u32, _: &u32| n))
    }

    #[test]
    fn no_hooks_means_no_extension() {
        assert_eq!(registry().fire(&1, &1), 0);
    }

    #[test]
    fn max_of_all_hooks_wins() {
        let r = registry();
        for n in [1, 5, 3] {
            r.register(grant(n));
        }
        assert_eq!(r.fire(&1, &1), 5);
    }

    #[test]
    fn ids_are_unique_and_removable() {
        let r = registry();
        let a = r.register(grant(1));
        let b = r.register(grant(2));
        assert_ne!(a, b);
        assert!(r.unregister(b));
        assert!(!r.unregister(b));
        assert_eq!(r.len(), 1);
        assert_eq!(r.fire(&0, &0), 1);
    }

    #[test]
    fn panicking_hook_grants_nothing() {
        let r = registry();
        r.register(Box::new(FnHook(|_: &u32, _: &u32| -> Tick { panic!("boom") })));
        assert_eq!(r.fire(&0, &0), 0);

        r.register(grant(4));
        assert_eq!(r.fire(&0, &0), 4, "other hooks still run");
    }

    #[test]
    fn hooks_see_key_and_value() {
        let r = registry();
        r.register(Box::new(FnHook(|k: &u32, v: &u32| u64::from(k + v))));
        assert_eq!(r.fire(&2, &3), 5);
    }
}
