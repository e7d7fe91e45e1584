use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::builder::{CacheBuilder, Config};
use crate::error::Result;
use crate::expiry::Tick;
use crate::hook::{ExpiryHook, FnHook, HookId, HookRegistry};
use crate::metrics::stats::{Metrics, StatsCounter};
use crate::store::table::{SetOutcome, StepOutcome, Table};

// ---------------------------------------------------------------------------
// Cache interior
// ---------------------------------------------------------------------------

/// Shared interior of a [`Cache`].
///
/// Two lock domains: `table` guards the clock, the bucket table and the
/// timing wheel together; the hook registry has its own lock.  The table
/// lock is always taken first.
pub(crate) struct Inner<K, V> {
    pub(crate) table: RwLock<Table<K, V>>,
    pub(crate) hooks: HookRegistry<K, V>,
    pub(crate) config: Config,
    pub(crate) metrics: StatsCounter,
}

// ---------------------------------------------------------------------------
// Cache handle
// ---------------------------------------------------------------------------

/// A key-value cache whose entries expire after a number of logical ticks.
///
/// The cache has no clock of its own.  Time moves only when the caller
/// invokes [`elapse`](Self::elapse), typically from a ticker that maps
/// wall-clock seconds (or request arrivals) onto ticks.
///
/// Expiry is driven by a timing wheel indexed by absolute deadline, so an
/// `elapse` step only visits entries that are actually due.
///
/// # Example
/// ```
/// use tickcache::Cache;
///
/// let cache: Cache<String, u32> = Cache::builder().default_ttl(10).build();
/// cache.set("my_key".to_string(), 5);
///
/// cache.elapse(9);
/// assert_eq!(cache.get(&"my_key".to_string()).as_deref(), Some(&5));
///
/// cache.elapse(1);
/// assert_eq!(cache.get(&"my_key".to_string()), None);
/// ```
///
/// # Locking
/// [`elapse`](Self::elapse) holds the table lock exclusively for its whole
/// duration and runs expiry hooks under it.  Hooks must not call back into
/// the cache.
pub struct Cache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Cache {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates a cache with the default [`Config`].
    pub fn new() -> Self {
        Self::from_valid_config(Config::default())
    }

    /// Creates a cache with the given configuration.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: Config) -> Self {
        debug!(
            default_ttl = config.default_ttl,
            no_overwrite = config.no_overwrite,
            extend_on_get = config.extend_on_get,
            "creating cache"
        );
        Cache {
            inner: Arc::new(Inner {
                table: RwLock::new(Table::new()),
                hooks: HookRegistry::new(),
                config,
                metrics: StatsCounter::new(),
            }),
        }
    }

    /// Returns a [`CacheBuilder`] for constructing a new cache.
    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::new()
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> Config {
        self.inner.config
    }

    // -----------------------------------------------------------------------
    // Set / Get / Delete
    // -----------------------------------------------------------------------

    /// Stores `value` under `key` with the default TTL.
    ///
    /// See [`set_with_ttl`](Self::set_with_ttl).
    pub fn set(&self, key: K, value: V) -> bool {
        self.set_with_ttl(key, value, self.inner.config.default_ttl)
    }

    /// Stores `value` under `key`, expiring `ttl` ticks from now.
    ///
    /// Overwriting a present key replaces the value, restarts its age and
    /// adopts the new TTL.  With `no_overwrite` enabled the call is refused
    /// instead and returns `false`.  A `ttl` of 0 is treated as 1: every
    /// entry survives until at least the next tick.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Tick) -> bool {
        let ttl = ttl.max(1);
        let outcome = self
            .inner
            .table
            .write()
            .set(key, value, ttl, self.inner.config.no_overwrite);

        match outcome {
            SetOutcome::Rejected => {
                trace!("set rejected: key present and overwrite disabled");
                self.inner.metrics.record_rejected_set();
                false
            }
            SetOutcome::Inserted | SetOutcome::Replaced => true,
        }
    }

    /// Returns the value for `key`, if present.
    ///
    /// With `extend_on_get` enabled this also restarts the entry's age, so it
    /// takes the table lock exclusively; otherwise a shared lock is enough.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let found = if self.inner.config.extend_on_get {
            self.inner.table.write().touch(key)
        } else {
            self.inner.table.read().peek(key)
        };

        match found {
            Some(_) => self.inner.metrics.record_hit(),
            None => self.inner.metrics.record_miss(),
        }
        found
    }

    /// Returns `true` if `key` is present.  Never extends the entry.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.table.read().contains(key)
    }

    /// Removes `key`.  Returns `false` if it was not present.
    ///
    /// Hooks are not consulted for explicit deletes.
    pub fn delete(&self, key: &K) -> bool {
        self.inner.table.write().delete(key)
    }

    /// Removes every entry without consulting hooks.  The tick counter is
    /// left unchanged.
    pub fn clear(&self) {
        self.inner.table.write().clear();
    }

    // -----------------------------------------------------------------------
    // Elapse
    // -----------------------------------------------------------------------

    /// Advances the logical clock by `ticks`, one tick at a time.
    ///
    /// At each tick every entry filed for that tick is resolved before the
    /// next tick starts: entries touched since they were filed move to their
    /// later deadline, and entries whose TTL has run out are offered to the
    /// hooks, then either kept for the largest extension granted or evicted.
    ///
    /// # Panics
    /// If the clock would reach `Tick::MAX`.  Deadlines past the end of the
    /// tick space are saturated to `Tick::MAX`, which therefore never comes
    /// due.
    pub fn elapse(&self, ticks: Tick) {
        if ticks == 0 {
            return;
        }

        let hooks = &self.inner.hooks;
        let mut table = self.inner.table.write();
        let start = table.now();
        if start.checked_add(ticks).map_or(true, |end| end == Tick::MAX) {
            panic!("tick counter overflow: cannot elapse {ticks} ticks from tick {start}");
        }
        let mut total = StepOutcome::default();

        for done in 0..ticks {
            if table.is_empty() {
                // Nothing is filed, so the remaining steps cannot observe
                // anything.
                table.skip(ticks - done);
                break;
            }
            let step = table.step(|key, value| hooks.fire(key, value));
            if step != StepOutcome::default() {
                trace!(
                    tick = table.now(),
                    rescheduled = step.rescheduled,
                    extended = step.extended,
                    evicted = step.evicted,
                    "drained slot"
                );
            }
            total.merge(step);
        }

        let now = table.now();
        drop(table);

        self.inner.metrics.record_eviction(total.evicted);
        self.inner.metrics.record_extension(total.extended);
        debug!(
            ticks,
            now,
            evicted = total.evicted,
            extended = total.extended,
            "elapsed"
        );
    }

    /// The current tick.
    pub fn now(&self) -> Tick {
        self.inner.table.read().now()
    }

    // -----------------------------------------------------------------------
    // Hooks
    // -----------------------------------------------------------------------

    /// Registers an expiry hook closure and returns its id.
    ///
    /// The closure receives the key and value of an entry whose TTL has run
    /// out and returns how many more ticks to keep it (0 to evict).  It must
    /// not call back into the cache.
    pub fn set_hook<F>(&self, f: F) -> HookId
    where
        F: Fn(&K, &V) -> Tick + Send + Sync + 'static,
    {
        self.inner.hooks.register(Box::new(FnHook(f)))
    }

    /// Registers an expiry hook via the [`ExpiryHook`] trait.
    pub fn set_hook_impl<H: ExpiryHook<K, V>>(&self, hook: H) -> HookId {
        self.inner.hooks.register(Box::new(hook))
    }

    /// Removes a hook.  Returns `false` if `id` is not registered.
    pub fn del_hook(&self, id: HookId) -> bool {
        self.inner.hooks.unregister(id)
    }

    /// Number of registered hooks.
    pub fn hook_count(&self) -> usize {
        self.inner.hooks.len()
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Snapshot of the hit, miss, eviction and extension counters.
    pub fn stats(&self) -> Metrics {
        self.inner.metrics.snapshot()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.table.read().is_empty()
    }

    /// Walks the whole table and wheel verifying that every entry is indexed
    /// once and filed once at a future deadline.  O(n); meant for tests.
    pub fn check_invariants(&self) -> Result<()> {
        self.inner.table.read().check_invariants()
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
