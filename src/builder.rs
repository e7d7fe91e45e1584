use std::hash::Hash;
use std::marker::PhantomData;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::expiry::Tick;

/// TTL applied by [`Cache::set`] when none is given.
pub const DEFAULT_TTL: Tick = 300;

/// Cache configuration.
///
/// | Field           | Default | Effect                                               |
/// |-----------------|---------|------------------------------------------------------|
/// | `default_ttl`   | `300`   | Ticks an entry lives when `set` is given no TTL.     |
/// | `no_overwrite`  | `false` | `set` on a present key returns `false`, keeps value. |
/// | `extend_on_get` | `false` | `get` resets the entry's last-touched tick.          |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub default_ttl: Tick,
    pub no_overwrite: bool,
    pub extend_on_get: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_ttl: DEFAULT_TTL,
            no_overwrite: false,
            extend_on_get: false,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl == 0 {
            return Err(Error::ZeroTtl);
        }
        Ok(())
    }
}

/// Builder for configuring and constructing a [`Cache`].
///
/// # Example
/// ```
/// use tickcache::CacheBuilder;
///
/// let cache: tickcache::Cache<String, String> = CacheBuilder::new()
///     .default_ttl(60)
///     .extend_on_get(true)
///     .build();
/// assert_eq!(cache.config().default_ttl, 60);
/// ```
pub struct CacheBuilder<K, V> {
    config: Config,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Default for CacheBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CacheBuilder<K, V> {
    pub fn new() -> Self {
        CacheBuilder {
            config: Config::default(),
            _marker: PhantomData,
        }
    }

    /// Ticks an entry lives when [`Cache::set`] is used (default: 300).
    pub fn default_ttl(mut self, ttl: Tick) -> Self {
        assert!(ttl > 0, "default_ttl must be at least one tick");
        self.config.default_ttl = ttl;
        self
    }

    /// Refuse to overwrite present keys (default: `false`).
    pub fn no_overwrite(mut self, enabled: bool) -> Self {
        self.config.no_overwrite = enabled;
        self
    }

    /// Reset an entry's age whenever it is read (default: `false`).
    pub fn extend_on_get(mut self, enabled: bool) -> Self {
        self.config.extend_on_get = enabled;
        self
    }

    /// Replace the whole configuration at once.  Unlike the individual
    /// setters this does not validate; [`try_build`](Self::try_build) does.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }
}

impl<K, V> CacheBuilder<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn try_build(self) -> Result<Cache<K, V>> {
        Cache::with_config(self.config)
    }

    /// Builds the cache.
    ///
    /// # Panics
    /// If a configuration passed through [`config`](Self::config) is invalid.
    pub fn build(self) -> Cache<K, V> {
        match self.try_build() {
            Ok(cache) => cache,
            Err(e) => panic!("invalid cache configuration: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.default_ttl, 300);
        assert!(!c.no_overwrite);
        assert!(!c.extend_on_get);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn zero_ttl_rejected() {
        let config = Config {
            default_ttl: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(Error::ZeroTtl));
        let built = CacheBuilder::<u8, u8>::new().config(config).try_build();
        assert!(matches!(built, Err(Error::ZeroTtl)));
    }

    #[test]
    #[should_panic(expected = "default_ttl")]
    fn zero_ttl_setter_panics() {
        let _ = CacheBuilder::<u8, u8>::new().default_ttl(0);
    }

    #[test]
    fn setters_chain() {
        let cache: Cache<u8, u8> = CacheBuilder::new()
            .default_ttl(7)
            .no_overwrite(true)
            .extend_on_get(true)
            .build();
        assert_eq!(
            cache.config(),
            Config {
                default_ttl: 7,
                no_overwrite: true,
                extend_on_get: true,
            }
        );
    }
}
