use thiserror::Error;

/// Errors reported by the cache.
///
/// Lookups that miss and overwrites rejected under `no_overwrite` are normal
/// outcomes and are reported through `Option`/`bool`, not through this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The configured default TTL was zero ticks.
    #[error("default ttl must be at least one tick")]
    ZeroTtl,
    /// An internal consistency check failed.
    #[error("cache invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
