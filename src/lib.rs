//! An in-process key-value cache whose entries expire after a number of
//! logical ticks.
//!
//! The cache owns no clock: the caller advances time explicitly with
//! [`Cache::elapse`], which makes expiry deterministic and easy to test.
//! Expiry hooks registered with [`Cache::set_hook`] may postpone an eviction
//! by granting extra ticks.

mod builder;
mod cache;
mod error;
mod expiry;
mod metrics;
mod store;
pub mod hook;

pub use builder::{CacheBuilder, Config, DEFAULT_TTL};
pub use cache::Cache;
pub use error::{Error, Result};
pub use expiry::Tick;
pub use hook::{ExpiryHook, FnHook, HookId};
pub use metrics::stats::Metrics;
