//! A wall-clock driver for the tick cache.
//!
//! The cache never looks at the time itself; this demo converts elapsed
//! milliseconds into ticks and calls `elapse` with the difference, the way a
//! service would from a periodic timer.
//!
//! Run with:
//!     cargo run --example ticker

use std::thread;
use std::time::{Duration, Instant};

use ahash::AHashSet;
use parking_lot::Mutex;
use tickcache::{Cache, CacheBuilder, Tick};
use tracing::info;

/// Wall-clock length of one tick.
const TICK: Duration = Duration::from_millis(200);

#[derive(Debug)]
struct Visitor {
    addr: String,
    hits: u32,
}

/// Converts wall-clock progress into `elapse` calls.
struct Ticker {
    start: Instant,
    last: Tick,
}

impl Ticker {
    fn new() -> Self {
        Ticker {
            start: Instant::now(),
            last: 0,
        }
    }

    fn drive<K, V>(&mut self, cache: &Cache<K, V>)
    where
        K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let tick = (self.start.elapsed().as_millis() / TICK.as_millis()) as Tick;
        if tick > self.last {
            cache.elapse(tick - self.last);
            self.last = tick;
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let cache: Cache<String, Visitor> = CacheBuilder::new().default_ttl(4).build();

    // Frequent visitors get a one-off bonus of two ticks.
    let rewarded: Mutex<AHashSet<String>> = Mutex::new(AHashSet::new());
    cache.set_hook(move |key, visitor| {
        if visitor.hits >= 3 && rewarded.lock().insert(key.clone()) {
            info!(%key, hits = visitor.hits, "keeping frequent visitor");
            2
        } else {
            info!(%key, addr = %visitor.addr, "expired");
            0
        }
    });

    let mut ticker = Ticker::new();
    for (i, addr) in ["10.0.0.1", "10.0.0.2", "10.0.0.1", "10.0.0.1"].iter().enumerate() {
        ticker.drive(&cache);
        let key = addr.to_string();
        let hits = cache.get(&key).map(|v| v.hits).unwrap_or(0) + 1;
        cache.set(
            key,
            Visitor {
                addr: addr.to_string(),
                hits,
            },
        );
        info!(request = i, %addr, hits, tick = cache.now(), "visit");
        thread::sleep(TICK / 2);
    }

    while !cache.is_empty() {
        thread::sleep(TICK);
        ticker.drive(&cache);
    }

    let stats = cache.stats();
    info!(
        evictions = stats.evictions,
        extensions = stats.extensions,
        tick = cache.now(),
        "all entries expired"
    );
}
