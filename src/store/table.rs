//! The clock, bucket table and timing wheel, mutated together as one unit.
//!
//! [`Table`] is single-threaded; [`Cache`](crate::Cache) wraps it in a lock.
//! Every method leaves the table satisfying the placement invariant: each
//! live node is indexed once and filed in exactly one slot, at a deadline
//! strictly after the current tick.

use std::hash::Hash;
use std::sync::Arc;

use super::bucket::BucketTable;
use crate::error::{Error, Result};
use crate::expiry::timer_wheel::SlotTable;
use crate::expiry::{Linked, Tick};

/// What happened to the nodes of one drained slot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// Nodes whose real deadline had moved later after a touch.
    pub rescheduled: u64,
    /// Nodes kept alive by a hook extension.
    pub extended: u64,
    /// Nodes removed for good.
    pub evicted: u64,
}

impl StepOutcome {
    pub fn merge(&mut self, other: StepOutcome) {
        self.rescheduled += other.rescheduled;
        self.extended += other.extended;
        self.evicted += other.evicted;
    }
}

/// Result of a `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Inserted,
    Replaced,
    Rejected,
}

pub struct Table<K, V> {
    now: Tick,
    buckets: BucketTable<K, V>,
    wheel: SlotTable,
}

impl<K: Hash + Eq + Clone, V> Table<K, V> {
    pub fn new() -> Self {
        Table {
            now: 0,
            buckets: BucketTable::new(),
            wheel: SlotTable::new(),
        }
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Inserts or overwrites `key`.  `ttl` must be at least 1.
    ///
    /// Overwrites relocate the node to its new deadline immediately, so no
    /// node is ever left filed under a stale deadline.
    pub fn set(&mut self, key: K, value: V, ttl: Tick, no_overwrite: bool) -> SetOutcome {
        debug_assert!(ttl > 0);
        let deadline = self.now.saturating_add(ttl);

        match self.buckets.lookup(&key) {
            Some(_) if no_overwrite => SetOutcome::Rejected,
            Some(id) => {
                let now = self.now;
                let node = self.buckets.node_mut(id);
                node.value = Arc::new(value);
                node.last = now;
                node.ttl = ttl;
                self.wheel.relocate(self.buckets.arena_mut(), id, deadline);
                SetOutcome::Replaced
            }
            None => {
                let id = self.buckets.insert(key, value, self.now, ttl);
                self.wheel.push(self.buckets.arena_mut(), id, deadline);
                SetOutcome::Inserted
            }
        }
    }

    /// Read-only lookup.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        let id = self.buckets.lookup(key)?;
        Some(Arc::clone(&self.buckets.node(id).value))
    }

    /// Lookup that resets the node's last-touched tick.
    ///
    /// The node stays filed where it is; the elapse loop notices the later
    /// real deadline when the old slot comes due.
    pub fn touch(&mut self, key: &K) -> Option<Arc<V>> {
        let id = self.buckets.lookup(key)?;
        let now = self.now;
        let node = self.buckets.node_mut(id);
        node.last = now;
        Some(Arc::clone(&node.value))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.buckets.lookup(key).is_some()
    }

    /// Removes `key` from both the index and the wheel.
    pub fn delete(&mut self, key: &K) -> bool {
        let Some(id) = self.buckets.lookup(key) else {
            return false;
        };
        self.wheel.unlink(self.buckets.arena_mut(), id);
        self.buckets.remove(id);
        true
    }

    /// Advances the clock by one tick and resolves every node filed for it.
    ///
    /// `fire` is consulted for nodes whose TTL has genuinely run out and
    /// returns the number of extra ticks granted (0 to evict).
    pub fn step<F>(&mut self, mut fire: F) -> StepOutcome
    where
        F: FnMut(&K, &V) -> Tick,
    {
        self.now += 1;
        let now = self.now;
        let mut outcome = StepOutcome::default();

        // Every reschedule below targets a tick > now, so popping until the
        // slot is gone visits each originally-filed node exactly once.
        while let Some(id) = self.wheel.pop(self.buckets.arena_mut(), now) {
            let node = self.buckets.node(id);
            assert!(
                now > node.last,
                "node drained at tick {now} was last touched at tick {}",
                node.last
            );
            let diff = now - node.last;

            if diff < node.ttl {
                let deadline = node.expires_at();
                debug_assert_eq!(deadline, now + (node.ttl - diff));
                self.wheel.push(self.buckets.arena_mut(), id, deadline);
                outcome.rescheduled += 1;
                continue;
            }

            let extend = fire(&node.key, &*node.value);
            if extend > 0 {
                self.wheel
                    .push(self.buckets.arena_mut(), id, now.saturating_add(extend));
                outcome.extended += 1;
            } else {
                self.buckets.remove(id);
                outcome.evicted += 1;
            }
        }

        outcome
    }

    /// Moves the clock forward without draining anything.  Only valid while
    /// the table is empty, when no slot can be due.
    pub fn skip(&mut self, ticks: Tick) {
        debug_assert!(self.wheel.is_empty());
        self.now += ticks;
    }

    /// Drops every node.  The clock keeps its value.
    pub fn clear(&mut self) {
        self.wheel.clear();
        self.buckets.clear();
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Verifies that every node is indexed once and filed once, at a future
    /// deadline, with `last <= now`.
    pub fn check_invariants(&self) -> Result<()> {
        let arena = self.buckets.arena();
        if arena.len() != self.buckets.len() {
            return Err(Error::Invariant(format!(
                "arena holds {} nodes but index holds {}",
                arena.len(),
                self.buckets.len()
            )));
        }

        for (key, id) in self.buckets.index() {
            let node = arena
                .get(id)
                .ok_or_else(|| Error::Invariant(format!("index points at freed node {}", id.index())))?;
            if &node.key != key {
                return Err(Error::Invariant(format!(
                    "node {} is indexed under a different key",
                    id.index()
                )));
            }
            if node.last > self.now {
                return Err(Error::Invariant(format!(
                    "node {} last touched at {} after current tick {}",
                    id.index(),
                    node.last,
                    self.now
                )));
            }
        }

        let mut filed = 0usize;
        for (deadline, slot) in self.wheel.iter() {
            if deadline <= self.now {
                return Err(Error::Invariant(format!(
                    "slot {deadline} is not after current tick {}",
                    self.now
                )));
            }
            let members = self.wheel.members(arena, deadline);
            if members.len() != slot.len() || slot.is_empty() {
                return Err(Error::Invariant(format!(
                    "slot {deadline} records {} members but chains {}",
                    slot.len(),
                    members.len()
                )));
            }
            for id in members {
                let node = arena.get(id).ok_or_else(|| {
                    Error::Invariant(format!("slot {deadline} chains freed node {}", id.index()))
                })?;
                if node.link().deadline() != deadline {
                    return Err(Error::Invariant(format!(
                        "node {} filed in slot {deadline} but records {}",
                        id.index(),
                        node.link().deadline()
                    )));
                }
            }
            filed += slot.len();
        }

        if filed != arena.len() {
            return Err(Error::Invariant(format!(
                "{} nodes live but {filed} are filed in the wheel",
                arena.len()
            )));
        }
        Ok(())
    }
}

impl<K: Hash + Eq + Clone, V> Default for Table<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
