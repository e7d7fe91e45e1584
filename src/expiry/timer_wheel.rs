//! Sparse timing wheel keyed by absolute deadline tick.
//!
//! ## Layout
//!
//! A ring of `max_ttl` buckets indexed by `tick % ring` only works when every
//! entry shares one TTL.  Entries here carry independent TTLs and hooks may
//! push a deadline arbitrarily far out, so the wheel is a sparse map from the
//! absolute deadline to the slot of nodes due at that tick:
//!
//! ```text
//!   slots: { 5 => [n3, n0], 9 => [n1], 12 => [n4, n2] }
//! ```
//!
//! Each slot is a doubly linked list threaded through the nodes' own
//! [`Link`](super::Link) fields, with nodes addressed by arena handle.  That
//! gives O(1) `push` (prepend), `pop` (head) and `unlink` (arbitrary member),
//! which is what overwrite relocation and explicit deletes need.
//!
//! Slots are created on the first push and dropped as soon as they become
//! empty, whether by draining or by unlinking their last member.

use ahash::AHashMap;

use super::{Linked, Tick};
use crate::store::arena::{Arena, NodeId};

/// Nodes sharing one absolute deadline.  Order within a slot is irrelevant.
#[derive(Debug, Clone, Copy)]
pub struct Slot {
    head: Option<NodeId>,
    len: usize,
}

impl Slot {
    fn empty() -> Self {
        Slot { head: None, len: 0 }
    }

    #[inline]
    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[inline]
fn linked_mut<T: Linked>(arena: &mut Arena<T>, id: NodeId) -> &mut T {
    arena
        .get_mut(id)
        .unwrap_or_else(|| panic!("timing wheel references freed node {}", id.index()))
}

/// Deadline-indexed slot table.
#[derive(Debug, Default)]
pub struct SlotTable {
    slots: AHashMap<Tick, Slot>,
}

impl SlotTable {
    pub fn new() -> Self {
        SlotTable {
            slots: AHashMap::new(),
        }
    }

    /// Returns the slot filed for `tick`, never creating one.
    #[inline]
    pub fn get(&self, tick: Tick) -> Option<&Slot> {
        self.slots.get(&tick)
    }

    /// Returns the slot filed for `tick`, creating an empty one if absent.
    #[inline]
    fn get_or_create(&mut self, tick: Tick) -> &mut Slot {
        self.slots.entry(tick).or_insert_with(Slot::empty)
    }

    /// Files `id` at the head of the slot for `tick`.
    ///
    /// The node must not currently be filed anywhere.
    pub fn push<T: Linked>(&mut self, arena: &mut Arena<T>, id: NodeId, tick: Tick) {
        let slot = self.get_or_create(tick);
        let old_head = slot.head.replace(id);
        slot.len += 1;

        if let Some(old) = old_head {
            linked_mut(arena, old).link_mut().prev = Some(id);
        }
        let link = linked_mut(arena, id).link_mut();
        link.deadline = tick;
        link.prev = None;
        link.next = old_head;
    }

    /// Removes `id` from whichever slot it is filed under.
    ///
    /// The slot is discarded if this leaves it empty.
    pub fn unlink<T: Linked>(&mut self, arena: &mut Arena<T>, id: NodeId) {
        let link = *linked_mut(arena, id).link();

        if let Some(next) = link.next {
            linked_mut(arena, next).link_mut().prev = link.prev;
        }
        if let Some(prev) = link.prev {
            linked_mut(arena, prev).link_mut().next = link.next;
        }

        let emptied = match self.slots.get_mut(&link.deadline) {
            Some(slot) => {
                if link.prev.is_none() {
                    slot.head = link.next;
                }
                slot.len -= 1;
                slot.len == 0
            }
            None => panic!(
                "node {} claims deadline {} but no such slot exists",
                id.index(),
                link.deadline
            ),
        };
        if emptied {
            self.slots.remove(&link.deadline);
        }

        let link = linked_mut(arena, id).link_mut();
        link.prev = None;
        link.next = None;
    }

    /// Moves `id` from its current slot to the slot for `tick`.
    pub fn relocate<T: Linked>(&mut self, arena: &mut Arena<T>, id: NodeId, tick: Tick) {
        self.unlink(arena, id);
        self.push(arena, id, tick);
    }

    /// Detaches and returns the head of the slot for `tick`, or `None` once
    /// the slot is empty (at which point it no longer exists).
    pub fn pop<T: Linked>(&mut self, arena: &mut Arena<T>, tick: Tick) -> Option<NodeId> {
        let head = self.slots.get(&tick)?.head?;
        self.unlink(arena, head);
        Some(head)
    }

    /// Collects the members of the slot for `tick` by walking its chain.
    pub fn members<T: Linked>(&self, arena: &Arena<T>, tick: Tick) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.get(tick).and_then(Slot::head);
        while let Some(id) = cursor {
            out.push(id);
            cursor = arena.get(id).and_then(|n| n.link().next);
        }
        out
    }

    /// Iterates over `(deadline, slot)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Tick, &Slot)> {
        self.slots.iter().map(|(tick, slot)| (*tick, slot))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
