use std::hash::Hash;
use std::sync::Arc;

use ahash::AHashMap;

use super::arena::{Arena, NodeId};
use crate::expiry::{Link, Linked, Tick};

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// The unit of storage: one key, its value, and its aging state.
///
/// The node's effective deadline is `last + ttl`.  The deadline it is
/// *filed* under in the wheel (`link.deadline`) may be earlier than that when
/// the node was touched after being scheduled; the elapse loop reconciles the
/// two when the filed slot comes due.
pub struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: Arc<V>,
    /// Tick of the last Set (or Get, under extend-on-access).
    pub(crate) last: Tick,
    /// Ticks of grace since `last`.
    pub(crate) ttl: Tick,
    link: Link,
}

impl<K, V> Node<K, V> {
    /// Tick at which the node's TTL runs out, ignoring hook extensions.
    #[inline]
    pub fn expires_at(&self) -> Tick {
        self.last.saturating_add(self.ttl)
    }
}

impl<K, V> Linked for Node<K, V> {
    #[inline]
    fn link(&self) -> &Link {
        &self.link
    }

    #[inline]
    fn link_mut(&mut self) -> &mut Link {
        &mut self.link
    }
}

// ---------------------------------------------------------------------------
// BucketTable
// ---------------------------------------------------------------------------

/// Hash index from key to node handle, plus the arena owning the nodes.
///
/// Every node in the arena has exactly one index entry and vice versa.
pub struct BucketTable<K, V> {
    index: AHashMap<K, NodeId>,
    nodes: Arena<Node<K, V>>,
}

impl<K: Hash + Eq + Clone, V> BucketTable<K, V> {
    pub fn new() -> Self {
        BucketTable {
            index: AHashMap::new(),
            nodes: Arena::new(),
        }
    }

    #[inline]
    pub fn lookup(&self, key: &K) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node<K, V> {
        self.nodes
            .get(id)
            .unwrap_or_else(|| panic!("bucket table references freed node {}", id.index()))
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        self.nodes
            .get_mut(id)
            .unwrap_or_else(|| panic!("bucket table references freed node {}", id.index()))
    }

    /// Creates a node for a key that is not yet present.
    ///
    /// The node starts unfiled; the caller must push it into the wheel.
    pub fn insert(&mut self, key: K, value: V, now: Tick, ttl: Tick) -> NodeId {
        debug_assert!(!self.index.contains_key(&key), "insert on present key");
        let id = self.nodes.insert(Node {
            key: key.clone(),
            value: Arc::new(value),
            last: now,
            ttl,
            link: Link::default(),
        });
        self.index.insert(key, id);
        id
    }

    /// Drops the node and its index entry.  The caller must already have
    /// unlinked it from the wheel.
    pub fn remove(&mut self, id: NodeId) -> Option<Node<K, V>> {
        let node = self.nodes.remove(id)?;
        self.index.remove(&node.key);
        Some(node)
    }

    /// Arena access for the wheel, which relinks nodes in place.
    #[inline]
    pub fn arena_mut(&mut self) -> &mut Arena<Node<K, V>> {
        &mut self.nodes
    }

    #[inline]
    pub fn arena(&self) -> &Arena<Node<K, V>> {
        &self.nodes
    }

    pub fn index(&self) -> impl Iterator<Item = (&K, NodeId)> {
        self.index.iter().map(|(k, id)| (k, *id))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
    }
}

impl<K: Hash + Eq + Clone, V> Default for BucketTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut table: BucketTable<&str, u32> = BucketTable::new();
        let id = table.insert("a", 1, 3, 4);
        assert_eq!(table.lookup(&"a"), Some(id));
        assert_eq!(*table.node(id).value, 1);
        assert_eq!(table.node(id).expires_at(), 7);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn remove_drops_index_entry() {
        let mut table: BucketTable<&str, u32> = BucketTable::new();
        let id = table.insert("a", 1, 0, 4);
        let node = table.remove(id).map(|n| n.key);
        assert_eq!(node, Some("a"));
        assert_eq!(table.lookup(&"a"), None);
        assert!(table.is_empty());
        assert!(table.remove(id).is_none());
    }

    #[test]
    fn expires_at_saturates() {
        let mut table: BucketTable<u8, u8> = BucketTable::new();
        let id = table.insert(1, 1, 10, Tick::MAX);
        assert_eq!(table.node(id).expires_at(), Tick::MAX);
    }
}
