pub mod timer_wheel;

use crate::store::arena::NodeId;

/// The cache's unit of logical time.
///
/// Ticks start at 0 and only move forward when the caller invokes
/// [`Cache::elapse`](crate::Cache::elapse).
pub type Tick = u64;

/// Wheel-linkage embedded in every scheduled node.
///
/// `deadline` is the absolute tick of the slot the node is currently filed
/// under; `prev`/`next` chain the node to its slot siblings.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub(crate) deadline: Tick,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
}

impl Link {
    /// Absolute tick this node is filed under.
    #[inline]
    pub fn deadline(&self) -> Tick {
        self.deadline
    }
}

/// Anything that can be filed into a [`SlotTable`](timer_wheel::SlotTable).
pub trait Linked {
    fn link(&self) -> &Link;
    fn link_mut(&mut self) -> &mut Link;
}
