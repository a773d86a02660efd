//! Node Adapter
//!
//! The engine never touches concrete platform nodes itself. It tells a
//! [`NodeAdapter`] what to create, attach, patch and remove, and when a
//! node's cached lookups may be dropped.
//!
//! Text children are created as nodes with tag [`TEXT_TAG`] and their content
//! in the [`TEXT_ATTR`] attribute.

mod memory;

pub use memory::MemoryAdapter;

use crate::element::Props;

/// Tag used for text nodes.
pub const TEXT_TAG: &str = "#text";

/// Attribute holding a text node's content.
pub const TEXT_ATTR: &str = "text";

/// Opaque handle to a concrete node owned by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(u64);

impl NodeHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Platform operations the engine delegates.
pub trait NodeAdapter {
    /// Create a detached node.
    fn create_node(&mut self, tag: &str, attrs: &Props) -> NodeHandle;

    /// Append `handle` to `parent`.
    fn mount_node(&mut self, handle: NodeHandle, parent: NodeHandle);

    /// Detach `handle` (and its subtree) from its parent.
    fn unmount_node(&mut self, handle: NodeHandle);

    /// Apply the attribute difference between `old` and `new`.
    fn patch_node(&mut self, handle: NodeHandle, old: &Props, new: &Props);

    /// Drop any lookup caches kept for `handle`. Called once per node, after
    /// every lifecycle hook that could still query it has returned.
    fn purge_cache(&mut self, handle: NodeHandle);

    /// Place `handle` at `index` among `parent`'s children. Moving a node to
    /// the position it already occupies must be a no-op.
    fn move_node(&mut self, handle: NodeHandle, parent: NodeHandle, index: usize);

    /// Put the detached node `new` where `old` is and detach `old`.
    fn replace_node(&mut self, old: NodeHandle, new: NodeHandle);
}
