//! Instance Records
//!
//! The mutable runtime state attached to one live occurrence of an element.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::adapter::NodeHandle;
use crate::component::{Component, ComponentType};
use crate::element::{Context, Element, Node, Props, State};
use crate::refs::RefRegistry;
use crate::scheduler::PendingUpdates;

/// Unique identifier for an instance.
///
/// Ids are allocated from a process-wide counter, so a parent always has a
/// smaller id than any child mounted after it. The scheduler relies on this
/// to process dirty instances parents-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Generate a new unique instance id.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountStatus {
    /// Not (or no longer) part of a live tree.
    Unmounted,
    /// Being created or re-rendered.
    Mounting,
    /// Committed and idle.
    Mounted,
    /// Teardown hooks are running.
    Unmounting,
}

impl MountStatus {
    /// Whether update requests may be queued against this status.
    pub fn accepts_updates(&self) -> bool {
        matches!(self, MountStatus::Mounting | MountStatus::Mounted)
    }
}

/// State for a user-defined component.
pub(crate) struct CompositeState {
    pub ty: ComponentType,
    /// Taken out while one of its hooks runs.
    pub component: Option<Box<dyn Component>>,
    pub props: Props,
    pub state: State,
    /// Masked context visible to the component.
    pub context: Context,
    pub rendered: Option<InstanceId>,
    pub refs: RefRegistry,
}

/// State for a concrete node.
pub(crate) struct HostState {
    pub tag: String,
    pub props: Props,
    pub node: NodeHandle,
    /// Children keyed by their flattened name, in render order.
    pub children: IndexMap<String, InstanceId>,
}

/// State for a text child.
pub(crate) struct TextState {
    pub text: String,
    pub node: NodeHandle,
}

pub(crate) enum InstanceKind {
    Composite(CompositeState),
    Host(HostState),
    Text(TextState),
}

/// One live instance.
pub(crate) struct InstanceRecord {
    pub id: InstanceId,
    /// The node this instance was last reconciled against.
    pub current: Node,
    /// Structural parent.
    pub parent: Option<InstanceId>,
    /// Instance whose render created `current`.
    pub owner: Option<InstanceId>,
    /// Parent-based unmasked context at the last reconciliation.
    pub parent_context: Rc<Context>,
    /// Node that this instance's concrete node is attached under.
    pub host_parent: Option<NodeHandle>,
    pub depth: usize,
    pub status: MountStatus,
    pub pending: PendingUpdates,
    pub kind: InstanceKind,
}

impl InstanceRecord {
    pub fn element(&self) -> Option<&Element> {
        self.current.as_element()
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            InstanceKind::Composite(c) => c.ty.name(),
            InstanceKind::Host(h) => &h.tag,
            InstanceKind::Text(_) => crate::adapter::TEXT_TAG,
        }
    }

    pub fn composite(&self) -> Option<&CompositeState> {
        match &self.kind {
            InstanceKind::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub fn composite_mut(&mut self) -> Option<&mut CompositeState> {
        match &mut self.kind {
            InstanceKind::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub fn host(&self) -> Option<&HostState> {
        match &self.kind {
            InstanceKind::Host(h) => Some(h),
            _ => None,
        }
    }

    pub fn host_mut(&mut self) -> Option<&mut HostState> {
        match &mut self.kind {
            InstanceKind::Host(h) => Some(h),
            _ => None,
        }
    }

    /// The concrete node owned directly by this instance.
    pub fn own_node(&self) -> Option<NodeHandle> {
        match &self.kind {
            InstanceKind::Composite(_) => None,
            InstanceKind::Host(h) => Some(h.node),
            InstanceKind::Text(t) => Some(t.node),
        }
    }

    /// Whether this instance was mounted directly into a container.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Instances directly below this one.
    pub fn child_ids(&self) -> Vec<InstanceId> {
        match &self.kind {
            InstanceKind::Composite(c) => c.rendered.into_iter().collect(),
            InstanceKind::Host(h) => h.children.values().copied().collect(),
            InstanceKind::Text(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_ids_are_unique_and_ordered() {
        let first = InstanceId::new();
        let second = InstanceId::new();
        assert_ne!(first, second);
        assert!(first < second);
    }

    #[test]
    fn only_live_statuses_accept_updates() {
        assert!(MountStatus::Mounting.accepts_updates());
        assert!(MountStatus::Mounted.accepts_updates());
        assert!(!MountStatus::Unmounting.accepts_updates());
        assert!(!MountStatus::Unmounted.accepts_updates());
    }
}
