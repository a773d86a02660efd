//! Instance Tree
//!
//! All live instances, indexed by id, plus the root instance of every
//! container. Structure (parent, rendered child, host children) is stored on
//! the records themselves; this map only provides O(1) lookup.

mod instance;

pub use instance::{InstanceId, MountStatus};
pub(crate) use instance::{CompositeState, HostState, InstanceKind, InstanceRecord, TextState};

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::adapter::NodeHandle;

#[derive(Default)]
pub(crate) struct InstanceTree {
    instances: HashMap<InstanceId, InstanceRecord>,
    roots: IndexMap<NodeHandle, InstanceId>,
}

impl InstanceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: InstanceRecord) -> InstanceId {
        let id = record.id;
        self.instances.insert(id, record);
        id
    }

    pub fn remove(&mut self, id: InstanceId) -> Option<InstanceRecord> {
        self.instances.remove(&id)
    }

    pub fn get(&self, id: InstanceId) -> Option<&InstanceRecord> {
        self.instances.get(&id)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut InstanceRecord> {
        self.instances.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn root(&self, container: NodeHandle) -> Option<InstanceId> {
        self.roots.get(&container).copied()
    }

    pub fn set_root(&mut self, container: NodeHandle, id: InstanceId) {
        self.roots.insert(container, id);
    }

    pub fn take_root(&mut self, container: NodeHandle) -> Option<InstanceId> {
        self.roots.shift_remove(&container)
    }

    /// Status of `id`; instances no longer in the tree are unmounted.
    pub fn status(&self, id: InstanceId) -> MountStatus {
        self.get(id)
            .map(|record| record.status)
            .unwrap_or(MountStatus::Unmounted)
    }

    /// First concrete node at or below `id`.
    pub fn host_node(&self, id: InstanceId) -> Option<NodeHandle> {
        let mut current = self.get(id)?;
        loop {
            match &current.kind {
                InstanceKind::Composite(c) => current = self.get(c.rendered?)?,
                InstanceKind::Host(h) => return Some(h.node),
                InstanceKind::Text(t) => return Some(t.node),
            }
        }
    }
}
