//! Keyed child reconciliation for host instances.

use std::collections::HashSet;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::{can_reuse, refs_change, RendererInner, Result};
use crate::adapter::NodeHandle;
use crate::advisory::Advisory;
use crate::context::RenderFrame;
use crate::element::Node;
use crate::tree::{InstanceId, InstanceRecord};

pub(super) type NamedChildren<'a> = SmallVec<[(String, &'a Node); 8]>;

/// How one new child relates to the previous children.
enum Slot {
    Reuse { id: InstanceId, rewire: bool },
    Replace(InstanceId),
    Mount,
}

impl RendererInner {
    /// Name every child `.$key` or `.{index}`. A repeated name is reported
    /// and only its first child is kept.
    pub(super) fn flatten_children<'a>(&self, children: &'a [Node]) -> NamedChildren<'a> {
        let mut seen = HashSet::with_capacity(children.len());
        let mut named = NamedChildren::new();
        for (index, child) in children.iter().enumerate() {
            let name = match child.key() {
                Some(key) => format!(".${key}"),
                None => format!(".{index}"),
            };
            if !seen.insert(name.clone()) {
                self.advise(
                    None,
                    Advisory::DuplicateKey {
                        key: child.key().unwrap_or(&name).to_owned(),
                    },
                );
                continue;
            }
            named.push((name, child));
        }
        named
    }

    /// Reconcile the children of host `id` against `children`.
    ///
    /// Order of effects: refs that change are detached, removed children
    /// are unmounted, remaining children are updated, replaced or mounted,
    /// nodes are moved into render order, and finally new refs attach.
    pub(super) fn update_children(
        &self,
        id: InstanceId,
        node: NodeHandle,
        children: &[Node],
        frame: &RenderFrame,
    ) -> Result<()> {
        let next = self.flatten_children(children);
        let prev: IndexMap<String, InstanceId> = self
            .tree
            .borrow()
            .get(id)
            .and_then(InstanceRecord::host)
            .map(|host| host.children.clone())
            .unwrap_or_default();

        let mut plan: SmallVec<[Slot; 8]> = SmallVec::with_capacity(next.len());
        for (name, child) in &next {
            let previous = prev
                .get(name)
                .and_then(|&old| self.current_node(old).map(|current| (old, current)));
            let slot = match previous {
                Some((old, current)) if can_reuse(&current, child) => {
                    let rewire = refs_change(&current, child);
                    if rewire {
                        self.detach_ref(old, &current);
                    }
                    Slot::Reuse { id: old, rewire }
                }
                Some((old, _)) => Slot::Replace(old),
                None => Slot::Mount,
            };
            plan.push(slot);
        }

        for (name, old) in &prev {
            if !next.iter().any(|(next_name, _)| next_name == name) {
                self.unmount_instance(*old, true)?;
            }
        }

        let mut reconciled = IndexMap::with_capacity(next.len());
        let mut attach: SmallVec<[(InstanceId, &Node); 8]> = SmallVec::new();
        let mut failure = None;
        for ((name, child), slot) in next.iter().zip(plan) {
            let (result, needs_attach) = match slot {
                Slot::Reuse { id: old, rewire } => {
                    (self.receive(old, child, &frame.context).map(|()| old), rewire)
                }
                Slot::Replace(old) => (self.replace(old, child, frame), true),
                Slot::Mount => (self.mount_node(child, frame), true),
            };
            match result {
                Ok(child_id) => {
                    if needs_attach {
                        attach.push((child_id, *child));
                    }
                    reconciled.insert(name.clone(), child_id);
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        {
            let mut tree = self.tree.borrow_mut();
            if failure.is_some() {
                // Keep every previous child that is still live so the next
                // pass reconciles against what is actually mounted.
                for (name, old) in &prev {
                    if !reconciled.contains_key(name) && tree.get(*old).is_some() {
                        reconciled.insert(name.clone(), *old);
                    }
                }
            }
            if let Some(host) = tree.get_mut(id).and_then(InstanceRecord::host_mut) {
                host.children = reconciled;
            }
        }
        tracing::trace!(instance = %id, node = node.raw(), children = next.len(), "children reconciled");
        self.place_children(id);

        for (target, child) in attach {
            self.attach_ref(target, child);
        }
        failure.map_or(Ok(()), Err)
    }
}
