//! Mount/Unmount Driver
//!
//! Mounting runs creation hooks top-down: a composite's `component_did_mount`
//! runs after its whole rendered subtree is mounted. Unmounting runs teardown
//! hooks top-down but releases resources bottom-up: every descendant has
//! finished its teardown before an ancestor's node cache is purged.

use std::rc::Rc;

use indexmap::IndexMap;

use super::{RendererInner, Result};
use crate::adapter::{NodeHandle, TEXT_ATTR, TEXT_TAG};
use crate::advisory::Phase;
use crate::component::ComponentType;
use crate::context::RenderFrame;
use crate::element::{Element, ElementType, Node, Props, RefSpec, State};
use crate::error::ReconcileError;
use crate::refs::RefRegistry;
use crate::scheduler::{fold_states, PendingUpdates};
use crate::tree::{
    CompositeState, HostState, InstanceId, InstanceKind, InstanceRecord, MountStatus, TextState,
};

impl RendererInner {
    /// Create and mount the instance tree for `node`.
    pub(super) fn mount_node(&self, node: &Node, frame: &RenderFrame) -> Result<InstanceId> {
        match node {
            Node::Text(text) => Ok(self.mount_text(node, text, frame)),
            Node::Element(element) => match element.element_type() {
                ElementType::Host(tag) => self.mount_host(element, tag, frame),
                ElementType::Composite(ty) => self.mount_composite(element, ty, frame),
            },
        }
    }

    fn mount_text(&self, node: &Node, text: &str, frame: &RenderFrame) -> InstanceId {
        let handle = {
            let mut adapter = self.adapter.borrow_mut();
            let handle = adapter.create_node(TEXT_TAG, &Props::new().with(TEXT_ATTR, text));
            if let Some(parent) = frame.host_parent {
                adapter.mount_node(handle, parent);
            }
            handle
        };
        let id = InstanceId::new();
        self.tree.borrow_mut().insert(InstanceRecord {
            id,
            current: node.clone(),
            parent: frame.parent,
            owner: None,
            parent_context: Rc::clone(&frame.context),
            host_parent: frame.host_parent,
            depth: frame.depth,
            status: MountStatus::Mounted,
            pending: PendingUpdates::default(),
            kind: InstanceKind::Text(TextState {
                text: text.to_owned(),
                node: handle,
            }),
        })
    }

    fn mount_host(&self, element: &Element, tag: &str, frame: &RenderFrame) -> Result<InstanceId> {
        let handle = {
            let mut adapter = self.adapter.borrow_mut();
            let handle = adapter.create_node(tag, element.props());
            if let Some(parent) = frame.host_parent {
                adapter.mount_node(handle, parent);
            }
            handle
        };
        let id = InstanceId::new();
        self.tree.borrow_mut().insert(InstanceRecord {
            id,
            current: Node::Element(element.clone()),
            parent: frame.parent,
            owner: element.owner(),
            parent_context: Rc::clone(&frame.context),
            host_parent: frame.host_parent,
            depth: frame.depth,
            status: MountStatus::Mounting,
            pending: PendingUpdates::default(),
            kind: InstanceKind::Host(HostState {
                tag: tag.to_owned(),
                props: element.props().clone(),
                node: handle,
                children: IndexMap::new(),
            }),
        });
        tracing::debug!(instance = %id, tag, depth = frame.depth, "mount host");

        let children_frame = frame.descend(id, Some(handle), Rc::clone(&frame.context));
        match self.mount_children(id, element.children(), &children_frame) {
            Ok(()) => {
                self.set_status(id, MountStatus::Mounted);
                Ok(id)
            }
            Err(err) => {
                self.abandon(id);
                Err(err)
            }
        }
    }

    fn mount_children(&self, id: InstanceId, children: &[Node], frame: &RenderFrame) -> Result<()> {
        let named = self.flatten_children(children);
        let mut mounted = Vec::with_capacity(named.len());
        for (name, child) in named {
            let child_id = self.mount_node(child, frame)?;
            if let Some(host) = self.tree.borrow_mut().get_mut(id).and_then(InstanceRecord::host_mut) {
                host.children.insert(name, child_id);
            }
            mounted.push((child_id, child));
        }
        for (child_id, child) in mounted {
            self.attach_ref(child_id, child);
        }
        Ok(())
    }

    fn mount_composite(
        &self,
        element: &Element,
        ty: &ComponentType,
        frame: &RenderFrame,
    ) -> Result<InstanceId> {
        let props = self.resolve_props(ty, element);
        let context = self.masked_context(ty, element, &frame.context, Phase::Mounting);

        let id = InstanceId::new();
        self.tree.borrow_mut().insert(InstanceRecord {
            id,
            current: Node::Element(element.clone()),
            parent: frame.parent,
            owner: element.owner(),
            parent_context: Rc::clone(&frame.context),
            host_parent: frame.host_parent,
            depth: frame.depth,
            status: MountStatus::Mounting,
            pending: PendingUpdates::default(),
            kind: InstanceKind::Composite(CompositeState {
                ty: ty.clone(),
                component: Some(ty.instantiate()),
                props,
                state: State::new(),
                context,
                rendered: None,
                refs: RefRegistry::new(),
            }),
        });
        tracing::debug!(instance = %id, component = ty.name(), depth = frame.depth, "mount");

        match self.run_mount_lifecycle(id, element, ty, frame) {
            Ok(()) => Ok(id),
            Err(err) => {
                tracing::debug!(instance = %id, component = ty.name(), error = %err, "mount failed");
                self.abandon(id);
                Err(err)
            }
        }
    }

    fn run_mount_lifecycle(
        &self,
        id: InstanceId,
        element: &Element,
        ty: &ComponentType,
        frame: &RenderFrame,
    ) -> Result<()> {
        let initial = self.call_hook(id, "getInitialState", |c, cx| Ok(c.initial_state(cx)))?;
        if let Some(composite) = self
            .tree
            .borrow_mut()
            .get_mut(id)
            .and_then(InstanceRecord::composite_mut)
        {
            composite.state = initial;
        }

        self.call_hook(id, "componentWillMount", |c, cx| c.component_will_mount(cx))?;

        // Updates queued by componentWillMount land in the first render.
        {
            let mut tree = self.tree.borrow_mut();
            let record = tree.get_mut(id).ok_or(ReconcileError::InstanceGone { id })?;
            let updates = record.pending.take_states();
            record.pending.take_force();
            if let Some(composite) = record.composite_mut() {
                composite.state = fold_states(&composite.state, &composite.props, updates);
            }
        }

        let (owner_context, child_context) =
            self.process_child_context(id, ty, element, &frame.context)?;
        let rendered = self.render_component(id, owner_context)?;

        if let Some(child) = rendered {
            let child = Node::Element(child);
            let child_frame = frame.descend(id, frame.host_parent, child_context);
            let child_id = self.mount_node(&child, &child_frame)?;
            if let Some(composite) = self
                .tree
                .borrow_mut()
                .get_mut(id)
                .and_then(InstanceRecord::composite_mut)
            {
                composite.rendered = Some(child_id);
            }
            self.attach_ref(child_id, &child);
        }

        self.call_hook(id, "componentDidMount", |c, cx| c.component_did_mount(cx))?;
        self.set_status(id, MountStatus::Mounted);
        Ok(())
    }

    /// Tear down `id` and everything below it.
    ///
    /// With `detach`, the instance's top concrete node is removed from its
    /// parent; descendants are never detached individually. A failing
    /// `component_will_unmount` does not stop the teardown; the first error
    /// is returned once every resource has been released.
    pub(super) fn unmount_instance(&self, id: InstanceId, detach: bool) -> Result<()> {
        let composite = {
            let mut tree = self.tree.borrow_mut();
            let Some(record) = tree.get_mut(id) else {
                return Ok(());
            };
            record.status = MountStatus::Unmounting;
            record.composite().is_some()
        };
        tracing::debug!(instance = %id, detach, "unmount");

        let mut first_error = None;
        if composite {
            if let Err(err) =
                self.call_hook(id, "componentWillUnmount", |c, cx| c.component_will_unmount(cx))
            {
                first_error = Some(err);
            }
        }

        let (children, node) = match self.tree.borrow().get(id) {
            Some(record) => (record.child_ids(), record.own_node()),
            None => (Vec::new(), None),
        };
        for child in children {
            // A composite's rendered child carries the composite's node.
            let child_detach = composite && detach;
            if let Err(err) = self.unmount_instance(child, child_detach) {
                first_error.get_or_insert(err);
            }
        }

        if let Some(node) = node {
            let mut adapter = self.adapter.borrow_mut();
            if detach {
                adapter.unmount_node(node);
            }
            adapter.purge_cache(node);
        }

        let current = self.tree.borrow().get(id).map(|record| record.current.clone());
        if let Some(current) = current {
            self.detach_ref(id, &current);
        }
        if let Some(mut record) = self.tree.borrow_mut().remove(id) {
            record.status = MountStatus::Unmounted;
        }
        self.scheduler.borrow_mut().forget(id);

        first_error.map_or(Ok(()), Err)
    }

    /// Discard a subtree whose mount failed. No hooks run.
    pub(super) fn abandon(&self, id: InstanceId) {
        let top = self.tree.borrow().host_node(id);
        let mut nodes: Vec<NodeHandle> = Vec::new();
        let mut callbacks = Vec::new();
        {
            let mut tree = self.tree.borrow_mut();
            let mut stack = vec![id];
            while let Some(next) = stack.pop() {
                let Some(record) = tree.remove(next) else {
                    continue;
                };
                stack.extend(record.child_ids());
                nodes.extend(record.own_node());
                let Some(element) = record.element() else {
                    continue;
                };
                match (element.ref_spec(), element.owner()) {
                    (Some(RefSpec::Named(name)), Some(owner)) => {
                        if let Some(composite) =
                            tree.get_mut(owner).and_then(InstanceRecord::composite_mut)
                        {
                            composite.refs.detach(name, next);
                        }
                    }
                    (Some(RefSpec::Callback(callback)), Some(_)) => {
                        callbacks.push(Rc::clone(callback));
                    }
                    _ => {}
                }
            }
        }

        {
            let mut scheduler = self.scheduler.borrow_mut();
            scheduler.forget(id);
        }
        {
            let mut adapter = self.adapter.borrow_mut();
            if let Some(top) = top {
                adapter.unmount_node(top);
            }
            for node in &nodes {
                adapter.purge_cache(*node);
            }
        }
        tracing::debug!(instance = %id, nodes = nodes.len(), "abandoned partial mount");

        for callback in callbacks {
            callback(None);
        }
    }
}
