//! Update paths for live instances.

use std::rc::Rc;

use super::{can_reuse, refs_change, RendererInner, Result};
use crate::adapter::{NodeHandle, TEXT_ATTR};
use crate::advisory::{Advisory, Phase};
use crate::context::RenderFrame;
use crate::element::{Context, Element, Node, Props, State};
use crate::error::ReconcileError;
use crate::scheduler::fold_states;
use crate::tree::{InstanceId, InstanceKind, InstanceRecord, MountStatus};

impl RendererInner {
    /// Hand `next` to the live instance `id`.
    ///
    /// Nothing happens when the parent passes the very same element under
    /// the very same context and no update is queued.
    pub(super) fn receive(
        &self,
        id: InstanceId,
        next: &Node,
        parent_context: &Rc<Context>,
    ) -> Result<()> {
        let unchanged = {
            let tree = self.tree.borrow();
            let Some(record) = tree.get(id) else {
                return Err(ReconcileError::InstanceGone { id });
            };
            match (&record.current, next) {
                (Node::Element(prev), Node::Element(next)) => {
                    Element::ptr_eq(prev, next)
                        && Rc::ptr_eq(&record.parent_context, parent_context)
                        && record.pending.is_empty()
                }
                (Node::Text(prev), Node::Text(next)) => prev == next,
                _ => false,
            }
        };
        if unchanged {
            return Ok(());
        }
        self.update_instance(id, next, Rc::clone(parent_context))
    }

    pub(super) fn update_instance(
        &self,
        id: InstanceId,
        next: &Node,
        parent_context: Rc<Context>,
    ) -> Result<()> {
        let is_composite = match self.tree.borrow().get(id) {
            Some(record) => record.composite().is_some(),
            None => return Err(ReconcileError::InstanceGone { id }),
        };
        match next {
            Node::Text(text) => {
                self.update_text(id, text);
                Ok(())
            }
            Node::Element(element) if is_composite => {
                let result = self.update_composite(id, element, parent_context);
                if result.is_err() {
                    // Leave the instance updatable after a failed pass.
                    let mut tree = self.tree.borrow_mut();
                    if let Some(record) = tree.get_mut(id) {
                        if record.status == MountStatus::Mounting {
                            record.status = MountStatus::Mounted;
                        }
                    }
                }
                result
            }
            Node::Element(element) => self.update_host(id, element, parent_context),
        }
    }

    fn update_composite(
        &self,
        id: InstanceId,
        next: &Element,
        parent_context: Rc<Context>,
    ) -> Result<()> {
        let (ty, prev_element, prev_parent_context, prev_props, prev_state, prev_context) = {
            let mut tree = self.tree.borrow_mut();
            let record = tree.get_mut(id).ok_or(ReconcileError::InstanceGone { id })?;
            record.status = MountStatus::Mounting;
            record.pending.take_element();
            let prev_element = record.element().cloned();
            let prev_parent_context = std::mem::replace(
                &mut record.parent_context,
                Rc::clone(&parent_context),
            );
            let composite = record
                .composite()
                .ok_or(ReconcileError::InstanceGone { id })?;
            (
                composite.ty.clone(),
                prev_element,
                prev_parent_context,
                composite.props.clone(),
                composite.state.clone(),
                composite.context.clone(),
            )
        };
        tracing::debug!(instance = %id, component = ty.name(), "update");

        let element_changed = !prev_element.is_some_and(|prev| Element::ptr_eq(&prev, next));
        let context_changed = !Rc::ptr_eq(&prev_parent_context, &parent_context);

        let (next_props, next_context) = if element_changed || context_changed {
            let props = self.resolve_props(&ty, next);
            let context = self.masked_context(&ty, next, &parent_context, Phase::Updating);
            self.call_hook(id, "componentWillReceiveProps", |c, cx| {
                c.component_will_receive_props(&props, &context, cx)
            })?;
            (props, context)
        } else {
            (prev_props.clone(), prev_context.clone())
        };

        // State queued so far, including by componentWillReceiveProps, is
        // folded into this render.
        let (next_state, forced) = {
            let mut tree = self.tree.borrow_mut();
            let record = tree.get_mut(id).ok_or(ReconcileError::InstanceGone { id })?;
            let updates = record.pending.take_states();
            let forced = record.pending.take_force();
            (fold_states(&prev_state, &next_props, updates), forced)
        };

        let should_update = forced || {
            let answer = self.call_hook(id, "shouldComponentUpdate", |c, cx| {
                c.should_component_update(&next_props, &next_state, &next_context, cx)
            })?;
            answer.unwrap_or_else(|| {
                self.advise(
                    Some(ty.uid()),
                    Advisory::NonBooleanShouldUpdate {
                        component: ty.name().to_owned(),
                    },
                );
                true
            })
        };

        if !should_update {
            self.commit(id, next, next_props, next_state, next_context);
            self.set_status(id, MountStatus::Mounted);
            tracing::debug!(instance = %id, component = ty.name(), "update skipped");
            return Ok(());
        }

        self.call_hook(id, "componentWillUpdate", |c, cx| {
            c.component_will_update(&next_props, &next_state, &next_context, cx)
        })?;
        self.commit(id, next, next_props, next_state, next_context);

        let (owner_context, child_context) =
            self.process_child_context(id, &ty, next, &parent_context)?;
        let rendered = self.render_component(id, owner_context)?.map(Node::Element);

        let (prev_child, frame, node_before) = {
            let tree = self.tree.borrow();
            let record = tree.get(id).ok_or(ReconcileError::InstanceGone { id })?;
            let prev_child = record.composite().and_then(|c| c.rendered);
            let frame = RenderFrame {
                parent: Some(id),
                host_parent: record.host_parent,
                context: child_context,
                depth: record.depth + 1,
            };
            (prev_child, frame, tree.host_node(id))
        };

        let reconciled = self.reconcile(prev_child, rendered.as_ref(), &frame);
        {
            let mut tree = self.tree.borrow_mut();
            let next_child = match &reconciled {
                Ok(child) => *child,
                Err(_) => prev_child.filter(|child| tree.get(*child).is_some()),
            };
            if let Some(composite) = tree.get_mut(id).and_then(InstanceRecord::composite_mut) {
                composite.rendered = next_child;
            }
        }
        reconciled?;
        let node_after = self.tree.borrow().host_node(id);
        if node_after.is_some() && node_after != node_before {
            self.restore_position(id);
        }

        self.call_hook(id, "componentDidUpdate", |c, cx| {
            c.component_did_update(&prev_props, &prev_state, &prev_context, cx)
        })?;
        self.set_status(id, MountStatus::Mounted);
        Ok(())
    }

    /// Write the next element, props, state and context onto the record.
    fn commit(
        &self,
        id: InstanceId,
        element: &Element,
        props: Props,
        state: State,
        context: Context,
    ) {
        let mut tree = self.tree.borrow_mut();
        let Some(record) = tree.get_mut(id) else {
            return;
        };
        record.current = Node::Element(element.clone());
        if let Some(composite) = record.composite_mut() {
            composite.props = props;
            composite.state = state;
            composite.context = context;
        }
    }

    fn update_host(&self, id: InstanceId, next: &Element, parent_context: Rc<Context>) -> Result<()> {
        let (node, old_props, depth) = {
            let mut tree = self.tree.borrow_mut();
            let record = tree.get_mut(id).ok_or(ReconcileError::InstanceGone { id })?;
            record.status = MountStatus::Mounting;
            record.pending.take_element();
            record.current = Node::Element(next.clone());
            record.parent_context = Rc::clone(&parent_context);
            let depth = record.depth;
            let host = record.host_mut().ok_or(ReconcileError::InstanceGone { id })?;
            let old_props = std::mem::replace(&mut host.props, next.props().clone());
            (host.node, old_props, depth)
        };

        if &old_props != next.props() {
            self.adapter
                .borrow_mut()
                .patch_node(node, &old_props, next.props());
        }

        let frame = RenderFrame {
            parent: Some(id),
            host_parent: Some(node),
            context: parent_context,
            depth: depth + 1,
        };
        self.update_children(id, node, next.children(), &frame)?;
        self.set_status(id, MountStatus::Mounted);
        Ok(())
    }

    fn update_text(&self, id: InstanceId, text: &str) {
        let patch = {
            let mut tree = self.tree.borrow_mut();
            let Some(record) = tree.get_mut(id) else {
                return;
            };
            record.current = Node::Text(text.to_owned());
            match &mut record.kind {
                InstanceKind::Text(state) if state.text != text => {
                    let old = std::mem::replace(&mut state.text, text.to_owned());
                    Some((state.node, old))
                }
                _ => None,
            }
        };
        if let Some((node, old)) = patch {
            self.adapter.borrow_mut().patch_node(
                node,
                &Props::new().with(TEXT_ATTR, old),
                &Props::new().with(TEXT_ATTR, text),
            );
        }
    }

    /// Reconcile the single child slot of a composite.
    pub(super) fn reconcile(
        &self,
        prev: Option<InstanceId>,
        next: Option<&Node>,
        frame: &RenderFrame,
    ) -> Result<Option<InstanceId>> {
        let current = prev.and_then(|id| self.current_node(id).map(|node| (id, node)));
        match (current, next) {
            (None, None) => Ok(None),
            (Some((prev, _)), None) => {
                self.unmount_instance(prev, true)?;
                Ok(None)
            }
            (None, Some(node)) => {
                let id = self.mount_node(node, frame)?;
                self.attach_ref(id, node);
                Ok(Some(id))
            }
            (Some((prev, current)), Some(node)) if can_reuse(&current, node) => {
                let rewire = refs_change(&current, node);
                if rewire {
                    self.detach_ref(prev, &current);
                }
                self.receive(prev, node, &frame.context)?;
                if rewire {
                    self.attach_ref(prev, node);
                }
                Ok(Some(prev))
            }
            (Some((prev, _)), Some(node)) => {
                let id = self.replace(prev, node, frame)?;
                self.attach_ref(id, node);
                Ok(Some(id))
            }
        }
    }

    /// Unmount `prev`, mount `next` detached and swap its node into place.
    pub(super) fn replace(
        &self,
        prev: InstanceId,
        next: &Node,
        frame: &RenderFrame,
    ) -> Result<InstanceId> {
        let old_node = self.tree.borrow().host_node(prev);
        tracing::debug!(instance = %prev, "replace");

        self.unmount_instance(prev, false)?;
        let id = match self.mount_node(next, &frame.detached()) {
            Ok(id) => id,
            Err(err) => {
                // The old subtree is already torn down; its node must not
                // linger in the parent.
                if let Some(old) = old_node {
                    self.adapter.borrow_mut().unmount_node(old);
                }
                return Err(err);
            }
        };
        let new_node = self.tree.borrow().host_node(id);

        {
            let mut adapter = self.adapter.borrow_mut();
            match (old_node, new_node) {
                (Some(old), Some(new)) => adapter.replace_node(old, new),
                (Some(old), None) => adapter.unmount_node(old),
                (None, Some(new)) => {
                    if let Some(parent) = frame.host_parent {
                        adapter.mount_node(new, parent);
                    }
                }
                (None, None) => {}
            }
        }
        self.rehome(id, frame.host_parent);
        Ok(id)
    }

    /// Point the composite chain starting at `id` at its real host parent
    /// after it was mounted detached.
    fn rehome(&self, id: InstanceId, host_parent: Option<NodeHandle>) {
        let mut tree = self.tree.borrow_mut();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(record) = tree.get_mut(current) else {
                break;
            };
            record.host_parent = host_parent;
            cursor = record.composite().and_then(|c| c.rendered);
        }
    }

    /// Re-place the children of the nearest host ancestor of `id`.
    fn restore_position(&self, id: InstanceId) {
        let host = {
            let tree = self.tree.borrow();
            let mut cursor = tree.get(id).and_then(|record| record.parent);
            loop {
                let Some(current) = cursor.and_then(|parent| tree.get(parent)) else {
                    break None;
                };
                if current.host().is_some() {
                    break Some(current.id);
                }
                cursor = current.parent;
            }
        };
        if let Some(host) = host {
            self.place_children(host);
        }
    }

    /// Move every child node of host `id` to its render-order index.
    pub(super) fn place_children(&self, id: InstanceId) {
        let (parent, placements) = {
            let tree = self.tree.borrow();
            let Some(host) = tree.get(id).and_then(InstanceRecord::host) else {
                return;
            };
            let placements: Vec<NodeHandle> = host
                .children
                .values()
                .filter_map(|child| tree.host_node(*child))
                .collect();
            (host.node, placements)
        };
        let mut adapter = self.adapter.borrow_mut();
        for (index, node) in placements.into_iter().enumerate() {
            adapter.move_node(node, parent, index);
        }
    }
}
