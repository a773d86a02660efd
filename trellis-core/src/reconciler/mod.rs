//! Reconciler
//!
//! The [`Renderer`] owns every live instance for one node adapter. It mounts
//! root elements into containers, turns update requests into re-renders,
//! and tears trees down again.
//!
//! # Algorithm
//!
//! Reconciling an existing instance against a new node:
//!
//! 1. Same type and key: the instance is kept and receives the new element.
//!    Composites run the update lifecycle; hosts patch their node and
//!    reconcile their children by flattened name (`.$key` or `.{index}`).
//! 2. Otherwise the old subtree is fully unmounted, a new one is mounted
//!    detached, and its node is swapped into the old node's position.
//!
//! Refs follow the matched pairing: every detach of a pass happens before
//! any attach.
//!
//! # Re-entrancy
//!
//! No `RefCell` borrow is held while user code runs. A component is taken
//! out of its record for the duration of a hook and put back afterwards, so
//! hooks may freely read their instance and queue updates. Updates queued
//! while a batch is open are flushed when the outermost batch ends.

mod children;
mod mount;
mod update;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::adapter::{NodeAdapter, NodeHandle};
use crate::advisory::{Advisory, AdvisoryLog, Phase};
use crate::component::{Component, ComponentCx, ComponentType, HookResult, InstanceHandle};
use crate::config::RendererConfig;
use crate::context::{check_divergence, owner, RenderFrame};
use crate::element::{mask_context, Context, Element, Node, Props, RefSpec};
use crate::error::ReconcileError;
use crate::scheduler::{BatchScope, UpdateRequest, UpdateScheduler};
use crate::tree::{InstanceId, InstanceRecord, InstanceTree, MountStatus};

type Result<T> = std::result::Result<T, ReconcileError>;

/// The reconciliation engine for one node adapter.
///
/// Cloning a renderer shares the same engine.
#[derive(Clone)]
pub struct Renderer {
    inner: Rc<RendererInner>,
}

impl Renderer {
    pub fn new(adapter: impl NodeAdapter + 'static) -> Self {
        Self::with_config(adapter, RendererConfig::default())
    }

    pub fn with_config(adapter: impl NodeAdapter + 'static, config: RendererConfig) -> Self {
        let inner = Rc::new_cyclic(|this| RendererInner {
            this: this.clone(),
            advisories: RefCell::new(AdvisoryLog::new(config.dedupe_advisories)),
            config,
            tree: RefCell::new(InstanceTree::new()),
            adapter: RefCell::new(Box::new(adapter)),
            scheduler: RefCell::new(UpdateScheduler::new()),
        });
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Rc<RendererInner>) -> Self {
        Self { inner }
    }

    /// Mount `element` into `container`, or update the root already there.
    ///
    /// A root with the same type and key is updated in place; any other
    /// root is unmounted first.
    pub fn render(
        &self,
        element: impl Into<Element>,
        container: NodeHandle,
    ) -> Result<InstanceHandle> {
        self.inner.render_root(element.into(), container)
    }

    /// Unmount the root in `container`. Returns `false` if there was none.
    pub fn unmount_component_at_node(&self, container: NodeHandle) -> Result<bool> {
        self.inner.unmount_root(container)
    }

    /// The root instance mounted in `container`.
    pub fn root(&self, container: NodeHandle) -> Option<InstanceHandle> {
        let id = self.inner.tree.borrow().root(container)?;
        Some(self.inner.handle(id))
    }

    /// Run `f` inside one batch; updates it queues are flushed together.
    pub fn batched_updates<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        self.inner.batched(|| Ok(f()))
    }

    /// Advisories reported so far.
    pub fn advisories(&self) -> Vec<Advisory> {
        self.inner.advisories.borrow().entries().to_vec()
    }

    /// Drain the advisory log. De-duplication state is kept.
    pub fn take_advisories(&self) -> Vec<Advisory> {
        self.inner.advisories.borrow_mut().take()
    }

    /// Number of live instance records.
    pub fn instance_count(&self) -> usize {
        self.inner.tree.borrow().len()
    }

    pub fn config(&self) -> &RendererConfig {
        &self.inner.config
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("instances", &self.instance_count())
            .field("config", &self.inner.config)
            .finish()
    }
}

pub(crate) struct RendererInner {
    this: Weak<RendererInner>,
    config: RendererConfig,
    pub(crate) tree: RefCell<InstanceTree>,
    adapter: RefCell<Box<dyn NodeAdapter>>,
    scheduler: RefCell<UpdateScheduler>,
    advisories: RefCell<AdvisoryLog>,
}

impl RendererInner {
    pub(crate) fn handle(&self, id: InstanceId) -> InstanceHandle {
        InstanceHandle::new(self.this.clone(), id)
    }

    pub(crate) fn status(&self, id: InstanceId) -> MountStatus {
        self.tree.borrow().status(id)
    }

    fn render_root(&self, element: Element, container: NodeHandle) -> Result<InstanceHandle> {
        if owner::current_owner().is_some() {
            self.advise(None, Advisory::NestedRender);
        }

        self.batched(|| {
            let existing = {
                let tree = self.tree.borrow();
                tree.root(container).and_then(|root| {
                    let record = tree.get(root)?;
                    let reusable = record
                        .element()
                        .is_some_and(|prev| prev.is_reusable_for(&element));
                    Some((root, reusable, Rc::clone(&record.parent_context)))
                })
            };

            match existing {
                Some((root, true, parent_context)) => {
                    tracing::debug!(instance = %root, "update root");
                    self.receive(root, &Node::Element(element), &parent_context)?;
                    return Ok(self.handle(root));
                }
                Some(_) => {
                    self.unmount_root(container)?;
                }
                None => {}
            }

            let id = self.mount_node(&Node::Element(element), &RenderFrame::root(container))?;
            self.tree.borrow_mut().set_root(container, id);
            tracing::debug!(instance = %id, container = container.raw(), "mounted root");
            Ok(self.handle(id))
        })
    }

    fn unmount_root(&self, container: NodeHandle) -> Result<bool> {
        self.batched(|| {
            let Some(root) = self.tree.borrow_mut().take_root(container) else {
                return Ok(false);
            };
            tracing::debug!(instance = %root, container = container.raw(), "unmount root");
            self.unmount_instance(root, true)?;
            Ok(true)
        })
    }

    /// Run `f` in a batch, flushing queued updates if it is the outermost.
    pub(crate) fn batched<R>(&self, f: impl FnOnce() -> Result<R>) -> Result<R> {
        let scope = BatchScope::open(&self.scheduler);
        let value = f()?;
        if scope.is_outermost() {
            self.flush_updates()?;
        }
        Ok(value)
    }

    /// Validate and queue an update request against `id`.
    pub(crate) fn request_update(&self, id: InstanceId, request: UpdateRequest) -> Result<()> {
        let kind = request.kind();
        {
            let mut tree = self.tree.borrow_mut();
            let record = tree
                .get_mut(id)
                .ok_or(ReconcileError::UpdateOnUnmounted { kind })?;
            if record.status == MountStatus::Unmounting {
                return Err(ReconcileError::UpdateWhileUnmounting { kind });
            }
            if !record.status.accepts_updates() {
                return Err(ReconcileError::UpdateOnUnmounted { kind });
            }

            let not_composite = |record: &InstanceRecord| ReconcileError::NotComposite {
                kind,
                tag: record.name().to_owned(),
            };
            match request {
                UpdateRequest::SetProps(partial) => {
                    if !record.is_root() {
                        return Err(ReconcileError::SetPropsOnChild);
                    }
                    let current = record
                        .element()
                        .cloned()
                        .ok_or_else(|| not_composite(record))?;
                    record.pending.set_props(&current, &partial);
                }
                UpdateRequest::SetState(update) => {
                    if record.composite().is_none() {
                        return Err(not_composite(record));
                    }
                    record.pending.push_state(update);
                }
                UpdateRequest::ForceUpdate => {
                    if record.composite().is_none() {
                        return Err(not_composite(record));
                    }
                    record.pending.force();
                }
            }
        }

        let batching = {
            let mut scheduler = self.scheduler.borrow_mut();
            scheduler.mark_dirty(id);
            scheduler.is_batching()
        };
        tracing::debug!(instance = %id, %kind, batching, "queued update");
        self.batched(|| Ok(()))
    }

    fn flush_updates(&self) -> Result<()> {
        loop {
            let dirty = self.scheduler.borrow_mut().drain();
            if dirty.is_empty() {
                return Ok(());
            }
            let passes = self.scheduler.borrow().passes();
            if passes > self.config.max_update_passes {
                return Err(ReconcileError::UpdateDepthExceeded {
                    passes: self.config.max_update_passes,
                });
            }
            tracing::debug!(pass = passes, instances = dirty.len(), "flush updates");
            for id in dirty {
                self.perform_update_if_necessary(id)?;
            }
        }
    }

    /// Re-render `id` from its queue, unless it stopped being mounted or
    /// its queue was already consumed earlier in this pass.
    fn perform_update_if_necessary(&self, id: InstanceId) -> Result<()> {
        let (next, parent_context) = {
            let mut tree = self.tree.borrow_mut();
            let Some(record) = tree.get_mut(id) else {
                return Ok(());
            };
            if record.status != MountStatus::Mounted || record.pending.is_empty() {
                return Ok(());
            }
            let next = match record.pending.take_element() {
                Some(element) => Node::Element(element),
                None => record.current.clone(),
            };
            (next, Rc::clone(&record.parent_context))
        };
        self.update_instance(id, &next, parent_context)
    }

    fn cx(&self, id: InstanceId) -> ComponentCx {
        ComponentCx::new(self.this.clone(), id)
    }

    /// Call one lifecycle hook of the composite `id`.
    ///
    /// The component is moved out of its record while the hook runs.
    fn call_hook<R>(
        &self,
        id: InstanceId,
        hook: &'static str,
        f: impl FnOnce(&mut dyn Component, &ComponentCx) -> HookResult<R>,
    ) -> Result<R> {
        let (mut component, name) = {
            let mut tree = self.tree.borrow_mut();
            let composite = tree
                .get_mut(id)
                .and_then(InstanceRecord::composite_mut)
                .ok_or(ReconcileError::InstanceGone { id })?;
            let name = composite.ty.name().to_owned();
            match composite.component.take() {
                Some(component) => (component, name),
                None => return Err(ReconcileError::ComponentBusy { component: name, hook }),
            }
        };

        let cx = self.cx(id);
        let result = f(component.as_mut(), &cx);

        if let Some(composite) = self
            .tree
            .borrow_mut()
            .get_mut(id)
            .and_then(InstanceRecord::composite_mut)
        {
            composite.component = Some(component);
        }

        result.map_err(|source| ReconcileError::Lifecycle {
            component: name,
            hook,
            source,
        })
    }

    fn advise(&self, source: Option<u64>, advisory: Advisory) {
        self.advisories.borrow_mut().report(source, advisory);
    }

    /// Element props with defaults applied, validated if configured.
    fn resolve_props(&self, ty: &ComponentType, element: &Element) -> Props {
        let props = ty.resolve_props(element.props());
        if self.config.validate_props {
            for message in ty.validate_props(&props) {
                self.advise(
                    Some(ty.uid()),
                    Advisory::InvalidProp {
                        component: ty.name().to_owned(),
                        message,
                    },
                );
            }
        }
        props
    }

    /// The parent-based context masked to `ty`'s declared keys, after
    /// reporting any disagreement with the owner-based channel.
    fn masked_context(
        &self,
        ty: &ComponentType,
        element: &Element,
        parent_context: &Context,
        phase: Phase,
    ) -> Context {
        let declared = ty.context_types();
        if self.config.check_context_divergence && !declared.is_empty() {
            let advisories = check_divergence(
                ty.name(),
                declared,
                element.owner_context(),
                parent_context,
                phase,
            );
            for advisory in advisories {
                self.advise(Some(ty.uid()), advisory);
            }
        }
        mask_context(parent_context, declared)
    }

    /// Call `child_context` and merge the result over both channels.
    ///
    /// Returns `(owner_based, parent_based)`. Both are returned unchanged
    /// when the component contributes nothing.
    fn process_child_context(
        &self,
        id: InstanceId,
        ty: &ComponentType,
        element: &Element,
        parent_context: &Rc<Context>,
    ) -> Result<(Rc<Context>, Rc<Context>)> {
        let contributed = self.call_hook(id, "getChildContext", |c, cx| c.child_context(cx))?;
        if contributed.is_empty() {
            return Ok((
                Rc::clone(element.owner_context()),
                Rc::clone(parent_context),
            ));
        }

        if let Some(key) = contributed
            .keys()
            .find(|key| !ty.child_context_types().contains(key))
        {
            return Err(ReconcileError::UndeclaredChildContext {
                component: ty.name().to_owned(),
                key: key.clone(),
            });
        }

        let mut owner_based = (**element.owner_context()).clone();
        owner_based.extend(contributed.clone());
        let mut parent_based = (**parent_context).clone();
        parent_based.extend(contributed);
        Ok((Rc::new(owner_based), Rc::new(parent_based)))
    }

    /// Run `render` with `id` as the current owner.
    fn render_component(&self, id: InstanceId, owner_context: Rc<Context>) -> Result<Option<Element>> {
        let _scope = owner::OwnerScope::enter(id, owner_context);
        self.call_hook(id, "render", |c, cx| c.render(cx))
    }

    fn set_status(&self, id: InstanceId, status: MountStatus) {
        if let Some(record) = self.tree.borrow_mut().get_mut(id) {
            record.status = status;
        }
    }

    fn current_node(&self, id: InstanceId) -> Option<Node> {
        self.tree.borrow().get(id).map(|record| record.current.clone())
    }

    /// Attach `target` under the ref its element asks for.
    fn attach_ref(&self, target: InstanceId, node: &Node) {
        let Some(element) = node.as_element() else {
            return;
        };
        let (Some(spec), Some(owner)) = (element.ref_spec(), element.owner()) else {
            return;
        };
        match spec {
            RefSpec::Named(name) => {
                if let Some(composite) = self
                    .tree
                    .borrow_mut()
                    .get_mut(owner)
                    .and_then(InstanceRecord::composite_mut)
                {
                    composite.refs.attach(name, target);
                }
            }
            RefSpec::Callback(callback) => callback(Some(self.handle(target))),
        }
    }

    /// Detach `target` from the ref its element asked for, if it still
    /// holds it.
    fn detach_ref(&self, target: InstanceId, node: &Node) {
        let Some(element) = node.as_element() else {
            return;
        };
        let (Some(spec), Some(owner)) = (element.ref_spec(), element.owner()) else {
            return;
        };
        match spec {
            RefSpec::Named(name) => {
                if let Some(composite) = self
                    .tree
                    .borrow_mut()
                    .get_mut(owner)
                    .and_then(InstanceRecord::composite_mut)
                {
                    composite.refs.detach(name, target);
                }
            }
            RefSpec::Callback(callback) => callback(None),
        }
    }
}

/// Whether an instance reconciled against `prev` can take `next`.
fn can_reuse(prev: &Node, next: &Node) -> bool {
    match (prev, next) {
        (Node::Text(_), Node::Text(_)) => true,
        (Node::Element(a), Node::Element(b)) => a.is_reusable_for(b),
        _ => false,
    }
}

/// Whether moving from `prev` to `next` changes which ref slot the
/// instance occupies.
fn refs_change(prev: &Node, next: &Node) -> bool {
    let (Some(prev), Some(next)) = (prev.as_element(), next.as_element()) else {
        return false;
    };
    let same_ref = match (prev.ref_spec(), next.ref_spec()) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_as(b),
        _ => false,
    };
    !same_ref || prev.owner() != next.owner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::component::{Component, ComponentCx, HookResult};
    use serde_json::json;

    struct Label;

    impl Component for Label {
        fn render(&mut self, cx: &ComponentCx) -> HookResult<Option<Element>> {
            let text = cx.prop("text").and_then(|v| v.as_str().map(str::to_owned));
            Ok(Some(Element::host("span").child(text.unwrap_or_default()).build()))
        }
    }

    fn setup() -> (Renderer, MemoryAdapter, NodeHandle) {
        let adapter = MemoryAdapter::new();
        let container = adapter.create_container();
        (Renderer::new(adapter.clone()), adapter, container)
    }

    #[test]
    fn renders_and_updates_root_in_place() {
        let (renderer, adapter, container) = setup();
        let label = ComponentType::new("Label", || Label);

        let first = renderer
            .render(Element::component(&label).prop("text", "one"), container)
            .unwrap();
        assert_eq!(adapter.text_content(container), "one");

        let second = renderer
            .render(Element::component(&label).prop("text", "two"), container)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(adapter.text_content(container), "two");
        assert_eq!(first.props().unwrap().get("text"), Some(&json!("two")));
    }

    #[test]
    fn different_root_type_replaces() {
        let (renderer, adapter, container) = setup();
        let label = ComponentType::new("Label", || Label);

        let first = renderer.render(Element::component(&label), container).unwrap();
        let second = renderer.render(Element::host("p"), container).unwrap();

        assert_ne!(first, second);
        assert_eq!(first.status(), MountStatus::Unmounted);
        assert_eq!(adapter.children(container).len(), 1);
        assert_eq!(second.tag().as_deref(), Some("p"));
    }

    #[test]
    fn unmount_releases_every_record() {
        let (renderer, adapter, container) = setup();
        let label = ComponentType::new("Label", || Label);
        renderer.render(Element::component(&label).prop("text", "x"), container).unwrap();
        assert_eq!(renderer.instance_count(), 3);

        assert!(renderer.unmount_component_at_node(container).unwrap());
        assert_eq!(renderer.instance_count(), 0);
        assert!(adapter.children(container).is_empty());
        assert!(!renderer.unmount_component_at_node(container).unwrap());
    }

    #[test]
    fn state_updates_on_host_are_rejected() {
        let (renderer, _adapter, container) = setup();
        let root = renderer.render(Element::host("div"), container).unwrap();
        let err = root.force_update().unwrap_err();
        assert!(matches!(err, ReconcileError::NotComposite { .. }));
    }

    #[test]
    fn refs_change_tracks_name_and_owner() {
        let a = Node::from(Element::host("a").ref_name("x").build());
        let b = Node::from(Element::host("b").ref_name("x").build());
        let c = Node::from(Element::host("b").ref_name("y").build());
        assert!(!refs_change(&a, &b));
        assert!(refs_change(&b, &c));
        assert!(!refs_change(&Node::from("t"), &Node::from("u")));
    }
}
