//! Instance handles.

use std::fmt;
use std::rc::Weak;

use serde_json::Value;

use crate::adapter::NodeHandle;
use crate::element::{Context, Node, Props, State};
use crate::error::ReconcileError;
use crate::reconciler::{Renderer, RendererInner};
use crate::scheduler::{StateUpdate, UpdateRequest};
use crate::tree::{InstanceId, InstanceKind, MountStatus};

/// A weak reference to one instance.
///
/// Handles outlive the instance they point at: once it is unmounted every
/// read returns `None` and every update request fails with
/// [`ReconcileError::UpdateOnUnmounted`].
#[derive(Clone)]
pub struct InstanceHandle {
    renderer: Weak<RendererInner>,
    id: InstanceId,
}

impl InstanceHandle {
    pub(crate) fn new(renderer: Weak<RendererInner>, id: InstanceId) -> Self {
        Self { renderer, id }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn status(&self) -> MountStatus {
        self.renderer
            .upgrade()
            .map(|renderer| renderer.status(self.id))
            .unwrap_or(MountStatus::Unmounted)
    }

    pub fn is_mounted(&self) -> bool {
        self.status() == MountStatus::Mounted
    }

    /// Queue a shallow merge of `partial` into state.
    pub fn set_state(&self, partial: State) -> Result<(), ReconcileError> {
        self.request_update(UpdateRequest::SetState(StateUpdate::Merge(partial)))
    }

    /// Queue a state update computed from the state at fold time.
    pub fn update_state(
        &self,
        updater: impl FnOnce(&State, &Props) -> State + 'static,
    ) -> Result<(), ReconcileError> {
        self.request_update(UpdateRequest::SetState(StateUpdate::Updater(Box::new(
            updater,
        ))))
    }

    /// Re-render without consulting `should_component_update`.
    pub fn force_update(&self) -> Result<(), ReconcileError> {
        self.request_update(UpdateRequest::ForceUpdate)
    }

    /// Overlay `partial` on a root instance's props and re-render it.
    pub fn set_props(&self, partial: Props) -> Result<(), ReconcileError> {
        self.request_update(UpdateRequest::SetProps(partial))
    }

    pub fn request_update(&self, request: UpdateRequest) -> Result<(), ReconcileError> {
        match self.renderer.upgrade() {
            Some(renderer) => renderer.request_update(self.id, request),
            None => Err(ReconcileError::UpdateOnUnmounted {
                kind: request.kind(),
            }),
        }
    }

    /// Committed props (composite or host).
    pub fn props(&self) -> Option<Props> {
        self.read(|kind| match kind {
            InstanceKind::Composite(c) => Some(c.props.clone()),
            InstanceKind::Host(h) => Some(h.props.clone()),
            InstanceKind::Text(_) => None,
        })
    }

    pub fn state(&self) -> Option<State> {
        self.read(|kind| match kind {
            InstanceKind::Composite(c) => Some(c.state.clone()),
            _ => None,
        })
    }

    /// Masked context committed on a composite instance.
    pub fn context(&self) -> Option<Context> {
        self.read(|kind| match kind {
            InstanceKind::Composite(c) => Some(c.context.clone()),
            _ => None,
        })
    }

    /// Host tag, for host instances.
    pub fn tag(&self) -> Option<String> {
        self.read(|kind| match kind {
            InstanceKind::Host(h) => Some(h.tag.clone()),
            _ => None,
        })
    }

    /// Component name, host tag, or `#text`.
    pub fn component_name(&self) -> Option<String> {
        let renderer = self.renderer.upgrade()?;
        let tree = renderer.tree.borrow();
        tree.get(self.id).map(|record| record.name().to_owned())
    }

    /// First concrete node at or below this instance.
    pub fn node(&self) -> Option<NodeHandle> {
        let renderer = self.renderer.upgrade()?;
        let tree = renderer.tree.borrow();
        tree.host_node(self.id)
    }

    /// The instance a composite rendered.
    pub fn rendered_child(&self) -> Option<InstanceHandle> {
        let child = self.read(|kind| match kind {
            InstanceKind::Composite(c) => c.rendered,
            _ => None,
        })?;
        Some(Self::new(self.renderer.clone(), child))
    }

    /// The instance currently attached under ref `name`.
    pub fn lookup_ref(&self, name: &str) -> Option<InstanceHandle> {
        let target = self.read(|kind| match kind {
            InstanceKind::Composite(c) => c.refs.get(name),
            _ => None,
        })?;
        Some(Self::new(self.renderer.clone(), target))
    }

    /// The instance whose render created this one.
    pub fn owner(&self) -> Option<InstanceHandle> {
        let renderer = self.renderer.upgrade()?;
        let owner = renderer.tree.borrow().get(self.id)?.owner?;
        Some(Self::new(self.renderer.clone(), owner))
    }

    /// The renderer this instance belongs to, if it is still alive.
    pub fn renderer(&self) -> Option<Renderer> {
        self.renderer.upgrade().map(Renderer::from_inner)
    }

    fn read<R>(&self, f: impl FnOnce(&InstanceKind) -> Option<R>) -> Option<R> {
        let renderer = self.renderer.upgrade()?;
        let tree = renderer.tree.borrow();
        tree.get(self.id).and_then(|record| f(&record.kind))
    }

    pub(crate) fn children_nodes(&self) -> Vec<Node> {
        self.renderer
            .upgrade()
            .and_then(|renderer| {
                let tree = renderer.tree.borrow();
                tree.get(self.id)
                    .and_then(|record| record.element().map(|el| el.children().to_vec()))
            })
            .unwrap_or_default()
    }
}

impl PartialEq for InstanceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.renderer, &other.renderer)
    }
}

impl Eq for InstanceHandle {}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

/// What a lifecycle hook sees of its own instance.
pub struct ComponentCx {
    handle: InstanceHandle,
}

impl ComponentCx {
    pub(crate) fn new(renderer: Weak<RendererInner>, id: InstanceId) -> Self {
        Self {
            handle: InstanceHandle::new(renderer, id),
        }
    }

    /// A handle to this instance, e.g. for capture in event handlers.
    pub fn handle(&self) -> InstanceHandle {
        self.handle.clone()
    }

    pub fn id(&self) -> InstanceId {
        self.handle.id
    }

    pub fn props(&self) -> Props {
        self.handle.props().unwrap_or_default()
    }

    pub fn prop(&self, key: &str) -> Option<Value> {
        self.handle.props().and_then(|props| props.get(key).cloned())
    }

    pub fn state(&self) -> State {
        self.handle.state().unwrap_or_default()
    }

    pub fn state_value(&self, key: &str) -> Option<Value> {
        self.handle.state().and_then(|state| state.get(key).cloned())
    }

    pub fn context(&self) -> Context {
        self.handle.context().unwrap_or_default()
    }

    /// Children passed to this instance's element.
    pub fn children(&self) -> Vec<Node> {
        self.handle.children_nodes()
    }

    pub fn set_state(&self, partial: State) -> Result<(), ReconcileError> {
        self.handle.set_state(partial)
    }

    pub fn update_state(
        &self,
        updater: impl FnOnce(&State, &Props) -> State + 'static,
    ) -> Result<(), ReconcileError> {
        self.handle.update_state(updater)
    }

    pub fn force_update(&self) -> Result<(), ReconcileError> {
        self.handle.force_update()
    }

    pub fn lookup_ref(&self, name: &str) -> Option<InstanceHandle> {
        self.handle.lookup_ref(name)
    }

    /// First concrete node at or below this instance.
    pub fn node(&self) -> Option<NodeHandle> {
        self.handle.node()
    }

    pub fn status(&self) -> MountStatus {
        self.handle.status()
    }

    pub fn renderer(&self) -> Option<Renderer> {
        self.handle.renderer()
    }
}
