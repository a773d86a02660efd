//! Components
//!
//! A component is a value implementing [`Component`]: a fixed capability
//! set of lifecycle hooks, every one of which has a default except
//! [`Component::render`]. The engine calls hooks through the trait and never
//! checks for their presence.
//!
//! A [`ComponentType`] is the definition an element refers to: a name, a
//! factory for new component values, and static declarations (default
//! props, context keys read and provided, prop validation). Two elements
//! have the same type only if they hold the same definition.
//!
//! Hooks receive a [`ComponentCx`] for reading the instance's committed
//! props, state and context and for requesting updates. Event handlers that
//! need to reach an instance later capture an [`InstanceHandle`] obtained
//! from `cx.handle()`.
//!
//! # Lifecycle
//!
//! Mount: `initial_state` → `component_will_mount` → `child_context` →
//! `render` → (children mount) → `component_did_mount`.
//!
//! Update: `component_will_receive_props` (only when the element or the
//! parent context changed) → `should_component_update` →
//! `component_will_update` → `child_context` → `render` → (children
//! reconcile) → `component_did_update`.
//!
//! Unmount: `component_will_unmount` → (children unmount).

mod handle;

pub use handle::{ComponentCx, InstanceHandle};

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::element::{Context, Element, PropValidator, Props, State};
use crate::error::HookError;

/// Result type for lifecycle hooks.
pub type HookResult<T = ()> = Result<T, HookError>;

/// The lifecycle capability set of a component.
pub trait Component: 'static {
    /// State before the first render.
    fn initial_state(&mut self, _cx: &ComponentCx) -> State {
        State::new()
    }

    fn component_will_mount(&mut self, _cx: &ComponentCx) -> HookResult {
        Ok(())
    }

    /// Produce the single child element, or nothing.
    fn render(&mut self, cx: &ComponentCx) -> HookResult<Option<Element>>;

    fn component_did_mount(&mut self, _cx: &ComponentCx) -> HookResult {
        Ok(())
    }

    /// Context contributed to descendants. Every key must be declared in
    /// the type's `child_context_types`.
    fn child_context(&mut self, _cx: &ComponentCx) -> HookResult<Context> {
        Ok(Context::new())
    }

    fn component_will_receive_props(
        &mut self,
        _next_props: &Props,
        _next_context: &Context,
        _cx: &ComponentCx,
    ) -> HookResult {
        Ok(())
    }

    /// Whether to re-render. `None` means the hook gave no boolean answer;
    /// the engine reports an advisory and re-renders.
    fn should_component_update(
        &mut self,
        _next_props: &Props,
        _next_state: &State,
        _next_context: &Context,
        _cx: &ComponentCx,
    ) -> HookResult<Option<bool>> {
        Ok(Some(true))
    }

    fn component_will_update(
        &mut self,
        _next_props: &Props,
        _next_state: &State,
        _next_context: &Context,
        _cx: &ComponentCx,
    ) -> HookResult {
        Ok(())
    }

    fn component_did_update(
        &mut self,
        _prev_props: &Props,
        _prev_state: &State,
        _prev_context: &Context,
        _cx: &ComponentCx,
    ) -> HookResult {
        Ok(())
    }

    /// Runs while the instance's concrete nodes are still attached and
    /// queryable.
    fn component_will_unmount(&mut self, _cx: &ComponentCx) -> HookResult {
        Ok(())
    }
}

type Factory = Box<dyn Fn() -> Box<dyn Component>>;
type DefaultPropsFn = Box<dyn Fn() -> Props>;

struct ComponentDef {
    uid: u64,
    name: String,
    factory: Factory,
    default_props: Option<DefaultPropsFn>,
    context_types: Vec<String>,
    child_context_types: Vec<String>,
    prop_types: Option<Box<dyn PropValidator>>,
}

/// A component definition. Cloning shares the definition.
#[derive(Clone)]
pub struct ComponentType(Rc<ComponentDef>);

impl ComponentType {
    /// Define a component with no declarations.
    pub fn new<C, F>(name: impl Into<String>, factory: F) -> Self
    where
        C: Component,
        F: Fn() -> C + 'static,
    {
        Self::builder(name, factory).build()
    }

    pub fn builder<C, F>(name: impl Into<String>, factory: F) -> ComponentTypeBuilder
    where
        C: Component,
        F: Fn() -> C + 'static,
    {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        ComponentTypeBuilder {
            def: ComponentDef {
                uid: COUNTER.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                factory: Box::new(move || Box::new(factory()) as Box<dyn Component>),
                default_props: None,
                context_types: Vec::new(),
                child_context_types: Vec::new(),
                prop_types: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Identity of this definition.
    pub fn uid(&self) -> u64 {
        self.0.uid
    }

    /// Context keys this component reads.
    pub fn context_types(&self) -> &[String] {
        &self.0.context_types
    }

    /// Context keys this component provides to its descendants.
    pub fn child_context_types(&self) -> &[String] {
        &self.0.child_context_types
    }

    pub fn ptr_eq(&self, other: &ComponentType) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn instantiate(&self) -> Box<dyn Component> {
        (self.0.factory)()
    }

    /// Element props with this type's defaults filled in. The element's
    /// props are not modified.
    pub(crate) fn resolve_props(&self, props: &Props) -> Props {
        match &self.0.default_props {
            Some(defaults) => props.with_defaults(&defaults()),
            None => props.clone(),
        }
    }

    pub(crate) fn validate_props(&self, props: &Props) -> Vec<String> {
        self.0
            .prop_types
            .as_ref()
            .map(|validator| validator.validate(&self.0.name, props))
            .unwrap_or_default()
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ComponentType {}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.0.name)
            .field("uid", &self.0.uid)
            .finish()
    }
}

pub struct ComponentTypeBuilder {
    def: ComponentDef,
}

impl ComponentTypeBuilder {
    /// Defaults applied to every instantiation. The function receives no
    /// instance and cannot observe one.
    pub fn default_props(mut self, defaults: impl Fn() -> Props + 'static) -> Self {
        self.def.default_props = Some(Box::new(defaults));
        self
    }

    pub fn context_types<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.context_types = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn child_context_types<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.child_context_types = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn prop_types(mut self, validator: impl PropValidator + 'static) -> Self {
        self.def.prop_types = Some(Box::new(validator));
        self
    }

    pub fn build(self) -> ComponentType {
        ComponentType(Rc::new(self.def))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{PropKind, PropTypes};
    use serde_json::json;

    struct Empty;

    impl Component for Empty {
        fn render(&mut self, _cx: &ComponentCx) -> HookResult<Option<Element>> {
            Ok(None)
        }
    }

    #[test]
    fn identity_is_per_definition() {
        let a = ComponentType::new("Empty", || Empty);
        let b = ComponentType::new("Empty", || Empty);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a.uid(), b.uid());
    }

    #[test]
    fn defaults_are_applied_to_a_fresh_copy() {
        let ty = ComponentType::builder("Empty", || Empty)
            .default_props(|| Props::new().with("prop", "testKey"))
            .build();
        let input = Props::new();

        let resolved = ty.resolve_props(&input);

        assert_eq!(resolved.get("prop"), Some(&json!("testKey")));
        assert!(input.is_empty());
    }

    #[test]
    fn validation_uses_declared_types() {
        let ty = ComponentType::builder("Empty", || Empty)
            .prop_types(PropTypes::new().required("label", PropKind::String))
            .build();
        assert_eq!(ty.validate_props(&Props::new()).len(), 1);
        assert!(ty.validate_props(&Props::new().with("label", "x")).is_empty());
    }
}
