//! Element Descriptors
//!
//! An [`Element`] is the immutable description of one node in a render
//! output: a type, props, optional key and ref, and children. Elements are
//! cheap to clone (the data sits behind an `Rc`) and cannot be mutated once
//! built; every "change" produces a new element.
//!
//! When an element is built it captures two pieces of render-tracking state
//! from [`crate::context::owner`]:
//!
//! - the *owner*: the instance whose `render` is currently running, and
//! - the *owner context*: the unmasked context visible to that render.
//!
//! These feed ref ownership and the owner-based context channel.

mod props;
mod validation;

pub use props::{mask_context, Context, Props, State};
pub(crate) use props::describe_value;
pub use validation::{PropKind, PropSpec, PropTypes, PropValidator};

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::component::{ComponentType, InstanceHandle};
use crate::context::owner;
use crate::tree::InstanceId;

/// What an element renders to.
#[derive(Clone)]
pub enum ElementType {
    /// A concrete node created through the node adapter.
    Host(String),
    /// A user-defined component.
    Composite(ComponentType),
}

impl ElementType {
    /// Tag or component name.
    pub fn name(&self) -> &str {
        match self {
            ElementType::Host(tag) => tag,
            ElementType::Composite(ty) => ty.name(),
        }
    }

    /// Type identity: equal tags, or the same component definition.
    pub fn same_type(&self, other: &ElementType) -> bool {
        match (self, other) {
            (ElementType::Host(a), ElementType::Host(b)) => a == b,
            (ElementType::Composite(a), ElementType::Composite(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Host(tag) => write!(f, "Host({tag})"),
            ElementType::Composite(ty) => write!(f, "Composite({})", ty.name()),
        }
    }
}

impl From<&str> for ElementType {
    fn from(tag: &str) -> Self {
        ElementType::Host(tag.to_owned())
    }
}

impl From<String> for ElementType {
    fn from(tag: String) -> Self {
        ElementType::Host(tag)
    }
}

impl From<ComponentType> for ElementType {
    fn from(ty: ComponentType) -> Self {
        ElementType::Composite(ty)
    }
}

impl From<&ComponentType> for ElementType {
    fn from(ty: &ComponentType) -> Self {
        ElementType::Composite(ty.clone())
    }
}

/// Callback invoked with the attached instance, then with `None` on detach.
pub type RefCallback = Rc<dyn Fn(Option<InstanceHandle>)>;

/// How an element asks to be referenced by its owner.
#[derive(Clone)]
pub enum RefSpec {
    Named(String),
    Callback(RefCallback),
}

impl RefSpec {
    /// Identity comparison: names by value, callbacks by pointer.
    pub fn same_as(&self, other: &RefSpec) -> bool {
        match (self, other) {
            (RefSpec::Named(a), RefSpec::Named(b)) => a == b,
            (RefSpec::Callback(a), RefSpec::Callback(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for RefSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefSpec::Named(name) => write!(f, "Named({name})"),
            RefSpec::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// One child in a render output.
#[derive(Clone, Debug)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub(crate) fn key(&self) -> Option<&str> {
        self.as_element().and_then(Element::key)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_owned())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

struct ElementData {
    ty: ElementType,
    props: Props,
    key: Option<String>,
    ref_spec: Option<RefSpec>,
    children: Vec<Node>,
    owner: Option<InstanceId>,
    owner_context: Rc<Context>,
}

/// An immutable element descriptor.
#[derive(Clone)]
pub struct Element(Rc<ElementData>);

impl Element {
    /// Start building a host element.
    pub fn host(tag: impl Into<String>) -> ElementBuilder {
        ElementBuilder::new(ElementType::Host(tag.into()))
    }

    /// Start building a composite element.
    pub fn component(ty: &ComponentType) -> ElementBuilder {
        ElementBuilder::new(ElementType::Composite(ty.clone()))
    }

    /// Create an element from a type, props and children.
    ///
    /// A string or number `key` prop and a string `ref` prop are lifted out
    /// of `props`, so the component never sees them.
    pub fn create(
        ty: impl Into<ElementType>,
        mut props: Props,
        children: impl IntoIterator<Item = Node>,
    ) -> Element {
        let key = props.remove("key").and_then(|key| match key {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let ref_spec = props.remove("ref").and_then(|r| match r {
            Value::String(name) => Some(RefSpec::Named(name)),
            _ => None,
        });

        let mut builder = ElementBuilder::new(ty.into()).props(props).children(children);
        builder.key = key;
        builder.ref_spec = ref_spec;
        builder.build()
    }

    pub fn element_type(&self) -> &ElementType {
        &self.0.ty
    }

    pub fn props(&self) -> &Props {
        &self.0.props
    }

    pub fn key(&self) -> Option<&str> {
        self.0.key.as_deref()
    }

    pub fn ref_spec(&self) -> Option<&RefSpec> {
        self.0.ref_spec.as_ref()
    }

    pub fn children(&self) -> &[Node] {
        &self.0.children
    }

    /// The instance whose render created this element.
    pub fn owner(&self) -> Option<InstanceId> {
        self.0.owner
    }

    /// The unmasked context captured when this element was created.
    pub fn owner_context(&self) -> &Rc<Context> {
        &self.0.owner_context
    }

    /// A copy of this element with `props` replacing its props. Type, key,
    /// ref, children, owner and owner context are kept.
    pub fn with_props(&self, props: Props) -> Element {
        Element(Rc::new(ElementData {
            ty: self.0.ty.clone(),
            props,
            key: self.0.key.clone(),
            ref_spec: self.0.ref_spec.clone(),
            children: self.0.children.clone(),
            owner: self.0.owner,
            owner_context: Rc::clone(&self.0.owner_context),
        }))
    }

    /// Whether both handles point at the same descriptor.
    pub fn ptr_eq(a: &Element, b: &Element) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Whether an instance built from `self` may be reused for `next`.
    pub fn is_reusable_for(&self, next: &Element) -> bool {
        self.0.ty.same_type(&next.0.ty) && self.0.key == next.0.key
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("type", &self.0.ty)
            .field("key", &self.0.key)
            .field("ref", &self.0.ref_spec)
            .field("props", &self.0.props)
            .field("children", &self.0.children.len())
            .finish()
    }
}

/// Builder for [`Element`]. Owner and owner context are captured in
/// [`ElementBuilder::build`].
pub struct ElementBuilder {
    ty: ElementType,
    props: Props,
    key: Option<String>,
    ref_spec: Option<RefSpec>,
    children: Vec<Node>,
}

impl ElementBuilder {
    fn new(ty: ElementType) -> Self {
        Self {
            ty,
            props: Props::new(),
            key: None,
            ref_spec: None,
            children: Vec::new(),
        }
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.set(key, value);
        self
    }

    pub fn props(mut self, props: Props) -> Self {
        self.props = self.props.merged(&props);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn ref_name(mut self, name: impl Into<String>) -> Self {
        self.ref_spec = Some(RefSpec::Named(name.into()));
        self
    }

    pub fn ref_callback(mut self, callback: impl Fn(Option<InstanceHandle>) + 'static) -> Self {
        self.ref_spec = Some(RefSpec::Callback(Rc::new(callback)));
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn build(self) -> Element {
        Element(Rc::new(ElementData {
            ty: self.ty,
            props: self.props,
            key: self.key,
            ref_spec: self.ref_spec,
            children: self.children,
            owner: owner::current_owner(),
            owner_context: owner::current_context(),
        }))
    }
}

impl From<ElementBuilder> for Element {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

impl From<ElementBuilder> for Node {
    fn from(builder: ElementBuilder) -> Self {
        Node::Element(builder.build())
    }
}
