//! Trellis Core
//!
//! This crate provides the component reconciliation engine for the Trellis
//! UI runtime. It implements:
//!
//! - Immutable element descriptors with owner and context capture
//! - Stateful component instances with a fixed lifecycle
//! - Keyed reconciliation of render output against the live tree
//! - Batched state updates flushed after the current pass
//! - Named and callback refs that follow their logical slot
//!
//! Concrete platform nodes are created and patched through a [`NodeAdapter`];
//! [`MemoryAdapter`] keeps them in memory.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `element`: element descriptors, props, prop validation
//! - `component`: the `Component` trait, component definitions, handles
//! - `context`: render tracking and the two context channels
//! - `tree`: instance records
//! - `scheduler`: pending update queues and batching
//! - `reconciler`: mount, update and unmount of instance trees
//! - `adapter`: the node adapter contract and the in-memory adapter
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::{Component, ComponentCx, ComponentType, Element, HookResult, State};
//! use trellis_core::{MemoryAdapter, Renderer};
//!
//! struct Counter;
//!
//! impl Component for Counter {
//!     fn initial_state(&mut self, _cx: &ComponentCx) -> State {
//!         [("count".to_owned(), 0.into())].into_iter().collect()
//!     }
//!
//!     fn render(&mut self, cx: &ComponentCx) -> HookResult<Option<Element>> {
//!         let count = cx.state_value("count").unwrap_or_default();
//!         Ok(Some(Element::host("span").child(count.to_string()).build()))
//!     }
//! }
//!
//! let adapter = MemoryAdapter::new();
//! let container = adapter.create_container();
//! let renderer = Renderer::new(adapter.clone());
//!
//! let counter = ComponentType::new("Counter", || Counter);
//! let root = renderer.render(Element::component(&counter), container)?;
//! root.set_state([("count".to_owned(), 1.into())].into_iter().collect())?;
//! assert_eq!(adapter.text_content(container), "1");
//! ```

pub mod adapter;
pub mod advisory;
pub mod component;
pub mod config;
pub mod context;
pub mod element;
pub mod error;
pub mod reconciler;
pub mod scheduler;
pub mod tree;

mod refs;

pub use adapter::{MemoryAdapter, NodeAdapter, NodeHandle};
pub use advisory::{Advisory, Phase};
pub use component::{
    Component, ComponentCx, ComponentType, ComponentTypeBuilder, HookResult, InstanceHandle,
};
pub use config::RendererConfig;
pub use context::owner::{current_owner, with_context};
pub use element::{
    Context, Element, ElementBuilder, ElementType, Node, PropKind, PropTypes, PropValidator,
    Props, RefSpec, State,
};
pub use error::{ConfigError, HookError, ReconcileError, UpdateKind};
pub use reconciler::Renderer;
pub use scheduler::{StateUpdate, UpdateRequest};
pub use tree::{InstanceId, MountStatus};
