//! Context Propagation
//!
//! Context reaches an instance through two channels:
//!
//! - **parent-based** (masked): the merged child-context contributions of
//!   the instance's structural ancestors. This is carried explicitly down
//!   the reconciliation recursion in a [`RenderFrame`].
//!
//! - **owner-based** (unmasked): the context that was current when the
//!   instance's element was created, i.e. the child context of the owner
//!   whose render built it (see [`owner`]).
//!
//! The two normally agree. They can legitimately disagree when an element
//! is created in one place and rendered under a different parent, for
//! example when passed through `children`. For every key an instance
//! declares, the values are compared; a difference is reported as an
//! advisory and the parent-based value is used.

pub mod owner;

use std::rc::Rc;

use crate::advisory::{Advisory, Phase};
use crate::adapter::NodeHandle;
use crate::element::{describe_value, mask_context, Context};
use crate::tree::InstanceId;

/// Immutable per-level state threaded through mount and update recursion.
#[derive(Debug, Clone)]
pub(crate) struct RenderFrame {
    /// Structural parent of the instance being reconciled.
    pub parent: Option<InstanceId>,
    /// Concrete node that newly created nodes attach to. `None` means the
    /// subtree is built detached and placed by the caller afterwards.
    pub host_parent: Option<NodeHandle>,
    /// Parent-based unmasked context.
    pub context: Rc<Context>,
    pub depth: usize,
}

impl RenderFrame {
    /// Frame for a root mounted into `container`.
    pub fn root(container: NodeHandle) -> Self {
        Self {
            parent: None,
            host_parent: Some(container),
            context: Rc::default(),
            depth: 0,
        }
    }

    /// Frame for the children of `parent`.
    pub fn descend(
        &self,
        parent: InstanceId,
        host_parent: Option<NodeHandle>,
        context: Rc<Context>,
    ) -> Self {
        Self {
            parent: Some(parent),
            host_parent,
            context,
            depth: self.depth + 1,
        }
    }

    /// Same frame, but build nodes detached.
    pub fn detached(&self) -> Self {
        Self {
            host_parent: None,
            ..self.clone()
        }
    }
}

/// Compare the owner-based and parent-based values of every declared key.
///
/// Returns one advisory per differing key, in declaration order.
pub(crate) fn check_divergence(
    component: &str,
    declared: &[String],
    owner_context: &Context,
    parent_context: &Context,
    phase: Phase,
) -> Vec<Advisory> {
    let owner_masked = mask_context(owner_context, declared);
    let parent_masked = mask_context(parent_context, declared);

    declared
        .iter()
        .filter_map(|key| {
            let owner_value = owner_masked.get(key);
            let parent_value = parent_masked.get(key);
            (owner_value != parent_value).then(|| Advisory::ContextDivergence {
                component: component.to_owned(),
                key: key.clone(),
                owner_value: describe_value(owner_value),
                parent_value: describe_value(parent_value),
                phase,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(pairs: &[(&str, &str)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), json!(v)))
            .collect()
    }

    #[test]
    fn equal_channels_do_not_diverge() {
        let declared = vec!["foo".to_owned()];
        let both = ctx(&[("foo", "bar")]);
        assert!(check_divergence("C", &declared, &both, &both, Phase::Mounting).is_empty());
    }

    #[test]
    fn missing_parent_value_is_undefined() {
        let declared = vec!["foo".to_owned()];
        let advisories = check_divergence(
            "Component",
            &declared,
            &ctx(&[("foo", "bar")]),
            &Context::new(),
            Phase::Mounting,
        );
        assert_eq!(advisories.len(), 1);
        assert_eq!(
            advisories[0].to_string(),
            "owner-based and parent-based contexts differ (values: `bar` vs `undefined`) for \
             key (foo) while mounting Component"
        );
    }

    #[test]
    fn undeclared_keys_are_ignored() {
        let declared = vec!["foo".to_owned()];
        let advisories = check_divergence(
            "C",
            &declared,
            &ctx(&[("foo", "bar"), ("other", "x")]),
            &ctx(&[("foo", "bar"), ("other", "y")]),
            Phase::Updating,
        );
        assert!(advisories.is_empty());
    }

    #[test]
    fn descend_increments_depth() {
        let root = RenderFrame::root(NodeHandle::from_raw(1));
        let child = root.descend(InstanceId::new(), None, Rc::default());
        assert_eq!(child.depth, 1);
        assert!(child.host_parent.is_none());
        assert!(child.detached().host_parent.is_none());
    }
}
