//! Error Types
//!
//! Two families of failure exist in the engine:
//!
//! - [`ReconcileError`]: fatal usage and state-machine violations. These
//!   terminate the operation that triggered them and are returned to its
//!   caller. Messages carry the stable `Invariant Violation:` prefix.
//!
//! - [`HookError`]: what a component's lifecycle hook returns when it fails.
//!   The engine wraps it in [`ReconcileError::Lifecycle`] after unwinding any
//!   render-tracking state that was pushed for the failed call.
//!
//! Advisory conditions (warnings) are not errors; see [`crate::advisory`].

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::tree::InstanceId;

/// The kind of update request made against an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    SetState,
    ForceUpdate,
    SetProps,
}

impl UpdateKind {
    /// The method name used in user-facing messages.
    pub fn method(&self) -> &'static str {
        match self {
            UpdateKind::SetState => "setState",
            UpdateKind::ForceUpdate => "forceUpdate",
            UpdateKind::SetProps => "setProps",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// A fatal violation of the engine's lifecycle or usage rules.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(
        "Invariant Violation: {kind}(...): Can only update a mounted or mounting component. \
         This usually means you called {kind}() on an unmounted component."
    )]
    UpdateOnUnmounted { kind: UpdateKind },

    #[error("Invariant Violation: {kind}(...): Cannot call {kind}() on an unmounting component.")]
    UpdateWhileUnmounting { kind: UpdateKind },

    #[error(
        "Invariant Violation: setProps(...): You called `setProps` on a component with a parent. \
         This is an anti-pattern since props will get reactively updated when rendered. \
         Instead, change the owner's `render` method to pass the correct value as props to \
         the component where it is created."
    )]
    SetPropsOnChild,

    #[error(
        "Invariant Violation: {kind}(...): `<{tag}>` is a host node, not a composite component; \
         only setProps is supported on host nodes."
    )]
    NotComposite { kind: UpdateKind, tag: String },

    #[error(
        "Invariant Violation: {component}.getChildContext(): key \"{key}\" is not defined in \
         childContextTypes."
    )]
    UndeclaredChildContext { component: String, key: String },

    #[error(
        "Invariant Violation: {component}.{hook}(): the component is already running a \
         lifecycle method and cannot be re-entered."
    )]
    ComponentBusy { component: String, hook: &'static str },

    #[error(
        "Invariant Violation: maximum update depth exceeded after {passes} passes. A lifecycle \
         method is scheduling updates on every pass."
    )]
    UpdateDepthExceeded { passes: usize },

    #[error("Invariant Violation: instance {id} is no longer part of the tree.")]
    InstanceGone { id: InstanceId },

    #[error("{component}.{hook}() failed: {source}")]
    Lifecycle {
        component: String,
        hook: &'static str,
        #[source]
        source: HookError,
    },
}

impl ReconcileError {
    /// The update kind this error was raised for, if it is a mount-state
    /// violation.
    pub fn update_kind(&self) -> Option<UpdateKind> {
        match self {
            ReconcileError::UpdateOnUnmounted { kind }
            | ReconcileError::UpdateWhileUnmounting { kind }
            | ReconcileError::NotComposite { kind, .. } => Some(*kind),
            ReconcileError::SetPropsOnChild => Some(UpdateKind::SetProps),
            _ => None,
        }
    }
}

/// Error returned by a component's lifecycle hook.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl HookError {
    /// Create an error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap another error.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    /// The wrapped engine error, when a hook propagated one with `?`.
    pub fn reconcile_error(&self) -> Option<&ReconcileError> {
        self.source
            .as_ref()
            .and_then(|source| source.downcast_ref::<ReconcileError>())
    }
}

impl From<ReconcileError> for HookError {
    fn from(error: ReconcileError) -> Self {
        HookError::new(error)
    }
}

/// Failure to load a [`crate::RendererConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid renderer configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmounted_message_names_method() {
        let err = ReconcileError::UpdateOnUnmounted {
            kind: UpdateKind::ForceUpdate,
        };
        assert_eq!(
            err.to_string(),
            "Invariant Violation: forceUpdate(...): Can only update a mounted or mounting \
             component. This usually means you called forceUpdate() on an unmounted component."
        );
    }

    #[test]
    fn unmounting_message_is_distinct() {
        let err = ReconcileError::UpdateWhileUnmounting {
            kind: UpdateKind::SetState,
        };
        assert_eq!(
            err.to_string(),
            "Invariant Violation: setState(...): Cannot call setState() on an unmounting component."
        );
    }

    #[test]
    fn hook_error_keeps_engine_error() {
        let hook: HookError = ReconcileError::SetPropsOnChild.into();
        assert!(matches!(
            hook.reconcile_error(),
            Some(ReconcileError::SetPropsOnChild)
        ));
        assert!(hook.to_string().starts_with("Invariant Violation: setProps(...)"));
    }
}
