//! Pending update queues.
//!
//! Every instance carries a [`PendingUpdates`] value. Requests are appended
//! in call order and consumed by the next render of that instance.

use std::collections::VecDeque;
use std::fmt;

use crate::element::{Element, Props, State};
use crate::error::UpdateKind;

/// Computes a partial state from the state and props at fold time.
pub type StateUpdater = Box<dyn FnOnce(&State, &Props) -> State>;

/// One `setState` payload.
pub enum StateUpdate {
    /// Shallow-merge these keys.
    Merge(State),
    /// Shallow-merge the result of this function.
    Updater(StateUpdater),
}

impl fmt::Debug for StateUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateUpdate::Merge(partial) => f.debug_tuple("Merge").field(partial).finish(),
            StateUpdate::Updater(_) => f.write_str("Updater(..)"),
        }
    }
}

/// An update request against one instance.
#[derive(Debug)]
pub enum UpdateRequest {
    SetState(StateUpdate),
    ForceUpdate,
    /// Partial props, overlaid on the root element's props.
    SetProps(Props),
}

impl UpdateRequest {
    pub fn kind(&self) -> UpdateKind {
        match self {
            UpdateRequest::SetState(_) => UpdateKind::SetState,
            UpdateRequest::ForceUpdate => UpdateKind::ForceUpdate,
            UpdateRequest::SetProps(_) => UpdateKind::SetProps,
        }
    }
}

/// Updates waiting for the next render of an instance.
#[derive(Debug, Default)]
pub(crate) struct PendingUpdates {
    states: VecDeque<StateUpdate>,
    force: bool,
    element: Option<Element>,
}

impl PendingUpdates {
    pub fn push_state(&mut self, update: StateUpdate) {
        self.states.push_back(update);
    }

    pub fn force(&mut self) {
        self.force = true;
    }

    /// Queue a replacement element, merged over any element already queued.
    pub fn set_props(&mut self, current: &Element, partial: &Props) {
        let base = self.element.take().unwrap_or_else(|| current.clone());
        let props = base.props().merged(partial);
        self.element = Some(base.with_props(props));
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && !self.force && self.element.is_none()
    }

    pub fn take_element(&mut self) -> Option<Element> {
        self.element.take()
    }

    pub fn take_force(&mut self) -> bool {
        std::mem::take(&mut self.force)
    }

    pub fn take_states(&mut self) -> VecDeque<StateUpdate> {
        std::mem::take(&mut self.states)
    }
}

/// Apply queued state updates in FIFO order.
pub(crate) fn fold_states(
    state: &State,
    props: &Props,
    updates: impl IntoIterator<Item = StateUpdate>,
) -> State {
    let mut next = state.clone();
    for update in updates {
        let partial = match update {
            StateUpdate::Merge(partial) => partial,
            StateUpdate::Updater(f) => f(&next, props),
        };
        next.extend(partial);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn partial(key: &str, value: serde_json::Value) -> State {
        [(key.to_owned(), value)].into_iter().collect()
    }

    #[test]
    fn folds_in_call_order() {
        let state = partial("count", json!(0));
        let updates = vec![
            StateUpdate::Updater(Box::new(|s: &State, _: &Props| {
                partial("count", json!(s["count"].as_i64().unwrap_or(0) + 1))
            })),
            StateUpdate::Updater(Box::new(|s: &State, _: &Props| {
                partial("count", json!(s["count"].as_i64().unwrap_or(0) * 10))
            })),
            StateUpdate::Merge(partial("label", json!("done"))),
        ];

        let next = fold_states(&state, &Props::new(), updates);

        assert_eq!(next["count"], json!(10));
        assert_eq!(next["label"], json!("done"));
        assert_eq!(state["count"], json!(0));
    }

    #[test]
    fn set_props_accumulates() {
        let element = Element::host("div").prop("a", 1).build();
        let mut pending = PendingUpdates::default();

        pending.set_props(&element, &Props::new().with("b", 2));
        pending.set_props(&element, &Props::new().with("a", 3));

        let next = pending.take_element().expect("queued element");
        assert_eq!(next.props().get("a"), Some(&json!(3)));
        assert_eq!(next.props().get("b"), Some(&json!(2)));
        assert!(pending.is_empty());
    }

    #[test]
    fn force_is_consumed() {
        let mut pending = PendingUpdates::default();
        pending.force();
        assert!(!pending.is_empty());
        assert!(pending.take_force());
        assert!(!pending.take_force());
    }
}
