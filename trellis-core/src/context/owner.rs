//! Render Tracking
//!
//! Tracks which instance is currently rendering and the unmasked context
//! visible to that render. Elements built while an entry is active capture
//! both values (see [`crate::element::ElementBuilder::build`]).
//!
//! # Implementation
//!
//! A thread-local stack of entries. Entering pushes an entry and returns a
//! guard; dropping the guard pops it. Because the pop lives in `Drop`, the
//! stack is restored on every exit path, including an early `?` return out
//! of a failed `render`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::element::Context;
use crate::tree::InstanceId;

thread_local! {
    static OWNER_STACK: RefCell<Vec<OwnerEntry>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone)]
struct OwnerEntry {
    /// Instance whose render is running, if any.
    owner: Option<InstanceId>,
    /// Unmasked context handed to elements created under this entry.
    context: Rc<Context>,
}

/// Guard that pops its entry when dropped.
pub struct OwnerScope {
    depth: usize,
}

impl OwnerScope {
    /// Make `owner` the current owner, with `context` as the context that
    /// elements created during its render will capture.
    pub(crate) fn enter(owner: InstanceId, context: Rc<Context>) -> Self {
        Self::push(OwnerEntry {
            owner: Some(owner),
            context,
        })
    }

    fn push(entry: OwnerEntry) -> Self {
        let depth = OWNER_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(entry);
            stack.len()
        });
        Self { depth }
    }
}

impl Drop for OwnerScope {
    fn drop(&mut self) {
        OWNER_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(
                stack.len(),
                self.depth,
                "OwnerScope mismatch: expected depth {}, got {}",
                self.depth,
                stack.len()
            );
            stack.pop();
        });
    }
}

/// The instance whose render is currently running, if any.
pub fn current_owner() -> Option<InstanceId> {
    OWNER_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.owner))
}

/// The unmasked context that an element created right now would capture.
pub fn current_context() -> Rc<Context> {
    OWNER_STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .map(|entry| Rc::clone(&entry.context))
            .unwrap_or_default()
    })
}

/// Whether any render-tracking entry is active on this thread.
pub fn is_active() -> bool {
    OWNER_STACK.with(|stack| !stack.borrow().is_empty())
}

/// Run `f` with `context` merged over the current context.
///
/// Elements created inside `f` capture the merged context as their
/// owner-based context. The current owner is left unchanged.
pub fn with_context<R>(context: Context, f: impl FnOnce() -> R) -> R {
    let mut merged = (*current_context()).clone();
    merged.extend(context);
    let _scope = OwnerScope::push(OwnerEntry {
        owner: current_owner(),
        context: Rc::new(merged),
    });
    f()
}
