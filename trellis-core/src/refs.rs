//! Ref Registry
//!
//! Each composite instance owns a registry mapping ref names to the
//! instance currently occupying that slot in its render output. Entries are
//! keyed by name and guarded by identity: detaching only removes an entry if
//! it still points at the instance being detached, so a slot that has
//! already been claimed by a new occupant is left alone.

use indexmap::IndexMap;

use crate::tree::InstanceId;

#[derive(Debug, Default, Clone)]
pub(crate) struct RefRegistry {
    entries: IndexMap<String, InstanceId>,
}

impl RefRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `name` at `target`, displacing any previous occupant.
    pub fn attach(&mut self, name: &str, target: InstanceId) {
        let previous = self.entries.insert(name.to_owned(), target);
        tracing::debug!(
            name,
            target = target.raw(),
            previous = previous.map(|id| id.raw()),
            "attach ref"
        );
    }

    /// Remove `name` if it currently points at `target`.
    pub fn detach(&mut self, name: &str, target: InstanceId) -> bool {
        if self.entries.get(name) == Some(&target) {
            tracing::debug!(name, target = target.raw(), "detach ref");
            self.entries.shift_remove(name);
            true
        } else {
            false
        }
    }

    pub fn get(&self, name: &str) -> Option<InstanceId> {
        self.entries.get(name).copied()
    }
}
