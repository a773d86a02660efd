//! Advisories
//!
//! Warning-only conditions. Each is logged once through `tracing` and kept
//! in an in-memory log so hosts and tests can inspect what was reported.
//! Execution always continues after an advisory.

use std::collections::HashSet;
use std::fmt;

/// Which render phase an advisory was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Mounting,
    Updating,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Mounting => f.write_str("mounting"),
            Phase::Updating => f.write_str("updating"),
        }
    }
}

/// A usage problem that does not stop rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    NonBooleanShouldUpdate {
        component: String,
    },
    NestedRender,
    ContextDivergence {
        component: String,
        key: String,
        owner_value: String,
        parent_value: String,
        phase: Phase,
    },
    DuplicateKey {
        key: String,
    },
    InvalidProp {
        component: String,
        message: String,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::NonBooleanShouldUpdate { component } => write!(
                f,
                "{component}.shouldComponentUpdate(): Returned undefined instead of a boolean \
                 value. Make sure to return true or false."
            ),
            Advisory::NestedRender => f.write_str(
                "render(): Render methods should be a pure function of props and state; \
                 triggering nested component updates from render is not allowed. If necessary, \
                 trigger nested updates in componentDidUpdate.",
            ),
            Advisory::ContextDivergence {
                component,
                key,
                owner_value,
                parent_value,
                phase,
            } => write!(
                f,
                "owner-based and parent-based contexts differ (values: `{owner_value}` vs \
                 `{parent_value}`) for key ({key}) while {phase} {component}"
            ),
            Advisory::DuplicateKey { key } => write!(
                f,
                "flattenChildren(...): Encountered two children with the same key, `{key}`. \
                 Child keys must be unique; when two children share a key, only the first \
                 child will be used."
            ),
            Advisory::InvalidProp { message, .. } => write!(f, "Failed propType: {message}"),
        }
    }
}

impl Advisory {
    /// Identity used for de-duplication. A context divergence is one
    /// report per key and value pair, whichever phase first saw it.
    fn dedupe_key(&self) -> String {
        match self {
            Advisory::ContextDivergence {
                key,
                owner_value,
                parent_value,
                ..
            } => format!("context:{key}:{owner_value}:{parent_value}"),
            other => other.to_string(),
        }
    }

    fn component(&self) -> Option<&str> {
        match self {
            Advisory::NonBooleanShouldUpdate { component }
            | Advisory::ContextDivergence { component, .. }
            | Advisory::InvalidProp { component, .. } => Some(component),
            Advisory::NestedRender | Advisory::DuplicateKey { .. } => None,
        }
    }
}

/// Recorded advisories plus the de-duplication set, keyed by component
/// type and [`Advisory::dedupe_key`].
#[derive(Debug, Default)]
pub(crate) struct AdvisoryLog {
    dedupe: bool,
    seen: HashSet<(Option<u64>, String)>,
    entries: Vec<Advisory>,
}

impl AdvisoryLog {
    pub fn new(dedupe: bool) -> Self {
        Self {
            dedupe,
            ..Self::default()
        }
    }

    /// Record `advisory` raised on behalf of the component type `source`.
    ///
    /// Returns `false` when an identical advisory for the same source was
    /// already reported.
    pub fn report(&mut self, source: Option<u64>, advisory: Advisory) -> bool {
        if self.dedupe && !self.seen.insert((source, advisory.dedupe_key())) {
            return false;
        }
        let message = advisory.to_string();
        match advisory.component() {
            Some(component) => tracing::warn!(component, "Warning: {message}"),
            None => tracing::warn!("Warning: {message}"),
        }
        self.entries.push(advisory);
        true
    }

    pub fn entries(&self) -> &[Advisory] {
        &self.entries
    }

    pub fn take(&mut self) -> Vec<Advisory> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn divergence(owner: &str) -> Advisory {
        divergence_in(owner, Phase::Mounting)
    }

    fn divergence_in(owner: &str, phase: Phase) -> Advisory {
        Advisory::ContextDivergence {
            component: "Component".to_owned(),
            key: "foo".to_owned(),
            owner_value: owner.to_owned(),
            parent_value: "bar".to_owned(),
            phase,
        }
    }

    #[test]
    fn context_divergence_message() {
        assert_eq!(
            divergence("noise").to_string(),
            "owner-based and parent-based contexts differ (values: `noise` vs `bar`) for key \
             (foo) while mounting Component"
        );
    }

    #[test]
    fn duplicate_reports_are_suppressed() {
        let mut log = AdvisoryLog::new(true);
        assert!(log.report(Some(1), divergence("noise")));
        assert!(!log.report(Some(1), divergence("noise")));
        assert!(log.report(Some(1), divergence("other")));
        assert!(log.report(Some(2), divergence("noise")));
        assert_eq!(log.entries().len(), 3);
    }

    #[test]
    fn divergence_is_reported_once_across_phases() {
        let mut log = AdvisoryLog::new(true);
        assert!(log.report(Some(1), divergence_in("noise", Phase::Mounting)));
        assert!(!log.report(Some(1), divergence_in("noise", Phase::Updating)));
        assert!(log.report(Some(1), divergence_in("other", Phase::Updating)));
        assert_eq!(log.entries().len(), 2);
    }

    #[test]
    fn dedupe_can_be_disabled() {
        let mut log = AdvisoryLog::new(false);
        log.report(None, Advisory::NestedRender);
        log.report(None, Advisory::NestedRender);
        assert_eq!(log.take().len(), 2);
        assert!(log.entries().is_empty());
    }

    #[traced_test]
    #[test]
    fn reports_reach_the_log_once() {
        let mut log = AdvisoryLog::new(true);
        log.report(Some(7), Advisory::NestedRender);
        log.report(Some(7), Advisory::NestedRender);

        assert!(logs_contain("Warning: render(): Render methods should be a pure function"));
        logs_assert(|lines: &[&str]| {
            match lines.iter().filter(|line| line.contains("Render methods")).count() {
                1 => Ok(()),
                n => Err(format!("expected one advisory line, got {n}")),
            }
        });
    }
}
