//! Prop validation.
//!
//! Validators only produce advisory messages. Rendering never blocks on them.

use indexmap::IndexMap;
use serde_json::Value;

use super::props::Props;

/// Checks actual props against declared specs.
pub trait PropValidator {
    /// Return zero or more human-readable problems for `component`.
    fn validate(&self, component: &str, props: &Props) -> Vec<String>;
}

/// The JSON kind a prop is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    Any,
    String,
    Number,
    Bool,
    Array,
    Object,
}

impl PropKind {
    fn of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PropKind::Any => "any",
            PropKind::String => "string",
            PropKind::Number => "number",
            PropKind::Bool => "boolean",
            PropKind::Array => "array",
            PropKind::Object => "object",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            PropKind::Any => true,
            PropKind::String => value.is_string(),
            PropKind::Number => value.is_number(),
            PropKind::Bool => value.is_boolean(),
            PropKind::Array => value.is_array(),
            PropKind::Object => value.is_object(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropSpec {
    pub kind: PropKind,
    pub required: bool,
}

/// Declarative kind/required checks keyed by prop name.
#[derive(Debug, Clone, Default)]
pub struct PropTypes {
    specs: IndexMap<String, PropSpec>,
}

impl PropTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn optional(mut self, name: impl Into<String>, kind: PropKind) -> Self {
        self.specs.insert(name.into(), PropSpec { kind, required: false });
        self
    }

    pub fn required(mut self, name: impl Into<String>, kind: PropKind) -> Self {
        self.specs.insert(name.into(), PropSpec { kind, required: true });
        self
    }
}

impl PropValidator for PropTypes {
    fn validate(&self, component: &str, props: &Props) -> Vec<String> {
        let mut problems = Vec::new();
        for (name, spec) in &self.specs {
            match props.get(name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        problems.push(format!(
                            "Required prop `{name}` was not specified in `{component}`."
                        ));
                    }
                }
                Some(value) if !spec.kind.accepts(value) => {
                    problems.push(format!(
                        "Invalid prop `{name}` of type `{}` supplied to `{component}`, expected `{}`.",
                        PropKind::of(value),
                        spec.kind.name()
                    ));
                }
                Some(_) => {}
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_missing_required_prop() {
        let types = PropTypes::new().required("label", PropKind::String);
        let problems = types.validate("Button", &Props::new());
        assert_eq!(
            problems,
            vec!["Required prop `label` was not specified in `Button`.".to_owned()]
        );
    }

    #[test]
    fn reports_wrong_kind() {
        let types = PropTypes::new().optional("count", PropKind::Number);
        let problems = types.validate("Counter", &Props::new().with("count", "three"));
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("of type `string`"));
    }

    #[test]
    fn accepts_valid_props() {
        let types = PropTypes::new()
            .required("label", PropKind::String)
            .optional("disabled", PropKind::Bool);
        let props = Props::new().with("label", "ok").with("disabled", false);
        assert!(types.validate("Button", &props).is_empty());
    }
}
