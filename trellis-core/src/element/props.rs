//! Props, State and Context values.
//!
//! All three are string-keyed maps of JSON values. Props additionally keep
//! track of keys that were passed explicitly as "undefined": such a key is
//! treated as absent when defaults are merged, while an explicit `null` is a
//! real value and wins over the default.

use indexmap::IndexMap;
use serde_json::Value;

/// Component state. Updates are shallow merges of partial states.
pub type State = IndexMap<String, Value>;

/// Context visible to one instance, or handed down to its children.
pub type Context = IndexMap<String, Value>;

/// The props of an element.
///
/// Equality ignores insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    entries: IndexMap<String, Option<Value>>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder-style insert of an explicitly undefined key.
    pub fn with_undefined(mut self, key: impl Into<String>) -> Self {
        self.entries.insert(key.into(), None);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), Some(value.into()));
    }

    /// Remove a key entirely, returning its value if it was defined.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key).flatten()
    }

    /// The value for `key`, or `None` when absent or undefined.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).and_then(Option::as_ref)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Whether `key` was passed explicitly as undefined.
    pub fn is_undefined(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(None))
    }

    /// Defined entries, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|value| (key.as_str(), value)))
    }

    /// Number of defined entries.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A new props value with `defaults` filled in for every key that is
    /// absent or undefined here. `self` is left untouched.
    pub fn with_defaults(&self, defaults: &Props) -> Props {
        let mut merged = self.clone();
        for (key, value) in defaults.iter() {
            let slot = merged.entries.entry(key.to_owned()).or_insert(None);
            if slot.is_none() {
                *slot = Some(value.clone());
            }
        }
        merged
    }

    /// A new props value with `partial` overlaid on top of `self`.
    pub fn merged(&self, partial: &Props) -> Props {
        let mut merged = self.clone();
        for (key, value) in &partial.entries {
            merged.entries.insert(key.clone(), value.clone());
        }
        merged
    }
}

impl<K, V> FromIterator<(K, V)> for Props
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Props::new();
        for (key, value) in iter {
            props.set(key, value);
        }
        props
    }
}

/// Keep only the keys `declared` from `context`, in declaration order.
pub fn mask_context(context: &Context, declared: &[String]) -> Context {
    declared
        .iter()
        .filter_map(|key| context.get(key).map(|value| (key.clone(), value.clone())))
        .collect()
}

/// Render a possibly missing context or prop value for messages.
pub(crate) fn describe_value(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_owned(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_absent_and_undefined() {
        let defaults = Props::new().with("prop", "testKey");

        let absent = Props::new().with_defaults(&defaults);
        assert_eq!(absent.get("prop"), Some(&json!("testKey")));

        let undefined = Props::new().with_undefined("prop").with_defaults(&defaults);
        assert_eq!(undefined.get("prop"), Some(&json!("testKey")));

        let null = Props::new().with("prop", Value::Null).with_defaults(&defaults);
        assert_eq!(null.get("prop"), Some(&Value::Null));
    }

    #[test]
    fn defaults_do_not_mutate_input() {
        let input = Props::new();
        let merged = input.with_defaults(&Props::new().with("prop", "testKey"));

        assert!(merged.contains("prop"));
        assert!(!input.contains("prop"));
    }

    #[test]
    fn equality_ignores_order() {
        let a = Props::new().with("x", 1).with("y", 2);
        let b = Props::new().with("y", 2).with("x", 1);
        assert_eq!(a, b);
    }

    #[test]
    fn merged_overlays_partial() {
        let base = Props::new().with("a", 1).with("b", 2);
        let next = base.merged(&Props::new().with("b", 3));
        assert_eq!(next.get("a"), Some(&json!(1)));
        assert_eq!(next.get("b"), Some(&json!(3)));
        assert_eq!(base.get("b"), Some(&json!(2)));
    }

    #[test]
    fn mask_keeps_declared_keys_only() {
        let context: Context = [("foo".to_owned(), json!("bar")), ("depth".to_owned(), json!(0))]
            .into_iter()
            .collect();
        let masked = mask_context(&context, &["foo".to_owned(), "missing".to_owned()]);
        assert_eq!(masked.len(), 1);
        assert_eq!(masked.get("foo"), Some(&json!("bar")));
    }
}
