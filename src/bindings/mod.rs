//! Variable bindings
//!
//! A binding maps a variable name to the ordered values extracted for it
//! from a payload: one value for a plain occurrence, several for a pattern
//! found under a wildcard array position.

use serde_json::Value;

/// Insertion-ordered map from variable name to extracted values.
///
/// Callers always receive an instance, never an absent one: binding against
/// an empty or null candidate yields an empty set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<(String, Vec<Value>)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a single value, replacing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entry_mut(&name) {
            Some(values) => *values = vec![value],
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Append a value to `name`, creating the binding if absent. Used for
    /// wildcard array positions where traversal order must be preserved.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entry_mut(&name) {
            Some(values) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// The first (usually only) value bound to `name`.
    pub fn first(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(<[Value]>::first)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Bound names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Layer `other` underneath: entries already present here win, entries
    /// only in `other` are appended. Used to apply caller-supplied defaults
    /// after payload extraction.
    pub fn merge_missing_from(&mut self, other: &Bindings) {
        for (name, values) in &other.entries {
            if !self.contains(name) {
                self.entries.push((name.clone(), values.clone()));
            }
        }
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut Vec<Value>> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

impl FromIterator<(String, Value)> for Bindings {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut bindings = Bindings::new();
        for (name, value) in iter {
            bindings.push(name, value);
        }
        bindings
    }
}

/// Mechanism for retrieving variable bindings from a candidate document.
///
/// An empty or null candidate results in an empty (never absent) set of
/// bindings.
pub trait VariablesFetcher {
    fn fetch(&self, candidate: &Value) -> Bindings;

    /// The variable names this fetcher tracks, in template order.
    fn names(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bind_replaces_push_appends() {
        let mut b = Bindings::new();
        b.bind("A", json!(1));
        b.bind("A", json!(2));
        assert_eq!(b.get("A").unwrap(), &[json!(2)]);

        b.push("B", json!("x"));
        b.push("B", json!("y"));
        assert_eq!(b.get("B").unwrap(), &[json!("x"), json!("y")]);
        assert_eq!(b.names(), vec!["A", "B"]);
    }

    #[test]
    fn test_merge_missing_keeps_existing() {
        let mut b = Bindings::new();
        b.bind("A", json!("payload"));

        let mut defaults = Bindings::new();
        defaults.bind("A", json!("default"));
        defaults.bind("B", json!("fallback"));

        b.merge_missing_from(&defaults);
        assert_eq!(b.first("A"), Some(&json!("payload")));
        assert_eq!(b.first("B"), Some(&json!("fallback")));
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let b: Bindings = [
            ("Z".to_string(), json!(1)),
            ("A".to_string(), json!(2)),
            ("M".to_string(), json!(3)),
        ]
        .into_iter()
        .collect();
        assert_eq!(b.names(), vec!["Z", "A", "M"]);
    }
}
