//! ExecutionContext: keyed values accumulated across pipeline stages
//!
//! Insertion-ordered and append-only: a key, once written, is never
//! overwritten. Stages receive a narrowed copy built with `select`, never
//! the accumulated context itself.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ContextError {
    #[error("context key already set: {0}")]
    DuplicateKey(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    entries: Vec<(String, Value)>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; a repeated key keeps its first value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if self.get(&key).is_none() {
            self.entries.push((key, value.into()));
        }
        self
    }

    /// Append a new key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), ContextError> {
        let key = key.into();
        if self.get(&key).is_some() {
            return Err(ContextError::DuplicateKey(key));
        }
        self.entries.push((key, value.into()));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Resolve a dotted path: the first segment is a context key, the rest
    /// index into nested JSON objects.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let root = self.get(parts.next()?)?;
        parts.try_fold(root, |value, key| value.get(key))
    }

    /// Array at `path`, or an empty slice.
    pub fn array_at(&self, path: &str) -> &[Value] {
        self.get_path(path)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn str_at(&self, path: &str) -> Option<&str> {
        self.get_path(path).and_then(Value::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A copy holding only `keys`, in the order given. Absent keys are skipped.
    pub fn select(&self, keys: &[&str]) -> ExecutionContext {
        let entries = keys
            .iter()
            .filter_map(|k| self.get(k).map(|v| (k.to_string(), v.clone())))
            .collect();
        ExecutionContext { entries }
    }

    /// Pretty JSON for prompt assembly, keys in insertion order.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Serialize for ExecutionContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_is_append_only() {
        let mut ctx = ExecutionContext::new();
        ctx.insert("plan", json!({"a": 1})).unwrap();
        let err = ctx.insert("plan", json!({"a": 2})).unwrap_err();
        assert_eq!(err, ContextError::DuplicateKey("plan".into()));
        assert_eq!(ctx.get("plan"), Some(&json!({"a": 1})));
    }

    #[test]
    fn select_narrows_in_requested_order() {
        let ctx = ExecutionContext::new()
            .with("plan", json!(1))
            .with("analysis", json!(2))
            .with("hypotheses", json!(3));

        let narrowed = ctx.select(&["hypotheses", "plan", "missing"]);
        assert_eq!(narrowed.keys().collect::<Vec<_>>(), vec!["hypotheses", "plan"]);
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn serializes_in_insertion_order() {
        let ctx = ExecutionContext::new().with("zeta", 1).with("alpha", 2);
        let text = serde_json::to_string(&ctx).unwrap();
        assert_eq!(text, r#"{"zeta":1,"alpha":2}"#);
    }

    #[test]
    fn path_lookup() {
        let ctx = ExecutionContext::new().with(
            "analysis",
            json!({"low_ctr_campaigns": [{"campaign_name": "A"}], "note": "x"}),
        );
        assert_eq!(ctx.array_at("analysis.low_ctr_campaigns").len(), 1);
        assert_eq!(ctx.str_at("analysis.note"), Some("x"));
        assert!(ctx.array_at("analysis.none").is_empty());
        assert!(ctx.get_path("missing.key").is_none());
    }
}
