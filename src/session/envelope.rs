//! The typed wrapper around one session's stored data.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One session's stored record.
///
/// Serializes as `{"store": {...}, "cause": "..."}`. Application data
/// lives exclusively in the inner `store` bucket; top-level fields are
/// reserved for bookkeeping, so internal keys can never collide with
/// application keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionEnvelope {
    store: HashMap<String, Value>,

    /// Why this session was issued (diagnostic only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cause: Option<String>,
}

impl SessionEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value from the data bucket
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.store.get(key)
    }

    /// Set a value in the data bucket
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.store.insert(key.into(), value);
    }

    /// Remove a value from the data bucket
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.store.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    pub(crate) fn set_cause(&mut self, cause: impl Into<String>) {
        self.cause = Some(cause.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bucket_operations() {
        let mut envelope = SessionEnvelope::new();
        assert!(envelope.is_empty());

        envelope.insert("user_id", json!(42));
        envelope.insert("theme", json!("dark"));

        assert_eq!(envelope.len(), 2);
        assert!(envelope.contains("user_id"));
        assert_eq!(envelope.get("user_id"), Some(&json!(42)));

        assert_eq!(envelope.remove("theme"), Some(json!("dark")));
        assert!(!envelope.contains("theme"));
    }

    #[test]
    fn test_wire_format() {
        let mut envelope = SessionEnvelope::new();
        envelope.insert("user", json!({"id": 1, "email": "a@b.c"}));

        let wire = serde_json::to_value(&envelope).unwrap();
        assert_eq!(wire["store"]["user"]["id"], 1);
        // cause is omitted when unset
        assert!(wire.get("cause").is_none());
    }

    #[test]
    fn test_cause_survives_roundtrip() {
        let mut envelope = SessionEnvelope::new();
        envelope.set_cause("new");

        let wire = serde_json::to_string(&envelope).unwrap();
        let back: SessionEnvelope = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.cause(), Some("new"));
    }

    #[test]
    fn test_cause_does_not_occupy_bucket() {
        let mut envelope = SessionEnvelope::new();
        envelope.set_cause("new");
        // An application key named "cause" is independent of the slot
        envelope.insert("cause", json!("app value"));

        assert_eq!(envelope.get("cause"), Some(&json!("app value")));
        assert_eq!(envelope.cause(), Some("new"));
    }

    #[test]
    fn test_deserializes_bare_store() {
        let envelope: SessionEnvelope = serde_json::from_str(r#"{"store": {"k": "v"}}"#).unwrap();
        assert_eq!(envelope.get("k"), Some(&serde_json::json!("v")));
        assert_eq!(envelope.cause(), None);
    }
}
