//! Cache Handle Module
//!
//! Binds one id to one agent and adds multi-key operations on top of it.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::agent::Agent;
use crate::error::{CacheError, Result};

// == Keys ==
/// Dynamically typed key argument, as received from JSON callers.
#[derive(Debug, Clone, PartialEq)]
pub enum Keys {
    One(String),
    List(Vec<String>),
    /// Key/value pairs in input order
    Pairs(Vec<(String, Value)>),
}

impl Keys {
    /// Accepts a string, an array of strings or an object of key/value pairs.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(key) => Ok(Keys::One(key)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(key) => Ok(key),
                    other => Err(CacheError::InvalidKey(format!(
                        "expected a string key, got {}",
                        type_name(&other)
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Keys::List),
            Value::Object(map) => Ok(Keys::Pairs(map.into_iter().collect())),
            other => Err(CacheError::InvalidKey(format!(
                "unsupported key type {}",
                type_name(&other)
            ))),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// == Cache ==
/// Cheap-to-clone handle over a shared agent.
#[derive(Debug, Clone)]
pub struct Cache {
    id: String,
    agent: Arc<dyn Agent>,
}

impl Cache {
    pub fn new(id: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        Self {
            id: id.into(),
            agent,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }

    // == Has ==
    pub fn has(&self, key: &str) -> bool {
        self.agent.has(key, None)
    }

    pub fn has_with_ttl(&self, key: &str, ttl: u64) -> bool {
        self.agent.has(key, Some(ttl))
    }

    /// True iff every key is live. Stops at the first miss.
    pub fn has_many<K: AsRef<str>>(&self, keys: &[K]) -> bool {
        keys.iter().all(|key| self.has(key.as_ref()))
    }

    // == Set ==
    pub fn set(&self, key: &str, value: &Value) -> bool {
        self.agent.set(key, value, None)
    }

    pub fn set_with_ttl(&self, key: &str, value: &Value, ttl: u64) -> bool {
        self.agent.set(key, value, Some(ttl))
    }

    /// Writes pairs in order and returns the result of the last write.
    pub fn set_many<I, K>(&self, entries: I) -> bool
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        self.set_pairs(entries, None)
    }

    fn set_pairs<I, K>(&self, entries: I, ttl: Option<u64>) -> bool
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut last = false;
        for (key, value) in entries {
            last = self.agent.set(key.as_ref(), &value, ttl);
        }
        last
    }

    /// Serializes `value` through serde before storing it.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<bool> {
        let value =
            serde_json::to_value(value).map_err(|e| CacheError::InvalidValue(e.to_string()))?;
        Ok(self.set(key, &value))
    }

    /// Dynamic entry point: one key with a value, or key/value pairs.
    pub fn set_keys(&self, keys: Keys, value: Option<Value>, ttl: Option<u64>) -> Result<bool> {
        match keys {
            Keys::One(key) => {
                let value = value.ok_or(CacheError::MissingValue { key: key.clone() })?;
                Ok(self.agent.set(&key, &value, ttl))
            }
            Keys::Pairs(pairs) => Ok(self.set_pairs(pairs, ttl)),
            Keys::List(_) => Err(CacheError::InvalidKey(
                "a key list cannot be set, pass an object of key/value pairs".to_string(),
            )),
        }
    }

    // == Get ==
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.agent.get(key, default, None)
    }

    pub fn get_with_ttl(&self, key: &str, default: Value, ttl: u64) -> Value {
        self.agent.get(key, default, Some(ttl))
    }

    /// Values aligned with `keys`; an empty key list yields an empty list.
    pub fn get_many<K: AsRef<str>>(&self, keys: &[K], default: Value) -> Vec<Value> {
        keys.iter()
            .map(|key| self.agent.get(key.as_ref(), default.clone(), None))
            .collect()
    }

    /// Deserializes the stored value, `None` on a miss or a type mismatch.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.has(key) {
            return None;
        }
        serde_json::from_value(self.get(key, Value::Null)).ok()
    }

    // == Delete ==
    pub fn delete(&self, key: &str) -> bool {
        self.agent.delete(key)
    }

    /// Deletes every key; true iff each one was actually removed.
    pub fn delete_many<K: AsRef<str>>(&self, keys: &[K]) -> bool {
        keys.iter()
            .fold(true, |all, key| self.agent.delete(key.as_ref()) && all)
    }

    // == Clear ==
    pub fn clear(&self) -> bool {
        self.agent.clear(None)
    }

    pub fn clear_subset(&self, subset: &str) -> bool {
        self.agent.clear(Some(subset))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentOptions, FileAgent, MemoryAgent};
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::TempDir;

    fn memory_cache() -> Cache {
        let agent = MemoryAgent::new("memory", &AgentOptions::new("apcu"));
        Cache::new("test", Arc::new(agent))
    }

    fn file_cache(dir: &TempDir) -> Cache {
        let mut agent =
            FileAgent::new("files", &AgentOptions::new("file").with_directory(dir.path())).unwrap();
        agent.init().unwrap();
        Cache::new("test", Arc::new(agent))
    }

    #[test]
    fn test_keys_from_value() {
        assert_eq!(Keys::from_value(json!("a")).unwrap(), Keys::One("a".into()));
        assert_eq!(
            Keys::from_value(json!(["a", "b"])).unwrap(),
            Keys::List(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            Keys::from_value(json!({"b": 2, "a": 1})).unwrap(),
            Keys::Pairs(vec![("b".into(), json!(2)), ("a".into(), json!(1))])
        );
        assert!(matches!(Keys::from_value(json!(5)), Err(CacheError::InvalidKey(_))));
        assert!(matches!(
            Keys::from_value(json!(["a", 1])),
            Err(CacheError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_has_many_is_and() {
        let cache = memory_cache();
        cache.set("k1", &json!(1));
        cache.set("k2", &json!(2));

        assert!(cache.has_many(&["k1", "k2"]));
        cache.delete("k2");
        assert!(!cache.has_many(&["k1", "k2"]));
        assert!(cache.has("k1"));
    }

    #[test]
    fn test_set_many_returns_last_result() {
        let dir = TempDir::new().unwrap();
        let cache = file_cache(&dir);

        assert!(cache.set_many(vec![("a", json!(1)), ("b", json!(2))]));
        assert_eq!(cache.get_many(&["a", "b"], Value::Null), vec![json!(1), json!(2)]);
        assert!(!cache.set_many(Vec::<(String, Value)>::new()));
    }

    #[test]
    fn test_get_many_keeps_order_and_defaults() {
        let cache = memory_cache();
        cache.set("b", &json!("B"));

        assert_eq!(
            cache.get_many(&["missing", "b"], json!("none")),
            vec![json!("none"), json!("B")]
        );
        assert!(cache.get_many::<&str>(&[], json!("none")).is_empty());
    }

    #[test]
    fn test_set_keys_arity() {
        let cache = memory_cache();

        assert!(matches!(
            cache.set_keys(Keys::One("k".into()), None, None),
            Err(CacheError::MissingValue { key }) if key == "k"
        ));
        assert!(cache.set_keys(Keys::One("k".into()), Some(json!(1)), None).unwrap());
        assert!(cache
            .set_keys(Keys::Pairs(vec![("x".into(), json!(true))]), None, Some(60))
            .unwrap());
        assert!(cache.has_many(&["k", "x"]));
        assert!(cache.set_keys(Keys::List(vec!["k".into()]), Some(json!(1)), None).is_err());
    }

    #[test]
    fn test_delete_many_attempts_every_key() {
        let cache = memory_cache();
        cache.set("a", &json!(1));
        cache.set("c", &json!(3));

        assert!(!cache.delete_many(&["a", "b", "c"]));
        assert!(!cache.has("a"));
        assert!(!cache.has("c"));
    }

    #[test]
    fn test_typed_put_and_get() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct User {
            n: String,
        }

        let dir = TempDir::new().unwrap();
        let cache = file_cache(&dir);
        let user = User { n: "a".into() };

        assert!(cache.put("user:1", &user).unwrap());
        assert_eq!(cache.get_as::<User>("user:1"), Some(user));
        assert_eq!(cache.get_as::<User>("user:2"), None);
        assert_eq!(cache.get_as::<u32>("user:1"), None);
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let cache = file_cache(&dir);
        cache.set("a", &json!(1));
        cache.set("b", &json!(2));

        assert!(cache.clear());
        assert!(!cache.has("a"));
        assert!(!cache.has("b"));
    }
}
