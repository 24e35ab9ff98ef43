//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and queries.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::Keys;
use crate::error::{CacheError, Result};

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: a single key, or an object of key/value pairs
/// - `value`: the value for a single key
/// - `ttl`: optional TTL in seconds (uses the agent default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: Value,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the key shape and converts it to [`Keys`].
    pub fn keys(&self) -> Result<Keys> {
        let keys = Keys::from_value(self.key.clone())?;
        match &keys {
            Keys::One(key) if key.is_empty() => {
                Err(CacheError::InvalidRequest("Key cannot be empty".to_string()))
            }
            Keys::Pairs(pairs) if pairs.is_empty() => {
                Err(CacheError::InvalidRequest("No key/value pairs given".to_string()))
            }
            _ => Ok(keys),
        }
    }
}

/// Query for DELETE /clear
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearQuery {
    /// Key prefix (memory, redis) or sub-directory (file) to clear
    pub subset: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": {"n": 1}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, json!("test"));
        assert_eq!(req.value, Some(json!({"n": 1})));
        assert!(req.ttl.is_none());
        assert_eq!(req.keys().unwrap(), Keys::One("test".into()));
    }

    #[test]
    fn test_set_request_pairs_with_ttl() {
        let json = r#"{"key": {"a": 1, "b": 2}, "ttl": 60}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl, Some(60));
        assert!(req.value.is_none());
        assert!(matches!(req.keys().unwrap(), Keys::Pairs(p) if p.len() == 2));
    }

    #[test]
    fn test_keys_rejects_empty() {
        let req: SetRequest = serde_json::from_str(r#"{"key": "", "value": 1}"#).unwrap();
        assert!(matches!(req.keys(), Err(CacheError::InvalidRequest(_))));

        let req: SetRequest = serde_json::from_str(r#"{"key": {}}"#).unwrap();
        assert!(matches!(req.keys(), Err(CacheError::InvalidRequest(_))));

        let req: SetRequest = serde_json::from_str(r#"{"key": 7, "value": 1}"#).unwrap();
        assert!(matches!(req.keys(), Err(CacheError::InvalidKey(_))));
    }
}
