//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Agents do blocking
//! I/O, so every cache call runs on the blocking thread pool.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::cache::{Cache, CacheFactory, Keys};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearQuery, ClearResponse, DeleteResponse, GetResponse, HasResponse, HealthResponse,
    SetRequest, SetResponse,
};

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub cache: Cache,
}

impl AppState {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Registers the configured cache in `factory` and wraps it.
    pub fn from_config(factory: &mut CacheFactory, config: &Config) -> Result<Self> {
        let cache = factory.init(&config.cache_id, &config.agent_options())?;
        Ok(Self::new(cache))
    }
}

/// Runs `f` against the cache on the blocking pool.
async fn with_cache<T, F>(state: &AppState, f: F) -> Result<T>
where
    F: FnOnce(&Cache) -> T + Send + 'static,
    T: Send + 'static,
{
    let cache = state.cache.clone();
    tokio::task::spawn_blocking(move || f(&cache))
        .await
        .map_err(|e| CacheError::Internal(e.to_string()))
}

/// Handler for PUT /set
///
/// Stores one key with `value`, or every pair of an object `key`.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let keys = req.keys()?;
    let names = match &keys {
        Keys::One(key) => vec![key.clone()],
        Keys::Pairs(pairs) => pairs.iter().map(|(key, _)| key.clone()).collect(),
        Keys::List(list) => list.clone(),
    };

    let SetRequest { value, ttl, .. } = req;
    let stored = with_cache(&state, move |cache| cache.set_keys(keys, value, ttl)).await??;

    Ok(Json(SetResponse::new(names, stored)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let lookup = key.clone();
    let value = with_cache(&state, move |cache| {
        cache.has(&lookup).then(|| cache.get(&lookup, Value::Null))
    })
    .await?;

    match value {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /has/:key
pub async fn has_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<HasResponse>> {
    let lookup = key.clone();
    let exists = with_cache(&state, move |cache| cache.has(&lookup)).await?;
    Ok(Json(HasResponse { key, exists }))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let target = key.clone();
    if with_cache(&state, move |cache| cache.delete(&target)).await? {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for DELETE /clear
///
/// Clears the whole cache, or only `subset` when given.
pub async fn clear_handler(
    State(state): State<AppState>,
    Query(query): Query<ClearQuery>,
) -> Result<Json<ClearResponse>> {
    let subset = query.subset.filter(|s| !s.is_empty());
    let scope = subset.clone();
    let cleared = with_cache(&state, move |cache| match scope.as_deref() {
        Some(subset) => cache.clear_subset(subset),
        None => cache.clear(),
    })
    .await?;

    Ok(Json(ClearResponse { subset, cleared }))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.cache.id(),
        state.cache.agent().kind().as_str(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentOptions;
    use serde_json::json;

    fn memory_state() -> AppState {
        let mut factory = CacheFactory::new();
        let cache = factory.init("test", &AgentOptions::new("apcu")).unwrap();
        AppState::new(cache)
    }

    fn set_request(body: Value) -> Json<SetRequest> {
        Json(serde_json::from_value(body).unwrap())
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = memory_state();

        let req = set_request(json!({"key": "test_key", "value": {"n": 1}}));
        let response = set_handler(State(state.clone()), req).await.unwrap();
        assert!(response.stored);
        assert_eq!(response.keys, vec!["test_key"]);

        let response = get_handler(State(state), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"n": 1}));
    }

    #[tokio::test]
    async fn test_set_pairs_handler() {
        let state = memory_state();

        let req = set_request(json!({"key": {"a": 1, "b": 2}, "ttl": 60}));
        let response = set_handler(State(state.clone()), req).await.unwrap();
        assert_eq!(response.keys, vec!["a", "b"]);
        assert!(state.cache.has_many(&["a", "b"]));
    }

    #[tokio::test]
    async fn test_set_missing_value() {
        let state = memory_state();
        let result = set_handler(State(state), set_request(json!({"key": "k"}))).await;
        assert!(matches!(result, Err(CacheError::MissingValue { .. })));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = memory_state();
        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_stored_null() {
        let state = memory_state();
        state.cache.set("nothing", &Value::Null);

        let response = get_handler(State(state), Path("nothing".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, Value::Null);
    }

    #[tokio::test]
    async fn test_has_and_delete_handler() {
        let state = memory_state();
        state.cache.set("to_delete", &json!("value"));

        let response = has_handler(State(state.clone()), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert!(response.exists);

        let response = delete_handler(State(state.clone()), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert_eq!(response.key, "to_delete");
        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));

        let response = has_handler(State(state), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert!(!response.exists);
    }

    #[tokio::test]
    async fn test_clear_handler_subset() {
        let state = memory_state();
        state.cache.set("user:1", &json!(1));
        state.cache.set("page:1", &json!(1));

        let query = ClearQuery {
            subset: Some("user:".to_string()),
        };
        let response = clear_handler(State(state.clone()), Query(query)).await.unwrap();
        assert!(response.cleared);
        assert!(!state.cache.has("user:1"));
        assert!(state.cache.has("page:1"));

        let response = clear_handler(State(state.clone()), Query(ClearQuery::default()))
            .await
            .unwrap();
        assert!(response.cleared);
        assert!(response.subset.is_none());
        assert!(!state.cache.has("page:1"));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler(State(memory_state())).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.agent, "memory");
        assert_eq!(response.cache, "test");
    }
}
