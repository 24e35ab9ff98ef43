//! Cache Factory Module
//!
//! Registry of cache handles and agents keyed by id. The registry is an
//! ordinary value owned by the application; pass it (or the handles it
//! returns) to whatever needs a cache.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::Cache;
use crate::agent::{build_agent, Agent, AgentOptions};
use crate::error::{CacheError, Result};

const CACHE_PREFIX: &str = "cache";
const AGENT_PREFIX: &str = "agent";

// == Instance ==
/// A registry entry.
#[derive(Debug, Clone)]
pub enum Instance {
    Cache(Cache),
    Agent(Arc<dyn Agent>),
}

// == Cache Factory ==
/// Creates and deduplicates caches and agents.
///
/// Cache handles are always memoized by id. Agents are memoized only when
/// their options are static (the default); a non-static agent is rebuilt
/// on every `init_agent` call. Options passed for an id that is already
/// registered are ignored.
#[derive(Debug, Default)]
pub struct CacheFactory {
    instances: HashMap<String, Instance>,
}

impl CacheFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered entries, keyed `cache@<id>` or `agent@<id>`.
    pub fn instances(&self) -> impl Iterator<Item = (&str, &Instance)> {
        self.instances.iter().map(|(key, instance)| (key.as_str(), instance))
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    // == Init ==
    /// Returns the cache registered under `id`, creating it on first use.
    ///
    /// A new cache reuses the static agent registered under `options.id`
    /// (or `id` when unset) and otherwise initializes one from `options`.
    pub fn init(&mut self, id: &str, options: &AgentOptions) -> Result<Cache> {
        let key = prepare_key(CACHE_PREFIX, id);

        if let Some(Instance::Cache(cache)) = self.instances.get(&key) {
            debug!(id, "reusing cache instance");
            return Ok(cache.clone());
        }

        let agent_id = options.id.as_deref().unwrap_or(id);
        let agent = match self.find_agent_instance(agent_id) {
            Some(agent) => agent,
            None => self.init_agent(agent_id, options)?,
        };

        let cache = Cache::new(id.trim(), agent);
        self.instances.insert(key, Instance::Cache(cache.clone()));
        Ok(cache)
    }

    pub fn get_instance(&self, id: &str) -> Result<Cache> {
        self.find_instance(id).ok_or_else(|| CacheError::NoCache { id: id.to_string() })
    }

    /// Lookup-only form of [`get_instance`](Self::get_instance).
    pub fn find_instance(&self, id: &str) -> Option<Cache> {
        match self.instances.get(&prepare_key(CACHE_PREFIX, id)) {
            Some(Instance::Cache(cache)) => Some(cache.clone()),
            _ => None,
        }
    }

    // == Init Agent ==
    /// Returns the static agent registered under `id`, or builds, initializes
    /// and (if static) registers a new one.
    pub fn init_agent(&mut self, id: &str, options: &AgentOptions) -> Result<Arc<dyn Agent>> {
        let is_static = options.is_static();

        if is_static {
            if let Some(agent) = self.find_agent_instance(id) {
                debug!(id, "reusing agent instance");
                return Ok(agent);
            }
        }

        let mut agent = build_agent(id.trim(), options)?;
        agent.init()?;
        info!(id, kind = %agent.kind(), is_static, "initialized cache agent");

        let agent: Arc<dyn Agent> = Arc::from(agent);
        if is_static {
            self.instances.insert(
                prepare_key(AGENT_PREFIX, id),
                Instance::Agent(Arc::clone(&agent)),
            );
        }
        Ok(agent)
    }

    pub fn get_agent_instance(&self, id: &str) -> Result<Arc<dyn Agent>> {
        self.find_agent_instance(id)
            .ok_or_else(|| CacheError::NoCacheAgent { id: id.to_string() })
    }

    /// Lookup-only form of [`get_agent_instance`](Self::get_agent_instance).
    pub fn find_agent_instance(&self, id: &str) -> Option<Arc<dyn Agent>> {
        match self.instances.get(&prepare_key(AGENT_PREFIX, id)) {
            Some(Instance::Agent(agent)) => Some(Arc::clone(agent)),
            _ => None,
        }
    }
}

/// Namespaces `id` by instance kind so cache and agent ids never collide.
fn prepare_key(prefix: &str, id: &str) -> String {
    format!("{}@{}", prefix, id.trim())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentKind, DEFAULT_TTL};
    use crate::error::AgentError;
    use serde_json::json;
    use tempfile::TempDir;

    fn file_options(dir: &TempDir) -> AgentOptions {
        AgentOptions::new("file").with_directory(dir.path())
    }

    #[test]
    fn test_prepare_key() {
        assert_eq!(prepare_key(CACHE_PREFIX, " main "), "cache@main");
        assert_eq!(prepare_key(AGENT_PREFIX, "main"), "agent@main");
    }

    #[test]
    fn test_init_agent_requires_agent_option() {
        let mut factory = CacheFactory::new();
        assert!(matches!(
            factory.init_agent("a", &AgentOptions::default()),
            Err(CacheError::EmptyAgentOption)
        ));
        assert!(matches!(
            factory.init_agent("a", &AgentOptions::new("mongo")),
            Err(CacheError::UnimplementedAgent(_))
        ));
        assert!(factory.is_empty());
    }

    #[test]
    fn test_init_agent_propagates_init_failure() {
        let mut factory = CacheFactory::new();
        assert!(matches!(
            factory.init_agent("a", &AgentOptions::new("file")),
            Err(CacheError::Agent(AgentError::Config(_)))
        ));
        assert!(factory.find_agent_instance("a").is_none());
    }

    #[test]
    fn test_static_agent_is_deduplicated() {
        let dir = TempDir::new().unwrap();
        let mut factory = CacheFactory::new();

        let first = factory.init_agent("files", &file_options(&dir)).unwrap();
        // First writer wins: these options are ignored
        let second = factory
            .init_agent("files", &AgentOptions::new("apcu").with_ttl(1))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.kind(), AgentKind::File);
        assert_eq!(second.ttl(), DEFAULT_TTL);
        assert!(Arc::ptr_eq(&factory.get_agent_instance(" files ").unwrap(), &first));
    }

    #[test]
    fn test_non_static_agent_is_rebuilt() {
        let mut factory = CacheFactory::new();
        let options = AgentOptions::new("apcu").with_static(false);

        let first = factory.init_agent("mem", &options).unwrap();
        let second = factory.init_agent("mem", &options).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!first.is_static());
        assert!(matches!(
            factory.get_agent_instance("mem"),
            Err(CacheError::NoCacheAgent { .. })
        ));
    }

    #[test]
    fn test_init_memoizes_cache() {
        let dir = TempDir::new().unwrap();
        let mut factory = CacheFactory::new();

        let cache = factory.init("main", &file_options(&dir)).unwrap();
        cache.set("k", &json!("v"));

        let again = factory.init("main", &AgentOptions::new("apcu")).unwrap();
        assert!(Arc::ptr_eq(cache.agent(), again.agent()));
        assert_eq!(again.get("k", json!(null)), json!("v"));

        let found = factory.get_instance("main").unwrap();
        assert_eq!(found.id(), "main");
        assert_eq!(factory.len(), 2);
    }

    #[test]
    fn test_cache_is_memoized_even_with_non_static_agent() {
        let mut factory = CacheFactory::new();
        let options = AgentOptions::new("apcu").with_static(false);

        let cache = factory.init("volatile", &options).unwrap();
        let again = factory.init("volatile", &options).unwrap();

        assert!(Arc::ptr_eq(cache.agent(), again.agent()));
        assert!(factory.find_agent_instance("volatile").is_none());
    }

    #[test]
    fn test_init_reuses_agent_by_option_id() {
        let dir = TempDir::new().unwrap();
        let mut factory = CacheFactory::new();
        let shared = factory.init_agent("shared", &file_options(&dir)).unwrap();

        let pages = factory
            .init("pages", &AgentOptions::default().with_id("shared"))
            .unwrap();
        let users = factory
            .init("users", &AgentOptions::default().with_id("shared"))
            .unwrap();

        assert!(Arc::ptr_eq(pages.agent(), &shared));
        assert!(Arc::ptr_eq(users.agent(), &shared));
    }

    #[test]
    fn test_cache_and_agent_ids_do_not_collide() {
        let mut factory = CacheFactory::new();
        factory.init("same", &AgentOptions::new("apcu")).unwrap();

        assert!(factory.find_instance("same").is_some());
        assert!(factory.find_agent_instance("same").is_some());

        let mut keys: Vec<&str> = factory.instances().map(|(key, _)| key).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["agent@same", "cache@same"]);
    }

    #[test]
    fn test_get_instance_missing() {
        let factory = CacheFactory::new();
        let err = factory.get_instance("nope").unwrap_err();
        assert!(matches!(err, CacheError::NoCache { ref id } if id == "nope"));
        assert!(err.to_string().contains("CacheFactory::init()"));
        assert!(factory.find_instance("nope").is_none());
    }
}
