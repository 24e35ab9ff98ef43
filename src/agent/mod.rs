//! Agent Module
//!
//! Backend-specific implementations of the cache contract. Every agent
//! embeds an [`AgentBase`] and is driven through the [`Agent`] trait, so the
//! factory and cache handles never know which backend is active.

mod base;
mod client;
mod entry;
mod file;
mod memory;
mod options;

#[cfg(feature = "memcached")]
mod memcached;
#[cfg(feature = "redis")]
mod redis;

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{AgentError, CacheError};

// Re-export public types
pub use base::AgentBase;
pub use client::ClientHandle;
pub use entry::MemoryEntry;
pub use file::{check_liveness, FileAgent, Liveness, FILE_EXTENSION};
pub use memory::MemoryAgent;
pub use options::{AgentOptions, DEFAULT_TTL};

#[cfg(feature = "memcached")]
pub use memcached::MemcachedAgent;
#[cfg(feature = "redis")]
pub use self::redis::RedisAgent;

// == Agent Kind ==
/// Closed set of supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    /// In-process memory (the "apcu" backend)
    Memory,
    File,
    Redis,
    Memcached,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Memory => "memory",
            AgentKind::File => "file",
            AgentKind::Redis => "redis",
            AgentKind::Memcached => "memcached",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(CacheError::EmptyAgentOption),
            "memory" | "apcu" => Ok(AgentKind::Memory),
            "file" => Ok(AgentKind::File),
            "redis" => Ok(AgentKind::Redis),
            "memcached" => Ok(AgentKind::Memcached),
            _ => Err(CacheError::UnimplementedAgent(s.to_string())),
        }
    }
}

// == Agent Trait ==
/// The cache contract every backend implements.
///
/// `init` is the only fallible operation. Per-key failures are reported as
/// `false` or the caller's default so a batch can continue past a bad entry.
pub trait Agent: fmt::Debug + Send + Sync {
    /// Shared identity and TTL state.
    fn base(&self) -> &AgentBase;

    /// Prepares the backend (directory, connection). Idempotent.
    fn init(&mut self) -> Result<(), AgentError>;

    /// Returns true if `key` exists and is live.
    fn has(&self, key: &str, ttl: Option<u64>) -> bool;

    /// Stores `value` under `key`. Returns false on any write failure.
    fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> bool;

    /// Returns the stored value, or `default` when the key is not live.
    fn get(&self, key: &str, default: Value, ttl: Option<u64>) -> Value;

    /// Removes `key`. Returns whether something was actually removed.
    fn delete(&self, key: &str) -> bool;

    /// Removes all entries, or only those under `subset`.
    /// Returns true if nothing matching remains.
    fn clear(&self, subset: Option<&str>) -> bool;

    fn id(&self) -> &str {
        self.base().id()
    }

    fn kind(&self) -> AgentKind {
        self.base().kind()
    }

    fn is_static(&self) -> bool {
        self.base().is_static()
    }

    fn ttl(&self) -> u64 {
        self.base().ttl()
    }

    fn set_ttl(&self, ttl: u64) {
        self.base().set_ttl(ttl)
    }
}

// == Construction ==
/// Builds an uninitialized agent for the backend named in `options`.
pub fn build_agent(id: &str, options: &AgentOptions) -> Result<Box<dyn Agent>, CacheError> {
    let agent: Box<dyn Agent> = match options.kind()? {
        AgentKind::Memory => Box::new(MemoryAgent::new(id, options)),
        AgentKind::File => Box::new(FileAgent::new(id, options)?),
        AgentKind::Redis => redis_agent(id, options)?,
        AgentKind::Memcached => memcached_agent(id, options)?,
    };
    Ok(agent)
}

#[cfg(feature = "redis")]
fn redis_agent(id: &str, options: &AgentOptions) -> Result<Box<dyn Agent>, AgentError> {
    Ok(Box::new(RedisAgent::new(id, options)?))
}

#[cfg(not(feature = "redis"))]
fn redis_agent(_id: &str, _options: &AgentOptions) -> Result<Box<dyn Agent>, AgentError> {
    Err(AgentError::Environment(
        "Redis support not found, build with the \"redis\" feature".to_string(),
    ))
}

#[cfg(feature = "memcached")]
fn memcached_agent(id: &str, options: &AgentOptions) -> Result<Box<dyn Agent>, AgentError> {
    Ok(Box::new(MemcachedAgent::new(id, options)?))
}

#[cfg(not(feature = "memcached"))]
fn memcached_agent(_id: &str, _options: &AgentOptions) -> Result<Box<dyn Agent>, AgentError> {
    Err(AgentError::Environment(
        "Memcached support not found, build with the \"memcached\" feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_kind_from_str() {
        assert_eq!("FILE".parse::<AgentKind>().unwrap(), AgentKind::File);
        assert_eq!("apcu".parse::<AgentKind>().unwrap(), AgentKind::Memory);
        assert_eq!("memory".parse::<AgentKind>().unwrap(), AgentKind::Memory);
        assert_eq!(" redis ".parse::<AgentKind>().unwrap(), AgentKind::Redis);
        assert!(matches!(
            "".parse::<AgentKind>(),
            Err(CacheError::EmptyAgentOption)
        ));
        assert!(matches!(
            "mongo".parse::<AgentKind>(),
            Err(CacheError::UnimplementedAgent(name)) if name == "mongo"
        ));
    }

    #[test]
    fn test_build_agent_memory() {
        let agent = build_agent("sessions", &AgentOptions::new("apcu").with_ttl(5)).unwrap();
        assert_eq!(agent.id(), "sessions");
        assert_eq!(agent.kind(), AgentKind::Memory);
        assert_eq!(agent.ttl(), 5);
        assert!(agent.is_static());
    }

    #[test]
    fn test_build_agent_rejects_bad_serialize_option() {
        let options = AgentOptions::new("file")
            .with_directory("/tmp/agent-cache-unused")
            .with_serialize("yaml");
        assert!(matches!(
            build_agent("files", &options),
            Err(CacheError::Agent(AgentError::Config(_)))
        ));
    }

    #[cfg(not(feature = "memcached"))]
    #[test]
    fn test_build_agent_without_memcached_support() {
        assert!(matches!(
            build_agent("mc", &AgentOptions::new("memcached")),
            Err(CacheError::Agent(AgentError::Environment(_)))
        ));
    }
}
