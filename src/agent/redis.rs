//! Redis Agent Module
//!
//! Values are serialized before being sent, since Redis stores strings only
//! and would otherwise lose the value type.

use std::sync::{Mutex, PoisonError};

use ::redis::{Commands, Connection, RedisResult};
use serde_json::Value;
use tracing::{info, warn};

use super::{Agent, AgentBase, AgentKind, AgentOptions, ClientHandle};
use crate::codec::Serializer;
use crate::error::AgentError;

// == Redis Agent ==
#[derive(Debug)]
pub struct RedisAgent {
    base: AgentBase,
    serializer: Serializer,
    handle: ClientHandle<Mutex<Connection>>,
}

impl RedisAgent {
    pub const HOST: &'static str = "localhost";
    pub const PORT: u16 = 6379;

    pub fn new(id: impl Into<String>, options: &AgentOptions) -> Result<Self, AgentError> {
        Ok(Self {
            base: AgentBase::new(id, AgentKind::Redis, options),
            serializer: options.serializer()?,
            handle: ClientHandle::new(
                options.host.as_deref().unwrap_or(Self::HOST),
                options.port.unwrap_or(Self::PORT),
            ),
        })
    }

    pub fn handle(&self) -> &ClientHandle<Mutex<Connection>> {
        &self.handle
    }

    /// Runs `command` on the connection, logging and swallowing failures.
    fn run<T>(&self, name: &str, command: impl FnOnce(&mut Connection) -> RedisResult<T>) -> Option<T> {
        let connection = match self.handle.client() {
            Ok(connection) => connection,
            Err(e) => {
                warn!(agent = self.base.id(), command = name, error = %e, "redis agent not initialized");
                return None;
            }
        };
        let mut connection = connection.lock().unwrap_or_else(PoisonError::into_inner);
        match command(&mut connection) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(agent = self.base.id(), command = name, error = %e, "redis command failed");
                None
            }
        }
    }
}

impl Agent for RedisAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn init(&mut self) -> Result<(), AgentError> {
        if self.handle.is_connected() {
            return Ok(());
        }
        self.handle.validate()?;

        let url = format!("redis://{}/", self.handle.address());
        let client = ::redis::Client::open(url.as_str())
            .map_err(|e| AgentError::Environment(format!("Invalid redis address {}: {}", url, e)))?;
        let connection = client.get_connection().map_err(|e| {
            AgentError::Environment(format!("Cannot connect to redis at {}: {}", url, e))
        })?;

        self.handle.set_client(Mutex::new(connection));
        info!(agent = self.base.id(), address = %self.handle.address(), "connected to redis");
        Ok(())
    }

    /// Expiry is delegated to Redis, so `_ttl` is not consulted.
    fn has(&self, key: &str, _ttl: Option<u64>) -> bool {
        self.run("EXISTS", |c| c.exists::<_, bool>(key))
            .unwrap_or(false)
    }

    /// A TTL of zero stores the value without expiry.
    fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> bool {
        let payload = match self.serializer.serialize(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(agent = self.base.id(), key, error = %e, "failed to encode cache entry");
                return false;
            }
        };
        let ttl = self.base.effective_ttl(ttl);

        self.run("SET", |c| {
            if ttl == 0 {
                c.set::<_, _, ()>(key, payload)
            } else {
                c.set_ex::<_, _, ()>(key, payload, ttl)
            }
        })
        .is_some()
    }

    fn get(&self, key: &str, default: Value, _ttl: Option<u64>) -> Value {
        let Some(payload) = self
            .run("GET", |c| c.get::<_, Option<Vec<u8>>>(key))
            .flatten()
        else {
            return default;
        };

        match self.serializer.unserialize(&payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(agent = self.base.id(), key, error = %e, "discarding unreadable redis entry");
                self.delete(key);
                default
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        self.run("DEL", |c| c.del::<_, i64>(key))
            .is_some_and(|removed| removed > 0)
    }

    /// `subset` is a key prefix; without one the current database is flushed.
    fn clear(&self, subset: Option<&str>) -> bool {
        match subset.filter(|prefix| !prefix.is_empty()) {
            Some(prefix) => self
                .run("DEL", |c| {
                    let keys: Vec<String> = c.keys(format!("{}*", prefix))?;
                    if !keys.is_empty() {
                        c.del::<_, ()>(keys)?;
                    }
                    Ok(())
                })
                .is_some(),
            None => self
                .run("FLUSHDB", |c| ::redis::cmd("FLUSHDB").query::<()>(c))
                .is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let agent = RedisAgent::new("redis", &AgentOptions::new("redis")).unwrap();
        assert_eq!(agent.handle().host(), RedisAgent::HOST);
        assert_eq!(agent.handle().port(), RedisAgent::PORT);
        assert_eq!(agent.kind(), AgentKind::Redis);
    }

    #[test]
    fn test_init_rejects_empty_host() {
        let mut agent =
            RedisAgent::new("redis", &AgentOptions::new("redis").with_host("")).unwrap();
        assert!(matches!(agent.init(), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_operations_before_init_are_soft_failures() {
        let agent = RedisAgent::new("redis", &AgentOptions::new("redis")).unwrap();
        assert!(!agent.has("k", None));
        assert!(!agent.set("k", &Value::Bool(true), None));
        assert_eq!(agent.get("k", Value::from("none"), None), Value::from("none"));
        assert!(!agent.delete("k"));
        assert!(!agent.clear(None));
    }

    #[test]
    fn test_init_unreachable_host() {
        // Port 1 is reserved and never runs redis
        let mut agent = RedisAgent::new(
            "redis",
            &AgentOptions::new("redis").with_host("127.0.0.1").with_port(1),
        )
        .unwrap();
        assert!(matches!(agent.init(), Err(AgentError::Environment(_))));
    }
}
