//! Memcached Agent Module

use memcache::Client;
use serde_json::Value;
use tracing::{info, warn};

use super::{Agent, AgentBase, AgentKind, AgentOptions, ClientHandle};
use crate::codec::Serializer;
use crate::error::AgentError;

/// Memcached reads an expiration above 30 days as a Unix timestamp.
const MAX_RELATIVE_EXPIRATION: u64 = 60 * 60 * 24 * 30;

/// Converts a TTL in seconds to a Memcached expiration value.
///
/// Zero stays zero (no expiry). TTLs longer than 30 days become the absolute
/// time `now + ttl`.
fn expiration(ttl: u64, now: i64) -> u32 {
    if ttl <= MAX_RELATIVE_EXPIRATION {
        return ttl as u32;
    }
    let now = u64::try_from(now).unwrap_or(0);
    u32::try_from(now.saturating_add(ttl)).unwrap_or(u32::MAX)
}

// == Memcached Agent ==
#[derive(Debug)]
pub struct MemcachedAgent {
    base: AgentBase,
    serializer: Serializer,
    handle: ClientHandle<Client>,
}

impl MemcachedAgent {
    pub const HOST: &'static str = "localhost";
    pub const PORT: u16 = 11211;

    pub fn new(id: impl Into<String>, options: &AgentOptions) -> Result<Self, AgentError> {
        Ok(Self {
            base: AgentBase::new(id, AgentKind::Memcached, options),
            serializer: options.serializer()?,
            handle: ClientHandle::new(
                options.host.as_deref().unwrap_or(Self::HOST),
                options.port.unwrap_or(Self::PORT),
            ),
        })
    }

    pub fn handle(&self) -> &ClientHandle<Client> {
        &self.handle
    }

    fn client(&self) -> Option<&Client> {
        match self.handle.client() {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(agent = self.base.id(), error = %e, "memcached agent not initialized");
                None
            }
        }
    }

    fn fetch(&self, key: &str) -> Option<String> {
        match self.client()?.get::<String>(key) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(agent = self.base.id(), key, error = %e, "memcached get failed");
                None
            }
        }
    }
}

impl Agent for MemcachedAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn init(&mut self) -> Result<(), AgentError> {
        if self.handle.is_connected() {
            return Ok(());
        }
        self.handle.validate()?;

        let url = format!("memcache://{}", self.handle.address());
        let client = Client::connect(url.as_str()).map_err(|e| {
            AgentError::Environment(format!("Cannot connect to memcached at {}: {}", url, e))
        })?;

        self.handle.set_client(client);
        info!(agent = self.base.id(), address = %self.handle.address(), "connected to memcached");
        Ok(())
    }

    /// Expiry is delegated to Memcached, so `_ttl` is not consulted.
    fn has(&self, key: &str, _ttl: Option<u64>) -> bool {
        self.fetch(key).is_some()
    }

    /// A TTL of zero stores the value without expiry.
    fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> bool {
        let Some(client) = self.client() else {
            return false;
        };
        let payload = match self.serializer.serialize(value).map(String::from_utf8) {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => {
                warn!(agent = self.base.id(), key, error = %e, "cache entry is not utf-8");
                return false;
            }
            Err(e) => {
                warn!(agent = self.base.id(), key, error = %e, "failed to encode cache entry");
                return false;
            }
        };
        let expires = expiration(self.base.effective_ttl(ttl), chrono::Utc::now().timestamp());

        match client.set(key, payload.as_str(), expires) {
            Ok(()) => true,
            Err(e) => {
                warn!(agent = self.base.id(), key, error = %e, "memcached set failed");
                false
            }
        }
    }

    fn get(&self, key: &str, default: Value, _ttl: Option<u64>) -> Value {
        let Some(payload) = self.fetch(key) else {
            return default;
        };
        match self.serializer.unserialize(payload.as_bytes()) {
            Ok(value) => value,
            Err(e) => {
                warn!(agent = self.base.id(), key, error = %e, "discarding unreadable memcached entry");
                self.delete(key);
                default
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        let Some(client) = self.client() else {
            return false;
        };
        client.delete(key).unwrap_or_else(|e| {
            warn!(agent = self.base.id(), key, error = %e, "memcached delete failed");
            false
        })
    }

    /// Memcached cannot enumerate keys, so a `subset` is refused.
    fn clear(&self, subset: Option<&str>) -> bool {
        if subset.is_some_and(|prefix| !prefix.is_empty()) {
            warn!(agent = self.base.id(), ?subset, "memcached cannot clear a subset");
            return false;
        }
        let Some(client) = self.client() else {
            return false;
        };
        match client.flush() {
            Ok(()) => true,
            Err(e) => {
                warn!(agent = self.base.id(), error = %e, "memcached flush failed");
                false
            }
        }
    }
}
