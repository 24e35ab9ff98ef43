//! Memory Agent Module
//!
//! In-process agent backed by a HashMap, the counterpart of a shared-memory
//! user cache. Values are stored as-is, without serialization.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::debug;

use super::{Agent, AgentBase, AgentKind, AgentOptions, MemoryEntry};
use crate::error::AgentError;

// == Memory Agent ==
#[derive(Debug)]
pub struct MemoryAgent {
    base: AgentBase,
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryAgent {
    pub fn new(id: impl Into<String>, options: &AgentOptions) -> Self {
        Self {
            base: AgentBase::new(id, AgentKind::Memory, options),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, MemoryEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, MemoryEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes `key` if it is still expired under the write lock.
    fn collect(&self, key: &str) {
        let mut entries = self.write();
        if entries.get(key).is_some_and(MemoryEntry::is_expired) {
            entries.remove(key);
            debug!(agent = self.base.id(), key, "collected expired memory entry");
        }
    }
}

impl Agent for MemoryAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn init(&mut self) -> Result<(), AgentError> {
        Ok(())
    }

    /// Expiry is fixed when the entry is written, so `_ttl` is not consulted.
    fn has(&self, key: &str, _ttl: Option<u64>) -> bool {
        let expired = match self.read().get(key) {
            Some(entry) => entry.is_expired(),
            None => return false,
        };
        if expired {
            self.collect(key);
        }
        !expired
    }

    fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> bool {
        let entry = MemoryEntry::new(value.clone(), self.base.effective_ttl(ttl));
        self.write().insert(key.to_string(), entry);
        true
    }

    fn get(&self, key: &str, default: Value, _ttl: Option<u64>) -> Value {
        let expired = match self.read().get(key) {
            Some(entry) if !entry.is_expired() => return entry.value.clone(),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.collect(key);
        }
        default
    }

    fn delete(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    /// `subset` is a key prefix.
    fn clear(&self, subset: Option<&str>) -> bool {
        let mut entries = self.write();
        match subset {
            Some(prefix) if !prefix.is_empty() => {
                entries.retain(|key, _| !key.starts_with(prefix));
                !entries.keys().any(|key| key.starts_with(prefix))
            }
            _ => {
                entries.clear();
                entries.is_empty()
            }
        }
    }
}
