//! Memory Entry Module
//!
//! Defines the structure for entries held by the memory agent.

use serde_json::Value;

// == Memory Entry ==
/// Represents a single in-memory entry with value and expiry metadata.
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    /// The stored value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl MemoryEntry {
    // == Constructor ==
    /// Creates a new entry. A TTL of zero means the entry never expires.
    pub fn new(value: Value, ttl_seconds: u64) -> Self {
        let now = current_timestamp_ms();
        let expires_at = (ttl_seconds > 0).then(|| now.saturating_add(ttl_seconds * 1000));

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration
    /// time, so an entry is never returned after its TTL fully elapsed.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
