//! Agent Options Module
//!
//! Construction options recognized by the factory and the agents.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::AgentKind;
use crate::codec::Serializer;
use crate::error::{AgentError, CacheError};

// == Public Constants ==
/// Default TTL in seconds (1 hour)
pub const DEFAULT_TTL: u64 = 3600;

// == Agent Options ==
/// Options for one agent. Unknown keys are ignored when deserializing;
/// each agent reads only the options that concern it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentOptions {
    /// Agent id to reuse when initializing a cache handle
    pub id: Option<String>,
    /// Backend name: file, apcu (memory), redis or memcached
    pub agent: Option<String>,
    /// File agent: directory holding the `.cache` files
    pub directory: Option<PathBuf>,
    /// Serialize format name, `php` or `json`
    pub serialize: Option<String>,
    /// File agent: zlib-compress serialized data
    pub compress: bool,
    /// File agent: verify zlib magic bytes before trusting a file
    pub compress_check: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Default TTL in seconds
    pub ttl: Option<u64>,
    /// Whether the factory memoizes the agent by id (default true)
    #[serde(rename = "static")]
    pub static_instance: Option<bool>,
}

impl AgentOptions {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: Some(agent.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_serialize(mut self, serialize: impl Into<String>) -> Self {
        self.serialize = Some(serialize.into());
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_compress_check(mut self, compress_check: bool) -> Self {
        self.compress_check = compress_check;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_static(mut self, static_instance: bool) -> Self {
        self.static_instance = Some(static_instance);
        self
    }

    pub fn is_static(&self) -> bool {
        self.static_instance.unwrap_or(true)
    }

    pub fn ttl_or_default(&self) -> u64 {
        self.ttl.unwrap_or(DEFAULT_TTL)
    }

    /// Parses the `agent` option.
    pub fn kind(&self) -> Result<AgentKind, CacheError> {
        self.agent
            .as_deref()
            .ok_or(CacheError::EmptyAgentOption)?
            .parse()
    }

    /// Parses the `serialize` option, defaulting to `php`.
    pub fn serializer(&self) -> Result<Serializer, AgentError> {
        match self.serialize.as_deref() {
            Some(name) => name.parse(),
            None => Ok(Serializer::default()),
        }
    }
}
