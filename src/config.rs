//! Configuration Module
//!
//! Handles loading the server's cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::agent::{AgentOptions, DEFAULT_TTL};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Id of the cache handle the server registers
    pub cache_id: String,
    /// Backend name: file, apcu, redis or memcached
    pub agent: String,
    /// File agent directory
    pub directory: Option<PathBuf>,
    /// Default TTL in seconds
    pub ttl: u64,
    /// Serialize format, `php` or `json`
    pub serialize: String,
    pub compress: bool,
    pub compress_check: bool,
    /// Remote backend host and port; each agent has its own defaults
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_ID` - Cache id (default: "default")
    /// - `CACHE_AGENT` - Backend (default: "file")
    /// - `CACHE_DIRECTORY` - File agent directory (default: `<tmp>/agent_cache`)
    /// - `CACHE_TTL` - Default TTL in seconds (default: 3600)
    /// - `CACHE_SERIALIZE` - `php` or `json` (default: "php")
    /// - `CACHE_COMPRESS`, `CACHE_COMPRESS_CHECK` - `true`/`1` to enable
    /// - `CACHE_HOST`, `CACHE_PORT` - Redis/Memcached address
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cache_id: env::var("CACHE_ID").unwrap_or(defaults.cache_id),
            agent: env::var("CACHE_AGENT").unwrap_or(defaults.agent),
            directory: env::var_os("CACHE_DIRECTORY")
                .map(PathBuf::from)
                .or(defaults.directory),
            ttl: parse_var("CACHE_TTL").unwrap_or(defaults.ttl),
            serialize: env::var("CACHE_SERIALIZE").unwrap_or(defaults.serialize),
            compress: flag_var("CACHE_COMPRESS"),
            compress_check: flag_var("CACHE_COMPRESS_CHECK"),
            host: env::var("CACHE_HOST").ok(),
            port: parse_var("CACHE_PORT"),
        }
    }

    /// Agent options for the configured backend.
    pub fn agent_options(&self) -> AgentOptions {
        let mut options = AgentOptions::new(self.agent.as_str())
            .with_ttl(self.ttl)
            .with_serialize(self.serialize.as_str())
            .with_compress(self.compress)
            .with_compress_check(self.compress_check);
        options.directory = self.directory.clone();
        options.host = self.host.clone();
        options.port = self.port;
        options
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache_id: "default".to_string(),
            agent: "file".to_string(),
            directory: Some(env::temp_dir().join("agent_cache")),
            ttl: DEFAULT_TTL,
            serialize: "php".to_string(),
            compress: false,
            compress_check: false,
            host: None,
            port: None,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn flag_var(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
