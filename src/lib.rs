//! Agent Cache - a key/value caching facade over pluggable storage agents
//!
//! Cache handles are created through a [`CacheFactory`] and backed by a
//! memory, file, Redis or Memcached [`Agent`](agent::Agent). Values are
//! `serde_json::Value`s, stored in PHP `serialize()` or JSON form.

pub mod agent;
pub mod api;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;

pub use agent::{Agent, AgentKind, AgentOptions};
pub use api::AppState;
pub use cache::{Cache, CacheFactory};
pub use config::Config;
pub use error::{AgentError, CacheError};
