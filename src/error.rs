//! Error types for the cache facade
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Agent Error Enum ==
/// Fatal errors raised while constructing or initializing an agent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Invalid or missing option (empty directory, unknown serialize format)
    #[error("Invalid agent configuration: {0}")]
    Config(String),

    /// Backend not usable (directory uncreatable, host unreachable, backend not compiled in)
    #[error("Agent environment error: {0}")]
    Environment(String),
}

// == Cache Error Enum ==
/// Unified error type for the factory, cache handles and the HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// No `agent` option was given
    #[error("Option \"agent\" is empty")]
    EmptyAgentOption,

    /// The `agent` option names a backend outside the supported set
    #[error("Unimplemented agent \"{0}\"")]
    UnimplementedAgent(String),

    /// Lookup of a cache handle that was never initialized
    #[error("No cache initiated with id \"{id}\", call CacheFactory::init() to initiate it first")]
    NoCache { id: String },

    /// Lookup of an agent that was never registered as static
    #[error(
        "No cache agent initiated with id \"{id}\" as static, call CacheFactory::init_agent() \
         with static=true option to initiate it first"
    )]
    NoCacheAgent { id: String },

    /// Single-key set without a value
    #[error("Missing value for key \"{key}\"")]
    MissingValue { key: String },

    /// Key argument of an unsupported type
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Value that cannot be represented as a cache value
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Agent construction or initialization failure
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::MissingValue { .. }
            | CacheError::InvalidKey(_)
            | CacheError::InvalidValue(_)
            | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::NoCache { .. } | CacheError::NoCacheAgent { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::EmptyAgentOption
            | CacheError::UnimplementedAgent(_)
            | CacheError::Agent(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache facade.
pub type Result<T> = std::result::Result<T, CacheError>;
