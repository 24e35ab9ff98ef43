//! Codec Module
//!
//! Serialization strategies and the compression envelope used by agents.

mod compress;
mod php;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::AgentError;

pub use compress::{deflate, has_zlib_magic, inflate, ZLIB_MAGIC};

// == Codec Error ==
/// Per-entry encoding failure. Agents turn these into a `false`/default return.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed php payload at byte {offset}: {reason}")]
    Php { offset: usize, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

// == Serializer ==
/// Value encoding fixed for an agent's lifetime.
///
/// Entries carry no format tag, so an agent must read with the same
/// serializer it wrote with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Serializer {
    /// PHP `serialize()` text format
    #[default]
    Php,
    /// JSON text
    Json,
}

impl Serializer {
    pub fn serialize(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        match self {
            Serializer::Php => Ok(php::serialize(value).into_bytes()),
            Serializer::Json => Ok(serde_json::to_vec(value)?),
        }
    }

    pub fn unserialize(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        match self {
            Serializer::Php => php::unserialize(bytes),
            Serializer::Json => Ok(serde_json::from_slice(bytes)?),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Serializer::Php => "php",
            Serializer::Json => "json",
        }
    }
}

impl FromStr for Serializer {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "php" => Ok(Serializer::Php),
            "json" => Ok(Serializer::Json),
            _ => Err(AgentError::Config(format!(
                "Unimplemented serialize option \"{}\" given",
                s
            ))),
        }
    }
}
