//! File Agent Module
//!
//! Stores one file per key under a directory, named by the md5 of the key.
//! The file mtime is the only expiry clock: there is no index or metadata
//! file. Expired and corrupt files are removed lazily by `has()`.
//!
//! Write pipeline: `value -> serialize -> [deflate] -> locked write`.
//! Read pipeline: `read -> [inflate] -> unserialize -> value`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, SystemTime};

use fs2::FileExt;
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use super::{Agent, AgentBase, AgentKind, AgentOptions};
use crate::codec::{deflate, has_zlib_magic, inflate, CodecError, Serializer};
use crate::error::AgentError;

/// Extension of every file written by the agent.
pub const FILE_EXTENSION: &str = "cache";

// == Liveness ==
/// Outcome of inspecting a cache file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// No file
    Absent,
    /// Within its TTL window
    Live,
    /// Older than the TTL
    Expired,
    /// Empty, unreadable or failing the magic-byte check
    Corrupt,
}

impl Liveness {
    pub fn is_live(&self) -> bool {
        matches!(self, Liveness::Live)
    }

    /// Whether the file should be deleted.
    pub fn is_garbage(&self) -> bool {
        matches!(self, Liveness::Expired | Liveness::Corrupt)
    }
}

/// Inspects `path` without modifying it.
///
/// A file is live iff it exists, is non-empty, passes the zlib magic check
/// when `magic_check` is set, and `now - mtime < ttl`.
pub fn check_liveness(path: &Path, ttl: u64, magic_check: bool) -> Liveness {
    let metadata = match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => return Liveness::Absent,
    };

    if metadata.len() == 0 {
        return Liveness::Corrupt;
    }

    if magic_check && !read_head(path).is_ok_and(|head| has_zlib_magic(&head)) {
        return Liveness::Corrupt;
    }

    let Ok(modified) = metadata.modified() else {
        return Liveness::Corrupt;
    };

    // An mtime in the future counts as just written
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);

    if age < Duration::from_secs(ttl) {
        Liveness::Live
    } else {
        Liveness::Expired
    }
}

fn read_head(path: &Path) -> io::Result<[u8; 2]> {
    let mut head = [0u8; 2];
    File::open(path)?.read_exact(&mut head)?;
    Ok(head)
}

// == File Agent ==
#[derive(Debug)]
pub struct FileAgent {
    base: AgentBase,
    directory: PathBuf,
    serializer: Serializer,
    compress: bool,
    compress_check: bool,
}

impl FileAgent {
    /// Creates the agent. Fails only on an unsupported `serialize` option;
    /// the directory is validated by `init()`.
    pub fn new(id: impl Into<String>, options: &AgentOptions) -> Result<Self, AgentError> {
        Ok(Self {
            base: AgentBase::new(id, AgentKind::File, options),
            directory: options.directory.clone().unwrap_or_default(),
            serializer: options.serializer()?,
            compress: options.compress,
            compress_check: options.compress_check,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn serializer(&self) -> Serializer {
        self.serializer
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.directory
            .join(format!("{:x}.{}", md5::compute(key.as_bytes()), FILE_EXTENSION))
    }

    /// Liveness of the file backing `key`, with no side effect.
    pub fn liveness(&self, key: &str, ttl: Option<u64>) -> Liveness {
        check_liveness(
            &self.path_for(key),
            self.base.effective_ttl(ttl),
            self.compress && self.compress_check,
        )
    }

    /// Deletes `path` if `liveness` says it is expired or corrupt.
    fn collect(&self, path: &Path, liveness: Liveness) {
        if !liveness.is_garbage() {
            return;
        }
        match fs::remove_file(path) {
            Ok(()) => debug!(
                agent = self.base.id(),
                path = %path.display(),
                ?liveness,
                "collected cache file"
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                agent = self.base.id(),
                path = %path.display(),
                error = %e,
                "failed to collect cache file"
            ),
        }
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let bytes = self.serializer.serialize(value)?;
        if self.compress {
            Ok(deflate(&bytes)?)
        } else {
            Ok(bytes)
        }
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<Value, CodecError> {
        let bytes = if self.compress { inflate(&bytes)? } else { bytes };
        self.serializer.unserialize(&bytes)
    }

    /// Resolves the directory `clear()` operates on. `None` if `subset`
    /// tries to leave the cache directory.
    fn clear_target(&self, subset: Option<&str>) -> Option<PathBuf> {
        let subset = subset.map(|s| s.trim_matches('/')).unwrap_or_default();
        if subset.is_empty() {
            return Some(self.directory.clone());
        }
        let relative = Path::new(subset);
        relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
            .then(|| self.directory.join(relative))
    }
}

impl Agent for FileAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn init(&mut self) -> Result<(), AgentError> {
        if self.directory.as_os_str().is_empty() {
            return Err(AgentError::Config(
                "Cache directory must not be empty".to_string(),
            ));
        }

        if !self.directory.is_dir() {
            fs::create_dir_all(&self.directory).map_err(|e| {
                AgentError::Environment(format!(
                    "Cannot make directory {}: {}",
                    self.directory.display(),
                    e
                ))
            })?;
            info!(
                agent = self.base.id(),
                directory = %self.directory.display(),
                "created cache directory"
            );
        }

        Ok(())
    }

    fn has(&self, key: &str, ttl: Option<u64>) -> bool {
        let path = self.path_for(key);
        let liveness = check_liveness(
            &path,
            self.base.effective_ttl(ttl),
            self.compress && self.compress_check,
        );
        self.collect(&path, liveness);
        liveness.is_live()
    }

    /// A live entry is kept as is and the new value is dropped.
    fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> bool {
        if self.has(key, ttl) {
            return true;
        }

        let payload = match self.encode(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(agent = self.base.id(), key, error = %e, "failed to encode cache entry");
                return false;
            }
        };

        match write_locked(&self.path_for(key), &payload) {
            Ok(()) => true,
            Err(e) => {
                warn!(agent = self.base.id(), key, error = %e, "failed to write cache file");
                false
            }
        }
    }

    fn get(&self, key: &str, default: Value, ttl: Option<u64>) -> Value {
        if !self.has(key, ttl) {
            return default;
        }

        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            // Lost a race with another collector
            Err(_) => return default,
        };

        match self.decode(bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(agent = self.base.id(), key, error = %e, "discarding unreadable cache file");
                self.collect(&path, Liveness::Corrupt);
                default
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(agent = self.base.id(), key, error = %e, "failed to delete cache file");
                false
            }
        }
    }

    /// `subset` is a subdirectory of the cache directory.
    fn clear(&self, subset: Option<&str>) -> bool {
        let Some(target) = self.clear_target(subset) else {
            warn!(agent = self.base.id(), ?subset, "refusing to clear outside the cache directory");
            return false;
        };

        if !target.is_dir() {
            return true;
        }

        if let Err(e) = clear_with_find(&target) {
            debug!(error = %e, "find-based clear failed, walking the directory");
            clear_with_walk(&target);
        }

        let remaining = cache_files(&target).count();
        if remaining > 0 {
            warn!(agent = self.base.id(), remaining, "cache files left after clear");
        }
        remaining == 0
    }
}

// == Filesystem Helpers ==
/// Replaces the file's bytes while holding an exclusive lock.
fn write_locked(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    // Released when `file` is dropped
    file.lock_exclusive()?;
    file.set_len(0)?;
    file.write_all(bytes)?;
    file.flush()
}

fn clear_with_find(directory: &Path) -> io::Result<()> {
    let status = Command::new("find")
        .arg(directory)
        .args(["-type", "f", "-name"])
        .arg(format!("*.{}", FILE_EXTENSION))
        .arg("-delete")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;

    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("find exited with {}", status)))
    }
}

fn clear_with_walk(directory: &Path) {
    for entry in cache_files(directory) {
        if let Err(e) = fs::remove_file(entry.path()) {
            warn!(path = %entry.path().display(), error = %e, "failed to remove cache file");
        }
    }
}

fn cache_files(directory: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(directory)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == FILE_EXTENSION)
        })
}
