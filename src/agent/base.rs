//! Agent Base Module
//!
//! Identity and TTL state shared by every agent.

use std::sync::atomic::{AtomicU64, Ordering};

use super::{AgentKind, AgentOptions};

// == Agent Base ==
/// Immutable identity plus the agent's default TTL.
///
/// `ttl` is the only mutable field; it is atomic so a shared agent can have
/// its default changed without exclusive access.
#[derive(Debug)]
pub struct AgentBase {
    id: String,
    kind: AgentKind,
    is_static: bool,
    ttl: AtomicU64,
}

impl AgentBase {
    pub fn new(id: impl Into<String>, kind: AgentKind, options: &AgentOptions) -> Self {
        Self {
            id: id.into(),
            kind,
            is_static: options.is_static(),
            ttl: AtomicU64::new(options.ttl_or_default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Default TTL in seconds.
    pub fn ttl(&self) -> u64 {
        self.ttl.load(Ordering::Relaxed)
    }

    pub fn set_ttl(&self, ttl: u64) {
        self.ttl.store(ttl, Ordering::Relaxed);
    }

    /// Per-call TTL if given, otherwise the default.
    pub fn effective_ttl(&self, ttl: Option<u64>) -> u64 {
        ttl.unwrap_or_else(|| self.ttl())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::DEFAULT_TTL;

    #[test]
    fn test_base_defaults() {
        let base = AgentBase::new("main", AgentKind::File, &AgentOptions::new("file"));
        assert_eq!(base.id(), "main");
        assert_eq!(base.kind(), AgentKind::File);
        assert!(base.is_static());
        assert_eq!(base.ttl(), DEFAULT_TTL);
    }

    #[test]
    fn test_ttl_override() {
        let options = AgentOptions::new("file").with_ttl(60).with_static(false);
        let base = AgentBase::new("main", AgentKind::File, &options);
        assert!(!base.is_static());
        assert_eq!(base.effective_ttl(None), 60);
        assert_eq!(base.effective_ttl(Some(5)), 5);

        base.set_ttl(120);
        assert_eq!(base.ttl(), 120);
        assert_eq!(base.effective_ttl(None), 120);
    }
}
