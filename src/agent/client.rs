//! Connection details embedded in the network agents.

use std::fmt;

use crate::error::AgentError;

// == Client Handle ==
/// Host, port and (after `init`) the connected client of a network agent.
pub struct ClientHandle<C> {
    host: String,
    port: u16,
    client: Option<C>,
}

impl<C> ClientHandle<C> {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if self.host.trim().is_empty() || self.port == 0 {
            return Err(AgentError::Config(
                "Host or port can not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    pub fn set_client(&mut self, client: C) {
        self.client = Some(client);
    }

    pub fn client(&self) -> Result<&C, AgentError> {
        self.client.as_ref().ok_or_else(|| {
            AgentError::Environment(format!("No client connected to {}", self.address()))
        })
    }
}

impl<C> fmt::Debug for ClientHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}
