//! # Client Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! server_url = "http://localhost:8080/lego"
//! world_id = 0
//! grid_min = [-31, -31, 0]
//! grid_max = [32, 32, 63]
//! network_enabled = true
//! catchup_on_start = true
//! dispatcher_poll_ms = 50
//! request_timeout_ms = 10000
//! # client_id = 12345   # random when omitted
//! ```

use std::path::Path;
use std::time::Duration;

use bricklayer_core::WorldId;
use bricklayer_shared::constants::{
    DEFAULT_GRID_MAX, DEFAULT_GRID_MIN, DEFAULT_SERVER_URL, DEFAULT_WORLD_ID,
};
use bricklayer_shared::Vec3i;
use serde::{Deserialize, Serialize};

use crate::error::{ReplicationError, ReplicationResult};
use crate::protocol::ClientId;

/// Transaction manager and transport settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Authority endpoint.
    pub server_url: String,
    /// Namespace on the server.
    pub world_id: WorldId,
    /// Lowest grid cell.
    pub grid_min: Vec3i,
    /// Highest grid cell (inclusive).
    pub grid_max: Vec3i,
    /// Start online.
    pub network_enabled: bool,
    /// Request a catch-up as soon as the manager starts.
    pub catchup_on_start: bool,
    /// How long the idle dispatcher sleeps before rechecking for shutdown.
    pub dispatcher_poll_ms: u64,
    /// Per-request HTTP timeout.
    pub request_timeout_ms: u64,
    /// Fixed at-most-once client token; random when `None`.
    pub client_id: Option<ClientId>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            world_id: DEFAULT_WORLD_ID,
            grid_min: DEFAULT_GRID_MIN,
            grid_max: DEFAULT_GRID_MAX,
            network_enabled: true,
            catchup_on_start: true,
            dispatcher_poll_ms: 50,
            request_timeout_ms: 10_000,
            client_id: None,
        }
    }
}

impl ClientConfig {
    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Malformed TOML or a configuration [`validate`](Self::validate) refuses.
    pub fn from_toml_str(text: &str) -> ReplicationResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| ReplicationError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// I/O failure or anything [`from_toml_str`](Self::from_toml_str) rejects.
    pub fn load(path: impl AsRef<Path>) -> ReplicationResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ReplicationError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Inverted grid bounds, a zero poll interval or zero timeout.
    pub fn validate(&self) -> ReplicationResult<()> {
        if (0..3).any(|axis| self.grid_min[axis] > self.grid_max[axis]) {
            return Err(ReplicationError::Config(format!(
                "grid_min {} exceeds grid_max {}",
                self.grid_min, self.grid_max
            )));
        }
        if self.dispatcher_poll_ms == 0 {
            return Err(ReplicationError::Config("dispatcher_poll_ms must be > 0".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ReplicationError::Config("request_timeout_ms must be > 0".into()));
        }
        Ok(())
    }

    /// Dispatcher poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.dispatcher_poll_ms)
    }

    /// HTTP request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(ClientConfig::from_toml_str("").unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = ClientConfig::from_toml_str(
            r#"
            server_url = "http://example.test/lego"
            world_id = 3
            grid_min = [0, 0, 0]
            grid_max = [15, 15, 15]
            network_enabled = false
            client_id = 77
            "#,
        )
        .unwrap();
        assert_eq!(config.world_id, 3);
        assert_eq!(config.grid_max, Vec3i::splat(15));
        assert!(!config.network_enabled);
        assert!(config.catchup_on_start);
        assert_eq!(config.client_id, Some(77));
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_validation() {
        let inverted = ClientConfig::from_toml_str("grid_min = [0, 0, 9]\ngrid_max = [9, 9, 0]");
        assert!(matches!(inverted, Err(ReplicationError::Config(_))));

        let zero_poll = ClientConfig::from_toml_str("dispatcher_poll_ms = 0");
        assert!(matches!(zero_poll, Err(ReplicationError::Config(_))));

        let garbage = ClientConfig::from_toml_str("world_id = \"zero\"");
        assert!(matches!(garbage, Err(ReplicationError::Config(_))));
    }
}
