//! TOML file configuration structures.
//!
//! These structs directly map to the `rideshare-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dispatch: DispatchSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:50054").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 50054))
}

/// Dispatch timing section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSection {
    /// Seconds a ride stays pending before it is auto-rejected.
    #[serde(default = "default_offer_timeout_secs")]
    pub offer_timeout_secs: u64,
    /// Seconds a completed or auto-rejected ride is kept. Absent keeps
    /// rides forever.
    #[serde(default)]
    pub ride_retention_secs: Option<u64>,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            offer_timeout_secs: default_offer_timeout_secs(),
            ride_retention_secs: None,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_offer_timeout_secs() -> u64 {
    10
}

fn default_sweep_interval_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "0.0.0.0:3000"

[dispatch]
offer_timeout_secs = 15
ride_retention_secs = 3600
sweep_interval_secs = 30
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.dispatch.offer_timeout_secs, 15);
        assert_eq!(config.dispatch.ride_retention_secs, Some(3600));
        assert_eq!(config.dispatch.sweep_interval_secs, 30);
    }

    #[test]
    fn test_defaults_apply_to_missing_sections() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:50054".parse().unwrap());
        assert_eq!(config.dispatch.offer_timeout_secs, 10);
        assert_eq!(config.dispatch.ride_retention_secs, None);
        assert_eq!(config.dispatch.sweep_interval_secs, 60);
    }

    #[test]
    fn test_partial_dispatch_section() {
        let config: FileConfig = toml::from_str("[dispatch]\noffer_timeout_secs = 3\n").unwrap();
        assert_eq!(config.dispatch.offer_timeout_secs, 3);
        assert_eq!(config.dispatch.sweep_interval_secs, 60);
    }
}
