//! Client configuration loaded from TOML.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub lsd: LsdConfig,
}

/// Listener and swarm settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Addresses the peer listener is bound to.
    #[serde(default = "default_listen_addrs")]
    pub listen_addrs: Vec<String>,
    /// Interface addresses of this host, for recognising our own
    /// announcements behind an unspecified bind.
    #[serde(default)]
    pub local_ips: Vec<String>,
    #[serde(default = "default_max_peers")]
    pub max_peers_per_torrent: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            listen_addrs: default_listen_addrs(),
            local_ips: Vec::new(),
            max_peers_per_torrent: default_max_peers(),
        }
    }
}

/// Local service discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsdConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ignore announcements coming from our own listen addresses.
    #[serde(default = "default_true")]
    pub self_filter: bool,
}

impl Default for LsdConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            self_filter: true,
        }
    }
}

fn default_listen_addrs() -> Vec<String> {
    vec!["0.0.0.0:42069".to_string(), "[::]:42069".to_string()]
}

fn default_max_peers() -> usize {
    500
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("max_peers_per_torrent = 500"));
        assert!(toml_str.contains("self_filter = true"));
    }

    #[test]
    fn parse_example_config() {
        let toml_str = r#"
[client]
listen_addrs = ["192.168.1.10:6881"]
local_ips = ["192.168.1.10"]
max_peers_per_torrent = 80

[lsd]
enabled = true
self_filter = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.client.listen_addrs, vec!["192.168.1.10:6881"]);
        assert_eq!(config.client.max_peers_per_torrent, 80);
        assert!(config.lsd.enabled);
        assert!(!config.lsd.self_filter);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: Config = toml::from_str("[lsd]\nenabled = false\n").unwrap();
        assert!(!config.lsd.enabled);
        assert!(config.lsd.self_filter);
        assert_eq!(config.client.listen_addrs.len(), 2);
    }
}
