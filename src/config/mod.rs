//! # Configuration Management Module
//!
//! TOML-backed configuration for the parrot, organized in logical sections:
//!
//! - [`MqttConfig`] - broker address, credentials, and the mesh root topic
//! - [`ChannelConfig`] - channel name and base64 channel key
//! - [`NodeConfig`] - this node's id and display metadata
//! - [`ParrotConfig`] - reply pacing, node-info announce period, dedup window
//! - [`LoggingConfig`] - log level and optional log file
//!
//! Defaults mirror the public Meshtastic MQTT broker so `meshparrot init`
//! produces a config that works out of the box on the LongFast channel.
//!
//! ```toml
//! [mqtt]
//! broker = "mqtt.meshtastic.org"
//! port = 1883
//! username = "meshdev"
//! password = "large4cats"
//! root_topic = "msh/ANZ/2/c/"
//!
//! [channel]
//! name = "LongFast"
//! key = "1PG7OiApB1nwvP+rz05pAQ=="
//!
//! [node]
//! node_id = "!abcde1e2"
//! long_name = "MQTT-PARROT"
//! short_name = "🦜"
//! hw_model = "PRIVATE_HW"
//!
//! [parrot]
//! reply_delay_seconds = 1
//! nodeinfo_interval_seconds = 900
//! dedup_ttl_seconds = 600
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Structural problems (bad key, bad node id) are caught at server startup
//! and are the only fatal error class; see the mesh error taxonomy.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub channel: ChannelConfig,
    pub node: NodeConfig,
    #[serde(default)]
    pub parrot: ParrotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Topic prefix up to and including the trailing slash before the
    /// channel name, e.g. "msh/ANZ/2/c/".
    pub root_topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    /// Base64 channel key. Empty string means the channel is unencrypted.
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This node's id in "!hex" form.
    pub node_id: String,
    pub long_name: String,
    pub short_name: String,
    /// Hardware model name announced in node info (e.g. "PRIVATE_HW").
    #[serde(default = "default_hw_model")]
    pub hw_model: String,
}

fn default_hw_model() -> String {
    "PRIVATE_HW".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParrotConfig {
    /// Pacing delay before a reply is transmitted, and the minimum interval
    /// between two replies (one global throttle for all destinations).
    #[serde(default = "default_reply_delay")]
    pub reply_delay_seconds: u64,
    /// Period of the node-info announcer.
    #[serde(default = "default_nodeinfo_interval")]
    pub nodeinfo_interval_seconds: u64,
    /// How long packet ids stay in the dedup cache. Several multiples of
    /// expected network propagation time is plenty.
    #[serde(default = "default_dedup_ttl")]
    pub dedup_ttl_seconds: u64,
}

fn default_reply_delay() -> u64 {
    1
}

fn default_nodeinfo_interval() -> u64 {
    900
}

fn default_dedup_ttl() -> u64 {
    600
}

impl Default for ParrotConfig {
    fn default() -> Self {
        Self {
            reply_delay_seconds: default_reply_delay(),
            nodeinfo_interval_seconds: default_nodeinfo_interval(),
            dedup_ttl_seconds: default_dedup_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mqtt: MqttConfig {
                broker: "mqtt.meshtastic.org".to_string(),
                port: 1883,
                username: "meshdev".to_string(),
                password: "large4cats".to_string(),
                root_topic: "msh/ANZ/2/c/".to_string(),
            },
            channel: ChannelConfig {
                name: "LongFast".to_string(),
                key: "1PG7OiApB1nwvP+rz05pAQ==".to_string(),
            },
            node: NodeConfig {
                node_id: "!abcde1e2".to_string(),
                long_name: "MQTT-PARROT".to_string(),
                short_name: "\u{1F99C}".to_string(),
                hw_model: "PRIVATE_HW".to_string(),
            },
            parrot: ParrotConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
