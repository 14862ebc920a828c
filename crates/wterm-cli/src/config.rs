//! Client configuration at `~/.wterm/config.toml`.
//!
//! Holds the bridge URL, topic template, editor, command aliases and the
//! host book. CLI flags always override config file values.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;
use wterm_client::AliasTable;

/// Top-level config file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Default connection settings.
    #[serde(default)]
    pub default: DefaultConfig,

    /// Program-name aliases applied to submitted commands.
    #[serde(default = "default_aliases")]
    pub aliases: BTreeMap<String, String>,

    /// Known hosts on the bridge.
    #[serde(default)]
    pub hosts: Vec<HostEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default: DefaultConfig::default(),
            aliases: default_aliases(),
            hosts: Vec::new(),
        }
    }
}

/// Default connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultConfig {
    /// Bridge WebSocket endpoint.
    #[serde(default = "default_url")]
    pub url: String,

    /// Inbound topic template; `{id}` is the host id.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Editor command for captured files.
    #[serde(default)]
    pub editor: Option<String>,

    /// Seconds allowed for the WebSocket and STOMP handshake.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            topic: default_topic(),
            editor: None,
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// One host record, as known to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostEntry {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// "0" password, "1" key path.
    #[serde(rename = "type", default = "default_connection_type")]
    pub connection_type: String,
    #[serde(default)]
    pub user: String,
}

impl HostEntry {
    /// Entry for a host id that is not in the book.
    pub fn ad_hoc(id: i64) -> Self {
        Self {
            id,
            name: String::new(),
            host: String::new(),
            port: default_port(),
            connection_type: default_connection_type(),
            user: String::new(),
        }
    }

    /// Label for pickers and logs.
    pub fn label(&self) -> String {
        let name = if self.name.is_empty() {
            format!("#{}", self.id)
        } else {
            self.name.clone()
        };
        match (self.user.is_empty(), self.host.is_empty()) {
            (_, true) => name,
            (true, false) => format!("{name} ({}:{})", self.host, self.port),
            (false, false) => format!("{name} ({}@{}:{})", self.user, self.host, self.port),
        }
    }
}

fn default_url() -> String {
    "ws://localhost:8080/platform-admin/ws/websocket".to_string()
}

fn default_connect_timeout() -> u64 {
    wterm_client::transport::websocket::DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_topic() -> String {
    wterm_core::frame::DEFAULT_TOPIC_TEMPLATE.to_string()
}

fn default_aliases() -> BTreeMap<String, String> {
    BTreeMap::from([("apt".to_string(), "apt-get".to_string())])
}

fn default_port() -> u16 {
    22
}

fn default_connection_type() -> String {
    "0".to_string()
}

impl Config {
    /// Load configuration from a TOML file, returning defaults if the file
    /// does not exist.
    pub fn load(path: &str) -> Result<Self> {
        let path = Path::new(path);
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;

        debug!(path = %path.display(), hosts = config.hosts.len(), "loaded config");
        Ok(config)
    }

    /// Find a host by name, or by id when `target` is numeric.
    pub fn find_host(&self, target: &str) -> Option<&HostEntry> {
        self.hosts
            .iter()
            .find(|h| h.name == target)
            .or_else(|| {
                let id: i64 = target.parse().ok()?;
                self.hosts.iter().find(|h| h.id == id)
            })
    }

    /// Resolve a connect target. Unknown numeric ids are accepted as-is.
    pub fn resolve_target(&self, target: &str) -> Result<HostEntry> {
        if let Some(host) = self.find_host(target) {
            return Ok(host.clone());
        }
        match target.parse::<i64>() {
            Ok(id) => Ok(HostEntry::ad_hoc(id)),
            Err(_) => anyhow::bail!("unknown host '{target}' (see `wterm hosts`)"),
        }
    }

    pub fn alias_table(&self) -> AliasTable {
        AliasTable::from_pairs(self.aliases.clone())
    }
}
