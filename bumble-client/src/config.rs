//! Client configuration file (JSON) and resolution into runtime settings.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use bumble_sdk::TcpTransport;
use serde::Deserialize;

use crate::dispatcher::DisconnectPolicy;
use crate::runtime::RuntimeSettings;
use crate::supervisor::ReconnectPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "client.conf";
pub const DEFAULT_ROUTER_ADDR: &str = "127.0.0.1:4280";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Format(#[from] serde_json::Error),
    #[error("{0} is missing.")]
    Missing(&'static str),
    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    /// Operator-facing lines, printed before the process exits.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Read { .. } => format!(
                "[ERROR] {self}\nFor your happiness an example config file is provided in the 'conf' directory in the repository."
            ),
            Self::Format(_) => format!(
                "[CONFIG FILE FORMAT ERROR] {self}\nPlease ensure that your config file is in valid JSON format."
            ),
            Self::Missing(_) | Self::Invalid { .. } => format!("[CONFIG ERROR] {self}"),
        }
    }
}

/// On-disk configuration, field names as deployed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    #[serde(default)]
    pub bumble_name: String,
    #[serde(default)]
    pub private_key_file: String,
    pub router_address: Option<String>,
    pub reconnect_delay_secs: Option<u64>,
    pub heartbeat_interval_secs: Option<u64>,
    pub reset_auth_on_disconnect: Option<bool>,
    pub connect_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&raw)?;
        tracing::debug!(path = %path.display(), name = %config.bumble_name, "Loaded config");
        Ok(config)
    }

    /// Parse and check required fields.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        if config.bumble_name.is_empty() {
            return Err(ConfigError::Missing("BumbleName"));
        }
        if config.private_key_file.is_empty() {
            return Err(ConfigError::Missing("PrivateKeyFile"));
        }
        Ok(config)
    }

    /// Key path as written if absolute, otherwise relative to the config
    /// file's directory. Lexically cleaned either way.
    pub fn private_key_path(&self, config_path: &Path) -> PathBuf {
        let key = clean_path(Path::new(&self.private_key_file));
        if key.is_absolute() {
            return key;
        }
        match config_path.parent() {
            Some(dir) => clean_path(&dir.join(key)),
            None => key,
        }
    }
}

/// Drop `.` segments and fold `name/..` pairs without touching the
/// filesystem. An empty result is `.`.
fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            _ => parts.push(component),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

fn positive_secs(field: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be at least 1".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Everything the binary needs after config and CLI are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub name: String,
    pub key_path: PathBuf,
    pub router_addr: String,
    pub connect_timeout: Duration,
    pub runtime: RuntimeSettings,
}

impl ClientSettings {
    pub fn resolve(
        config_path: &Path,
        config: &Config,
        router_override: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let router_addr = router_override
            .or(config.router_address.as_deref())
            .unwrap_or(DEFAULT_ROUTER_ADDR)
            .to_string();

        // A zero reconnect delay could attach the next session before the
        // previous Disconnected has cleared authentication.
        let mut runtime = RuntimeSettings::default();
        if let Some(secs) = config.reconnect_delay_secs {
            runtime.reconnect = ReconnectPolicy::Fixed(positive_secs("ReconnectDelaySecs", secs)?);
        }
        if let Some(secs) = config.heartbeat_interval_secs {
            runtime.heartbeat_interval = positive_secs("HeartbeatIntervalSecs", secs)?;
        }
        let connect_timeout = match config.connect_timeout_secs {
            Some(secs) => positive_secs("ConnectTimeoutSecs", secs)?,
            None => TcpTransport::DEFAULT_CONNECT_TIMEOUT,
        };
        if config.reset_auth_on_disconnect == Some(false) {
            runtime.disconnect_policy = DisconnectPolicy::Retain;
        }

        Ok(Self {
            name: config.bumble_name.clone(),
            key_path: config.private_key_path(config_path),
            router_addr,
            connect_timeout,
            runtime,
        })
    }
}
