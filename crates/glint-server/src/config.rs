use glint_common::{GlintError, Result};
use glint_logger::LogSeverity;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "glint.json";

/// How player identity reaches us when running behind a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyDialect {
    /// Direct connections
    #[default]
    None,
    /// BungeeCord style NUL separated hostname
    Legacy,
    /// JSON hostname with a shared secret
    Lilypad,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub dialect: ProxyDialect,
    /// Shared secret checked by the LilyPad dialect. Empty disables the check.
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub motd: String,
    pub max_players: u32,
    pub online_mode: bool,
    /// Packets this size or larger are compressed. Negative disables compression.
    pub compression_threshold: i32,
    pub idle_timeout_secs: u64,
    pub keep_alive_interval_secs: u64,
    pub async_workers: usize,
    pub log_level: String,
    pub session_server: String,
    pub proxy: ProxyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:25565".to_owned(),
            motd: "A Glint server".to_owned(),
            max_players: 20,
            online_mode: false,
            compression_threshold: 256,
            idle_timeout_secs: 30,
            keep_alive_interval_secs: 10,
            async_workers: 4,
            log_level: "info".to_owned(),
            session_server: "https://sessionserver.mojang.com".to_owned(),
            proxy: ProxyConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(GlintError::Config(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents)
            .map_err(|e| GlintError::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.async_workers == 0 {
            return Err(GlintError::Config("async_workers must be at least 1".to_owned()));
        }
        if self.idle_timeout_secs == 0 || self.keep_alive_interval_secs == 0 {
            return Err(GlintError::Config("timeouts must be positive".to_owned()));
        }
        if self.keep_alive_interval_secs >= self.idle_timeout_secs {
            return Err(GlintError::Config(
                "keep_alive_interval_secs must be shorter than idle_timeout_secs".to_owned(),
            ));
        }
        self.log_severity()?;
        Ok(())
    }

    pub fn log_severity(&self) -> Result<LogSeverity> {
        self.log_level.parse().map_err(GlintError::Config)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_interval_secs)
    }
}
