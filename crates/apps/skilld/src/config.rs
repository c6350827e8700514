use serde::Deserialize;
use skill_gate::SkillConfig;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid listen address {0}")]
    InvalidListen(String),
    #[error("skill.application_id must be set")]
    MissingApplicationId,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub skill: SkillConfig,
    pub tls: Option<TlsConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TlsConfig {
    pub cert_chain_path: PathBuf,
    pub private_key_path: PathBuf,
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { listen: default_listen(), skill: SkillConfig::default(), tls: None }
    }
}

impl DaemonConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&contents)
    }

    /// Checks everything the daemon needs before it binds a socket.
    pub fn validate(&self) -> Result<SocketAddr, ConfigError> {
        if self.skill.application_id.trim().is_empty() {
            return Err(ConfigError::MissingApplicationId);
        }
        self.listen.parse().map_err(|_| ConfigError::InvalidListen(self.listen.clone()))
    }
}
