use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::endpoints::Endpoints;
use crate::error::ConfigError;

// =============================================================================
// File config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
//   config.toml:     [server]
//                    api_url = "https://chat.example.com"
//
//   env var:         ROOMCHAT_SERVER__API_URL=https://chat.example.com
//
//   (double underscore = nesting; single underscore stays within field names)

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub session: SessionFileConfig,
}

/// Backend location (lives under `[server]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Websocket base; derived from `api_url` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: None,
        }
    }
}

/// Session tunables (lives under `[session]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionFileConfig {
    /// Name used by `join` when `--name` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SessionFileConfig {
    fn default() -> Self {
        Self {
            display_name: None,
            outbound_queue: default_outbound_queue(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_outbound_queue() -> usize {
    64
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Build the layered figment: defaults, then `config.toml`, then `ROOMCHAT_*` env vars.
pub fn load_config(data_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("ROOMCHAT_").split("__"))
}

/// Where the client keeps its files.
#[derive(Clone, Debug)]
pub struct ClientPaths {
    pub data_dir: PathBuf,
}

impl ClientPaths {
    /// `custom` or `~/.roomchat`.
    pub fn new(custom: Option<PathBuf>) -> Result<Self, ConfigError> {
        let data_dir = match custom {
            Some(dir) => dir,
            None => dirs::home_dir()
                .ok_or(ConfigError::NoHomeDir)?
                .join(".roomchat"),
        };
        Ok(Self { data_dir })
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }
}

/// Validated runtime configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub endpoints: Endpoints,
    pub display_name: Option<String>,
    pub outbound_queue: usize,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn from_file(fc: &FileConfig) -> Result<Self, ConfigError> {
        if fc.session.outbound_queue == 0 {
            return Err(ConfigError::EmptyOutboundQueue);
        }
        Ok(Self {
            endpoints: Endpoints::parse(&fc.server.api_url, fc.server.ws_url.as_deref())?,
            display_name: fc
                .session
                .display_name
                .clone()
                .filter(|n| !n.trim().is_empty()),
            outbound_queue: fc.session.outbound_queue,
            request_timeout: Duration::from_secs(fc.session.request_timeout_secs),
        })
    }

    pub fn load(paths: &ClientPaths) -> Result<Self, ConfigError> {
        let fc: FileConfig = load_config(&paths.data_dir).extract()?;
        Self::from_file(&fc)
    }
}
