//! Server configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `PARTYD_*` environment variables (`__` separates nested keys, e.g.
//! `PARTYD_IMAGES__API_KEY`).

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// SQLite file; None = in-memory
    pub db_path: Option<String>,
    /// Fixed dice seed for reproducible sessions; None = OS entropy
    pub dice_seed: Option<u64>,
    pub images: ImageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            db_path: None,
            dice_seed: None,
            images: ImageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional TOML file and the environment
    pub fn load(file: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment
            .merge(Env::prefixed("PARTYD_").split("__"))
            .extract()
    }
}

/// Portrait generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Base URL of an OpenAI-compatible image API
    pub api_url: String,
    /// Portraits are disabled without a key
    pub api_key: Option<String>,
    pub model: String,
    pub size: String,
    pub timeout_secs: u64,
    /// Per-character request budget
    pub requests_per_minute: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.venice.ai/api/v1".to_string(),
            api_key: None,
            model: "fluently-xl".to_string(),
            size: "1024x1024".to_string(),
            timeout_secs: 60,
            requests_per_minute: 10,
        }
    }
}
