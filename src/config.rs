use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::character_gen::NEGATIVE_PROMPT;
use crate::core::image_gen::{ImageFormat, DEFAULT_DIMENSION};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid listen address {0}")]
    InvalidAddress(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}

/// Where the active configuration came from.
#[derive(Debug)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults { path: PathBuf, error: ConfigError },
}

impl ConfigSource {
    pub fn report(&self) {
        match self {
            ConfigSource::File(path) => log::info!("Loaded config from {}", path.display()),
            ConfigSource::Defaults { path, error } => log::warn!(
                "Failed to load config at {}: {error}; using defaults",
                path.display()
            ),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub image: ImageGenConfig,
    pub pinning: PinningConfig,
    pub contract: ContractConfig,
    pub data: DataConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Image generation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageGenConfig {
    pub endpoint: String,
    pub api_key: String,
    pub output_format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub negative_prompt: Option<String>,
}

/// Pinning service credentials and URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinningConfig {
    pub api_url: String,
    pub gateway_url: String,
    pub api_key: String,
    pub secret_key: String,
}

/// Minting relay and marketplace settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Signing relay that submits contract transactions.
    pub relay_url: String,
    pub address: String,
    /// Marketplace prefix; links are `{marketplace_url}/{address}/{token_id}`.
    pub marketplace_url: String,
}

/// Data directory configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for ImageGenConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.stability.ai/v2beta/stable-image/generate/core".to_string(),
            api_key: String::new(),
            output_format: ImageFormat::Webp,
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            negative_prompt: Some(NEGATIVE_PROMPT.to_string()),
        }
    }
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.pinata.cloud".to_string(),
            gateway_url: "https://gateway.pinata.cloud".to_string(),
            api_key: String::new(),
            secret_key: String::new(),
        }
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://127.0.0.1:8545".to_string(),
            address: String::new(),
            marketplace_url: "https://testnets.opensea.io/assets/base-sepolia".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/character-forge/config.toml`,
    /// `FORGE_`-prefixed environment variables and service credentials.
    /// Falls back to `Default` (plus credentials) if loading fails.
    ///
    /// Nothing is logged here; report the returned [`ConfigSource`] once
    /// logging is initialized, since the log directory comes from the config.
    pub fn load() -> (Self, ConfigSource) {
        Self::load_or_default(&Self::config_path())
    }

    pub fn load_or_default(path: &std::path::Path) -> (Self, ConfigSource) {
        match Self::load_from(path) {
            Ok(config) => (config, ConfigSource::File(path.to_path_buf())),
            Err(error) => (
                Self::default().with_credentials_from_env(),
                ConfigSource::Defaults {
                    path: path.to_path_buf(),
                    error,
                },
            ),
        }
    }

    /// Layer defaults, the given TOML file (if present) and the environment.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("FORGE_").split("__"))
            .extract()?;
        Ok(config.with_credentials_from_env())
    }

    /// Apply the conventional credential variables used by the hosted services.
    fn with_credentials_from_env(mut self) -> Self {
        if let Ok(key) = std::env::var("STABILITY_API_KEY") {
            self.image.api_key = key;
        }
        if let Ok(key) = std::env::var("PINATA_API_KEY") {
            self.pinning.api_key = key;
        }
        if let Ok(secret) = std::env::var("PINATA_SECRET_KEY") {
            self.pinning.secret_key = secret;
        }
        if let Ok(address) = std::env::var("CONTRACT_ADDRESS") {
            self.contract.address = address;
        }
        self
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("character-forge"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    /// Copy with every credential masked, safe to print.
    pub fn redacted(&self) -> Self {
        fn mask(secret: &mut String) {
            if !secret.is_empty() {
                *secret = "********".to_string();
            }
        }

        let mut config = self.clone();
        mask(&mut config.image.api_key);
        mask(&mut config.pinning.api_key);
        mask(&mut config.pinning.secret_key);
        config
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("character-forge").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
