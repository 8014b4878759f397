use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdType {
    Long,
    String,
}

impl FromStr for IdType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "long" => Ok(IdType::Long),
            "string" => Ok(IdType::String),
            _ => Err(format!("Invalid value for IdType: {}", s)),
        }
    }
}

impl<'de> serde::Deserialize<'de> for IdType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        IdType::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub http: HttpSettings,
    pub service: ServiceSettings,
    pub experimental: ExperimentalSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpSettings {
    pub enable: bool,
    pub bind_address: SocketAddr,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceSettings {
    pub root_url: String,
    pub id_type: IdType,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExperimentalSettings {
    pub custom_links_enable: bool,
    pub custom_links_recurse_depth: u32,
}

impl Default for ExperimentalSettings {
    fn default() -> Self {
        ExperimentalSettings { custom_links_enable: false, custom_links_recurse_depth: 5 }
    }
}

impl AppConfig {
    /// Layers `path` (optional, any format `config` understands) and `SENSORLINK__*` env vars over defaults.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Defaults plus environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let defaults = ExperimentalSettings::default();
        let mut builder =
            Config::builder()
                .set_default("http.enable", true)?
                .set_default("http.bind_address", "127.0.0.1:8080")?
                .set_default("service.root_url", "http://localhost:8080/v1.1")?
                .set_default("service.id_type", "long")?
                .set_default("experimental.custom_links_enable", defaults.custom_links_enable)?
                .set_default("experimental.custom_links_recurse_depth", defaults.custom_links_recurse_depth as i64)?;
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        builder
            .add_source(Environment::with_prefix("SENSORLINK").try_parsing(true).separator("__"))
            .build()?
            .try_deserialize()
    }
}
