use anyhow::{Context, Result};
use config::{Config, Environment, File};
use fleet_core::{ConfigError, FleetConfig, Operation};
use reqwest::Method;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct NeuraConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_wallets_file")]
    pub wallets_file: String,
    #[serde(default = "default_proxies_file")]
    pub proxies_file: String,
    /// Operation tags assigned, in this order, to every generated wallet.
    pub modules: Vec<String>,
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointConfig>,
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointConfig {
    #[serde(default = "default_method")]
    pub method: String,
    /// `{address}` is replaced with the wallet address.
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

fn default_database_path() -> String {
    "neura.db".to_string()
}

fn default_wallets_file() -> String {
    "wallets.txt".to_string()
}

fn default_proxies_file() -> String {
    "proxies.txt".to_string()
}

fn default_method() -> String {
    "POST".to_string()
}

impl NeuraConfig {
    /// Reads the TOML file, then applies `NEURA__*` environment overrides
    /// (e.g. `NEURA__FLEET__MAX_PARALLEL_ACCOUNTS=4`).
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("NEURA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        settings.try_deserialize().map_err(|e| anyhow::anyhow!(e))
    }

    pub fn operations(&self) -> Result<Vec<Operation>, ConfigError> {
        if self.modules.is_empty() {
            return Err(ConfigError::MissingField {
                field: "modules".to_string(),
            });
        }
        Operation::parse_list(&self.modules)
    }

    /// Endpoints keyed by operation. Tags are matched case-insensitively.
    pub fn endpoints(&self) -> Result<Vec<(Operation, &EndpointConfig)>, ConfigError> {
        let mut endpoints: Vec<(Operation, &EndpointConfig)> = self
            .endpoints
            .iter()
            .map(|(tag, endpoint)| Ok((tag.parse::<Operation>()?, endpoint)))
            .collect::<Result<_, ConfigError>>()?;
        endpoints.sort_by_key(|(op, _)| *op);
        Ok(endpoints)
    }

    /// Checks everything that can be checked without touching the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fleet.validate()?;
        self.operations()?;

        for (op, endpoint) in self.endpoints()? {
            endpoint.method()?;
            let sample = endpoint.url_for("0x0000000000000000000000000000000000000000");
            url::Url::parse(&sample).map_err(|e| ConfigError::InvalidValue {
                field: format!("endpoints.{}.url", op),
                reason: e.to_string(),
            })?;
        }

        if let Some(telegram) = &self.telegram {
            if telegram.bot_token.is_empty() || telegram.chat_id.is_empty() {
                return Err(ConfigError::MissingField {
                    field: "telegram.bot_token / telegram.chat_id".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl EndpointConfig {
    pub fn method(&self) -> Result<Method, ConfigError> {
        Method::from_bytes(self.method.to_uppercase().as_bytes()).map_err(|_| {
            ConfigError::InvalidValue {
                field: "method".to_string(),
                reason: format!("'{}' is not an HTTP method", self.method),
            }
        })
    }

    pub fn url_for(&self, address: &str) -> String {
        self.url.replace("{address}", address)
    }
}
