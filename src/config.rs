use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::ClientError;

/// Largest decimal exponent whose power of ten still fits in a `u128`.
const MAX_MINOR_UNIT_DECIMALS: u32 = 38;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub contract: ContractSettings,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub lcd_url: Option<String>,
    #[serde(default)]
    pub broadcast_url: Option<String>,
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractSettings {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub betting_denom: Option<String>,
    #[serde(default)]
    pub minor_unit_decimals: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    #[serde(default = "default_page_limit")]
    pub default_page_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub csv_logging: bool,
    #[serde(default = "default_csv_log_path")]
    pub csv_log_path: String,
}

fn default_rpc_timeout() -> u64 { 10 }
fn default_dry_run() -> bool { true }
fn default_page_limit() -> u32 { 10 }
fn default_csv_log_path() -> String { "transactions.csv".to_string() }

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: None,
            lcd_url: None,
            broadcast_url: None,
            rpc_timeout_secs: default_rpc_timeout(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            csv_logging: false,
            csv_log_path: default_csv_log_path(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            dry_run: default_dry_run(),
            default_page_limit: default_page_limit(),
        }
    }
}

/// Secrets and per-deployment overrides read from the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub wallet_private_key: Option<String>,
    pub address_prefix: String,
    pub chain_id: Option<String>,
    pub contract_address: Option<String>,
    pub betting_denom: Option<String>,
    pub lcd_url: Option<String>,
    pub broadcast_url: Option<String>,
    pub dry_run: Option<bool>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {}", path))
    }

    /// Load `path` if it exists, otherwise start from defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            tracing::warn!("Config file {} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Environment values win over the file.
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(chain_id) = &env.chain_id {
            self.network.chain_id = Some(chain_id.clone());
        }
        if let Some(lcd_url) = &env.lcd_url {
            self.network.lcd_url = Some(lcd_url.clone());
        }
        if let Some(broadcast_url) = &env.broadcast_url {
            self.network.broadcast_url = Some(broadcast_url.clone());
        }
        if let Some(address) = &env.contract_address {
            self.contract.address = Some(address.clone());
        }
        if let Some(denom) = &env.betting_denom {
            self.contract.betting_denom = Some(denom.clone());
        }
        if let Some(dry_run) = env.dry_run {
            self.system.dry_run = dry_run;
        }
    }

    pub fn chain_id(&self) -> Result<&str, ClientError> {
        required(&self.network.chain_id, "network.chain_id")
    }

    pub fn lcd_url(&self) -> Result<&str, ClientError> {
        required(&self.network.lcd_url, "network.lcd_url")
    }

    pub fn broadcast_url(&self) -> Result<&str, ClientError> {
        required(&self.network.broadcast_url, "network.broadcast_url")
    }

    pub fn contract_address(&self) -> Result<&str, ClientError> {
        required(&self.contract.address, "contract.address")
    }

    pub fn betting_denom(&self) -> Result<&str, ClientError> {
        required(&self.contract.betting_denom, "contract.betting_denom")
    }

    pub fn minor_unit_decimals(&self) -> Result<u32, ClientError> {
        match self.contract.minor_unit_decimals {
            Some(decimals) if decimals <= MAX_MINOR_UNIT_DECIMALS => Ok(decimals),
            _ => Err(ClientError::MisconfiguredClient("contract.minor_unit_decimals")),
        }
    }
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ClientError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ClientError::MisconfiguredClient(field)),
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let dry_run = match std::env::var("DRY_RUN") {
            Ok(v) => Some(
                v.parse()
                    .with_context(|| format!("DRY_RUN must be true or false, got {}", v))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            wallet_private_key: std::env::var("WALLET_PRIVATE_KEY").ok(),
            address_prefix: std::env::var("WALLET_ADDRESS_PREFIX")
                .unwrap_or_else(|_| "inj".to_string()),
            chain_id: std::env::var("CHAIN_ID").ok(),
            contract_address: std::env::var("CONTRACT_ADDRESS").ok(),
            betting_denom: std::env::var("BETTING_DENOM").ok(),
            lcd_url: std::env::var("LCD_URL").ok(),
            broadcast_url: std::env::var("BROADCAST_URL").ok(),
            dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [network]
        chain_id = "injective-888"
        lcd_url = "https://testnet.sentry.lcd.injective.network"
        rpc_timeout_secs = 5

        [contract]
        address = "inj1contract"
        betting_denom = "inj"
        minor_unit_decimals = 18

        [system]
        dry_run = false
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(SAMPLE).unwrap();

        assert_eq!(config.chain_id().unwrap(), "injective-888");
        assert_eq!(config.contract_address().unwrap(), "inj1contract");
        assert_eq!(config.betting_denom().unwrap(), "inj");
        assert_eq!(config.minor_unit_decimals().unwrap(), 18);
        assert_eq!(config.network.rpc_timeout_secs, 5);
        assert!(!config.system.dry_run);
        assert_eq!(config.system.default_page_limit, 10);
        assert!(!config.monitoring.csv_logging);
    }

    #[test]
    fn test_missing_values_fail_on_access() {
        let config = Config::parse("[contract]\nbetting_denom = \"  \"\n").unwrap();

        assert!(matches!(
            config.betting_denom(),
            Err(ClientError::MisconfiguredClient("contract.betting_denom"))
        ));
        assert!(matches!(
            config.contract_address(),
            Err(ClientError::MisconfiguredClient("contract.address"))
        ));
        assert!(matches!(
            config.minor_unit_decimals(),
            Err(ClientError::MisconfiguredClient("contract.minor_unit_decimals"))
        ));
        assert!(config.system.dry_run);
    }

    #[test]
    fn test_decimals_beyond_u128_are_misconfigured() {
        let config = Config::parse("[contract]\nminor_unit_decimals = 39\n").unwrap();
        assert!(config.minor_unit_decimals().is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::parse(SAMPLE).unwrap();
        let env = EnvConfig {
            contract_address: Some("inj1other".to_string()),
            dry_run: Some(true),
            ..Default::default()
        };

        config.apply_env(&env);

        assert_eq!(config.contract_address().unwrap(), "inj1other");
        assert_eq!(config.chain_id().unwrap(), "injective-888");
        assert!(config.system.dry_run);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let config = Config::load_or_default(path.to_str().unwrap()).unwrap();
        assert!(config.chain_id().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.lcd_url().unwrap(), "https://testnet.sentry.lcd.injective.network");
    }
}
