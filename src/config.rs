//! Configuration management with validation and defaults
//!
//! Engine configuration is loaded from TOML, overridden from the environment and
//! validated before any client is built.

use crate::common::types::{CasinoGame, ChainId};
use crate::errors::{ChainError, ConfigurationError};
use crate::games::{KenoConfiguration, WeightedGameConfiguration};
use crate::math::BP_VALUE;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_ROLL_TIMEOUT_MS: &str = "CASINO_ENGINE_ROLL_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "CASINO_ENGINE_LOG_LEVEL";

/// Complete engine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default = "default_token_cache_capacity")]
    pub token_cache_capacity: usize,
}

fn default_token_cache_capacity() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chains: Vec::new(),
            placement: PlacementConfig::default(),
            resolution: ResolutionConfig::default(),
            retry: RetryConfig::default(),
            monitoring: MonitoringConfig::default(),
            token_cache_capacity: default_token_cache_capacity(),
        }
    }
}

/// One supported chain and the casino deployments on it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub name: String,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    /// Affiliate credited on wagers that do not name one
    #[serde(default)]
    pub affiliate: Option<Address>,
    #[serde(default)]
    pub contracts: GameContracts,
    #[serde(default)]
    pub weighted_configs: Vec<WeightedGameConfiguration>,
    #[serde(default)]
    pub keno: Option<KenoConfiguration>,
}

fn default_native_symbol() -> String {
    "ETH".to_string()
}

fn default_native_decimals() -> u8 {
    18
}

fn default_polling_interval_ms() -> u64 {
    2_000
}

impl ChainConfig {
    pub fn new(chain_id: ChainId, name: impl Into<String>) -> Self {
        Self {
            chain_id,
            name: name.into(),
            native_symbol: default_native_symbol(),
            native_decimals: default_native_decimals(),
            polling_interval_ms: default_polling_interval_ms(),
            affiliate: None,
            contracts: GameContracts::default(),
            weighted_configs: Vec::new(),
            keno: None,
        }
    }

    /// Address of the game contract on this chain
    pub fn contract(&self, game: CasinoGame) -> Result<Address, ChainError> {
        self.contracts
            .get(game)
            .ok_or(ChainError::UnsupportedGame {
                chain_id: self.chain_id,
                game,
            })
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }
}

/// Game contract addresses of one chain
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameContracts {
    pub coin_toss: Option<Address>,
    pub dice: Option<Address>,
    pub roulette: Option<Address>,
    pub keno: Option<Address>,
    pub wheel: Option<Address>,
    pub plinko: Option<Address>,
    pub custom_weighted_game: Option<Address>,
}

impl GameContracts {
    pub fn get(&self, game: CasinoGame) -> Option<Address> {
        match game {
            CasinoGame::CoinToss => self.coin_toss,
            CasinoGame::Dice => self.dice,
            CasinoGame::Roulette => self.roulette,
            CasinoGame::Keno => self.keno,
            CasinoGame::Wheel => self.wheel,
            CasinoGame::Plinko => self.plinko,
            CasinoGame::CustomWeightedGame => self.custom_weighted_game,
        }
    }

    pub fn set(&mut self, game: CasinoGame, address: Address) {
        let slot = match game {
            CasinoGame::CoinToss => &mut self.coin_toss,
            CasinoGame::Dice => &mut self.dice,
            CasinoGame::Roulette => &mut self.roulette,
            CasinoGame::Keno => &mut self.keno,
            CasinoGame::Wheel => &mut self.wheel,
            CasinoGame::Plinko => &mut self.plinko,
            CasinoGame::CustomWeightedGame => &mut self.custom_weighted_game,
        };
        *slot = Some(address);
    }

    /// Deployed games with their addresses
    pub fn deployed(&self) -> Vec<(CasinoGame, Address)> {
        CasinoGame::ALL
            .iter()
            .filter_map(|game| self.get(*game).map(|address| (*game, address)))
            .collect()
    }
}

/// Bet placement settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Highest house edge the bettor accepts, in basis points
    pub default_max_house_edge: u16,
    /// Extra margin added to the quoted randomness fee, in basis points
    pub vrf_fee_buffer_bp: u32,
    pub check_allowance: bool,
    pub check_requirements: bool,
    pub receipt_poll_interval_ms: u64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            default_max_house_edge: 350,
            vrf_fee_buffer_bp: 0,
            check_allowance: true,
            check_requirements: true,
            receipt_poll_interval_ms: 1_000,
        }
    }
}

/// Roll resolution settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    pub roll_timeout_ms: u64,
    /// Ladder of the historical `Roll` log query
    pub historical_retry: RetryConfig,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            roll_timeout_ms: 120_000,
            historical_retry: RetryConfig::default(),
        }
    }
}

/// Bounded retry ladder: one attempt per delay, plus the first immediate one
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub delays_ms: Vec<u64>,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delays_ms: vec![500, 1_000, 2_000, 4_000],
            jitter: false,
        }
    }
}

/// Logging and metrics
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    pub enable_metrics: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Pretty,
            enable_metrics: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(ConfigurationError::InvalidValue {
                field: "log_level".to_string(),
                value: s.to_string(),
                reason: "expected error, warn, info, debug or trace".to_string(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl EngineConfig {
    /// Public testnets with conservative timings. Contract addresses come from TOML.
    pub fn testnet() -> Self {
        let mut base_sepolia = ChainConfig::new(84_532, "Base Sepolia");
        base_sepolia.polling_interval_ms = 2_000;

        let mut arbitrum_sepolia = ChainConfig::new(421_614, "Arbitrum Sepolia");
        arbitrum_sepolia.polling_interval_ms = 1_000;

        Self {
            chains: vec![base_sepolia, arbitrum_sepolia],
            placement: PlacementConfig {
                vrf_fee_buffer_bp: 1_000,
                ..Default::default()
            },
            monitoring: MonitoringConfig {
                log_level: LogLevel::Debug,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(content)?)
    }

    /// Read, apply environment overrides and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigurationError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_ROLL_TIMEOUT_MS) {
            self.resolution.roll_timeout_ms =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigurationError::InvalidValue {
                        field: ENV_ROLL_TIMEOUT_MS.to_string(),
                        value: value.clone(),
                        reason: "expected milliseconds".to_string(),
                    })?;
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.monitoring.log_level = value.parse()?;
        }
        Ok(())
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut chain_ids = HashSet::new();
        for chain in &self.chains {
            if !chain_ids.insert(chain.chain_id) {
                return Err(ConfigurationError::ValidationFailed(format!(
                    "chain {} is configured twice",
                    chain.chain_id
                )));
            }
            if chain.polling_interval_ms == 0 {
                return Err(ConfigurationError::ValidationFailed(format!(
                    "polling_interval_ms of chain {} must be > 0",
                    chain.chain_id
                )));
            }

            let mut config_ids = HashSet::new();
            for weighted in &chain.weighted_configs {
                weighted.validate()?;
                if !config_ids.insert((weighted.game, weighted.config_id)) {
                    return Err(ConfigurationError::ValidationFailed(format!(
                        "{} config {} is defined twice on chain {}",
                        weighted.game, weighted.config_id, chain.chain_id
                    )));
                }
            }
            if let Some(keno) = &chain.keno {
                keno.validate()?;
            }
        }

        if u32::from(self.placement.default_max_house_edge) > BP_VALUE {
            return Err(ConfigurationError::InvalidValue {
                field: "placement.default_max_house_edge".to_string(),
                value: self.placement.default_max_house_edge.to_string(),
                reason: format!("must be <= {}", BP_VALUE),
            });
        }
        if self.placement.receipt_poll_interval_ms == 0 {
            return Err(ConfigurationError::ValidationFailed(
                "placement.receipt_poll_interval_ms must be > 0".to_string(),
            ));
        }
        if self.resolution.roll_timeout_ms == 0 {
            return Err(ConfigurationError::ValidationFailed(
                "resolution.roll_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.retry.delays_ms.is_empty() || self.resolution.historical_retry.delays_ms.is_empty()
        {
            return Err(ConfigurationError::ValidationFailed(
                "retry ladders must have at least one delay".to_string(),
            ));
        }
        if self.token_cache_capacity == 0 {
            return Err(ConfigurationError::ValidationFailed(
                "token_cache_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn chain(&self, chain_id: ChainId) -> Result<&ChainConfig, ChainError> {
        self.chains
            .iter()
            .find(|chain| chain.chain_id == chain_id)
            .ok_or(ChainError::UnsupportedChain { chain_id })
    }

    pub fn roll_timeout(&self) -> Duration {
        Duration::from_millis(self.resolution.roll_timeout_ms)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.placement.receipt_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const SAMPLE: &str = r##"
token_cache_capacity = 64

[placement]
default_max_house_edge = 400
vrf_fee_buffer_bp = 2500

[resolution]
roll_timeout_ms = 30000

[resolution.historical_retry]
delays_ms = [100, 200]
jitter = true

[[chains]]
chain_id = 8453
name = "Base"
polling_interval_ms = 1500
affiliate = "0x1111111111111111111111111111111111111111"

[chains.contracts]
dice = "0x2222222222222222222222222222222222222222"
wheel = "0x3333333333333333333333333333333333333333"

[[chains.weighted_configs]]
config_id = 0
game = "wheel"
weights = [50, 30, 20]
multipliers = [0, 15000, 30000]
colors = ["#29384C", "#55DC36", "#15A2D8"]
label = "Normal"
"##;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(EngineConfig::testnet().validate().is_ok());
    }

    #[test]
    fn test_parse_sample() {
        let config = EngineConfig::from_toml_str(SAMPLE).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.token_cache_capacity, 64);
        assert_eq!(config.placement.default_max_house_edge, 400);
        // Unlisted fields keep their defaults
        assert!(config.placement.check_allowance);
        assert_eq!(config.roll_timeout(), Duration::from_secs(30));
        assert!(config.resolution.historical_retry.jitter);
        assert_eq!(config.retry, RetryConfig::default());

        let base = config.chain(8453).unwrap();
        assert_eq!(base.native_symbol, "ETH");
        assert_eq!(base.polling_interval(), Duration::from_millis(1_500));
        assert_eq!(
            base.contract(CasinoGame::Dice).unwrap(),
            Address::repeat_byte(0x22)
        );
        assert_eq!(
            base.contract(CasinoGame::Keno),
            Err(ChainError::UnsupportedGame {
                chain_id: 8453,
                game: CasinoGame::Keno
            })
        );
        assert_eq!(base.weighted_configs[0].label.as_deref(), Some("Normal"));
        assert_eq!(base.contracts.deployed().len(), 2);
    }

    #[test]
    fn test_unknown_chain() {
        let config = EngineConfig::default();
        assert_eq!(
            config.chain(1).unwrap_err(),
            ChainError::UnsupportedChain { chain_id: 1 }
        );
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut config = EngineConfig::testnet();
        config.placement.default_max_house_edge = 10_001;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::testnet();
        config.chains.push(ChainConfig::new(84_532, "duplicate"));
        assert!(config.validate().is_err());

        let mut config = EngineConfig::testnet();
        config.chains[0].polling_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.resolution.historical_retry.delays_ms.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_weighted_config_is_rejected() {
        let broken = SAMPLE.replace("multipliers = [0, 15000, 30000]", "multipliers = [0]");
        let config = EngineConfig::from_toml_str(&broken).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = EngineConfig::default();
        let overrides: HashMap<&str, &str> =
            [(ENV_ROLL_TIMEOUT_MS, "5000"), (ENV_LOG_LEVEL, "trace")].into();

        config
            .apply_overrides_from(|key| overrides.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.roll_timeout(), Duration::from_secs(5));
        assert_eq!(config.monitoring.log_level, LogLevel::Trace);

        let result = config.apply_overrides_from(|key| {
            (key == ENV_ROLL_TIMEOUT_MS).then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.chains.len(), 1);

        assert!(EngineConfig::load("/nonexistent/casino.toml").is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let result = EngineConfig::from_toml_str("chains = 5");
        assert!(matches!(result, Err(ConfigurationError::LoadFailed(_))));
    }
}
