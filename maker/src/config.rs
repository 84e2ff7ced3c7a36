//! TOML configuration loading and validation.

use std::path::Path;
use std::time::Duration;

use ladder_mm::{Contract, Denom, OffsetLadder, Wallet};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::trading::TradingParams;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    pub markets: Vec<MarketConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Consecutive failed ticks before the wallet session is re-established; 0 disables.
    #[serde(default = "default_reconnect_after")]
    pub reconnect_after_failures: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            reconnect_after_failures: default_reconnect_after(),
        }
    }
}

fn default_tick_interval() -> u64 {
    1_000
}
fn default_reconnect_after() -> u32 {
    5
}

/// Telegram destination. Notifications are off unless `chat_id` is set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyConfig {
    pub chat_id: Option<String>,
    pub bot_token: Option<String>,
}

/// Paper exchange behaviour shared by all markets.
#[derive(Debug, Clone, Deserialize)]
pub struct PaperConfig {
    #[serde(default = "default_half_spread")]
    pub half_spread: f64,
    /// Largest random move of the mid per step, as a fraction of price.
    #[serde(default = "default_price_step")]
    pub price_step: f64,
    #[serde(default = "default_step_interval")]
    pub step_interval_ms: u64,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            half_spread: default_half_spread(),
            price_step: default_price_step(),
            step_interval_ms: default_step_interval(),
        }
    }
}

fn default_half_spread() -> f64 {
    0.0005
}
fn default_price_step() -> f64 {
    0.002
}
fn default_step_interval() -> u64 {
    1_000
}

/// One trading instance.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub wallet: String,
    pub contract: String,
    pub base_denom: String,
    pub base_symbol: String,
    pub quote_denom: String,
    pub quote_symbol: String,
    #[serde(default = "default_price_decimals")]
    pub price_decimals: u32,
    pub offsets: Vec<f64>,
    pub target_rate: Option<f64>,
    pub paper: PaperMarketConfig,
}

fn default_price_decimals() -> u32 {
    3
}

/// Starting point of a market on the paper exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct PaperMarketConfig {
    pub mid_price: f64,
    pub base_balance: f64,
    pub quote_balance: f64,
}

impl MarketConfig {
    pub fn contract(&self) -> Contract {
        Contract {
            address: self.contract.clone(),
            base: Denom::new(&self.base_denom, &self.base_symbol),
            quote: Denom::new(&self.quote_denom, &self.quote_symbol),
            price_decimals: self.price_decimals,
        }
    }

    pub fn ladder(&self) -> Result<OffsetLadder> {
        Ok(OffsetLadder::new(self.offsets.clone())?)
    }

    pub fn trading_params(&self) -> Result<TradingParams> {
        Ok(TradingParams {
            wallet: Wallet::new(&self.wallet),
            contract: self.contract(),
            ladder: self.ladder()?,
            target_rate: self.target_rate,
        })
    }

    fn validate(&self) -> Result<()> {
        let name = &self.contract;
        if self.wallet.is_empty() || self.contract.is_empty() {
            return Err(Error::Configuration(
                "market wallet and contract must not be empty".into(),
            ));
        }
        if self.base_denom == self.quote_denom {
            return Err(Error::Configuration(format!(
                "{name}: base and quote denom must differ"
            )));
        }
        self.ladder()?;
        if let Some(rate) = self.target_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(Error::Configuration(format!(
                    "{name}: target_rate must be in [0.0, 1.0]"
                )));
            }
        }
        if self.price_decimals > 18 {
            return Err(Error::Configuration(format!(
                "{name}: price_decimals must be <= 18"
            )));
        }
        let paper = &self.paper;
        if paper.mid_price <= 0.0 || paper.base_balance < 0.0 || paper.quote_balance < 0.0 {
            return Err(Error::Configuration(format!(
                "{name}: paper mid_price must be > 0 and balances >= 0"
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.scheduler.tick_interval_ms == 0 {
            return Err(Error::Configuration("tick_interval_ms must be > 0".into()));
        }
        if self.markets.is_empty() {
            return Err(Error::Configuration(
                "at least one [[markets]] entry is required".into(),
            ));
        }
        if self.notify.chat_id.is_some() && self.notify.bot_token.is_none() {
            return Err(Error::Configuration(
                "notify.chat_id is set but notify.bot_token is missing".into(),
            ));
        }
        if self.paper.half_spread < 0.0 || !(0.0..1.0).contains(&self.paper.price_step) {
            return Err(Error::Configuration(
                "paper half_spread must be >= 0 and price_step in [0.0, 1.0)".into(),
            ));
        }
        if self.paper.step_interval_ms == 0 {
            return Err(Error::Configuration("step_interval_ms must be > 0".into()));
        }
        for market in &self.markets {
            market.validate()?;
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler.tick_interval_ms)
    }

    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.paper.step_interval_ms)
    }
}
