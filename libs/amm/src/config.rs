//! Pool configuration
//!
//! Loaded from TOML, e.g.
//!
//! ```toml
//! tick_spacing = 60
//! # optional, defaults to u128::MAX / number of usable ticks
//! max_liquidity_per_tick = 1000000000000000000
//! ```
//!
//! TOML integers stop at `i64::MAX`; larger caps are written as decimal
//! strings, e.g. `max_liquidity_per_tick = "11505743598341114571880798222544994"`.

use crate::error::{PoolError, PoolResult};
use crate::tick::max_liquidity_per_tick;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest supported tick spacing
pub const MAX_TICK_SPACING: i32 = 16384;

/// Static parameters of a pool, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Only multiples of this may bound a position
    pub tick_spacing: i32,

    /// Gross liquidity cap per tick; derived from the spacing when absent
    #[serde(default)]
    pub max_liquidity_per_tick: Option<u128>,
}

/// On-disk form of [`PoolConfig`]
#[derive(Debug, Deserialize)]
struct PoolConfigFile {
    tick_spacing: i32,
    #[serde(default)]
    max_liquidity_per_tick: Option<LiquidityCap>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LiquidityCap {
    Integer(u64),
    Text(String),
}

impl LiquidityCap {
    fn to_u128(&self) -> Result<u128> {
        match self {
            LiquidityCap::Integer(value) => Ok(u128::from(*value)),
            LiquidityCap::Text(text) => text
                .trim()
                .parse::<u128>()
                .map_err(|e| anyhow!("Invalid max_liquidity_per_tick {:?}: {}", text, e)),
        }
    }
}

impl TryFrom<PoolConfigFile> for PoolConfig {
    type Error = anyhow::Error;

    fn try_from(file: PoolConfigFile) -> Result<Self> {
        let mut config = PoolConfig::new(file.tick_spacing);
        if let Some(cap) = file.max_liquidity_per_tick {
            config = config.with_max_liquidity_per_tick(cap.to_u128()?);
        }
        Ok(config)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(60)
    }
}

impl PoolConfig {
    pub fn new(tick_spacing: i32) -> Self {
        Self {
            tick_spacing,
            max_liquidity_per_tick: None,
        }
    }

    pub fn with_max_liquidity_per_tick(mut self, max_liquidity: u128) -> Self {
        self.max_liquidity_per_tick = Some(max_liquidity);
        self
    }

    /// Effective gross liquidity cap per tick
    pub fn max_liquidity(&self) -> u128 {
        self.max_liquidity_per_tick
            .unwrap_or_else(|| max_liquidity_per_tick(self.tick_spacing))
    }

    pub fn validate(&self) -> PoolResult<()> {
        if !(1..=MAX_TICK_SPACING).contains(&self.tick_spacing) {
            return Err(PoolError::InvalidTickSpacing {
                spacing: self.tick_spacing,
            });
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: PoolConfigFile =
            toml::from_str(content).context("Failed to parse pool configuration")?;
        let config = PoolConfig::try_from(file).context("Invalid pool configuration")?;
        config.validate().context("Invalid pool configuration")?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pool config: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load pool config: {}", path.display()))
    }
}
