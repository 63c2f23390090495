//! Pool state and the operations that mutate it
//!
//! A [`Pool`] owns the current price, the active liquidity and the three
//! ledgers (ticks, bitmap, positions). Mint and swap are two-phase:
//!
//! 1. compute every state change against an immutable view of the pool
//! 2. hand the resulting token amounts to the host callback
//! 3. verify custody balances moved as required
//! 4. commit
//!
//! Any error in steps 1-3 leaves the pool exactly as it was.

pub mod callback;
mod flash;
mod mint;
mod snapshot;
mod swap;

pub use callback::{BalanceSource, PoolCallback};
pub use snapshot::PoolSnapshot;
pub use swap::SwapComputation;

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult, Token};
use crate::position::{Address, Position, PositionKey, PositionLedger};
use crate::tick::{TickInfo, TickRegistry};
use crate::tick_bitmap::TickBitmap;
use crate::tick_math::{TickMath, MAX_TICK, MIN_TICK};
use ethereum_types::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Current price and the tick it falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot0 {
    pub sqrt_price_x96: U256,
    pub tick: i32,
}

/// A single concentrated-liquidity pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    config: PoolConfig,
    max_liquidity_per_tick: u128,
    slot0: Slot0,
    liquidity: u128,
    ticks: TickRegistry,
    bitmap: TickBitmap,
    positions: PositionLedger,
}

impl Pool {
    /// Create an empty pool at `sqrt_price_x96`
    pub fn new(config: PoolConfig, sqrt_price_x96: U256) -> PoolResult<Self> {
        config.validate()?;
        let tick = TickMath::tick_at_sqrt_ratio(sqrt_price_x96)?;

        debug!(
            "Creating pool: spacing={} sqrt_price_x96={} tick={}",
            config.tick_spacing, sqrt_price_x96, tick
        );

        Ok(Self {
            config,
            max_liquidity_per_tick: config.max_liquidity(),
            slot0: Slot0 {
                sqrt_price_x96,
                tick,
            },
            liquidity: 0,
            ticks: TickRegistry::new(),
            bitmap: TickBitmap::new(),
            positions: PositionLedger::new(),
        })
    }

    /// Create an empty pool at the lower edge of `tick`
    pub fn from_tick(config: PoolConfig, tick: i32) -> PoolResult<Self> {
        let sqrt_price_x96 = TickMath::sqrt_ratio_at_tick(tick)?;
        Self::new(config, sqrt_price_x96)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn tick_spacing(&self) -> i32 {
        self.config.tick_spacing
    }

    pub fn max_liquidity_per_tick(&self) -> u128 {
        self.max_liquidity_per_tick
    }

    pub fn slot0(&self) -> Slot0 {
        self.slot0
    }

    pub fn sqrt_price_x96(&self) -> U256 {
        self.slot0.sqrt_price_x96
    }

    pub fn tick(&self) -> i32 {
        self.slot0.tick
    }

    /// Liquidity active at the current price
    pub fn liquidity(&self) -> u128 {
        self.liquidity
    }

    pub fn tick_info(&self, tick: i32) -> TickInfo {
        self.ticks.get(tick)
    }

    pub fn is_tick_initialized(&self, tick: i32) -> bool {
        self.bitmap.is_initialized(tick, self.config.tick_spacing)
    }

    pub fn position(&self, owner: Address, tick_lower: i32, tick_upper: i32) -> Position {
        self.positions
            .get(&PositionKey::new(owner, tick_lower, tick_upper))
    }

    pub fn ticks(&self) -> &TickRegistry {
        &self.ticks
    }

    pub fn bitmap(&self) -> &TickBitmap {
        &self.bitmap
    }

    pub fn positions(&self) -> &PositionLedger {
        &self.positions
    }

    /// Reject ranges that are unordered, out of bounds or off the spacing grid
    fn check_ticks(&self, tick_lower: i32, tick_upper: i32) -> PoolResult<()> {
        let spacing = self.config.tick_spacing;
        let invalid = tick_lower >= tick_upper
            || tick_lower < MIN_TICK
            || tick_upper > MAX_TICK
            || tick_lower % spacing != 0
            || tick_upper % spacing != 0;

        if invalid {
            return Err(PoolError::InvalidTickRange {
                lower: tick_lower,
                upper: tick_upper,
                spacing,
            });
        }
        Ok(())
    }
}

fn balance_of<H: BalanceSource>(host: &H, token: Token) -> u128 {
    match token {
        Token::Token0 => host.balance0(),
        Token::Token1 => host.balance1(),
    }
}

/// Require that `token` custody grew by at least `amount` since `before`
fn verify_payment<H: BalanceSource>(
    host: &H,
    token: Token,
    before: u128,
    amount: u128,
) -> PoolResult<()> {
    let received = balance_of(host, token);
    let expected = before.saturating_add(amount);
    if received < expected {
        warn!(
            "Custody check failed for {}: expected balance >= {}, got {}",
            token, expected, received
        );
        return Err(PoolError::InsufficientInputAmount {
            token,
            expected,
            received,
        });
    }
    Ok(())
}
