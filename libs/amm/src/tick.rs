//! Per-tick liquidity bookkeeping
//!
//! Each initialized tick records the gross liquidity referencing it (how
//! many positions use it as a bound, weighted by size) and the net change in
//! active liquidity when the price crosses it moving up. The sum of all net
//! values is always zero: every position adds `+L` at its lower tick and
//! `-L` at its upper tick.

use crate::error::{MathError, MathResult};
use crate::liquidity_math::LiquidityMath;
use crate::tick_math::{MAX_TICK, MIN_TICK};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Liquidity recorded at one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInfo {
    /// Total liquidity of positions using this tick as a bound
    pub liquidity_gross: u128,
    /// Active liquidity change when crossing this tick left to right
    pub liquidity_net: i128,
}

impl TickInfo {
    pub fn initialized(&self) -> bool {
        self.liquidity_gross > 0
    }
}

/// Staged change to a single tick, applied only after the owning operation
/// has passed all of its checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickUpdate {
    pub tick: i32,
    pub info: TickInfo,
    /// Initialization state changed (bitmap bit must flip)
    pub flipped: bool,
}

/// Sparse map of initialized ticks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRegistry {
    ticks: HashMap<i32, TickInfo>,
}

impl TickRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick state, zeroed when the tick was never initialized
    pub fn get(&self, tick: i32) -> TickInfo {
        self.ticks.get(&tick).copied().unwrap_or_default()
    }

    /// Compute the result of adding `liquidity_delta` at `tick` without
    /// touching the registry
    ///
    /// # Arguments
    /// * `tick` - Tick being updated
    /// * `liquidity_delta` - Liquidity added (positive) or removed (negative)
    /// * `upper` - Whether `tick` is the upper bound of the position
    /// * `max_liquidity` - Gross liquidity cap per tick
    pub fn preview_update(
        &self,
        tick: i32,
        liquidity_delta: i128,
        upper: bool,
        max_liquidity: u128,
    ) -> MathResult<TickUpdate> {
        let before = self.get(tick);

        let liquidity_gross = LiquidityMath::add_delta(before.liquidity_gross, liquidity_delta)?;
        if liquidity_gross > max_liquidity {
            return Err(MathError::LiquidityOverflow {
                current: before.liquidity_gross,
                delta: liquidity_delta,
            });
        }

        let liquidity_net = if upper {
            before.liquidity_net.checked_sub(liquidity_delta)
        } else {
            before.liquidity_net.checked_add(liquidity_delta)
        }
        .ok_or(MathError::Overflow {
            context: "liquidity_net",
        })?;

        let info = TickInfo {
            liquidity_gross,
            liquidity_net,
        };

        Ok(TickUpdate {
            tick,
            info,
            flipped: before.initialized() != info.initialized(),
        })
    }

    /// Store a staged update
    pub fn apply(&mut self, update: TickUpdate) {
        if update.info.initialized() {
            self.ticks.insert(update.tick, update.info);
        } else {
            self.ticks.remove(&update.tick);
        }
    }

    /// Add `liquidity_delta` at `tick`, returning whether the tick flipped
    /// between initialized and uninitialized
    pub fn update(
        &mut self,
        tick: i32,
        liquidity_delta: i128,
        upper: bool,
        max_liquidity: u128,
    ) -> MathResult<bool> {
        let update = self.preview_update(tick, liquidity_delta, upper, max_liquidity)?;
        self.apply(update);
        Ok(update.flipped)
    }

    /// Net liquidity change for crossing `tick`; never mutates gross
    pub fn cross(&self, tick: i32) -> i128 {
        self.get(tick).liquidity_net
    }

    /// Wrapping sum of all net values; zero whenever the ledger balances
    pub fn liquidity_net_sum(&self) -> i128 {
        self.ticks
            .values()
            .fold(0i128, |sum, info| sum.wrapping_add(info.liquidity_net))
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &TickInfo)> {
        self.ticks.iter().map(|(&tick, info)| (tick, info))
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

impl FromIterator<(i32, TickInfo)> for TickRegistry {
    fn from_iter<I: IntoIterator<Item = (i32, TickInfo)>>(iter: I) -> Self {
        Self {
            ticks: iter.into_iter().collect(),
        }
    }
}

/// Gross liquidity cap per tick so that the sum over every usable tick
/// cannot overflow `u128`
pub fn max_liquidity_per_tick(tick_spacing: i32) -> u128 {
    let spacing = tick_spacing.max(1);
    let min_tick = (MIN_TICK / spacing) * spacing;
    let max_tick = (MAX_TICK / spacing) * spacing;
    let num_ticks = ((max_tick - min_tick) / spacing) as u128 + 1;
    u128::MAX / num_ticks
}
