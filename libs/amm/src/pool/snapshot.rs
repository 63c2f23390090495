//! Caller-controlled persistence
//!
//! A [`PoolSnapshot`] is a plain, ordered copy of every piece of pool state.
//! It encodes with bincode, and [`Pool::restore`] refuses any snapshot whose
//! ledgers disagree with each other, so a restored pool always satisfies
//! the same invariants as one built through mints and swaps.

use super::{Pool, Slot0};
use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::position::{Position, PositionKey};
use crate::tick::{TickInfo, TickRegistry};
use crate::tick_bitmap::TickBitmap;
use crate::tick_math::TickMath;
use ethereum_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Serializable image of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub config: PoolConfig,
    pub slot0: Slot0,
    pub liquidity: u128,
    /// Initialized ticks, ascending
    pub ticks: Vec<(i32, TickInfo)>,
    /// Non-zero bitmap words, ascending
    pub bitmap: Vec<(i16, U256)>,
    /// Positions, ordered by key
    pub positions: Vec<(PositionKey, Position)>,
}

impl PoolSnapshot {
    pub fn encode(&self) -> PoolResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> PoolResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl Pool {
    /// Ordered copy of the full pool state
    pub fn snapshot(&self) -> PoolSnapshot {
        let mut ticks: Vec<(i32, TickInfo)> =
            self.ticks.iter().map(|(tick, info)| (tick, *info)).collect();
        ticks.sort_unstable_by_key(|(tick, _)| *tick);

        let mut bitmap: Vec<(i16, U256)> = self.bitmap.words().collect();
        bitmap.sort_unstable_by_key(|(word, _)| *word);

        let mut positions: Vec<(PositionKey, Position)> = self
            .positions
            .iter()
            .map(|(key, position)| (*key, *position))
            .collect();
        positions.sort_unstable_by_key(|(key, _)| *key);

        PoolSnapshot {
            config: self.config,
            slot0: self.slot0,
            liquidity: self.liquidity,
            ticks,
            bitmap,
            positions,
        }
    }

    /// Rebuild a pool from a snapshot, validating it first
    ///
    /// # Errors
    /// [`PoolError::CorruptSnapshot`] when the price and tick disagree, the
    /// bitmap does not match the initialized ticks, the ticks do not match
    /// the positions, or the active liquidity does not match the ticks
    /// below the current price.
    pub fn restore(snapshot: PoolSnapshot) -> PoolResult<Self> {
        snapshot.config.validate()?;

        let mut pool = Pool::new(snapshot.config, snapshot.slot0.sqrt_price_x96)
            .map_err(|e| corrupt(format!("invalid price: {}", e)))?;

        // A zero_for_one swap ending exactly on a tick leaves the tick one
        // below the price's own tick
        let tick = snapshot.slot0.tick;
        let price_tick = pool.slot0.tick;
        let at_boundary = tick == price_tick - 1
            && TickMath::sqrt_ratio_at_tick(price_tick)? == snapshot.slot0.sqrt_price_x96;
        if tick != price_tick && !at_boundary {
            return Err(corrupt(format!(
                "tick {} does not match sqrt price (tick {})",
                tick, price_tick
            )));
        }
        pool.slot0 = snapshot.slot0;
        pool.liquidity = snapshot.liquidity;

        let tick_count = snapshot.ticks.len();
        pool.ticks = snapshot.ticks.into_iter().collect();
        if pool.ticks.len() != tick_count {
            return Err(corrupt("duplicate tick entries".to_string()));
        }

        let position_count = snapshot.positions.len();
        pool.positions = snapshot.positions.into_iter().collect();
        if pool.positions.len() != position_count {
            return Err(corrupt("duplicate position entries".to_string()));
        }

        pool.bitmap = snapshot.bitmap.into_iter().collect::<TickBitmap>();

        pool.validate_ledgers()?;

        info!(
            "Restored pool: tick={} liquidity={} ticks={} positions={}",
            pool.slot0.tick,
            pool.liquidity,
            pool.ticks.len(),
            pool.positions.len()
        );
        Ok(pool)
    }

    /// Cross-check ticks against positions, bitmap and active liquidity
    fn validate_ledgers(&self) -> PoolResult<()> {
        let expected = self.ticks_from_positions()?;
        if expected != self.ticks {
            return Err(corrupt("ticks disagree with positions".to_string()));
        }

        let spacing = self.config.tick_spacing;
        for (tick, info) in self.ticks.iter() {
            if info.liquidity_gross > self.max_liquidity_per_tick {
                return Err(corrupt(format!("tick {} exceeds liquidity cap", tick)));
            }
            if !self.bitmap.is_initialized(tick, spacing) {
                return Err(corrupt(format!("tick {} missing from bitmap", tick)));
            }
        }
        if self.bitmap.count_initialized() != self.ticks.len() {
            return Err(corrupt("bitmap marks uninitialized ticks".to_string()));
        }

        if self.ticks.liquidity_net_sum() != 0 {
            return Err(corrupt("liquidity net does not sum to zero".to_string()));
        }

        let active = self
            .ticks
            .iter()
            .filter(|(tick, _)| *tick <= self.slot0.tick)
            .fold(0i128, |sum, (_, info)| sum.wrapping_add(info.liquidity_net));
        if active < 0 || active as u128 != self.liquidity {
            return Err(corrupt(format!(
                "active liquidity {} does not match ticks ({})",
                self.liquidity, active
            )));
        }

        Ok(())
    }

    /// Tick ledger implied by the stored positions
    fn ticks_from_positions(&self) -> PoolResult<TickRegistry> {
        let mut ticks = TickRegistry::new();
        let mut positions: BTreeMap<PositionKey, u128> = BTreeMap::new();
        for (key, position) in self.positions.iter() {
            positions.insert(*key, position.liquidity);
        }

        for (key, liquidity) in positions {
            if liquidity == 0 {
                continue;
            }
            self.check_ticks(key.tick_lower, key.tick_upper)
                .map_err(|e| corrupt(format!("position {}: {}", key, e)))?;

            let delta = i128::try_from(liquidity)
                .map_err(|_| corrupt(format!("position {} liquidity too large", key)))?;
            ticks
                .update(key.tick_lower, delta, false, u128::MAX)
                .and_then(|_| ticks.update(key.tick_upper, delta, true, u128::MAX))
                .map_err(|e| corrupt(format!("position {}: {}", key, e)))?;
        }

        Ok(ticks)
    }
}

fn corrupt(reason: String) -> PoolError {
    PoolError::CorruptSnapshot { reason }
}
