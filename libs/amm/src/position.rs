//! Liquidity positions keyed by owner and tick range

use crate::error::{MathError, MathResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 20-byte account identity of a position owner or swap recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to a `0x`-prefixed lowercase hex string
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex, with or without the `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| format!("Invalid hex: {}", e))?;
        if bytes.len() != 20 {
            return Err(format!(
                "Invalid address length: expected 20 bytes, got {}",
                bytes.len()
            ));
        }
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&bytes);
        Ok(Self(addr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Identity of a position: one owner may hold many ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey {
    pub owner: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl PositionKey {
    pub fn new(owner: Address, tick_lower: i32, tick_upper: i32) -> Self {
        Self {
            owner,
            tick_lower,
            tick_upper,
        }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}, {}]", self.owner, self.tick_lower, self.tick_upper)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub liquidity: u128,
}

/// All positions of a pool
///
/// Positions are created on first mint and never removed; an untouched key
/// reads as an empty position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionLedger {
    positions: HashMap<PositionKey, Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PositionKey) -> Position {
        self.positions.get(key).copied().unwrap_or_default()
    }

    /// Liquidity of `key` after adding `liquidity_delta`, without storing it
    pub fn preview_update(&self, key: &PositionKey, liquidity_delta: u128) -> MathResult<u128> {
        let current = self.get(key).liquidity;
        current
            .checked_add(liquidity_delta)
            .ok_or(MathError::LiquidityOverflow {
                current,
                delta: i128::try_from(liquidity_delta).unwrap_or(i128::MAX),
            })
    }

    /// Store a liquidity value computed by [`preview_update`](Self::preview_update)
    pub fn apply(&mut self, key: PositionKey, liquidity: u128) {
        self.positions.insert(key, Position { liquidity });
    }

    /// Add liquidity to `key`, returning the new position liquidity
    pub fn update(&mut self, key: PositionKey, liquidity_delta: u128) -> MathResult<u128> {
        let liquidity = self.preview_update(&key, liquidity_delta)?;
        self.apply(key, liquidity);
        Ok(liquidity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PositionKey, &Position)> {
        self.positions.iter()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl FromIterator<(PositionKey, Position)> for PositionLedger {
    fn from_iter<I: IntoIterator<Item = (PositionKey, Position)>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}
