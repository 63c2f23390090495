//! Liquidity ↔ token amount conversions and checked liquidity arithmetic

use crate::error::{MathError, MathResult};
use crate::full_math::{to_u128, FullMath};
use crate::sqrt_price_math::SqrtPriceMath;
use crate::tick_math::Q96;
use ethereum_types::U256;

pub struct LiquidityMath;

impl LiquidityMath {
    /// Apply a signed delta to a liquidity value
    ///
    /// Fails rather than wrapping in either direction.
    pub fn add_delta(current: u128, delta: i128) -> MathResult<u128> {
        if delta < 0 {
            current
                .checked_sub(delta.unsigned_abs())
                .ok_or(MathError::LiquidityUnderflow { current, delta })
        } else {
            current
                .checked_add(delta as u128)
                .ok_or(MathError::LiquidityOverflow { current, delta })
        }
    }

    /// Liquidity bought by `amount0` across `[sqrt_a, sqrt_b]`, rounded down
    pub fn liquidity_for_amount0(
        sqrt_ratio_a_x96: U256,
        sqrt_ratio_b_x96: U256,
        amount0: U256,
    ) -> MathResult<u128> {
        let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
        let intermediate = FullMath::mul_div(lower, upper, Q96)?;
        let liquidity = FullMath::mul_div(amount0, intermediate, upper - lower)?;
        to_u128(liquidity, "liquidity_for_amount0")
    }

    /// Liquidity bought by `amount1` across `[sqrt_a, sqrt_b]`, rounded down
    pub fn liquidity_for_amount1(
        sqrt_ratio_a_x96: U256,
        sqrt_ratio_b_x96: U256,
        amount1: U256,
    ) -> MathResult<u128> {
        let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
        let liquidity = FullMath::mul_div(amount1, Q96, upper - lower)?;
        to_u128(liquidity, "liquidity_for_amount1")
    }

    /// Maximum liquidity that `amount0` and `amount1` can back for a range
    ///
    /// Below the range only token0 counts, above it only token1, and inside
    /// it the scarcer of the two limits the result.
    pub fn liquidity_for_amounts(
        sqrt_price_x96: U256,
        sqrt_ratio_a_x96: U256,
        sqrt_ratio_b_x96: U256,
        amount0: U256,
        amount1: U256,
    ) -> MathResult<u128> {
        let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);

        if sqrt_price_x96 <= lower {
            Self::liquidity_for_amount0(lower, upper, amount0)
        } else if sqrt_price_x96 < upper {
            let liquidity0 = Self::liquidity_for_amount0(sqrt_price_x96, upper, amount0)?;
            let liquidity1 = Self::liquidity_for_amount1(lower, sqrt_price_x96, amount1)?;
            Ok(liquidity0.min(liquidity1))
        } else {
            Self::liquidity_for_amount1(lower, upper, amount1)
        }
    }

    /// Token amounts a position of `liquidity` is worth at the current price,
    /// rounded down
    pub fn amounts_for_liquidity(
        sqrt_price_x96: U256,
        sqrt_ratio_a_x96: U256,
        sqrt_ratio_b_x96: U256,
        liquidity: u128,
    ) -> MathResult<(U256, U256)> {
        let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);

        if sqrt_price_x96 <= lower {
            let amount0 = SqrtPriceMath::amount0_delta(lower, upper, liquidity, false)?;
            Ok((amount0, U256::zero()))
        } else if sqrt_price_x96 < upper {
            let amount0 = SqrtPriceMath::amount0_delta(sqrt_price_x96, upper, liquidity, false)?;
            let amount1 = SqrtPriceMath::amount1_delta(lower, sqrt_price_x96, liquidity, false)?;
            Ok((amount0, amount1))
        } else {
            let amount1 = SqrtPriceMath::amount1_delta(lower, upper, liquidity, false)?;
            Ok((U256::zero(), amount1))
        }
    }
}

fn sorted(a: U256, b: U256) -> (U256, U256) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}
