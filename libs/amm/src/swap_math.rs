//! Single bounded swap step within one band of constant liquidity

use crate::error::MathResult;
use crate::sqrt_price_math::SqrtPriceMath;
use ethereum_types::U256;
use serde::{Deserialize, Serialize};

/// Outcome of one swap step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStep {
    /// Price after the step; equals the target iff the target was reached
    pub sqrt_price_next: U256,
    /// Input consumed, rounded up
    pub amount_in: U256,
    /// Output produced, rounded down
    pub amount_out: U256,
}

pub struct SwapMath;

impl SwapMath {
    /// Move from `sqrt_price_current` towards `sqrt_price_target` spending at
    /// most `amount_remaining` of input
    ///
    /// Direction is implied by the prices: a target at or below the current
    /// price means token0 in. When the remaining input cannot reach the
    /// target, the whole remainder is consumed and any sub-unit of price it
    /// cannot buy stays with the pool, so a swap loop always terminates.
    ///
    /// # Arguments
    /// * `sqrt_price_current` - Current Q64.96 sqrt price
    /// * `sqrt_price_target` - Bound for this step (next tick or price limit)
    /// * `liquidity` - Liquidity active across the step
    /// * `amount_remaining` - Input still to be spent
    pub fn compute_swap_step(
        sqrt_price_current: U256,
        sqrt_price_target: U256,
        liquidity: u128,
        amount_remaining: U256,
    ) -> MathResult<SwapStep> {
        let zero_for_one = sqrt_price_current >= sqrt_price_target;

        let amount_in_to_target = if zero_for_one {
            SqrtPriceMath::amount0_delta(sqrt_price_target, sqrt_price_current, liquidity, true)?
        } else {
            SqrtPriceMath::amount1_delta(sqrt_price_current, sqrt_price_target, liquidity, true)?
        };

        let (sqrt_price_next, amount_in) = if amount_remaining >= amount_in_to_target {
            (sqrt_price_target, amount_in_to_target)
        } else {
            let next = SqrtPriceMath::next_sqrt_price_from_input(
                sqrt_price_current,
                liquidity,
                amount_remaining,
                zero_for_one,
            )?;
            (next, amount_remaining)
        };

        let amount_out = if zero_for_one {
            SqrtPriceMath::amount1_delta(sqrt_price_next, sqrt_price_current, liquidity, false)?
        } else {
            SqrtPriceMath::amount0_delta(sqrt_price_current, sqrt_price_next, liquidity, false)?
        };

        Ok(SwapStep {
            sqrt_price_next,
            amount_in,
            amount_out,
        })
    }
}
