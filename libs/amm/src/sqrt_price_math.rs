//! Closed-form price/amount relations for a single liquidity band
//!
//! Within a band of constant liquidity `L`:
//! - `amount0 = L * 2^96 * (sqrt_b - sqrt_a) / (sqrt_a * sqrt_b)`
//! - `amount1 = L * (sqrt_b - sqrt_a) / 2^96`
//!
//! Amounts the pool receives are rounded up, amounts it pays out are rounded
//! down. The next-price functions round in whichever direction moves the
//! price less, so the pool never gives away value through truncation.

use crate::error::{MathError, MathResult};
use crate::full_math::FullMath;
use crate::tick_math::Q96;
use ethereum_types::U256;

const RESOLUTION: usize = 96;

/// `2^160 - 1`, the largest representable sqrt price
const MAX_U160: U256 = U256([u64::MAX, u64::MAX, 0xffff_ffff, 0]);

pub struct SqrtPriceMath;

impl SqrtPriceMath {
    /// Amount of token0 between two sqrt prices for `liquidity`
    ///
    /// The bounds may be passed in either order.
    ///
    /// # Arguments
    /// * `sqrt_ratio_a_x96` - One bound of the band
    /// * `sqrt_ratio_b_x96` - The other bound
    /// * `liquidity` - Active liquidity across the band
    /// * `round_up` - Round up (owed to the pool) or down (owed by the pool)
    pub fn amount0_delta(
        sqrt_ratio_a_x96: U256,
        sqrt_ratio_b_x96: U256,
        liquidity: u128,
        round_up: bool,
    ) -> MathResult<U256> {
        let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
        if lower.is_zero() {
            return Err(MathError::DivisionByZero);
        }

        let numerator1 = U256::from(liquidity) << RESOLUTION;
        let numerator2 = upper - lower;

        if round_up {
            FullMath::div_rounding_up(
                FullMath::mul_div_rounding_up(numerator1, numerator2, upper)?,
                lower,
            )
        } else {
            Ok(FullMath::mul_div(numerator1, numerator2, upper)? / lower)
        }
    }

    /// Amount of token1 between two sqrt prices for `liquidity`
    ///
    /// The bounds may be passed in either order.
    pub fn amount1_delta(
        sqrt_ratio_a_x96: U256,
        sqrt_ratio_b_x96: U256,
        liquidity: u128,
        round_up: bool,
    ) -> MathResult<U256> {
        let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
        let liquidity = U256::from(liquidity);

        if round_up {
            FullMath::mul_div_rounding_up(liquidity, upper - lower, Q96)
        } else {
            FullMath::mul_div(liquidity, upper - lower, Q96)
        }
    }

    /// Sqrt price after adding `amount_in` of the input token
    ///
    /// Token0 input (`zero_for_one`) lowers the price, token1 input raises it.
    pub fn next_sqrt_price_from_input(
        sqrt_price_x96: U256,
        liquidity: u128,
        amount_in: U256,
        zero_for_one: bool,
    ) -> MathResult<U256> {
        if sqrt_price_x96.is_zero() || liquidity == 0 {
            return Err(MathError::DivisionByZero);
        }

        if zero_for_one {
            Self::next_sqrt_price_from_amount0_rounding_up(sqrt_price_x96, liquidity, amount_in)
        } else {
            Self::next_sqrt_price_from_amount1_rounding_down(sqrt_price_x96, liquidity, amount_in)
        }
    }

    /// `L * p / (L + amount * p)`, rounded up so the price falls no further
    /// than the input pays for
    fn next_sqrt_price_from_amount0_rounding_up(
        sqrt_price_x96: U256,
        liquidity: u128,
        amount: U256,
    ) -> MathResult<U256> {
        if amount.is_zero() {
            return Ok(sqrt_price_x96);
        }

        let numerator1 = U256::from(liquidity) << RESOLUTION;

        let (product, mul_overflow) = amount.overflowing_mul(sqrt_price_x96);
        if !mul_overflow {
            let (denominator, add_overflow) = numerator1.overflowing_add(product);
            if !add_overflow {
                return FullMath::mul_div_rounding_up(numerator1, sqrt_price_x96, denominator);
            }
        }

        // Equivalent form that cannot overflow in the denominator
        let denominator = (numerator1 / sqrt_price_x96)
            .checked_add(amount)
            .ok_or(MathError::Overflow {
                context: "next_sqrt_price_from_amount0",
            })?;
        FullMath::div_rounding_up(numerator1, denominator)
    }

    /// `p + amount * 2^96 / L`, rounded down so the price rises no further
    /// than the input pays for
    fn next_sqrt_price_from_amount1_rounding_down(
        sqrt_price_x96: U256,
        liquidity: u128,
        amount: U256,
    ) -> MathResult<U256> {
        let liquidity = U256::from(liquidity);

        let quotient = if amount <= MAX_U160 {
            (amount << RESOLUTION) / liquidity
        } else {
            FullMath::mul_div(amount, Q96, liquidity)?
        };

        let next = sqrt_price_x96
            .checked_add(quotient)
            .ok_or(MathError::Overflow {
                context: "next_sqrt_price_from_amount1",
            })?;

        if next > MAX_U160 {
            return Err(MathError::Overflow {
                context: "next_sqrt_price_from_amount1",
            });
        }
        Ok(next)
    }
}

fn sorted(a: U256, b: U256) -> (U256, U256) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}
