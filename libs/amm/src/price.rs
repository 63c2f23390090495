//! Human-readable price view of Q64.96 sqrt prices
//!
//! The engine only ever works in sqrt price space. This module converts to
//! and from `Decimal` prices (token1 per token0) for display, configuration
//! and tests. Conversions are exact up to `Decimal`'s 28 fractional digits;
//! nothing here feeds back into swap or mint arithmetic.

use crate::error::{MathError, MathResult};
use crate::full_math::{narrow, FullMath};
use crate::tick_math::Q96;
use ethereum_types::{U256, U512};
use rust_decimal::Decimal;

/// Fractional digits carried when converting to `Decimal`
const FRACTION_SCALE: u32 = 28;

pub struct PriceMath;

impl PriceMath {
    /// Raw price `(sqrt_price_x96 / 2^96)^2`, token1 units per token0 unit
    pub fn sqrt_price_to_price(sqrt_price_x96: U256) -> MathResult<Decimal> {
        // Q96 fixed-point price; fits since sqrt_price_x96 < 2^160
        let price_x96 = FullMath::mul_div(sqrt_price_x96, sqrt_price_x96, Q96)?;

        let integer = price_x96 >> 96;
        let fraction = price_x96 & (Q96 - U256::one());

        let integer = decimal_from_u256(integer, 0)?;
        let fraction = FullMath::mul_div(fraction, U256::exp10(FRACTION_SCALE as usize), Q96)?;
        let fraction = decimal_from_u256(fraction, FRACTION_SCALE)?;

        integer.checked_add(fraction).ok_or(MathError::Overflow {
            context: "sqrt_price_to_price",
        })
    }

    /// Price adjusted for token decimals, e.g. USDC per WETH
    ///
    /// # Arguments
    /// * `sqrt_price_x96` - Pool sqrt price
    /// * `decimals0` - Decimals of token0
    /// * `decimals1` - Decimals of token1
    pub fn sqrt_price_to_adjusted_price(
        sqrt_price_x96: U256,
        decimals0: u32,
        decimals1: u32,
    ) -> MathResult<Decimal> {
        let raw = Self::sqrt_price_to_price(sqrt_price_x96)?;
        let overflow = MathError::Overflow {
            context: "sqrt_price_to_adjusted_price",
        };

        if decimals0 >= decimals1 {
            let factor = decimal_pow10(decimals0 - decimals1)?;
            raw.checked_mul(factor).ok_or(overflow)
        } else {
            let factor = decimal_pow10(decimals1 - decimals0)?;
            raw.checked_div(factor).ok_or(overflow)
        }
    }

    /// Floor of `sqrt(price) * 2^96`
    ///
    /// # Errors
    /// [`MathError::InvalidSqrtPrice`] for non-positive prices
    pub fn price_to_sqrt_price(price: Decimal) -> MathResult<U256> {
        if price <= Decimal::ZERO {
            return Err(MathError::InvalidSqrtPrice {
                sqrt_price_x96: U256::zero(),
            });
        }

        let mantissa = U512::from(price.mantissa().unsigned_abs());
        let scale = U512::exp10(price.scale() as usize);

        // price * 2^192 = mantissa * 2^192 / 10^scale
        let radicand = (mantissa << 192) / scale;
        narrow(isqrt(radicand), "price_to_sqrt_price")
    }
}

fn decimal_from_u256(value: U256, scale: u32) -> MathResult<Decimal> {
    let overflow = MathError::Overflow {
        context: "decimal conversion",
    };
    if value > U256::from(i128::MAX as u128) {
        return Err(overflow);
    }
    Decimal::try_from_i128_with_scale(value.low_u128() as i128, scale).map_err(|_| overflow)
}

fn decimal_pow10(exponent: u32) -> MathResult<Decimal> {
    let value = 10i128
        .checked_pow(exponent)
        .ok_or(MathError::Overflow { context: "pow10" })?;
    Decimal::try_from_i128_with_scale(value, 0).map_err(|_| MathError::Overflow { context: "pow10" })
}

/// Integer square root by Newton iteration
fn isqrt(value: U512) -> U512 {
    if value.is_zero() {
        return value;
    }

    let mut x = U512::one() << ((value.bits() + 1) / 2);
    loop {
        let y = (x + value / x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}
