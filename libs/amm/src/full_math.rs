//! 512-bit intermediate multiply/divide primitives
//!
//! Every price/amount relation in the engine is a product of two 256-bit
//! quantities divided by a third. The product is formed in `U512` so that
//! phantom overflow never truncates a result that itself fits in 256 bits.

use crate::error::{MathError, MathResult};
use ethereum_types::{U256, U512};

/// Fixed-point helpers with explicit rounding direction
pub struct FullMath;

impl FullMath {
    /// `floor(a * b / denominator)` with a full 512-bit intermediate
    pub fn mul_div(a: U256, b: U256, denominator: U256) -> MathResult<U256> {
        let (quotient, _) = Self::mul_div_rem(a, b, denominator)?;
        Ok(quotient)
    }

    /// `ceil(a * b / denominator)` with a full 512-bit intermediate
    pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> MathResult<U256> {
        let (quotient, has_remainder) = Self::mul_div_rem(a, b, denominator)?;
        if !has_remainder {
            return Ok(quotient);
        }
        quotient.checked_add(U256::one()).ok_or(MathError::Overflow {
            context: "mul_div_rounding_up",
        })
    }

    /// `ceil(a / b)`
    pub fn div_rounding_up(a: U256, b: U256) -> MathResult<U256> {
        if b.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let (quotient, remainder) = a.div_mod(b);
        if remainder.is_zero() {
            Ok(quotient)
        } else {
            // quotient < a <= U256::MAX here, so the increment cannot wrap
            Ok(quotient + U256::one())
        }
    }

    fn mul_div_rem(a: U256, b: U256, denominator: U256) -> MathResult<(U256, bool)> {
        if denominator.is_zero() {
            return Err(MathError::DivisionByZero);
        }

        let product: U512 = a.full_mul(b);
        let denominator = widen(denominator);
        let quotient = product / denominator;
        let remainder = product % denominator;

        Ok((narrow(quotient, "mul_div")?, !remainder.is_zero()))
    }
}

pub(crate) fn widen(value: U256) -> U512 {
    let U256(ref limbs) = value;
    U512([limbs[0], limbs[1], limbs[2], limbs[3], 0, 0, 0, 0])
}

pub(crate) fn narrow(value: U512, context: &'static str) -> MathResult<U256> {
    let U512(ref limbs) = value;
    if limbs[4..].iter().any(|&limb| limb != 0) {
        return Err(MathError::Overflow { context });
    }
    Ok(U256([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

/// Convert a 256-bit value into `u128`, failing instead of truncating
pub(crate) fn to_u128(value: U256, context: &'static str) -> MathResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(MathError::Overflow { context });
    }
    Ok(value.low_u128())
}
