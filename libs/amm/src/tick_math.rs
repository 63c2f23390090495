//! Tick ↔ sqrt price conversions in Q64.96
//!
//! Ticks index a geometric price ladder with ratio 1.0001. The sqrt price
//! at a tick is `sqrt(1.0001^tick) * 2^96`, computed by bit-decomposing the
//! absolute tick into precomputed Q128 factors so the result is exact and
//! deterministic across platforms. The inverse uses a log2 approximation
//! followed by a single correction step, always returning the floor tick.

use crate::error::{MathError, MathResult};
use ethereum_types::U256;

/// Lowest usable tick (price ≈ 2.9e-39)
pub const MIN_TICK: i32 = -887272;
/// Highest usable tick (price ≈ 3.4e38)
pub const MAX_TICK: i32 = 887272;

/// Sqrt price at `MIN_TICK`: 4295128739
pub const MIN_SQRT_RATIO: U256 = U256([4295128739, 0, 0, 0]);
/// Sqrt price at `MAX_TICK`: 1461446703485210103287273052203988822378723970342
pub const MAX_SQRT_RATIO: U256 = U256([
    6743328256752651558,
    17280870778742802505,
    4294805859,
    0,
]);

/// 2^96 as a sqrt price, i.e. price 1.0 (tick 0)
pub const Q96: U256 = U256([0, 4294967296, 0, 0]);

// log_sqrt(1.0001)(2) as a Q128 multiplier for the log2 result
const LOG_SQRT10001_MULTIPLIER: u128 = 255738958999603826347141;
// Error bounds of the log approximation, Q128
const TICK_LOW_ERROR: u128 = 3402992956809132418596140100660247210;
const TICK_HIGH_ERROR: u128 = 291339464771989622907027621153398088495;

// sqrt(1.0001^-(2^i)) in Q128 for i = 1..=19; bit 0 seeds the ratio
const SQRT_RATIO_FACTORS: [(u32, u128); 19] = [
    (0x2, 0xfff97272373d413259a46990580e213a),
    (0x4, 0xfff2e50f5f656932ef12357cf3c7fdcc),
    (0x8, 0xffe5caca7e10e4e61c3624eaa0941cd0),
    (0x10, 0xffcb9843d60f6159c9db58835c926644),
    (0x20, 0xff973b41fa98c081472e6896dfb254c0),
    (0x40, 0xff2ea16466c96a3843ec78b326b52861),
    (0x80, 0xfe5dee046a99a2a811c461f1969c3053),
    (0x100, 0xfcbe86c7900a88aedcffc83b479aa3a4),
    (0x200, 0xf987a7253ac413176f2b074cf7815e54),
    (0x400, 0xf3392b0822b70005940c7a398e4b70f3),
    (0x800, 0xe7159475a2c29b7443b29c7fa6e889d9),
    (0x1000, 0xd097f3bdfd2022b8845ad8f792aa5825),
    (0x2000, 0xa9f746462d870fdf8a65dc1f90e061e5),
    (0x4000, 0x70d869a156d2a1b890bb3df62baf32f7),
    (0x8000, 0x31be135f97d08fd981231505542fcfa6),
    (0x10000, 0x9aa508b5b7a84e1c677de54f3e99bc9),
    (0x20000, 0x5d6af8dedb81196699c329225ee604),
    (0x40000, 0x2216e584f5fa1ea926041bedfe98),
    (0x80000, 0x48a170391f7dc42444e8fa2),
];

/// Tick math over the Q64.96 sqrt price ladder
pub struct TickMath;

impl TickMath {
    /// Calculate `sqrt(1.0001^tick) * 2^96`, rounded up
    ///
    /// # Errors
    /// [`MathError::InvalidTick`] when `tick` is outside `[MIN_TICK, MAX_TICK]`
    pub fn sqrt_ratio_at_tick(tick: i32) -> MathResult<U256> {
        if !(MIN_TICK..=MAX_TICK).contains(&tick) {
            return Err(MathError::InvalidTick { tick });
        }

        let abs_tick = tick.unsigned_abs();

        let mut ratio = if abs_tick & 0x1 != 0 {
            U256::from(0xfffcb933bd6fad37aa2d162d1a594001u128)
        } else {
            U256::one() << 128
        };

        for &(bit, factor) in SQRT_RATIO_FACTORS.iter() {
            if abs_tick & bit != 0 {
                // ratio <= 2^128 and factor < 2^128, so the product fits
                ratio = (ratio * U256::from(factor)) >> 128;
            }
        }

        if tick > 0 {
            ratio = U256::MAX / ratio;
        }

        // Q128 -> Q96, rounding up so the result never falls below the true price
        let round_up = if ratio.low_u32() == 0 { 0u64 } else { 1u64 };
        Ok((ratio >> 32) + U256::from(round_up))
    }

    /// Greatest tick whose sqrt ratio is `<= sqrt_price_x96`
    ///
    /// # Errors
    /// [`MathError::InvalidSqrtPrice`] unless
    /// `MIN_SQRT_RATIO <= sqrt_price_x96 <= MAX_SQRT_RATIO`
    pub fn tick_at_sqrt_ratio(sqrt_price_x96: U256) -> MathResult<i32> {
        if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 > MAX_SQRT_RATIO {
            return Err(MathError::InvalidSqrtPrice { sqrt_price_x96 });
        }
        // The log2 estimate would bracket MAX_TICK + 1 here
        if sqrt_price_x96 == MAX_SQRT_RATIO {
            return Ok(MAX_TICK);
        }

        // Q128.128 ratio; fits since sqrt_price_x96 < 2^160
        let ratio = sqrt_price_x96 << 32;
        let msb = ratio.bits() - 1;

        let mut r = if msb >= 128 {
            ratio >> (msb - 127)
        } else {
            ratio << (127 - msb)
        };

        // Integer part of log2, Q64.64 signed
        let mut log_2: i128 = (msb as i128 - 128) << 64;

        // Fractional bits 63..=50 by repeated squaring
        for shift in (50..=63).rev() {
            r = (r * r) >> 127;
            let f = (r >> 128).low_u32();
            log_2 |= (f as i128) << shift;
            r = r >> (f as usize);
        }

        // Signed 256-bit products, carried as two's complement in U256
        let log_sqrt10001 = twos_complement(log_2)
            .overflowing_mul(U256::from(LOG_SQRT10001_MULTIPLIER))
            .0;

        let tick_low = high_tick_bits(log_sqrt10001.overflowing_sub(U256::from(TICK_LOW_ERROR)).0);
        let tick_high =
            high_tick_bits(log_sqrt10001.overflowing_add(U256::from(TICK_HIGH_ERROR)).0);

        if tick_low == tick_high {
            return Ok(tick_low);
        }

        if Self::sqrt_ratio_at_tick(tick_high)? <= sqrt_price_x96 {
            Ok(tick_high)
        } else {
            Ok(tick_low)
        }
    }
}

fn twos_complement(value: i128) -> U256 {
    let magnitude = U256::from(value.unsigned_abs());
    if value >= 0 {
        magnitude
    } else {
        (!magnitude).overflowing_add(U256::one()).0
    }
}

/// Bits 128..160 of a two's-complement Q128.128 value as a signed tick.
/// Arithmetic and logical shifts agree on these bits, so a plain shift is
/// enough once the result is truncated to 32 bits.
fn high_tick_bits(value: U256) -> i32 {
    (value >> 128).low_u32() as i32
}
