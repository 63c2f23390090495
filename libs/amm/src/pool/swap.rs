//! Swap state machine
//!
//! The loop walks the price from tick to tick. Each iteration asks the bitmap
//! for the next initialized tick within the current word, caps the step at
//! that tick's price (or the caller's limit), and runs one
//! [`SwapMath::compute_swap_step`]. Landing exactly on an initialized tick
//! crosses it and adjusts active liquidity; stopping short of it recomputes
//! the tick from the new price.

use super::{balance_of, verify_payment, BalanceSource, Pool, PoolCallback, Slot0};
use crate::error::{MathError, PoolError, PoolResult, Token};
use crate::full_math::to_u128;
use crate::liquidity_math::LiquidityMath;
use crate::position::Address;
use crate::swap_math::{SwapMath, SwapStep};
use crate::tick_math::{TickMath, MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK};
use ethereum_types::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Outcome of running the swap loop against the current pool state
///
/// Nothing here has been applied; [`Pool::swap`] commits it after the
/// custody check passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapComputation {
    pub zero_for_one: bool,
    /// Signed token0 delta from the pool's perspective (positive = paid in)
    pub amount0: i128,
    /// Signed token1 delta from the pool's perspective (positive = paid in)
    pub amount1: i128,
    pub amount_in: u128,
    pub amount_out: u128,
    /// Price, tick and active liquidity after the swap
    pub slot0: Slot0,
    pub liquidity: u128,
    pub ticks_crossed: u32,
    /// Every step in order; `amount_in` and `amount_out` are their sums
    pub steps: Vec<SwapStep>,
}

impl SwapComputation {
    fn unchanged(pool: &Pool, zero_for_one: bool) -> Self {
        Self {
            zero_for_one,
            amount0: 0,
            amount1: 0,
            amount_in: 0,
            amount_out: 0,
            slot0: pool.slot0,
            liquidity: pool.liquidity,
            ticks_crossed: 0,
            steps: Vec::new(),
        }
    }

    /// True when the swap neither moves the price nor exchanges tokens
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Pool {
    /// Run the swap loop without touching state
    ///
    /// # Arguments
    /// * `zero_for_one` - Token0 in / token1 out when true
    /// * `amount_specified` - Exact input amount
    /// * `sqrt_price_limit_x96` - Price the swap may not move past; defaults
    ///   to one unit inside the representable range
    pub fn compute_swap(
        &self,
        zero_for_one: bool,
        amount_specified: u128,
        sqrt_price_limit_x96: Option<U256>,
    ) -> PoolResult<SwapComputation> {
        let sqrt_price_limit = sqrt_price_limit_x96.unwrap_or(if zero_for_one {
            MIN_SQRT_RATIO + U256::one()
        } else {
            MAX_SQRT_RATIO - U256::one()
        });
        self.check_price_limit(zero_for_one, sqrt_price_limit)?;

        if amount_specified > i128::MAX as u128 {
            return Err(PoolError::SwapAmountTooLarge {
                amount: amount_specified,
            });
        }

        if amount_specified == 0 || sqrt_price_limit == self.slot0.sqrt_price_x96 {
            return Ok(SwapComputation::unchanged(self, zero_for_one));
        }

        let spacing = self.config.tick_spacing;
        let mut remaining = U256::from(amount_specified);
        let mut amount_out = U256::zero();
        let mut sqrt_price = self.slot0.sqrt_price_x96;
        let mut tick = self.slot0.tick;
        let mut liquidity = self.liquidity;
        let mut ticks_crossed = 0u32;
        let mut steps = Vec::new();

        while !remaining.is_zero() && sqrt_price != sqrt_price_limit {
            if liquidity == 0 {
                return Err(PoolError::InsufficientLiquidity {
                    remaining: remaining.low_u128(),
                });
            }

            let (tick_next, initialized) =
                self.bitmap
                    .next_initialized_tick_within_one_word(tick, spacing, zero_for_one);
            let tick_next = tick_next.clamp(MIN_TICK, MAX_TICK);
            let sqrt_price_next = TickMath::sqrt_ratio_at_tick(tick_next)?;

            let sqrt_price_target = if zero_for_one {
                sqrt_price_next.max(sqrt_price_limit)
            } else {
                sqrt_price_next.min(sqrt_price_limit)
            };

            let step =
                SwapMath::compute_swap_step(sqrt_price, sqrt_price_target, liquidity, remaining)?;

            remaining -= step.amount_in;
            amount_out = amount_out
                .checked_add(step.amount_out)
                .ok_or(MathError::Overflow {
                    context: "swap amount_out",
                })?;

            debug!(
                "Swap step: {} -> {} in={} out={} liquidity={}",
                sqrt_price, step.sqrt_price_next, step.amount_in, step.amount_out, liquidity
            );

            let sqrt_price_start = sqrt_price;
            sqrt_price = step.sqrt_price_next;
            steps.push(step);

            if sqrt_price == sqrt_price_next {
                if initialized {
                    let liquidity_net = self.ticks.cross(tick_next);
                    let liquidity_net = if zero_for_one {
                        liquidity_net.checked_neg().ok_or(MathError::Overflow {
                            context: "liquidity_net",
                        })?
                    } else {
                        liquidity_net
                    };
                    liquidity = LiquidityMath::add_delta(liquidity, liquidity_net)?;
                    ticks_crossed += 1;

                    debug!(
                        "Crossed tick {}: net={} active_liquidity={}",
                        tick_next, liquidity_net, liquidity
                    );
                }
                tick = if zero_for_one { tick_next - 1 } else { tick_next };
            } else if sqrt_price != sqrt_price_start {
                tick = TickMath::tick_at_sqrt_ratio(sqrt_price)?;
            }
        }

        let amount_in = amount_specified - remaining.low_u128();
        let amount_out = to_u128(amount_out, "swap amount_out")?;
        let amount_out_signed = i128::try_from(amount_out).map_err(|_| MathError::Overflow {
            context: "swap amount_out",
        })?;

        // amount_in <= amount_specified <= i128::MAX
        let (amount0, amount1) = if zero_for_one {
            (amount_in as i128, -amount_out_signed)
        } else {
            (-amount_out_signed, amount_in as i128)
        };

        Ok(SwapComputation {
            zero_for_one,
            amount0,
            amount1,
            amount_in,
            amount_out,
            slot0: Slot0 {
                sqrt_price_x96: sqrt_price,
                tick,
            },
            liquidity,
            ticks_crossed,
            steps,
        })
    }

    /// Signed amounts `(amount0, amount1)` that [`Pool::swap`] would return
    pub fn quote_swap(
        &self,
        zero_for_one: bool,
        amount_specified: u128,
        sqrt_price_limit_x96: Option<U256>,
    ) -> PoolResult<(i128, i128)> {
        let computation = self.compute_swap(zero_for_one, amount_specified, sqrt_price_limit_x96)?;
        Ok((computation.amount0, computation.amount1))
    }

    /// Swap an exact input amount
    ///
    /// Returns `(amount0, amount1)` from the pool's perspective: positive
    /// amounts were paid in by the caller, negative amounts are owed to
    /// `recipient`. A zero amount or a limit equal to the current price
    /// returns `(0, 0)` without invoking the host.
    ///
    /// # Errors
    /// - [`PoolError::InvalidPriceLimit`] when the limit is on the wrong side
    ///   of the current price or outside the representable range
    /// - [`PoolError::InsufficientLiquidity`] when active liquidity runs out
    ///   with input remaining
    /// - [`PoolError::InsufficientInputAmount`] when custody of the input
    ///   token did not grow by the input amount
    pub fn swap<H>(
        &mut self,
        recipient: Address,
        zero_for_one: bool,
        amount_specified: u128,
        sqrt_price_limit_x96: Option<U256>,
        data: &[u8],
        host: &mut H,
    ) -> PoolResult<(i128, i128)>
    where
        H: BalanceSource + PoolCallback,
    {
        let computation = self.compute_swap(zero_for_one, amount_specified, sqrt_price_limit_x96)?;
        if computation.is_noop() {
            return Ok((0, 0));
        }

        let token_in = if zero_for_one {
            Token::Token0
        } else {
            Token::Token1
        };
        let balance_before = balance_of(&*host, token_in);

        host.swap_callback(recipient, computation.amount0, computation.amount1, data)
            .map_err(PoolError::Callback)?;

        verify_payment(&*host, token_in, balance_before, computation.amount_in)?;

        if computation.slot0 != self.slot0 {
            self.slot0 = computation.slot0;
        }
        if computation.liquidity != self.liquidity {
            self.liquidity = computation.liquidity;
        }

        info!(
            "Swap: recipient={} zero_for_one={} amount0={} amount1={} sqrt_price_x96={} tick={} liquidity={} ticks_crossed={}",
            recipient,
            zero_for_one,
            computation.amount0,
            computation.amount1,
            self.slot0.sqrt_price_x96,
            self.slot0.tick,
            self.liquidity,
            computation.ticks_crossed
        );

        Ok((computation.amount0, computation.amount1))
    }

    fn check_price_limit(&self, zero_for_one: bool, limit: U256) -> PoolResult<()> {
        let current = self.slot0.sqrt_price_x96;
        let valid = if zero_for_one {
            limit <= current && limit > MIN_SQRT_RATIO
        } else {
            limit >= current && limit < MAX_SQRT_RATIO
        };

        if !valid {
            return Err(PoolError::InvalidPriceLimit { limit, current });
        }
        Ok(())
    }
}
