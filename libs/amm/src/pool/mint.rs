use super::{balance_of, verify_payment, BalanceSource, Pool, PoolCallback};
use crate::error::{MathError, PoolError, PoolResult, Token};
use crate::full_math::to_u128;
use crate::liquidity_math::LiquidityMath;
use crate::position::{Address, PositionKey};
use crate::sqrt_price_math::SqrtPriceMath;
use crate::tick_math::TickMath;
use tracing::{debug, info};

/// Token amounts owed for a mint and the active liquidity afterwards
struct MintAmounts {
    amount0: u128,
    amount1: u128,
    liquidity_after: u128,
}

impl Pool {
    /// Add `amount` liquidity for `owner` over `[tick_lower, tick_upper)`
    ///
    /// Returns the token amounts the host deposited through
    /// [`PoolCallback::mint_callback`], both rounded up.
    ///
    /// # Errors
    /// - [`PoolError::InvalidTickRange`] for unordered, out-of-range or
    ///   misaligned bounds
    /// - [`PoolError::ZeroLiquidity`] when `amount` is zero
    /// - [`PoolError::InsufficientInputAmount`] when custody did not grow by
    ///   the owed amounts
    /// - [`MathError::LiquidityOverflow`] when a tick would exceed the
    ///   per-tick cap
    pub fn mint<H>(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
        data: &[u8],
        host: &mut H,
    ) -> PoolResult<(u128, u128)>
    where
        H: BalanceSource + PoolCallback,
    {
        self.check_ticks(tick_lower, tick_upper)?;
        if amount == 0 {
            return Err(PoolError::ZeroLiquidity);
        }

        let liquidity_delta = i128::try_from(amount).map_err(|_| MathError::LiquidityOverflow {
            current: 0,
            delta: i128::MAX,
        })?;

        // Stage every ledger change before any custody interaction
        let max_liquidity = self.max_liquidity_per_tick;
        let lower_update =
            self.ticks
                .preview_update(tick_lower, liquidity_delta, false, max_liquidity)?;
        let upper_update =
            self.ticks
                .preview_update(tick_upper, liquidity_delta, true, max_liquidity)?;

        let key = PositionKey::new(owner, tick_lower, tick_upper);
        let position_liquidity = self.positions.preview_update(&key, amount)?;

        let owed = self.mint_amounts(tick_lower, tick_upper, amount)?;

        debug!(
            "Mint staged for {}: amount0={} amount1={} position_liquidity={}",
            key, owed.amount0, owed.amount1, position_liquidity
        );

        let balance0_before = balance_of(&*host, Token::Token0);
        let balance1_before = balance_of(&*host, Token::Token1);

        host.mint_callback(owed.amount0, owed.amount1, data)
            .map_err(PoolError::Callback)?;

        if owed.amount0 > 0 {
            verify_payment(&*host, Token::Token0, balance0_before, owed.amount0)?;
        }
        if owed.amount1 > 0 {
            verify_payment(&*host, Token::Token1, balance1_before, owed.amount1)?;
        }

        // Commit; bounds are validated so none of this can fail
        for update in [lower_update, upper_update] {
            self.ticks.apply(update);
            if update.flipped {
                self.bitmap.flip_tick(update.tick, self.config.tick_spacing)?;
            }
        }
        self.positions.apply(key, position_liquidity);
        self.liquidity = owed.liquidity_after;

        info!(
            "Mint: owner={} range=[{}, {}] liquidity={} amount0={} amount1={} active_liquidity={}",
            owner, tick_lower, tick_upper, amount, owed.amount0, owed.amount1, self.liquidity
        );

        Ok((owed.amount0, owed.amount1))
    }

    /// Amounts owed for `liquidity` over a range, given where the current
    /// tick sits relative to it
    fn mint_amounts(
        &self,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
    ) -> PoolResult<MintAmounts> {
        let sqrt_lower = TickMath::sqrt_ratio_at_tick(tick_lower)?;
        let sqrt_upper = TickMath::sqrt_ratio_at_tick(tick_upper)?;
        let current_tick = self.slot0.tick;
        let sqrt_price = self.slot0.sqrt_price_x96;

        let amounts = if current_tick < tick_lower {
            // Range above the price: all token0
            let amount0 = SqrtPriceMath::amount0_delta(sqrt_lower, sqrt_upper, liquidity, true)?;
            MintAmounts {
                amount0: to_u128(amount0, "mint amount0")?,
                amount1: 0,
                liquidity_after: self.liquidity,
            }
        } else if current_tick < tick_upper {
            // Straddling: token0 above the price, token1 below it
            let amount0 = SqrtPriceMath::amount0_delta(sqrt_price, sqrt_upper, liquidity, true)?;
            let amount1 = SqrtPriceMath::amount1_delta(sqrt_lower, sqrt_price, liquidity, true)?;
            MintAmounts {
                amount0: to_u128(amount0, "mint amount0")?,
                amount1: to_u128(amount1, "mint amount1")?,
                liquidity_after: LiquidityMath::add_delta(self.liquidity, liquidity as i128)?,
            }
        } else {
            // Range below the price: all token1
            let amount1 = SqrtPriceMath::amount1_delta(sqrt_lower, sqrt_upper, liquidity, true)?;
            MintAmounts {
                amount0: 0,
                amount1: to_u128(amount1, "mint amount1")?,
                liquidity_after: self.liquidity,
            }
        };

        Ok(amounts)
    }
}
