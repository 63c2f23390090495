use super::{balance_of, BalanceSource, Pool, PoolCallback};
use crate::error::{PoolError, PoolResult, Token};
use crate::position::Address;
use tracing::{info, warn};

impl Pool {
    /// Lend custody balances to `recipient` for the duration of the callback
    ///
    /// No fee is charged and pool state is never touched; the only
    /// requirement is that both custody balances end at least where they
    /// started.
    ///
    /// # Errors
    /// - [`PoolError::FlashExceedsReserves`] when a requested amount exceeds
    ///   the current custody balance
    /// - [`PoolError::FlashNotRepaid`] when a balance ends below its start
    pub fn flash<H>(
        &mut self,
        recipient: Address,
        amount0: u128,
        amount1: u128,
        data: &[u8],
        host: &mut H,
    ) -> PoolResult<()>
    where
        H: BalanceSource + PoolCallback,
    {
        let balance0_before = balance_of(&*host, Token::Token0);
        let balance1_before = balance_of(&*host, Token::Token1);

        for (token, requested, available) in [
            (Token::Token0, amount0, balance0_before),
            (Token::Token1, amount1, balance1_before),
        ] {
            if requested > available {
                return Err(PoolError::FlashExceedsReserves {
                    token,
                    requested,
                    available,
                });
            }
        }

        host.flash_callback(recipient, amount0, amount1, data)
            .map_err(PoolError::Callback)?;

        for (token, before) in [
            (Token::Token0, balance0_before),
            (Token::Token1, balance1_before),
        ] {
            let after = balance_of(&*host, token);
            if after < before {
                warn!(
                    "Flash loan not repaid for {}: balance {} below {}",
                    token, after, before
                );
                return Err(PoolError::FlashNotRepaid {
                    token,
                    before,
                    after,
                });
            }
        }

        info!(
            "Flash: recipient={} amount0={} amount1={}",
            recipient, amount0, amount1
        );
        Ok(())
    }
}
