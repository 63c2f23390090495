//! Custody boundary consumed by mint, swap and flash
//!
//! The pool never holds tokens. It asks a host for custody balances, hands
//! control to the host with the amounts it computed, and afterwards checks
//! that the balances moved as required. Both capabilities are implemented by
//! the same host object, passed by `&mut` into each operation.
//!
//! While a callback runs the pool is still mutably borrowed by the operation
//! in progress, so a host cannot call back into the same pool. The amounts a
//! callback receives are provisional: nothing is committed until the
//! operation returns `Ok`.

use crate::position::Address;
use anyhow::Result;

/// Current custody balances of the pool's two assets
pub trait BalanceSource {
    fn balance0(&self) -> u128;
    fn balance1(&self) -> u128;
}

/// Host hooks invoked mid-operation to settle token transfers
pub trait PoolCallback {
    /// Deposit `amount0_owed` / `amount1_owed` into custody for a mint
    fn mint_callback(&mut self, amount0_owed: u128, amount1_owed: u128, data: &[u8])
        -> Result<()>;

    /// Settle a swap: positive deltas must be paid into custody, negative
    /// deltas are owed to `recipient`
    fn swap_callback(
        &mut self,
        recipient: Address,
        amount0_delta: i128,
        amount1_delta: i128,
        data: &[u8],
    ) -> Result<()>;

    /// Lend `amount0` / `amount1` to `recipient` and return them before
    /// this call ends
    fn flash_callback(
        &mut self,
        recipient: Address,
        amount0: u128,
        amount1: u128,
        data: &[u8],
    ) -> Result<()>;
}
