//! Shared fixtures for pool integration tests
//!
//! `Custody` is an in-memory token ledger standing in for the host: it
//! tracks the pool's two custody balances, pays swap output to recipients,
//! and can be told to under-pay or fail to exercise the pool's checks.

#![allow(dead_code)]

use anyhow::{bail, ensure, Result};
use std::collections::HashMap;
use torq_clmm::{Address, BalanceSource, PoolCallback};

pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

/// How the host settles what the pool asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payment {
    /// Pay exactly what is owed
    Full,
    /// Pay this much less than owed on each token
    Short(u128),
    /// Return from the callback without paying
    Nothing,
    /// Return an error from the callback
    Fail,
}

#[derive(Debug, Clone)]
pub struct Custody {
    pub balance0: u128,
    pub balance1: u128,
    pub payment: Payment,
    pub repay_flash: bool,
    pub callbacks: usize,
    /// Tokens paid out to each recipient as `(token0, token1)`
    pub paid_out: HashMap<Address, (u128, u128)>,
}

impl Default for Custody {
    fn default() -> Self {
        Self {
            balance0: 0,
            balance1: 0,
            payment: Payment::Full,
            repay_flash: true,
            callbacks: 0,
            paid_out: HashMap::new(),
        }
    }
}

impl Custody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payment(payment: Payment) -> Self {
        Self {
            payment,
            ..Self::default()
        }
    }

    fn pay_in(&mut self, amount0: u128, amount1: u128) -> Result<()> {
        match self.payment {
            Payment::Full => {
                self.balance0 += amount0;
                self.balance1 += amount1;
            }
            Payment::Short(shortfall) => {
                self.balance0 += amount0.saturating_sub(shortfall);
                self.balance1 += amount1.saturating_sub(shortfall);
            }
            Payment::Nothing => {}
            Payment::Fail => bail!("host refused to pay"),
        }
        Ok(())
    }

    fn pay_out(&mut self, recipient: Address, amount0: u128, amount1: u128) -> Result<()> {
        ensure!(
            self.balance0 >= amount0 && self.balance1 >= amount1,
            "custody cannot cover payout"
        );
        self.balance0 -= amount0;
        self.balance1 -= amount1;
        let entry = self.paid_out.entry(recipient).or_default();
        entry.0 += amount0;
        entry.1 += amount1;
        Ok(())
    }
}

impl BalanceSource for Custody {
    fn balance0(&self) -> u128 {
        self.balance0
    }

    fn balance1(&self) -> u128 {
        self.balance1
    }
}

impl PoolCallback for Custody {
    fn mint_callback(&mut self, amount0_owed: u128, amount1_owed: u128, _data: &[u8]) -> Result<()> {
        self.callbacks += 1;
        self.pay_in(amount0_owed, amount1_owed)
    }

    fn swap_callback(
        &mut self,
        recipient: Address,
        amount0_delta: i128,
        amount1_delta: i128,
        _data: &[u8],
    ) -> Result<()> {
        self.callbacks += 1;
        let owed_in = (
            amount0_delta.max(0) as u128,
            amount1_delta.max(0) as u128,
        );
        let owed_out = (
            amount0_delta.min(0).unsigned_abs(),
            amount1_delta.min(0).unsigned_abs(),
        );
        self.pay_in(owed_in.0, owed_in.1)?;
        self.pay_out(recipient, owed_out.0, owed_out.1)
    }

    fn flash_callback(
        &mut self,
        recipient: Address,
        amount0: u128,
        amount1: u128,
        _data: &[u8],
    ) -> Result<()> {
        self.callbacks += 1;
        self.pay_out(recipient, amount0, amount1)?;
        if self.repay_flash {
            self.balance0 += amount0;
            self.balance1 += amount1;
        }
        Ok(())
    }
}

pub fn owner() -> Address {
    Address([0x11; 20])
}

pub fn trader() -> Address {
    Address([0x22; 20])
}

/// Route engine logs to the test writer; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
