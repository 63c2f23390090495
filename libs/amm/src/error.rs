//! Error types for the concentrated-liquidity engine
//!
//! Math-layer failures ([`MathError`]) are kept separate from pool-level
//! rejections ([`PoolError`]) so that pure helpers can be used without
//! pulling in pool semantics. Every error is a hard failure of the whole
//! operation: the pool never commits partial state.

use ethereum_types::U256;
use thiserror::Error;

/// Which of the two pool assets an error or transfer refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Token {
    Token0,
    Token1,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Token0 => write!(f, "token0"),
            Token::Token1 => write!(f, "token1"),
        }
    }
}

/// Fixed-point and liquidity arithmetic errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MathError {
    /// Tick index outside `[MIN_TICK, MAX_TICK]` or not usable with the spacing
    #[error("Invalid tick {tick}: must lie in [-887272, 887272] and align with the tick spacing")]
    InvalidTick { tick: i32 },

    /// Sqrt price outside `[MIN_SQRT_RATIO, MAX_SQRT_RATIO]`
    #[error("Invalid sqrt price {sqrt_price_x96}: outside the representable tick range")]
    InvalidSqrtPrice { sqrt_price_x96: U256 },

    /// Liquidity addition would exceed the representable or permitted maximum
    #[error("Liquidity overflow: {current} + {delta} exceeds the allowed maximum")]
    LiquidityOverflow { current: u128, delta: i128 },

    /// Liquidity subtraction would go below zero
    #[error("Liquidity underflow: {current} + {delta} is negative")]
    LiquidityUnderflow { current: u128, delta: i128 },

    /// Division by zero in a fixed-point primitive
    #[error("Division by zero in fixed-point arithmetic")]
    DivisionByZero,

    /// Result does not fit the destination width
    #[error("Arithmetic overflow in {context}")]
    Overflow { context: &'static str },
}

/// Pool-level rejections
///
/// None of these are retried by the engine; they propagate to the immediate
/// caller and the pool state is left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Invalid tick range [{lower}, {upper}]: bounds must be ordered, in range and aligned to spacing {spacing}")]
    InvalidTickRange { lower: i32, upper: i32, spacing: i32 },

    #[error("Mint amount must be greater than zero")]
    ZeroLiquidity,

    #[error("Insufficient {token} input: expected balance >= {expected}, got {received}")]
    InsufficientInputAmount {
        token: Token,
        expected: u128,
        received: u128,
    },

    #[error("Invalid price limit {limit} for current sqrt price {current}")]
    InvalidPriceLimit { limit: U256, current: U256 },

    /// Active liquidity is zero with input left to spend. This includes gaps
    /// between ranges: the swap does not jump to a further initialized tick.
    #[error("Insufficient liquidity: active liquidity reached zero with {remaining} input remaining")]
    InsufficientLiquidity { remaining: u128 },

    #[error("Swap amount {amount} exceeds the signed amount range")]
    SwapAmountTooLarge { amount: u128 },

    #[error("Invalid tick spacing {spacing}: must be in [1, 16384]")]
    InvalidTickSpacing { spacing: i32 },

    #[error("Flash request exceeds {token} reserves: requested {requested}, available {available}")]
    FlashExceedsReserves {
        token: Token,
        requested: u128,
        available: u128,
    },

    #[error("Flash loan of {token} not repaid: balance {after} below {before}")]
    FlashNotRepaid { token: Token, before: u128, after: u128 },

    #[error("Corrupt snapshot: {reason}")]
    CorruptSnapshot { reason: String },

    #[error("Snapshot encoding error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("Callback failed: {0}")]
    Callback(#[source] anyhow::Error),

    #[error(transparent)]
    Math(#[from] MathError),
}

pub type MathResult<T> = Result<T, MathError>;
pub type PoolResult<T> = Result<T, PoolError>;
