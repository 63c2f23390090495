//! # Torq CLMM - Concentrated-Liquidity Pool Engine
//!
//! ## Purpose
//!
//! Deterministic fixed-point engine for a two-asset concentrated-liquidity pool.
//! Liquidity providers deposit into arbitrary tick ranges, traders swap by walking
//! the price curve implied by every active range. All arithmetic is integer Q64.96
//! with explicit rounding so the pool never pays out more than it receives.
//!
//! ## Integration Points
//!
//! - **Custody**: Hosts implement [`BalanceSource`] and [`PoolCallback`]; the pool
//!   never holds tokens itself
//! - **Operations**: [`Pool::mint`], [`Pool::swap`], [`Pool::flash`], plus the
//!   read-only [`Pool::quote_swap`] dry run
//! - **Persistence**: [`PoolSnapshot`] (bincode) with invariant checks on restore
//! - **Configuration**: [`PoolConfig`] loaded from TOML
//! - **Display**: [`PriceMath`] converts sqrt prices to `Decimal` prices
//! - **Logging**: `tracing` events under `torq_clmm::pool` for every committed operation
//!
//! ## Architecture Role
//!
//! Leaf-first: fixed-point primitives ([`FullMath`], [`TickMath`]) feed the closed-form
//! amount relations ([`SqrtPriceMath`], [`LiquidityMath`]) and the single-step solver
//! ([`SwapMath`]). The [`Pool`] composes them with the tick ledger ([`TickRegistry`]),
//! the sparse tick index ([`TickBitmap`]) and the [`PositionLedger`].
//!
//! See [`architecture_diagram()`] for visual representation of the data flow.
//!
//! ## Invariants
//!
//! - `sqrt_ratio_at_tick(tick) <= sqrt_price_x96 <= sqrt_ratio_at_tick(tick + 1)`
//! - Liquidity net sums to zero across all ticks
//! - A tick is initialized exactly when its bitmap bit is set
//! - Swap input never exceeds the specified amount
//! - Failed operations leave the pool unchanged

pub mod config;
pub mod error;
pub mod full_math;
pub mod liquidity_math;
pub mod pool;
pub mod position;
pub mod price;
pub mod sqrt_price_math;
pub mod swap_math;
pub mod tick;
pub mod tick_bitmap;
pub mod tick_math;

pub use config::PoolConfig;
pub use error::{MathError, MathResult, PoolError, PoolResult, Token};
pub use full_math::FullMath;
pub use liquidity_math::LiquidityMath;
pub use pool::{BalanceSource, Pool, PoolCallback, PoolSnapshot, Slot0, SwapComputation};
pub use position::{Address, Position, PositionKey, PositionLedger};
pub use price::PriceMath;
pub use sqrt_price_math::SqrtPriceMath;
pub use swap_math::{SwapMath, SwapStep};
pub use tick::{TickInfo, TickRegistry};
pub use tick_bitmap::TickBitmap;
pub use tick_math::{TickMath, MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, Q96};

/// Common types for pool calculations
pub use ethereum_types::U256;
pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;

/// Architecture diagram showing how a swap and a mint flow through the engine
#[cfg_attr(doc, aquamarine::aquamarine)]
/// ```mermaid
/// graph LR
///     subgraph Host["🏦 Host"]
///         CB[PoolCallback]
///         BS[BalanceSource]
///     end
///
///     subgraph Pool["🔁 Pool"]
///         MI[mint]
///         SW[swap loop]
///         FL[flash]
///         SN[snapshot / restore]
///     end
///
///     subgraph Ledgers["📒 Ledgers"]
///         TR[TickRegistry]
///         TB[TickBitmap]
///         PL[PositionLedger]
///     end
///
///     subgraph Math["🧮 Fixed-Point Math"]
///         TM[TickMath]
///         SP[SqrtPriceMath]
///         SM[SwapMath]
///         FM[FullMath]
///     end
///
///     MI --> TR
///     MI --> PL
///     MI --> SP
///     SW --> TB
///     SW --> SM
///     SW --> TR
///     SM --> SP
///     SP --> FM
///     TM --> FM
///     SW --> TM
///
///     MI -. amounts owed .-> CB
///     SW -. signed deltas .-> CB
///     FL -. loan .-> CB
///     MI -. verify .-> BS
///     SW -. verify .-> BS
///     FL -. verify .-> BS
///
///     SN --> TR
///     SN --> TB
///     SN --> PL
///
///     style Host fill:#e1f5fe
///     style Pool fill:#fff3e0
///     style Ledgers fill:#f3e5f5
///     style Math fill:#e8f5e9
/// ```
pub fn architecture_diagram() {
    // This function exists solely for documentation purposes
    // The diagram is rendered by aquamarine in rustdoc
}
