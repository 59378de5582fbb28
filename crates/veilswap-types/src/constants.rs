//! System-wide constants for the VeilSwap auction engine.

/// Fixed-point scale for prices: 18 decimals, matching wei-style token units.
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// Denominator for basis-point fractions.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Default COMMIT window duration in milliseconds.
pub const DEFAULT_COMMIT_WINDOW_MS: u64 = 8_000;

/// Default REVEAL window duration in milliseconds.
pub const DEFAULT_REVEAL_WINDOW_MS: u64 = 2_000;

/// Minimum good-faith deposit required to commit (native units, 18 decimals).
pub const MIN_DEPOSIT: u128 = 10_000_000_000_000_000; // 0.01

/// Share of a forfeited deposit routed to the treasury, in basis points.
/// The remainder is refunded to the committer.
pub const SLASH_RATE_BPS: u32 = 5_000;

/// Maximum commitments accepted into a single batch.
pub const MAX_COMMITMENTS_PER_BATCH: usize = 10_000;

/// Default swap fee in basis points (0.3%).
pub const DEFAULT_FEE_RATE_BPS: u32 = 30;

/// Hard upper bound on a pool's swap fee (10%).
pub const MAX_FEE_RATE_BPS: u32 = 1_000;

/// Default share of the swap fee accruing to the protocol, in basis points.
/// The remainder stays in reserves for liquidity providers.
pub const DEFAULT_PROTOCOL_FEE_SHARE_BPS: u32 = 1_000;

/// Default cap on a single order's input, as basis points of the input-side
/// reserve (10%).
pub const DEFAULT_MAX_TRADE_SIZE_BPS: u32 = 1_000;

/// Surplus tolerance before the donation guard trips, as basis points of the
/// tracked reserve (~1%).
pub const DONATION_TOLERANCE_BPS: u32 = 100;

/// Default bound on post-swap spot deviation from the TWAP, in basis points (5%).
pub const DEFAULT_TWAP_DEVIATION_BPS: u32 = 500;

/// Default TWAP averaging window, in blocks.
pub const DEFAULT_TWAP_WINDOW_BLOCKS: u64 = 20;

/// Ring-buffer capacity of the per-pool price oracle.
pub const DEFAULT_TWAP_CARDINALITY: usize = 128;

/// LP shares permanently locked on pool creation.
pub const MINIMUM_LIQUIDITY: u128 = 1_000;

/// Block time assumed by [`crate::Clock::System`] when synthesising block
/// numbers from wall-clock time, in milliseconds.
pub const DEFAULT_BLOCK_TIME_MS: u64 = 12_000;

/// Symbol under which native-value proceeds (deposits, priority bids) are
/// forwarded to the fee sink.
pub const NATIVE_ASSET: &str = "ETH";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "VeilSwap";
