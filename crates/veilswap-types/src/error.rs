//! Error taxonomy for the VeilSwap engine.
//!
//! Errors are grouped by stable `VS_ERR_NNN` codes: 1xx auction entry
//! (commit/reveal/slash), 2xx batch lifecycle, 3xx AMM, 4xx manipulation
//! guards, 5xx authorization, 6xx arithmetic, 9xx internal. The codes are
//! part of the public API; operator runbooks key off them.

use thiserror::Error;

use crate::ids::{AccountId, BatchId, CommitmentId, PoolId};
use crate::phase::Phase;

/// Convenience alias used across all VeilSwap crates.
pub type Result<T> = std::result::Result<T, VeilswapError>;

/// All failure modes surfaced by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VeilswapError {
    // ------------------------------------------------------------------
    // 1xx — auction entry: commit, reveal, slash
    // ------------------------------------------------------------------
    #[error("Commitment {0} not found")]
    CommitmentNotFound(CommitmentId),

    #[error("Deposit {deposit} below minimum {minimum}")]
    InsufficientDeposit { deposit: u128, minimum: u128 },

    #[error("Account {caller} is not the committer of {commitment_id}")]
    NotCommitter {
        commitment_id: CommitmentId,
        caller: AccountId,
    },

    #[error("Commitment {commitment_id} is {status}, expected PENDING")]
    CommitmentNotPending {
        commitment_id: CommitmentId,
        status: String,
    },

    #[error("Reveal window for {batch_id} has closed")]
    RevealTooLate { batch_id: BatchId },

    #[error("Cannot slash {commitment_id} before the reveal window closes")]
    SlashTooEarly { commitment_id: CommitmentId },

    #[error("Batch {batch_id} is full ({limit} commitments)")]
    BatchFull { batch_id: BatchId, limit: usize },

    #[error("Value {paid} does not cover priority bid {bid}")]
    InsufficientPriorityBid { paid: u128, bid: u128 },

    // ------------------------------------------------------------------
    // 2xx — batch lifecycle
    // ------------------------------------------------------------------
    #[error("Wrong phase: expected {expected}, currently {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("Batch {0} not found")]
    BatchNotFound(BatchId),

    #[error("Batch {0} is already settled")]
    BatchAlreadySettled(BatchId),

    // ------------------------------------------------------------------
    // 3xx — AMM pools and liquidity
    // ------------------------------------------------------------------
    #[error("Pool {0} not found")]
    PoolNotFound(PoolId),

    #[error("Pool for pair {pair} already exists")]
    PoolAlreadyExists { pair: String },

    #[error("Cannot create a pool with identical tokens: {token}")]
    IdenticalTokens { token: String },

    #[error("Liquidity minted ({minted}) does not exceed the minimum lock ({minimum})")]
    InsufficientLiquidityMinted { minted: u128, minimum: u128 },

    #[error("Account {account} holds {held} LP shares, {requested} requested")]
    InsufficientShares {
        account: AccountId,
        held: u128,
        requested: u128,
    },

    #[error("Output {amount_out} below minimum {min_amount_out}")]
    SlippageExceeded { amount_out: u128, min_amount_out: u128 },

    #[error("Amount must be non-zero")]
    ZeroAmount,

    #[error("Fee rate {fee_rate_bps} bps exceeds maximum {max_bps} bps")]
    InvalidFeeRate { fee_rate_bps: u32, max_bps: u32 },

    #[error("Basis-point value {value} out of range [{min}, {max}]")]
    InvalidBps { value: u32, min: u32, max: u32 },

    #[error("Token {token} is not part of pool {pool_id}")]
    UnknownPoolToken { pool_id: PoolId, token: String },

    // ------------------------------------------------------------------
    // 4xx — manipulation guards (all fail closed)
    // ------------------------------------------------------------------
    #[error("Trade of {amount_in} exceeds {max_bps} bps of reserve {reserve_in}")]
    TradeTooLarge {
        amount_in: u128,
        reserve_in: u128,
        max_bps: u32,
    },

    #[error("Untracked balance change detected on pool {pool_id}: token {token}, surplus {surplus}")]
    DonationDetected {
        pool_id: PoolId,
        token: String,
        surplus: u128,
    },

    #[error("Account {account} already interacted with pool {pool_id} in block {block}")]
    SameBlockInteraction {
        account: AccountId,
        pool_id: PoolId,
        block: u64,
    },

    #[error("Spot price deviates {deviation_bps} bps from TWAP (limit {limit_bps} bps)")]
    TwapDeviation { deviation_bps: u32, limit_bps: u32 },

    #[error("Constant-product invariant would decrease on pool {pool_id}")]
    KInvariantViolated { pool_id: PoolId },

    // ------------------------------------------------------------------
    // 5xx — authorization
    // ------------------------------------------------------------------
    #[error("Account {account} is not authorized to {action}")]
    NotAuthorized { account: AccountId, action: String },

    // ------------------------------------------------------------------
    // 6xx — arithmetic
    // ------------------------------------------------------------------
    #[error("Arithmetic overflow in {context}")]
    MathOverflow { context: &'static str },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: &'static str },

    // ------------------------------------------------------------------
    // 9xx — internal
    // ------------------------------------------------------------------
    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("I/O failure: {0}")]
    Io(String),

    #[error("Internal invariant violated: {0}")]
    Internal(String),
}

impl VeilswapError {
    /// Stable error code for logs, metrics, and operator runbooks.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::CommitmentNotFound(_) => "VS_ERR_101",
            Self::InsufficientDeposit { .. } => "VS_ERR_102",
            Self::NotCommitter { .. } => "VS_ERR_103",
            Self::CommitmentNotPending { .. } => "VS_ERR_104",
            Self::RevealTooLate { .. } => "VS_ERR_105",
            Self::SlashTooEarly { .. } => "VS_ERR_106",
            Self::BatchFull { .. } => "VS_ERR_107",
            Self::InsufficientPriorityBid { .. } => "VS_ERR_108",
            Self::WrongPhase { .. } => "VS_ERR_201",
            Self::BatchNotFound(_) => "VS_ERR_202",
            Self::BatchAlreadySettled(_) => "VS_ERR_203",
            Self::PoolNotFound(_) => "VS_ERR_301",
            Self::PoolAlreadyExists { .. } => "VS_ERR_302",
            Self::IdenticalTokens { .. } => "VS_ERR_303",
            Self::InsufficientLiquidityMinted { .. } => "VS_ERR_304",
            Self::InsufficientShares { .. } => "VS_ERR_305",
            Self::SlippageExceeded { .. } => "VS_ERR_306",
            Self::ZeroAmount => "VS_ERR_307",
            Self::InvalidFeeRate { .. } => "VS_ERR_308",
            Self::InvalidBps { .. } => "VS_ERR_309",
            Self::UnknownPoolToken { .. } => "VS_ERR_310",
            Self::TradeTooLarge { .. } => "VS_ERR_401",
            Self::DonationDetected { .. } => "VS_ERR_402",
            Self::SameBlockInteraction { .. } => "VS_ERR_403",
            Self::TwapDeviation { .. } => "VS_ERR_404",
            Self::KInvariantViolated { .. } => "VS_ERR_405",
            Self::NotAuthorized { .. } => "VS_ERR_501",
            Self::MathOverflow { .. } => "VS_ERR_601",
            Self::DivisionByZero { .. } => "VS_ERR_602",
            Self::Serialization(_) => "VS_ERR_901",
            Self::Io(_) => "VS_ERR_902",
            Self::Internal(_) => "VS_ERR_903",
        }
    }

    /// Whether the error comes from a manipulation guard.
    ///
    /// Guard failures abort the mutation but are expected during normal
    /// operation under adversarial flow; callers typically log and retry
    /// in a later block rather than escalate.
    #[must_use]
    pub fn is_guard_rejection(&self) -> bool {
        matches!(
            self,
            Self::TradeTooLarge { .. }
                | Self::DonationDetected { .. }
                | Self::SameBlockInteraction { .. }
                | Self::TwapDeviation { .. }
                | Self::KInvariantViolated { .. }
        )
    }
}

impl From<serde_json::Error> for VeilswapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for VeilswapError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
