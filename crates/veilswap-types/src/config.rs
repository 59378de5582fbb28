//! Configuration types for the VeilSwap engine.

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, VeilswapError};
use crate::phase::PhaseSchedule;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// COMMIT/REVEAL window timing.
    pub schedule: PhaseSchedule,
    /// Commitment and slashing parameters.
    pub auction: AuctionConfig,
    /// Swap fee parameters.
    pub fees: FeeConfig,
    /// Manipulation guard parameters.
    pub guards: GuardConfig,
    /// Journal file for crash recovery. `None` keeps state in memory only.
    pub journal_path: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schedule: PhaseSchedule::default(),
            auction: AuctionConfig::default(),
            fees: FeeConfig::default(),
            guards: GuardConfig::default(),
            journal_path: None,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot run safely.
    pub fn validate(&self) -> Result<()> {
        if self.schedule.commit_window.is_zero() || self.schedule.reveal_window.is_zero() {
            return Err(VeilswapError::Internal(
                "commit and reveal windows must be non-zero".into(),
            ));
        }
        if self.auction.slash_rate_bps > constants::BPS_DENOMINATOR as u32 {
            return Err(VeilswapError::InvalidBps {
                value: self.auction.slash_rate_bps,
                min: 0,
                max: constants::BPS_DENOMINATOR as u32,
            });
        }
        if self.fees.default_fee_rate_bps > constants::MAX_FEE_RATE_BPS {
            return Err(VeilswapError::InvalidFeeRate {
                fee_rate_bps: self.fees.default_fee_rate_bps,
                max_bps: constants::MAX_FEE_RATE_BPS,
            });
        }
        if self.fees.protocol_fee_share_bps > constants::BPS_DENOMINATOR as u32 {
            return Err(VeilswapError::InvalidBps {
                value: self.fees.protocol_fee_share_bps,
                min: 0,
                max: constants::BPS_DENOMINATOR as u32,
            });
        }
        if self.guards.max_trade_size_bps == 0
            || self.guards.max_trade_size_bps > constants::BPS_DENOMINATOR as u32
        {
            return Err(VeilswapError::InvalidBps {
                value: self.guards.max_trade_size_bps,
                min: 1,
                max: constants::BPS_DENOMINATOR as u32,
            });
        }
        if self.guards.twap_cardinality == 0 {
            return Err(VeilswapError::Internal(
                "TWAP cardinality must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Commitment and slashing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionConfig {
    /// Minimum deposit required with each commitment.
    pub min_deposit: u128,
    /// Share of the deposit slashed on mismatch or reveal timeout.
    pub slash_rate_bps: u32,
    /// Hard cap on commitments per batch.
    pub max_commitments_per_batch: usize,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            min_deposit: constants::MIN_DEPOSIT,
            slash_rate_bps: constants::SLASH_RATE_BPS,
            max_commitments_per_batch: constants::MAX_COMMITMENTS_PER_BATCH,
        }
    }
}

/// Swap fee parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Fee rate applied to new pools unless overridden at creation.
    pub default_fee_rate_bps: u32,
    /// Share of each swap fee routed to the protocol fee pot; the rest
    /// stays in reserves for liquidity providers.
    pub protocol_fee_share_bps: u32,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            default_fee_rate_bps: constants::DEFAULT_FEE_RATE_BPS,
            protocol_fee_share_bps: constants::DEFAULT_PROTOCOL_FEE_SHARE_BPS,
        }
    }
}

/// Manipulation guard parameters. All guards fail closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Default per-trade size cap as a share of the input reserve.
    /// Pools may be given individual overrides.
    pub max_trade_size_bps: u32,
    /// Tolerated drift between tracked and observed pool balances before
    /// the donation guard rejects.
    pub donation_tolerance_bps: u32,
    /// Reject a second pool interaction from the same account in the
    /// same block.
    pub flash_loan_protection: bool,
    /// Reject swaps that push spot price too far from the TWAP.
    pub twap_validation: bool,
    /// Maximum spot-vs-TWAP deviation.
    pub twap_deviation_bps: u32,
    /// TWAP lookback window, in blocks.
    pub twap_window_blocks: u64,
    /// Ring-buffer capacity for TWAP observations.
    pub twap_cardinality: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_trade_size_bps: constants::DEFAULT_MAX_TRADE_SIZE_BPS,
            donation_tolerance_bps: constants::DONATION_TOLERANCE_BPS,
            flash_loan_protection: true,
            twap_validation: true,
            twap_deviation_bps: constants::DEFAULT_TWAP_DEVIATION_BPS,
            twap_window_blocks: constants::DEFAULT_TWAP_WINDOW_BLOCKS,
            twap_cardinality: constants::DEFAULT_TWAP_CARDINALITY,
        }
    }
}
