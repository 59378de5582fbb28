//! Manipulation guards for pool mutations.
//!
//! Four independent checks, all fail-closed: a rejection aborts the whole
//! call before any state is touched.
//!
//! - **Trade size**: one trade may not exceed a basis-point share of the
//!   input reserve.
//! - **Donation**: observed custody above the tracked
//!   `reserve + fee pot` beyond a tolerance means an unaccounted transfer
//!   landed; every mutation is rejected until `sync_reserves` absorbs it.
//! - **Same block**: one account gets one pool interaction per block,
//!   which removes the borrow-trade-repay pattern flash loans need.
//! - **TWAP deviation**: the planned post-trade spot may not stray too
//!   far from the trailing average price. Passes while the oracle is
//!   still warming up.
//!
//! Each check is a pure function over the pool; the caller decides which
//! toggles apply and in what order to run them.

use veilswap_types::constants::BPS_DENOMINATOR;
use veilswap_types::{AccountId, Result, VeilswapError};

use crate::math;
use crate::pool::Pool;

/// Reject a trade larger than the pool's per-trade reserve share cap.
pub fn check_trade_size(pool: &Pool, token_in: &str, amount_in: u128) -> Result<()> {
    let reserve_in = pool.reserve_of(token_in)?;
    let cap = math::bps_of(reserve_in, pool.max_trade_size_bps)?;
    if amount_in > cap {
        return Err(VeilswapError::TradeTooLarge {
            amount_in,
            reserve_in,
            max_bps: pool.max_trade_size_bps,
        });
    }
    Ok(())
}

/// Reject any mutation while either pool token shows a custody surplus
/// beyond `tolerance_bps` of its tracked total.
pub fn check_donation(pool: &Pool, tolerance_bps: u32) -> Result<()> {
    for token in [&pool.pair.token0, &pool.pair.token1] {
        let tracked = pool.tracked_total(token)?;
        let allowance = math::bps_of(tracked, tolerance_bps)?;
        let surplus = pool.surplus(token)?;
        if surplus > allowance {
            return Err(VeilswapError::DonationDetected {
                pool_id: pool.id,
                token: token.clone(),
                surplus,
            });
        }
    }
    Ok(())
}

/// Reject a second interaction from `account` within the same block.
pub fn check_same_block(pool: &Pool, account: &AccountId, block: u64) -> Result<()> {
    if pool.last_interaction_block(account) == Some(block) {
        return Err(VeilswapError::SameBlockInteraction {
            account: *account,
            pool_id: pool.id,
            block,
        });
    }
    Ok(())
}

/// Reject a swap whose post-trade spot deviates from the trailing
/// average by more than `limit_bps`.
///
/// Passes when the oracle cannot yet cover the window; a young pool has
/// no manipulation-resistant reference to compare against.
pub fn check_twap_deviation(
    pool: &Pool,
    spot_after: u128,
    window_blocks: u64,
    limit_bps: u32,
    block: u64,
) -> Result<()> {
    let Some(twap) = pool.oracle.consult(window_blocks, block) else {
        return Ok(());
    };
    if twap == 0 {
        return Ok(());
    }
    let deviation = math::mul_div(spot_after.abs_diff(twap), BPS_DENOMINATOR, twap)?;
    if deviation > u128::from(limit_bps) {
        return Err(VeilswapError::TwapDeviation {
            deviation_bps: u32::try_from(deviation).unwrap_or(u32::MAX),
            limit_bps,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use veilswap_types::TokenPair;
    use veilswap_types::constants::PRECISION;

    use super::*;

    fn funded_pool() -> Pool {
        let mut pool = Pool::new(TokenPair::canonical("ETH", "USDC"), 30, 1_000, 16, Utc::now());
        pool.add_liquidity(AccountId::new(), 1_000_000, 1_000_000).unwrap();
        pool
    }

    #[test]
    fn trade_size_boundary() {
        let pool = funded_pool();
        // Cap is 10% of the 1,000,000 input reserve.
        assert!(check_trade_size(&pool, "ETH", 100_000).is_ok());
        assert!(matches!(
            check_trade_size(&pool, "ETH", 100_001),
            Err(VeilswapError::TradeTooLarge { max_bps: 1_000, .. })
        ));
    }

    #[test]
    fn donation_boundary() {
        let mut pool = funded_pool();
        // Tolerance 100 bps over a 1,000,000 tracked total.
        pool.credit("ETH", 10_000).unwrap();
        assert!(check_donation(&pool, 100).is_ok());

        pool.credit("ETH", 1).unwrap();
        assert!(matches!(
            check_donation(&pool, 100),
            Err(VeilswapError::DonationDetected { surplus: 10_001, .. })
        ));
    }

    #[test]
    fn donation_clears_after_sync() {
        let mut pool = funded_pool();
        pool.credit("USDC", 50_000).unwrap();
        assert!(check_donation(&pool, 100).is_err());

        pool.sync_reserves().unwrap();
        assert!(check_donation(&pool, 100).is_ok());
    }

    #[test]
    fn same_block_rejection() {
        let mut pool = funded_pool();
        let account = AccountId::new();
        assert!(check_same_block(&pool, &account, 7).is_ok());

        pool.record_interaction(account, 7);
        assert!(matches!(
            check_same_block(&pool, &account, 7),
            Err(VeilswapError::SameBlockInteraction { block: 7, .. })
        ));
        assert!(check_same_block(&pool, &account, 8).is_ok());
        // Other accounts are unaffected.
        assert!(check_same_block(&pool, &AccountId::new(), 7).is_ok());
    }

    #[test]
    fn twap_deviation_boundary() {
        let mut pool = funded_pool();
        pool.oracle.write(1_000 * PRECISION, 0);
        pool.oracle.write(1_000 * PRECISION, 20);

        // 4% off a 1000 average: inside the 500 bps limit.
        assert!(check_twap_deviation(&pool, 1_040 * PRECISION, 20, 500, 20).is_ok());
        // 6% off: rejected.
        assert!(matches!(
            check_twap_deviation(&pool, 1_060 * PRECISION, 20, 500, 20),
            Err(VeilswapError::TwapDeviation { deviation_bps: 600, limit_bps: 500 })
        ));
        // Deviation below the average trips too.
        assert!(check_twap_deviation(&pool, 940 * PRECISION, 20, 500, 20).is_err());
    }

    #[test]
    fn twap_guard_passes_during_warmup() {
        let pool = funded_pool();
        // No observations at all: any spot is accepted.
        assert!(check_twap_deviation(&pool, u128::MAX, 20, 500, 100).is_ok());
    }
}
