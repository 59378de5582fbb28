//! Pool registry and the guarded mutation surface.
//!
//! `PoolManager` owns every pool, routes token pairs to them (pool ids
//! derive deterministically from canonical pairs), and wraps each
//! mutation in the guard battery from [`crate::guards`]. Checks run
//! before any state changes, so a rejected call leaves no partial
//! effect.
//!
//! Authorization is not handled here: callers are identified only so the
//! same-block guard can track them. The engine layer gates which
//! accounts may reach the admin surface.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use veilswap_types::constants::MAX_FEE_RATE_BPS;
use veilswap_types::{
    AccountId, FeeConfig, GuardConfig, PoolId, Result, Token, TokenPair, VeilswapError,
};

use crate::guards;
use crate::pool::Pool;

/// Outcome of one direct swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub pool_id: PoolId,
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: u128,
    pub amount_out: u128,
    /// Total fee charged, in `token_in` units.
    pub fee_paid: u128,
    /// Protocol fee slice parked in the pool's pot, in `token_out` units.
    pub protocol_fee: u128,
    /// Post-trade spot price, token1 per token0, `PRECISION`-scaled.
    pub spot_after: u128,
}

/// Registry of all pools plus the fee and guard parameters they share.
#[derive(Debug)]
pub struct PoolManager {
    pools: BTreeMap<PoolId, Pool>,
    fees: FeeConfig,
    guards: GuardConfig,
}

impl PoolManager {
    #[must_use]
    pub fn new(fees: FeeConfig, guards: GuardConfig) -> Self {
        Self {
            pools: BTreeMap::new(),
            fees,
            guards,
        }
    }

    // =================================================================
    // Lookup
    // =================================================================

    /// Pool id for a token pair, independent of argument order.
    #[must_use]
    pub fn pool_id_for(token_a: &str, token_b: &str) -> PoolId {
        PoolId::for_pair(&TokenPair::canonical(token_a, token_b))
    }

    pub fn pool(&self, pool_id: PoolId) -> Result<&Pool> {
        self.pools
            .get(&pool_id)
            .ok_or(VeilswapError::PoolNotFound(pool_id))
    }

    pub fn pool_mut(&mut self, pool_id: PoolId) -> Result<&mut Pool> {
        self.pools
            .get_mut(&pool_id)
            .ok_or(VeilswapError::PoolNotFound(pool_id))
    }

    /// Pool serving a token pair, in either order.
    pub fn pool_for(&self, token_a: &str, token_b: &str) -> Result<&Pool> {
        self.pool(Self::pool_id_for(token_a, token_b))
    }

    /// All pools, in id order.
    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    #[must_use]
    pub fn guard_config(&self) -> &GuardConfig {
        &self.guards
    }

    #[must_use]
    pub fn fee_config(&self) -> &FeeConfig {
        &self.fees
    }

    /// Replace a pool wholesale with a staged copy. Used by batch
    /// settlement to commit an all-or-nothing execution pass.
    pub fn replace(&mut self, pool: Pool) {
        self.pools.insert(pool.id, pool);
    }

    // =================================================================
    // Pool lifecycle
    // =================================================================

    /// Create a pool for a new pair and seed it with initial liquidity.
    ///
    /// Amounts are given in the caller's token order and mapped onto the
    /// canonical pair internally. The creator receives the first-mint
    /// shares minus the permanent minimum-liquidity lock.
    #[allow(clippy::too_many_arguments)]
    pub fn create_pool(
        &mut self,
        creator: AccountId,
        token_a: &str,
        token_b: &str,
        amount_a: u128,
        amount_b: u128,
        fee_rate_bps: Option<u32>,
        block: u64,
        now: DateTime<Utc>,
    ) -> Result<(PoolId, u128)> {
        if token_a == token_b {
            return Err(VeilswapError::IdenticalTokens {
                token: token_a.to_string(),
            });
        }
        let fee_rate_bps = fee_rate_bps.unwrap_or(self.fees.default_fee_rate_bps);
        if fee_rate_bps > MAX_FEE_RATE_BPS {
            return Err(VeilswapError::InvalidFeeRate {
                fee_rate_bps,
                max_bps: MAX_FEE_RATE_BPS,
            });
        }

        let pair = TokenPair::canonical(token_a, token_b);
        let pool_id = PoolId::for_pair(&pair);
        if self.pools.contains_key(&pool_id) {
            return Err(VeilswapError::PoolAlreadyExists { pair: pair.symbol() });
        }

        let (amount0, amount1) = if token_a == pair.token0 {
            (amount_a, amount_b)
        } else {
            (amount_b, amount_a)
        };

        let mut pool = Pool::new(
            pair.clone(),
            fee_rate_bps,
            self.guards.max_trade_size_bps,
            self.guards.twap_cardinality,
            now,
        );
        let minted = pool.add_liquidity(creator, amount0, amount1)?;
        let spot = pool.spot_price()?;
        pool.oracle.write(spot, block);
        pool.record_interaction(creator, block);
        self.pools.insert(pool_id, pool);

        info!(
            pool_id = %pool_id,
            pair = %pair.symbol(),
            fee_rate_bps,
            minted,
            "Pool created"
        );
        Ok((pool_id, minted))
    }

    // =================================================================
    // Trading
    // =================================================================

    /// Swap `amount_in` of `token_in` for `token_out` at the current
    /// reserves.
    ///
    /// ## Order of operations
    ///
    /// 1. Donation, same-block, and trade-size guards against current
    ///    state.
    /// 2. Price the swap; reject if the output misses `min_amount_out`.
    /// 3. TWAP guard against the planned post-trade spot.
    /// 4. Record the pre-trade price in the oracle, apply the plan, and
    ///    mark the caller's interaction.
    pub fn swap(
        &mut self,
        caller: AccountId,
        token_in: &str,
        token_out: &str,
        amount_in: u128,
        min_amount_out: u128,
        block: u64,
    ) -> Result<SwapReceipt> {
        if token_in == token_out {
            return Err(VeilswapError::IdenticalTokens {
                token: token_in.to_string(),
            });
        }
        let pool_id = Self::pool_id_for(token_in, token_out);
        let tolerance_bps = self.guards.donation_tolerance_bps;
        let flash_protected = self.guards.flash_loan_protection;
        let twap_validated = self.guards.twap_validation;
        let twap_window = self.guards.twap_window_blocks;
        let twap_limit = self.guards.twap_deviation_bps;
        let protocol_share = self.fees.protocol_fee_share_bps;

        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(VeilswapError::PoolNotFound(pool_id))?;

        guards::check_donation(pool, tolerance_bps)?;
        if flash_protected {
            guards::check_same_block(pool, &caller, block)?;
        }
        guards::check_trade_size(pool, token_in, amount_in)?;

        let pre_spot = pool.spot_price()?;
        let plan = pool.plan_swap(token_in, amount_in, protocol_share)?;
        if plan.amount_out < min_amount_out {
            return Err(VeilswapError::SlippageExceeded {
                amount_out: plan.amount_out,
                min_amount_out,
            });
        }
        if twap_validated {
            guards::check_twap_deviation(pool, plan.spot_after, twap_window, twap_limit, block)?;
        }

        pool.oracle.write(pre_spot, block);
        pool.apply_swap(&plan);
        pool.record_interaction(caller, block);

        debug!(
            pool_id = %pool_id,
            caller = %caller,
            amount_in,
            amount_out = plan.amount_out,
            fee = plan.fee_total,
            "Swap executed"
        );
        Ok(SwapReceipt {
            pool_id,
            token_in: plan.token_in,
            token_out: plan.token_out,
            amount_in,
            amount_out: plan.amount_out,
            fee_paid: plan.fee_total,
            protocol_fee: plan.protocol_cut_out,
            spot_after: plan.spot_after,
        })
    }

    /// Quote a swap against current reserves without touching state.
    pub fn quote(&self, token_in: &str, token_out: &str, amount_in: u128) -> Result<u128> {
        let pool = self.pool_for(token_in, token_out)?;
        let plan = pool.plan_swap(token_in, amount_in, self.fees.protocol_fee_share_bps)?;
        Ok(plan.amount_out)
    }

    // =================================================================
    // Liquidity
    // =================================================================

    /// Deposit into an existing pool. Amounts are in canonical token
    /// order.
    pub fn add_liquidity(
        &mut self,
        caller: AccountId,
        pool_id: PoolId,
        amount0: u128,
        amount1: u128,
        block: u64,
    ) -> Result<u128> {
        let tolerance_bps = self.guards.donation_tolerance_bps;
        let flash_protected = self.guards.flash_loan_protection;
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(VeilswapError::PoolNotFound(pool_id))?;

        guards::check_donation(pool, tolerance_bps)?;
        if flash_protected {
            guards::check_same_block(pool, &caller, block)?;
        }

        let pre_spot = pool.spot_price()?;
        let minted = pool.add_liquidity(caller, amount0, amount1)?;
        pool.oracle.write(pre_spot, block);
        pool.record_interaction(caller, block);

        info!(pool_id = %pool_id, provider = %caller, minted, "Liquidity added");
        Ok(minted)
    }

    /// Burn shares for a pro-rata slice of both reserves.
    pub fn remove_liquidity(
        &mut self,
        caller: AccountId,
        pool_id: PoolId,
        shares: u128,
        block: u64,
    ) -> Result<(u128, u128)> {
        let tolerance_bps = self.guards.donation_tolerance_bps;
        let flash_protected = self.guards.flash_loan_protection;
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(VeilswapError::PoolNotFound(pool_id))?;

        guards::check_donation(pool, tolerance_bps)?;
        if flash_protected {
            guards::check_same_block(pool, &caller, block)?;
        }

        let pre_spot = pool.spot_price()?;
        let (amount0, amount1) = pool.remove_liquidity(&caller, shares)?;
        pool.oracle.write(pre_spot, block);
        pool.record_interaction(caller, block);

        info!(
            pool_id = %pool_id,
            provider = %caller,
            shares,
            amount0,
            amount1,
            "Liquidity removed"
        );
        Ok((amount0, amount1))
    }

    // =================================================================
    // Custody maintenance
    // =================================================================

    /// Register a direct token transfer into a pool's custody, outside
    /// swap and liquidity flows. The donation guard reacts on the next
    /// mutation.
    pub fn record_external_deposit(
        &mut self,
        pool_id: PoolId,
        token: &str,
        amount: u128,
    ) -> Result<()> {
        let pool = self.pool_mut(pool_id)?;
        pool.credit(token, amount)?;
        info!(pool_id = %pool_id, token, amount, "External deposit observed");
        Ok(())
    }

    /// Fold custody surpluses into reserves, clearing the donation
    /// guard. Permissionless.
    pub fn sync_reserves(&mut self, pool_id: PoolId, block: u64) -> Result<(u128, u128)> {
        let pool = self.pool_mut(pool_id)?;
        let pre_spot = pool.spot_price()?;
        let (surplus0, surplus1) = pool.sync_reserves()?;
        if surplus0 > 0 || surplus1 > 0 {
            pool.oracle.write(pre_spot, block);
            info!(pool_id = %pool_id, surplus0, surplus1, "Reserves resynchronized");
        }
        Ok((surplus0, surplus1))
    }

    /// Sweep one token's protocol fee pot across every pool holding it.
    pub fn collect_fees(&mut self, token: &str) -> Result<u128> {
        let mut total = 0u128;
        for pool in self.pools.values_mut() {
            if pool.pair.contains(token) {
                total += pool.collect_fees(token)?;
            }
        }
        if total > 0 {
            info!(token, amount = total, "Protocol fees collected");
        }
        Ok(total)
    }

    // =================================================================
    // Admin knobs
    // =================================================================

    pub fn set_flash_loan_protection(&mut self, enabled: bool) {
        self.guards.flash_loan_protection = enabled;
        info!(enabled, "Flash-loan protection toggled");
    }

    pub fn set_twap_validation(&mut self, enabled: bool) {
        self.guards.twap_validation = enabled;
        info!(enabled, "TWAP validation toggled");
    }

    /// Override one pool's per-trade size cap.
    pub fn set_pool_max_trade_size(&mut self, pool_id: PoolId, max_bps: u32) -> Result<()> {
        if max_bps == 0 || max_bps > 10_000 {
            return Err(VeilswapError::InvalidBps {
                value: max_bps,
                min: 1,
                max: 10_000,
            });
        }
        let pool = self.pool_mut(pool_id)?;
        pool.max_trade_size_bps = max_bps;
        info!(pool_id = %pool_id, max_bps, "Pool trade-size cap updated");
        Ok(())
    }

    /// Adjust the protocol's share of future swap fees.
    pub fn set_protocol_fee_share(&mut self, share_bps: u32) -> Result<()> {
        if share_bps > 10_000 {
            return Err(VeilswapError::InvalidBps {
                value: share_bps,
                min: 0,
                max: 10_000,
            });
        }
        self.fees.protocol_fee_share_bps = share_bps;
        info!(share_bps, "Protocol fee share updated");
        Ok(())
    }
}
