//! A single constant-product liquidity pool.
//!
//! Reserves follow `x * y = k`; every swap pays a basis-point fee on its
//! input. The liquidity-provider share of the fee stays in the input
//! reserve (growing `k`), while the protocol share is converted to output
//! units at the post-trade price and parked in `accumulated_fees`.
//!
//! Alongside the reserves the pool tracks `balances`, the externally
//! observable custody per token. The two are reconciled by the donation
//! guard: `balances[t] == reserve(t) + accumulated_fees[t]` after every
//! accounted operation, so any direct transfer into the pool shows up as
//! a surplus.
//!
//! Swaps are split into a pure planning step ([`Pool::plan_swap`]) and an
//! infallible apply step ([`Pool::apply_swap`]), so callers can run guard
//! checks against the planned post-state and abort without partial effect.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use veilswap_types::constants::MINIMUM_LIQUIDITY;
use veilswap_types::{AccountId, PoolId, Result, Token, TokenPair, VeilswapError};

use crate::math::{self, wide_cmp, wide_mul};
use crate::twap::TwapOracle;

/// A fully computed swap, ready to apply or discard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    pub token_in: Token,
    pub token_out: Token,
    /// `true` when token0 is sold for token1.
    pub zero_for_one: bool,
    pub amount_in: u128,
    pub amount_out: u128,
    /// Total fee charged, in `token_in` units.
    pub fee_total: u128,
    /// Fee slice left in the input reserve for liquidity providers.
    pub lp_fee: u128,
    /// Protocol fee slice, in `token_in` units before conversion.
    pub protocol_cut_in: u128,
    /// Protocol fee converted to `token_out` at the post-trade price.
    pub protocol_cut_out: u128,
    pub new_reserve0: u128,
    pub new_reserve1: u128,
    /// Post-trade spot price, token1 per token0, `PRECISION`-scaled.
    pub spot_after: u128,
}

/// Serializable public view of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub id: PoolId,
    pub pair: TokenPair,
    pub reserve0: u128,
    pub reserve1: u128,
    pub total_liquidity: u128,
    pub fee_rate_bps: u32,
    pub max_trade_size_bps: u32,
    pub accumulated_fees: BTreeMap<Token, u128>,
    pub created_at: DateTime<Utc>,
}

/// One constant-product pool and its custody ledger.
#[derive(Debug, Clone)]
pub struct Pool {
    pub id: PoolId,
    pub pair: TokenPair,
    pub reserve0: u128,
    pub reserve1: u128,
    /// Liquidity shares outstanding, including the permanently locked
    /// [`MINIMUM_LIQUIDITY`] from the first mint.
    pub total_liquidity: u128,
    pub fee_rate_bps: u32,
    /// Per-pool trade-size cap, adjustable by the admin surface.
    pub max_trade_size_bps: u32,
    /// Protocol fee pot per token. Swept by `collect_fees`.
    pub accumulated_fees: BTreeMap<Token, u128>,
    /// Externally observable custody per token.
    pub balances: BTreeMap<Token, u128>,
    pub oracle: TwapOracle,
    pub created_at: DateTime<Utc>,
    /// Liquidity shares per provider.
    lp_shares: HashMap<AccountId, u128>,
    /// Last block each account touched this pool (same-block guard).
    last_interaction: HashMap<AccountId, u64>,
}

impl Pool {
    /// Create an empty pool for a canonical pair. Reserves arrive with the
    /// first liquidity mint.
    #[must_use]
    pub fn new(
        pair: TokenPair,
        fee_rate_bps: u32,
        max_trade_size_bps: u32,
        twap_capacity: usize,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut accumulated_fees = BTreeMap::new();
        accumulated_fees.insert(pair.token0.clone(), 0);
        accumulated_fees.insert(pair.token1.clone(), 0);
        let balances = accumulated_fees.clone();
        Self {
            id: PoolId::for_pair(&pair),
            pair,
            reserve0: 0,
            reserve1: 0,
            total_liquidity: 0,
            fee_rate_bps,
            max_trade_size_bps,
            accumulated_fees,
            balances,
            oracle: TwapOracle::new(twap_capacity),
            created_at,
            lp_shares: HashMap::new(),
            last_interaction: HashMap::new(),
        }
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Reserve of one pool token.
    pub fn reserve_of(&self, token: &str) -> Result<u128> {
        if token == self.pair.token0 {
            Ok(self.reserve0)
        } else if token == self.pair.token1 {
            Ok(self.reserve1)
        } else {
            Err(VeilswapError::UnknownPoolToken {
                pool_id: self.id,
                token: token.to_string(),
            })
        }
    }

    /// Reserve plus protocol fee pot: the custody the pool can account for.
    pub fn tracked_total(&self, token: &str) -> Result<u128> {
        let reserve = self.reserve_of(token)?;
        Ok(reserve + self.accumulated_fee(token))
    }

    /// Externally observed custody of one token.
    #[must_use]
    pub fn balance_of(&self, token: &str) -> u128 {
        self.balances.get(token).copied().unwrap_or(0)
    }

    /// Current protocol fee pot for one token.
    #[must_use]
    pub fn accumulated_fee(&self, token: &str) -> u128 {
        self.accumulated_fees.get(token).copied().unwrap_or(0)
    }

    /// Liquidity shares held by one provider.
    #[must_use]
    pub fn shares_of(&self, account: &AccountId) -> u128 {
        self.lp_shares.get(account).copied().unwrap_or(0)
    }

    /// Spot price of token0 in token1 units, `PRECISION`-scaled.
    pub fn spot_price(&self) -> Result<u128> {
        math::spot_price(self.reserve0, self.reserve1)
    }

    /// Last block this account touched the pool.
    #[must_use]
    pub fn last_interaction_block(&self, account: &AccountId) -> Option<u64> {
        self.last_interaction.get(account).copied()
    }

    /// Serializable snapshot for the query surface.
    #[must_use]
    pub fn info(&self) -> PoolInfo {
        PoolInfo {
            id: self.id,
            pair: self.pair.clone(),
            reserve0: self.reserve0,
            reserve1: self.reserve1,
            total_liquidity: self.total_liquidity,
            fee_rate_bps: self.fee_rate_bps,
            max_trade_size_bps: self.max_trade_size_bps,
            accumulated_fees: self.accumulated_fees.clone(),
            created_at: self.created_at,
        }
    }

    // =================================================================
    // Swaps
    // =================================================================

    /// Price a swap against current reserves without mutating anything.
    ///
    /// ## Algorithm
    ///
    /// 1. Split the fee off the input: `fee = amount_in * fee_rate_bps`,
    ///    of which `protocol_share_bps` is the protocol's slice.
    /// 2. Quote the output on the fee-reduced input:
    ///    `out = reserve_out * effective_in / (reserve_in + effective_in)`.
    /// 3. Convert the protocol slice to output units at the post-trade
    ///    price, rounding down, so it can be parked outside the reserves.
    /// 4. Form post-trade reserves: the full input (fees included) enters
    ///    the input reserve; the output plus the converted protocol slice
    ///    leaves the output reserve.
    /// 5. Verify `k` did not shrink.
    ///
    /// # Errors
    ///
    /// `UnknownPoolToken`, `ZeroAmount`, arithmetic errors, or
    /// `KInvariantViolated` if the planned reserves would lower `k`.
    pub fn plan_swap(
        &self,
        token_in: &str,
        amount_in: u128,
        protocol_share_bps: u32,
    ) -> Result<SwapPlan> {
        let zero_for_one = if token_in == self.pair.token0 {
            true
        } else if token_in == self.pair.token1 {
            false
        } else {
            return Err(VeilswapError::UnknownPoolToken {
                pool_id: self.id,
                token: token_in.to_string(),
            });
        };
        if amount_in == 0 {
            return Err(VeilswapError::ZeroAmount);
        }

        let (reserve_in, reserve_out) = if zero_for_one {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        };

        let fee_total = math::bps_of(amount_in, self.fee_rate_bps)?;
        let protocol_cut_in = math::bps_of(fee_total, protocol_share_bps)?;
        let lp_fee = fee_total - protocol_cut_in;
        let effective_in = amount_in - fee_total;

        let grown_in = reserve_in
            .checked_add(effective_in)
            .ok_or(VeilswapError::MathOverflow { context: "swap input" })?;
        let amount_out = math::mul_div(reserve_out, effective_in, grown_in)?;

        // amount_out < reserve_out whenever effective_in > 0, so both
        // subtractions below stay in range.
        let post_in = reserve_in
            .checked_add(amount_in)
            .ok_or(VeilswapError::MathOverflow { context: "swap input" })?;
        let protocol_cut_out =
            math::mul_div(protocol_cut_in, reserve_out - amount_out, post_in)?;
        let post_out = reserve_out - amount_out - protocol_cut_out;

        let (new_reserve0, new_reserve1) = if zero_for_one {
            (post_in, post_out)
        } else {
            (post_out, post_in)
        };

        if wide_cmp(
            wide_mul(new_reserve0, new_reserve1),
            wide_mul(self.reserve0, self.reserve1),
        ) == Ordering::Less
        {
            return Err(VeilswapError::KInvariantViolated { pool_id: self.id });
        }

        let (token_in, token_out) = if zero_for_one {
            (self.pair.token0.clone(), self.pair.token1.clone())
        } else {
            (self.pair.token1.clone(), self.pair.token0.clone())
        };
        Ok(SwapPlan {
            token_in,
            token_out,
            zero_for_one,
            amount_in,
            amount_out,
            fee_total,
            lp_fee,
            protocol_cut_in,
            protocol_cut_out,
            new_reserve0,
            new_reserve1,
            spot_after: math::spot_price(new_reserve0, new_reserve1)?,
        })
    }

    /// Apply a plan produced by [`Pool::plan_swap`] against the same
    /// reserve state.
    pub fn apply_swap(&mut self, plan: &SwapPlan) {
        self.reserve0 = plan.new_reserve0;
        self.reserve1 = plan.new_reserve1;
        *self
            .accumulated_fees
            .entry(plan.token_out.clone())
            .or_insert(0) += plan.protocol_cut_out;
        *self.balances.entry(plan.token_in.clone()).or_insert(0) += plan.amount_in;
        // Custody only releases what the trader receives; the protocol cut
        // stays in the pool, reclassified from reserve to fee pot.
        *self.balances.entry(plan.token_out.clone()).or_insert(0) -= plan.amount_out;
    }

    // =================================================================
    // Liquidity
    // =================================================================

    /// Deposit both tokens and mint liquidity shares.
    ///
    /// The first mint prices shares at the geometric mean of the deposits
    /// and permanently locks [`MINIMUM_LIQUIDITY`] of them. Later mints
    /// are pro-rata on the lesser side of the deposit, valued against
    /// current reserves; both deposits are absorbed in full.
    ///
    /// # Errors
    ///
    /// `ZeroAmount` if either deposit is zero, or
    /// `InsufficientLiquidityMinted` when the mint would round to nothing
    /// (or, on the first mint, not cover the locked minimum).
    pub fn add_liquidity(
        &mut self,
        provider: AccountId,
        amount0: u128,
        amount1: u128,
    ) -> Result<u128> {
        if amount0 == 0 || amount1 == 0 {
            return Err(VeilswapError::ZeroAmount);
        }

        let minted = if self.total_liquidity == 0 {
            let shares = math::sqrt_product(amount0, amount1);
            if shares <= MINIMUM_LIQUIDITY {
                return Err(VeilswapError::InsufficientLiquidityMinted {
                    minted: shares,
                    minimum: MINIMUM_LIQUIDITY,
                });
            }
            self.total_liquidity = shares;
            shares - MINIMUM_LIQUIDITY
        } else {
            let by0 = math::mul_div(amount0, self.total_liquidity, self.reserve0)?;
            let by1 = math::mul_div(amount1, self.total_liquidity, self.reserve1)?;
            let minted = by0.min(by1);
            if minted == 0 {
                return Err(VeilswapError::InsufficientLiquidityMinted {
                    minted: 0,
                    minimum: 1,
                });
            }
            self.total_liquidity = self
                .total_liquidity
                .checked_add(minted)
                .ok_or(VeilswapError::MathOverflow { context: "liquidity mint" })?;
            minted
        };

        self.reserve0 = self
            .reserve0
            .checked_add(amount0)
            .ok_or(VeilswapError::MathOverflow { context: "liquidity deposit" })?;
        self.reserve1 = self
            .reserve1
            .checked_add(amount1)
            .ok_or(VeilswapError::MathOverflow { context: "liquidity deposit" })?;
        *self.balances.entry(self.pair.token0.clone()).or_insert(0) += amount0;
        *self.balances.entry(self.pair.token1.clone()).or_insert(0) += amount1;
        *self.lp_shares.entry(provider).or_insert(0) += minted;
        Ok(minted)
    }

    /// Burn liquidity shares for a pro-rata slice of both reserves.
    ///
    /// The locked first-mint shares are held by no account, so the pool
    /// can never be fully drained through this path.
    pub fn remove_liquidity(
        &mut self,
        provider: &AccountId,
        shares: u128,
    ) -> Result<(u128, u128)> {
        if shares == 0 {
            return Err(VeilswapError::ZeroAmount);
        }
        let held = self.shares_of(provider);
        if shares > held {
            return Err(VeilswapError::InsufficientShares {
                account: *provider,
                held,
                requested: shares,
            });
        }

        let amount0 = math::mul_div(shares, self.reserve0, self.total_liquidity)?;
        let amount1 = math::mul_div(shares, self.reserve1, self.total_liquidity)?;

        self.total_liquidity -= shares;
        let remaining = held - shares;
        if remaining == 0 {
            self.lp_shares.remove(provider);
        } else {
            self.lp_shares.insert(*provider, remaining);
        }
        self.reserve0 -= amount0;
        self.reserve1 -= amount1;
        *self.balances.entry(self.pair.token0.clone()).or_insert(0) -= amount0;
        *self.balances.entry(self.pair.token1.clone()).or_insert(0) -= amount1;
        Ok((amount0, amount1))
    }

    // =================================================================
    // Custody maintenance
    // =================================================================

    /// Record a token transfer that arrived outside swap and liquidity
    /// flows. Raises the observed balance only; the donation guard will
    /// flag the resulting surplus.
    pub fn credit(&mut self, token: &str, amount: u128) -> Result<()> {
        if !self.pair.contains(token) {
            return Err(VeilswapError::UnknownPoolToken {
                pool_id: self.id,
                token: token.to_string(),
            });
        }
        *self.balances.entry(token.to_string()).or_insert(0) += amount;
        Ok(())
    }

    /// Fold any custody surplus into the reserves, clearing the donation
    /// guard. Returns the absorbed surplus per side.
    pub fn sync_reserves(&mut self) -> Result<(u128, u128)> {
        let surplus0 = self.surplus(&self.pair.token0)?;
        let surplus1 = self.surplus(&self.pair.token1)?;
        self.reserve0 += surplus0;
        self.reserve1 += surplus1;
        Ok((surplus0, surplus1))
    }

    /// Sweep the protocol fee pot for one token out of the pool.
    pub fn collect_fees(&mut self, token: &str) -> Result<u128> {
        if !self.pair.contains(token) {
            return Err(VeilswapError::UnknownPoolToken {
                pool_id: self.id,
                token: token.to_string(),
            });
        }
        let pot = self.accumulated_fees.insert(token.to_string(), 0).unwrap_or(0);
        *self.balances.entry(token.to_string()).or_insert(0) -= pot;
        Ok(pot)
    }

    /// Observed custody in excess of `reserve + fee pot` for one token.
    pub fn surplus(&self, token: &str) -> Result<u128> {
        let tracked = self.tracked_total(token)?;
        self.balance_of(token).checked_sub(tracked).ok_or_else(|| {
            VeilswapError::Internal(format!(
                "pool {} custody of {token} fell below tracked total",
                self.id
            ))
        })
    }

    /// Mark that `account` touched this pool in `block`.
    pub fn record_interaction(&mut self, account: AccountId, block: u64) {
        self.last_interaction.insert(account, block);
    }
}

#[cfg(test)]
mod tests {
    use veilswap_types::constants::PRECISION;

    use super::*;

    fn eth_usdc() -> TokenPair {
        TokenPair::canonical("ETH", "USDC")
    }

    /// 1,000,000 / 1,000,000 pool with a 30 bps fee, easy to hand-check.
    fn small_pool() -> (Pool, AccountId) {
        let provider = AccountId::new();
        let mut pool = Pool::new(eth_usdc(), 30, 1_000, 16, Utc::now());
        pool.add_liquidity(provider, 1_000_000, 1_000_000).unwrap();
        (pool, provider)
    }

    #[test]
    fn first_mint_locks_minimum_liquidity() {
        let provider = AccountId::new();
        let mut pool = Pool::new(eth_usdc(), 30, 1_000, 16, Utc::now());
        let minted = pool.add_liquidity(provider, 4_000_000, 1_000_000).unwrap();
        // sqrt(4e6 * 1e6) = 2e6 shares, of which 1000 stay locked.
        assert_eq!(minted, 2_000_000 - MINIMUM_LIQUIDITY);
        assert_eq!(pool.total_liquidity, 2_000_000);
        assert_eq!(pool.shares_of(&provider), 2_000_000 - MINIMUM_LIQUIDITY);
    }

    #[test]
    fn tiny_first_mint_rejected() {
        let mut pool = Pool::new(eth_usdc(), 30, 1_000, 16, Utc::now());
        let result = pool.add_liquidity(AccountId::new(), 10, 10);
        assert!(matches!(
            result,
            Err(VeilswapError::InsufficientLiquidityMinted { minted: 10, .. })
        ));
        assert_eq!(pool.total_liquidity, 0);
    }

    #[test]
    fn second_mint_is_pro_rata() {
        let (mut pool, _) = small_pool();
        let other = AccountId::new();
        let minted = pool.add_liquidity(other, 100_000, 100_000).unwrap();
        // 10% of reserves buys 10% of outstanding shares.
        assert_eq!(minted, 100_000);
        assert_eq!(pool.reserve0, 1_100_000);
        assert_eq!(pool.reserve1, 1_100_000);
    }

    #[test]
    fn lopsided_mint_pays_the_lesser_side() {
        let (mut pool, _) = small_pool();
        let minted = pool.add_liquidity(AccountId::new(), 100_000, 200_000).unwrap();
        assert_eq!(minted, 100_000);
        // Both deposits are absorbed; the excess token1 accrues to all LPs.
        assert_eq!(pool.reserve1, 1_200_000);
    }

    #[test]
    fn remove_liquidity_pro_rata() {
        let (mut pool, provider) = small_pool();
        let held = pool.shares_of(&provider);
        let (amount0, amount1) = pool.remove_liquidity(&provider, held / 2).unwrap();
        // 499,500 of 1,000,000 shares: just under half the reserves.
        assert_eq!(amount0, amount1);
        assert!(amount0 > 0 && amount0 < 1_000_000);
        assert_eq!(pool.reserve0, 1_000_000 - amount0);
        assert_eq!(pool.shares_of(&provider), held - held / 2);
    }

    #[test]
    fn remove_more_than_held_rejected() {
        let (mut pool, provider) = small_pool();
        let held = pool.shares_of(&provider);
        let result = pool.remove_liquidity(&provider, held + 1);
        assert!(matches!(
            result,
            Err(VeilswapError::InsufficientShares { requested, .. }) if requested == held + 1
        ));
    }

    #[test]
    fn stranger_cannot_remove() {
        let (mut pool, _) = small_pool();
        let result = pool.remove_liquidity(&AccountId::new(), 1);
        assert!(matches!(
            result,
            Err(VeilswapError::InsufficientShares { held: 0, .. })
        ));
    }

    #[test]
    fn swap_quote_hand_checked() {
        let (pool, _) = small_pool();
        // Sell 10,000 token0: fee 30 bps = 30, effective input 9,970.
        let plan = pool.plan_swap("ETH", 10_000, 1_000).unwrap();
        assert!(plan.zero_for_one);
        assert_eq!(plan.fee_total, 30);
        assert_eq!(plan.protocol_cut_in, 3);
        assert_eq!(plan.lp_fee, 27);
        // out = 1e6 * 9970 / 1_009_970 = 9871 (floor)
        assert_eq!(plan.amount_out, 9_871);
        // protocol cut converted at post-trade price:
        // 3 * (1e6 - 9871) / 1_010_000 = 2 (floor)
        assert_eq!(plan.protocol_cut_out, 2);
        assert_eq!(plan.new_reserve0, 1_010_000);
        assert_eq!(plan.new_reserve1, 1_000_000 - 9_871 - 2);
    }

    #[test]
    fn apply_swap_preserves_custody_identity() {
        let (mut pool, _) = small_pool();
        let plan = pool.plan_swap("ETH", 10_000, 1_000).unwrap();
        pool.apply_swap(&plan);

        for token in ["ETH", "USDC"] {
            assert_eq!(
                pool.balance_of(token),
                pool.tracked_total(token).unwrap(),
                "custody identity broken for {token}"
            );
        }
        assert_eq!(pool.accumulated_fee("USDC"), 2);
    }

    #[test]
    fn swap_grows_k() {
        let (mut pool, _) = small_pool();
        let k_before = (pool.reserve0, pool.reserve1);
        let plan = pool.plan_swap("ETH", 10_000, 1_000).unwrap();
        pool.apply_swap(&plan);
        assert_eq!(
            wide_cmp(
                wide_mul(pool.reserve0, pool.reserve1),
                wide_mul(k_before.0, k_before.1),
            ),
            Ordering::Greater
        );
    }

    #[test]
    fn swap_both_directions() {
        let (pool, _) = small_pool();
        let sell0 = pool.plan_swap("ETH", 10_000, 1_000).unwrap();
        let sell1 = pool.plan_swap("USDC", 10_000, 1_000).unwrap();
        assert!(sell0.zero_for_one);
        assert!(!sell1.zero_for_one);
        // Symmetric reserves, symmetric quotes.
        assert_eq!(sell0.amount_out, sell1.amount_out);
    }

    #[test]
    fn swap_rejects_bad_input() {
        let (pool, _) = small_pool();
        assert!(matches!(
            pool.plan_swap("ETH", 0, 1_000),
            Err(VeilswapError::ZeroAmount)
        ));
        assert!(matches!(
            pool.plan_swap("DOGE", 1, 1_000),
            Err(VeilswapError::UnknownPoolToken { .. })
        ));
    }

    #[test]
    fn zero_fee_swap_holds_k_exactly_or_better() {
        let provider = AccountId::new();
        let mut pool = Pool::new(eth_usdc(), 0, 1_000, 16, Utc::now());
        pool.add_liquidity(provider, 1_000_000, 1_000_000).unwrap();
        let plan = pool.plan_swap("ETH", 1_000_000, 1_000).unwrap();
        // out = 1e6 * 1e6 / 2e6 = 500_000 exactly, no fee, no rounding.
        assert_eq!(plan.amount_out, 500_000);
        assert_eq!(plan.fee_total, 0);
        assert_eq!(plan.protocol_cut_out, 0);
    }

    #[test]
    fn realistic_scale_swap() {
        let provider = AccountId::new();
        let mut pool = Pool::new(eth_usdc(), 30, 1_000, 16, Utc::now());
        // 100 ETH / 200,000 USDC at 18 decimals.
        pool.add_liquidity(provider, 100 * PRECISION, 200_000 * PRECISION)
            .unwrap();
        let plan = pool.plan_swap("ETH", PRECISION, 1_000).unwrap();
        // Roughly 2000 USDC minus fee and slippage.
        assert!(plan.amount_out > 1_970 * PRECISION);
        assert!(plan.amount_out < 1_995 * PRECISION);
        assert_eq!(plan.fee_total, 3 * 10u128.pow(15));
    }

    #[test]
    fn credit_and_sync_absorb_donation() {
        let (mut pool, _) = small_pool();
        pool.credit("ETH", 50_000).unwrap();
        assert_eq!(pool.surplus("ETH").unwrap(), 50_000);
        assert_eq!(pool.surplus("USDC").unwrap(), 0);

        let (s0, s1) = pool.sync_reserves().unwrap();
        assert_eq!((s0, s1), (50_000, 0));
        assert_eq!(pool.reserve0, 1_050_000);
        assert_eq!(pool.surplus("ETH").unwrap(), 0);
    }

    #[test]
    fn credit_unknown_token_rejected() {
        let (mut pool, _) = small_pool();
        assert!(matches!(
            pool.credit("DOGE", 1),
            Err(VeilswapError::UnknownPoolToken { .. })
        ));
    }

    #[test]
    fn collect_fees_empties_pot() {
        let (mut pool, _) = small_pool();
        let plan = pool.plan_swap("ETH", 10_000, 1_000).unwrap();
        pool.apply_swap(&plan);
        assert_eq!(pool.accumulated_fee("USDC"), 2);

        let swept = pool.collect_fees("USDC").unwrap();
        assert_eq!(swept, 2);
        assert_eq!(pool.accumulated_fee("USDC"), 0);
        // Custody identity still holds after the sweep.
        assert_eq!(pool.balance_of("USDC"), pool.tracked_total("USDC").unwrap());
    }

    #[test]
    fn interaction_tracking() {
        let (mut pool, provider) = small_pool();
        assert_eq!(pool.last_interaction_block(&provider), None);
        pool.record_interaction(provider, 42);
        assert_eq!(pool.last_interaction_block(&provider), Some(42));
    }

    #[test]
    fn info_snapshot_serializes() {
        let (pool, _) = small_pool();
        let info = pool.info();
        let json = serde_json::to_string(&info).unwrap();
        let back: PoolInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
        assert_eq!(back.reserve0, 1_000_000);
    }
}
