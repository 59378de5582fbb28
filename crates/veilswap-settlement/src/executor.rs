//! Batch order execution against a single pool.
//!
//! Settlement consumes a batch's sequenced orders pool by pool. One call
//! here runs every order routed to one pool, in sequence, against live
//! reserves: earlier orders move the price later orders trade at.
//!
//! Two failure shapes, deliberately distinct:
//!
//! - **Per-order skips** (missed minimum, pool-level validation): the
//!   order's input is refunded, the pass continues, nothing reverts.
//! - **Guard rejections** (donation surplus, trade-size cap, TWAP
//!   deviation, k regression): the whole pass aborts with the error.
//!   Callers run the pass against a staged clone and install the pool
//!   only on success, so an abort leaves no partial settlement behind.
//!
//! The batch counts as one pool interaction. Commitments predate the
//! settlement block, so the same-block borrow-trade-repay shape the
//! flash guard exists for cannot occur inside a batch; no same-block
//! check runs against the orders. Fill recipients are still marked at
//! the settlement block, which blocks a direct follow-up swap from the
//! same account in that block.

use tracing::debug;
use veilswap_types::constants::PRECISION;
use veilswap_types::{
    BatchSwapResult, FeeConfig, GuardConfig, OrderFill, OrderOutcome, Result, RevealedOrder,
    SkipReason, VeilswapError,
};

use veilswap_amm::pool::Pool;
use veilswap_amm::{guards, math};

/// Result of running one pool's slice of a batch.
#[derive(Debug, Clone)]
pub struct ExecutionPass {
    /// Position-tagged outcomes in execution order. Positions index the
    /// batch-wide execution order, not this pool's slice.
    pub outcomes: Vec<(usize, OrderOutcome)>,
    /// Volume totals and the clearing price for the pass.
    pub result: BatchSwapResult,
}

/// Execute `orders` against `pool` in the given sequence.
///
/// ## Order of operations
///
/// 1. Donation guard over pre-batch custody.
/// 2. One oracle observation at the pre-batch spot. The oracle keeps at
///    most one observation per block, so the whole pass prices the
///    block at its opening spot.
/// 3. Per order, in sequence: trade-size guard, price the swap, check
///    the trader's minimum, TWAP guard on the planned post-trade spot,
///    then apply and mark the trader's interaction.
/// 4. Clearing price: total token1 moved per total token0 moved across
///    the pass, scaled by [`PRECISION`], falling back to the post-pass
///    spot when no token0 moved.
///
/// # Errors
/// Any guard rejection, or arithmetic overflow while totalling volume.
/// On error the pool may hold partially applied fills; callers must
/// treat `pool` as discardable staging state.
pub fn execute_pool_orders(
    pool: &mut Pool,
    orders: &[(usize, &RevealedOrder)],
    fees: &FeeConfig,
    guards_cfg: &GuardConfig,
    block: u64,
) -> Result<ExecutionPass> {
    guards::check_donation(pool, guards_cfg.donation_tolerance_bps)?;

    let pre_spot = pool.spot_price()?;
    pool.oracle.write(pre_spot, block);

    let mut outcomes = Vec::with_capacity(orders.len());
    let mut token0_in = 0u128;
    let mut token1_in = 0u128;
    let mut token0_out = 0u128;
    let mut token1_out = 0u128;

    for &(position, order) in orders {
        guards::check_trade_size(pool, &order.token_in, order.amount_in)?;

        let plan = match pool.plan_swap(&order.token_in, order.amount_in, fees.protocol_fee_share_bps)
        {
            Ok(plan) => plan,
            Err(err) if err.is_guard_rejection() => return Err(err),
            Err(err) => {
                debug!(
                    commitment = %order.commitment_id,
                    code = err.code(),
                    "Order skipped: swap planning failed"
                );
                outcomes.push((
                    position,
                    OrderOutcome::Skipped {
                        commitment_id: order.commitment_id,
                        trader: order.trader,
                        token: order.token_in.clone(),
                        refunded: order.amount_in,
                        reason: SkipReason::ExecutionFailed {
                            code: err.code().to_string(),
                            message: err.to_string(),
                        },
                    },
                ));
                continue;
            }
        };

        if plan.amount_out < order.min_amount_out {
            debug!(
                commitment = %order.commitment_id,
                amount_out = plan.amount_out,
                min_amount_out = order.min_amount_out,
                "Order skipped: below trader minimum"
            );
            outcomes.push((
                position,
                OrderOutcome::Skipped {
                    commitment_id: order.commitment_id,
                    trader: order.trader,
                    token: order.token_in.clone(),
                    refunded: order.amount_in,
                    reason: SkipReason::SlippageExceeded {
                        amount_out: plan.amount_out,
                        min_amount_out: order.min_amount_out,
                    },
                },
            ));
            continue;
        }

        if guards_cfg.twap_validation {
            guards::check_twap_deviation(
                pool,
                plan.spot_after,
                guards_cfg.twap_window_blocks,
                guards_cfg.twap_deviation_bps,
                block,
            )?;
        }

        pool.apply_swap(&plan);
        pool.record_interaction(order.trader, block);

        if plan.zero_for_one {
            token0_in = add_volume(token0_in, plan.amount_in)?;
            token1_out = add_volume(token1_out, plan.amount_out)?;
        } else {
            token1_in = add_volume(token1_in, plan.amount_in)?;
            token0_out = add_volume(token0_out, plan.amount_out)?;
        }

        debug!(
            commitment = %order.commitment_id,
            position,
            amount_in = plan.amount_in,
            amount_out = plan.amount_out,
            "Order filled"
        );
        outcomes.push((
            position,
            OrderOutcome::Filled(OrderFill {
                commitment_id: order.commitment_id,
                trader: order.trader,
                token_in: plan.token_in,
                token_out: plan.token_out,
                amount_in: plan.amount_in,
                amount_out: plan.amount_out,
                fee_paid: plan.fee_total,
                protocol_fee: plan.protocol_cut_out,
                position,
            }),
        ));
    }

    let token0_moved = add_volume(token0_in, token0_out)?;
    let token1_moved = add_volume(token1_in, token1_out)?;
    let clearing_price = if token0_moved > 0 {
        math::mul_div(token1_moved, PRECISION, token0_moved)?
    } else {
        pool.spot_price()?
    };

    Ok(ExecutionPass {
        outcomes,
        result: BatchSwapResult {
            clearing_price,
            token0_in,
            token1_in,
            token0_out,
            token1_out,
        },
    })
}

fn add_volume(total: u128, amount: u128) -> Result<u128> {
    total.checked_add(amount).ok_or(VeilswapError::MathOverflow {
        context: "batch volume totals",
    })
}
