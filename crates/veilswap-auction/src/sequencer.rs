//! Order sequencer — fixes one total execution order per batch.
//!
//! Ranking is two-level:
//! 1. `priority_bid` descending — paying more buys earlier execution.
//! 2. Ties broken by a deterministic pseudo-random permutation seeded
//!    from post-reveal data. Because every reveal's secret feeds the
//!    seed, no participant can know or steer the tie-break before the
//!    last reveal lands — which is exactly what removes any
//!    strategic-ordering advantage among non-priority orders.
//!
//! The order is fixed exactly once per batch and never recomputed;
//! settlement consumes it as-is.

use sha2::{Digest, Sha256};
use tracing::info;
use veilswap_types::{Batch, BatchId, Phase, Result, RevealedOrder, VeilswapError};

/// Derives shuffle seeds and execution orders for settled batches.
#[derive(Debug, Default)]
pub struct OrderSequencer;

impl OrderSequencer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Fix the batch's execution order, or return the already-fixed one.
    ///
    /// Idempotent: the first SETTLING-phase call derives the seed and the
    /// permutation and stores both on the batch; every later call returns
    /// the stored permutation unchanged.
    ///
    /// # Errors
    /// `WrongPhase` if called before the batch reaches SETTLING.
    pub fn sequence(&self, batch: &mut Batch, phase: Phase) -> Result<Vec<usize>> {
        if let Some(order) = &batch.execution_order {
            return Ok(order.clone());
        }
        if phase != Phase::Settling {
            return Err(VeilswapError::WrongPhase {
                expected: Phase::Settling,
                actual: phase,
            });
        }

        let seed = Self::derive_shuffle_seed(batch.id, &batch.revealed_orders);
        let order = Self::compute_execution_order(seed, &batch.revealed_orders);

        batch.shuffle_seed = Some(seed);
        batch.execution_order = Some(order.clone());

        info!(
            batch_id = %batch.id,
            orders = order.len(),
            seed = %hex::encode(&seed[..4]),
            "Execution order fixed"
        );
        Ok(order)
    }

    /// SHA-256 seed over the batch id and every revealed order's data,
    /// secrets included.
    ///
    /// Commits to:
    /// - Batch ID and order count
    /// - Each order's trader, tokens, amounts, priority bid, and secret
    #[must_use]
    pub fn derive_shuffle_seed(batch_id: BatchId, orders: &[RevealedOrder]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"veilswap:shuffle_seed:v1:");
        hasher.update(batch_id.0.to_le_bytes());
        hasher.update((orders.len() as u64).to_le_bytes());

        for order in orders {
            hasher.update(order.trader.0.as_bytes());
            hasher.update((order.token_in.len() as u64).to_le_bytes());
            hasher.update(order.token_in.as_bytes());
            hasher.update((order.token_out.len() as u64).to_le_bytes());
            hasher.update(order.token_out.as_bytes());
            hasher.update(order.amount_in.to_le_bytes());
            hasher.update(order.min_amount_out.to_le_bytes());
            hasher.update(order.priority_bid.to_le_bytes());
            hasher.update(order.secret);
        }

        hasher.finalize().into()
    }

    /// Shuffle all indices with the keyed permutation, then stable-sort
    /// by priority bid descending.
    ///
    /// The stable sort preserves the shuffled relative order within each
    /// tie group, so zero-bid orders end up uniformly permuted while paid
    /// bids always execute strictly before lower ones.
    #[must_use]
    pub fn compute_execution_order(seed: [u8; 32], orders: &[RevealedOrder]) -> Vec<usize> {
        let mut order = shuffled_indices(seed, orders.len());
        order.sort_by_key(|&idx| std::cmp::Reverse(orders[idx].priority_bid));
        order
    }
}

/// Fisher-Yates over `0..n`, drawing each step from a re-keyed SHA-256
/// chain. The modulo bias is immaterial at batch sizes (n ≤ 10^4 against
/// a 64-bit draw).
fn shuffled_indices(seed: [u8; 32], n: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut state = seed;
    for i in (1..n).rev() {
        let mut hasher = Sha256::new();
        hasher.update(b"veilswap:shuffle_step:v1:");
        hasher.update(state);
        hasher.update((i as u64).to_le_bytes());
        state = hasher.finalize().into();

        let word = u64::from_le_bytes(state[..8].try_into().expect("SHA-256 produces 32 bytes"));
        let j = (word % (i as u64 + 1)) as usize;
        indices.swap(i, j);
    }
    indices
}
