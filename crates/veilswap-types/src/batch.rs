//! Batch records and settlement outcomes.
//!
//! A `Batch` groups every commitment made during one COMMIT window,
//! collects `RevealedOrder`s during REVEAL, and is consumed exactly once
//! by settlement, which produces one `OrderOutcome` per revealed order
//! plus per-pool `BatchSwapResult` summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, BatchId, CommitmentId, PoolId, Token};
use crate::phase::Phase;

/// A successfully revealed order, appended to its batch in reveal order.
///
/// The `secret` is public once revealed; it feeds the batch shuffle seed,
/// which is why the seed cannot be predicted before the last reveal lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedOrder {
    pub batch_id: BatchId,
    pub commitment_id: CommitmentId,
    pub trader: AccountId,
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: u128,
    pub min_amount_out: u128,
    /// Paid at reveal; buys earlier execution within the batch.
    pub priority_bid: u128,
    /// Position in the batch's reveal order (0-based).
    pub reveal_index: u64,
    /// The commitment blinding secret, disclosed at reveal.
    pub secret: [u8; 32],
}

/// One auction round: COMMIT window → REVEAL window → settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    /// When the COMMIT window opened. All phase arithmetic keys off this.
    pub opened_at: DateTime<Utc>,
    /// Last reconciled phase. A mirror only — the authoritative phase is
    /// always recomputed from `opened_at` and the clock.
    pub phase: Phase,
    /// Number of commitments accepted; also the next arrival sequence.
    pub commitment_count: u64,
    /// Orders revealed so far, in reveal order.
    pub revealed_orders: Vec<RevealedOrder>,
    /// Shuffle seed derived from post-reveal data. Fixed at settlement
    /// time and never recomputed.
    pub shuffle_seed: Option<[u8; 32]>,
    /// Index permutation over `revealed_orders` produced by the
    /// sequencer; settlement consumes it as-is.
    pub execution_order: Option<Vec<usize>>,
    /// Priority-bid proceeds collected during REVEAL.
    pub total_priority_bids: u128,
    pub settled: bool,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Batch {
    #[must_use]
    pub fn open(id: BatchId, opened_at: DateTime<Utc>) -> Self {
        Self {
            id,
            opened_at,
            phase: Phase::Commit,
            commitment_count: 0,
            revealed_orders: Vec::new(),
            shuffle_seed: None,
            execution_order: None,
            total_priority_bids: 0,
            settled: false,
            settled_at: None,
        }
    }

    /// Commitments that never revealed (slashable once REVEAL closes).
    #[must_use]
    pub fn unrevealed_count(&self) -> u64 {
        self.commitment_count - self.revealed_orders.len() as u64
    }
}

/// Why an order was skipped instead of executed.
///
/// Skips are per-order and silent: the trader's input is refunded, the
/// rest of the batch proceeds, and nothing reverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Computed output fell below the trader's minimum.
    SlippageExceeded { amount_out: u128, min_amount_out: u128 },
    /// No pool exists for the revealed token pair.
    PoolMissing { token_in: Token, token_out: Token },
    /// The swap failed validation or arithmetic inside the pool.
    ExecutionFailed { code: String, message: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SlippageExceeded { amount_out, min_amount_out } => {
                write!(f, "slippage: out {amount_out} < min {min_amount_out}")
            }
            Self::PoolMissing { token_in, token_out } => {
                write!(f, "no pool for {token_in}/{token_out}")
            }
            Self::ExecutionFailed { code, message } => write!(f, "execution {code}: {message}"),
        }
    }
}

/// A successfully executed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFill {
    pub commitment_id: CommitmentId,
    pub trader: AccountId,
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: u128,
    pub amount_out: u128,
    /// Total swap fee charged, in `token_in` units.
    pub fee_paid: u128,
    /// Protocol share of the fee accrued to the pool's fee pot, in
    /// `token_out` units.
    pub protocol_fee: u128,
    /// Position in the batch execution order (0-based).
    pub position: usize,
}

/// Per-order result of settling a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderOutcome {
    /// Order executed against the pool.
    Filled(OrderFill),
    /// Order skipped; `refunded` units of `token` returned to the trader.
    Skipped {
        commitment_id: CommitmentId,
        trader: AccountId,
        token: Token,
        refunded: u128,
        reason: SkipReason,
    },
}

impl OrderOutcome {
    #[must_use]
    pub fn commitment_id(&self) -> CommitmentId {
        match self {
            Self::Filled(fill) => fill.commitment_id,
            Self::Skipped { commitment_id, .. } => *commitment_id,
        }
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Filled(_))
    }
}

/// Derived, non-persistent summary of one settlement pass over one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSwapResult {
    /// Volume-weighted execution price of the batch: total token1 moved
    /// per total token0 moved, scaled by `PRECISION`. Falls back to the
    /// post-settlement spot price when the batch moved no token0.
    pub clearing_price: u128,
    /// token0 sold into the pool across the batch.
    pub token0_in: u128,
    /// token1 sold into the pool across the batch.
    pub token1_in: u128,
    /// token0 paid out to traders across the batch.
    pub token0_out: u128,
    /// token1 paid out to traders across the batch.
    pub token1_out: u128,
}

/// Batch-level clearing summary produced by settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    pub batch_id: BatchId,
    pub settled_at: DateTime<Utc>,
    /// Outcomes in execution order.
    pub outcomes: Vec<OrderOutcome>,
    /// Swap summary per pool touched by the batch.
    pub pool_results: BTreeMap<PoolId, BatchSwapResult>,
    /// Protocol fees accrued during this batch, per token.
    pub fees_accrued: BTreeMap<Token, u128>,
    /// Commitments slashed for failing to reveal.
    pub slashed_count: usize,
    /// Priority-bid proceeds collected during the batch's REVEAL phase.
    pub priority_proceeds: u128,
}

impl SettlementReport {
    #[must_use]
    pub fn filled_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_filled()).count()
    }

    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.filled_count()
    }

    /// Clearing price for one pool, if the batch touched it.
    #[must_use]
    pub fn clearing_price(&self, pool_id: PoolId) -> Option<u128> {
        self.pool_results.get(&pool_id).map(|r| r.clearing_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_batch_starts_in_commit() {
        let batch = Batch::open(BatchId(1), Utc::now());
        assert_eq!(batch.phase, Phase::Commit);
        assert!(!batch.settled);
        assert_eq!(batch.commitment_count, 0);
        assert_eq!(batch.total_priority_bids, 0);
        assert!(batch.shuffle_seed.is_none());
        assert!(batch.execution_order.is_none());
    }

    #[test]
    fn unrevealed_count_tracks_gap() {
        let mut batch = Batch::open(BatchId(1), Utc::now());
        batch.commitment_count = 3;
        assert_eq!(batch.unrevealed_count(), 3);
        batch.revealed_orders.push(RevealedOrder {
            batch_id: batch.id,
            commitment_id: CommitmentId::deterministic(1, 0),
            trader: AccountId::new(),
            token_in: "ETH".into(),
            token_out: "USDC".into(),
            amount_in: 1,
            min_amount_out: 0,
            priority_bid: 0,
            reveal_index: 0,
            secret: [0u8; 32],
        });
        assert_eq!(batch.unrevealed_count(), 2);
    }

    #[test]
    fn outcome_accessors() {
        let fill = OrderFill {
            commitment_id: CommitmentId::deterministic(1, 0),
            trader: AccountId::new(),
            token_in: "ETH".into(),
            token_out: "USDC".into(),
            amount_in: 10,
            amount_out: 19_000,
            fee_paid: 1,
            protocol_fee: 0,
            position: 0,
        };
        let outcome = OrderOutcome::Filled(fill.clone());
        assert!(outcome.is_filled());
        assert_eq!(outcome.commitment_id(), fill.commitment_id);

        let skipped = OrderOutcome::Skipped {
            commitment_id: CommitmentId::deterministic(1, 1),
            trader: AccountId::new(),
            token: "ETH".into(),
            refunded: 10,
            reason: SkipReason::SlippageExceeded {
                amount_out: 5,
                min_amount_out: 6,
            },
        };
        assert!(!skipped.is_filled());
    }

    #[test]
    fn report_counts() {
        let report = SettlementReport {
            batch_id: BatchId(3),
            settled_at: Utc::now(),
            outcomes: vec![OrderOutcome::Skipped {
                commitment_id: CommitmentId::deterministic(3, 0),
                trader: AccountId::new(),
                token: "ETH".into(),
                refunded: 1,
                reason: SkipReason::PoolMissing {
                    token_in: "ETH".into(),
                    token_out: "DAI".into(),
                },
            }],
            pool_results: BTreeMap::new(),
            fees_accrued: BTreeMap::new(),
            slashed_count: 2,
            priority_proceeds: 0,
        };
        assert_eq!(report.filled_count(), 0);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.slashed_count, 2);
        assert_eq!(report.clearing_price(PoolId::for_pair(&crate::ids::TokenPair::canonical("ETH", "USDC"))), None);
    }

    #[test]
    fn skip_reason_display() {
        let reason = SkipReason::SlippageExceeded {
            amount_out: 99,
            min_amount_out: 100,
        };
        assert_eq!(format!("{reason}"), "slippage: out 99 < min 100");
    }

    #[test]
    fn report_serde_roundtrip() {
        let pool_id = PoolId::for_pair(&crate::ids::TokenPair::canonical("ETH", "USDC"));
        let mut pool_results = BTreeMap::new();
        pool_results.insert(
            pool_id,
            BatchSwapResult {
                clearing_price: 2_000,
                token0_in: 3,
                token1_in: 2_100,
                token0_out: 1,
                token1_out: 5_900,
            },
        );
        let report = SettlementReport {
            batch_id: BatchId(7),
            settled_at: Utc::now(),
            outcomes: Vec::new(),
            pool_results,
            fees_accrued: BTreeMap::new(),
            slashed_count: 0,
            priority_proceeds: 42,
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: SettlementReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.batch_id, BatchId(7));
        assert_eq!(back.priority_proceeds, 42);
        assert_eq!(back.clearing_price(pool_id), Some(2_000));
    }
}
