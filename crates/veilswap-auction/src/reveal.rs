//! Reveal validation and slashing.
//!
//! A reveal either verifies (hash match → order enters the batch) or
//! slashes (mismatch → deposit split). Both are terminal and one-way.
//! Slashing is a fault resolved locally, never a call failure: a
//! mismatched reveal returns `Ok(Mismatched { .. })` and the rest of the
//! batch is untouched.

use tracing::{debug, info};
use veilswap_types::{
    AccountId, AuctionConfig, Batch, CommitmentId, CommitmentStatus, OrderReveal, Phase,
    RevealedOrder, Result, VeilswapError, slash_split,
};

use crate::commitments::CommitmentStore;

/// Result of a reveal call. Both variants are successful calls; only
/// `Verified` admits the order into the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Hash matched. The deposit comes back in full, along with any value
    /// paid beyond the declared priority bid.
    Verified {
        deposit_refund: u128,
        excess_returned: u128,
    },
    /// Hash mismatched. The deposit is split; the attached value is
    /// returned untouched because no bid was consumed.
    Mismatched {
        treasury_cut: u128,
        trader_refund: u128,
        value_returned: u128,
    },
}

/// Receipt for a timeout slash of an unrevealed commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlashReceipt {
    pub commitment_id: CommitmentId,
    pub treasury_cut: u128,
    pub trader_refund: u128,
}

/// Validates reveals against stored commitments and applies the slashing
/// rule to mismatches and timeouts.
pub struct RevealValidator {
    slash_rate_bps: u32,
}

impl RevealValidator {
    #[must_use]
    pub fn new(config: &AuctionConfig) -> Self {
        Self {
            slash_rate_bps: config.slash_rate_bps,
        }
    }

    /// Process a reveal for `commitment_id`.
    ///
    /// Checks run in order, touching no state until all pass:
    /// 1. Phase must be REVEAL
    /// 2. Commitment must exist, belong to `batch`, and be PENDING
    /// 3. Caller must be the committer
    /// 4. Recomputed hash decides: match or slash
    /// 5. On match only, `paid_value` must cover `priority_bid`
    ///
    /// # Errors
    /// `WrongPhase`/`RevealTooLate`, `CommitmentNotFound`,
    /// `CommitmentNotPending`, `NotCommitter`, or
    /// `InsufficientPriorityBid`. A hash mismatch is **not** an error.
    #[allow(clippy::too_many_arguments)]
    pub fn reveal(
        &self,
        store: &mut CommitmentStore,
        batch: &mut Batch,
        phase: Phase,
        commitment_id: CommitmentId,
        caller: AccountId,
        order: OrderReveal,
        priority_bid: u128,
        paid_value: u128,
    ) -> Result<RevealOutcome> {
        match phase {
            Phase::Reveal => {}
            Phase::Commit => {
                return Err(VeilswapError::WrongPhase {
                    expected: Phase::Reveal,
                    actual: phase,
                });
            }
            Phase::Settling => {
                return Err(VeilswapError::RevealTooLate { batch_id: batch.id });
            }
        }

        let commitment = store.get(commitment_id)?;
        if commitment.batch_id != batch.id {
            return Err(VeilswapError::Internal(format!(
                "commitment {commitment_id} belongs to {}, not {}",
                commitment.batch_id, batch.id
            )));
        }
        if commitment.status != CommitmentStatus::Pending {
            return Err(VeilswapError::CommitmentNotPending {
                commitment_id,
                status: commitment.status.to_string(),
            });
        }
        if commitment.trader != caller {
            return Err(VeilswapError::NotCommitter {
                commitment_id,
                caller,
            });
        }

        let deposit = commitment.deposit;
        if order.commitment_hash(caller) != commitment.commit_hash {
            // Fault, not failure: slash and keep going.
            let (treasury_cut, trader_refund) = slash_split(deposit, self.slash_rate_bps);
            let commitment = store.get_mut(commitment_id)?;
            commitment.status = CommitmentStatus::Slashed;
            info!(
                commitment_id = %commitment_id,
                batch_id = %batch.id,
                treasury_cut,
                trader_refund,
                "Reveal hash mismatch, commitment slashed"
            );
            return Ok(RevealOutcome::Mismatched {
                treasury_cut,
                trader_refund,
                value_returned: paid_value,
            });
        }

        if paid_value < priority_bid {
            return Err(VeilswapError::InsufficientPriorityBid {
                paid: paid_value,
                bid: priority_bid,
            });
        }
        let excess_returned = paid_value - priority_bid;

        let reveal_index = batch.revealed_orders.len() as u64;
        batch.revealed_orders.push(RevealedOrder {
            batch_id: batch.id,
            commitment_id,
            trader: caller,
            token_in: order.token_in.clone(),
            token_out: order.token_out.clone(),
            amount_in: order.amount_in,
            min_amount_out: order.min_amount_out,
            priority_bid,
            reveal_index,
            secret: order.secret,
        });
        batch.total_priority_bids = batch
            .total_priority_bids
            .checked_add(priority_bid)
            .ok_or(VeilswapError::MathOverflow {
                context: "batch priority bid total",
            })?;

        let commitment = store.get_mut(commitment_id)?;
        commitment.status = CommitmentStatus::Revealed;
        commitment.priority_bid = priority_bid;
        commitment.reveal = Some(order);

        debug!(
            commitment_id = %commitment_id,
            batch_id = %batch.id,
            reveal_index,
            priority_bid,
            "Reveal verified"
        );
        Ok(RevealOutcome::Verified {
            deposit_refund: deposit,
            excess_returned,
        })
    }

    /// Slash a commitment that never revealed. Permissionless and
    /// time-gated: callable by anyone once the batch's REVEAL window has
    /// closed.
    ///
    /// # Errors
    /// `SlashTooEarly` before the window closes, `CommitmentNotFound`,
    /// or `CommitmentNotPending` if already resolved.
    pub fn slash_unrevealed(
        &self,
        store: &mut CommitmentStore,
        batch: &Batch,
        phase: Phase,
        commitment_id: CommitmentId,
    ) -> Result<SlashReceipt> {
        if phase != Phase::Settling {
            return Err(VeilswapError::SlashTooEarly { commitment_id });
        }

        let commitment = store.get(commitment_id)?;
        if commitment.batch_id != batch.id {
            return Err(VeilswapError::Internal(format!(
                "commitment {commitment_id} belongs to {}, not {}",
                commitment.batch_id, batch.id
            )));
        }
        if commitment.status != CommitmentStatus::Pending {
            return Err(VeilswapError::CommitmentNotPending {
                commitment_id,
                status: commitment.status.to_string(),
            });
        }

        let (treasury_cut, trader_refund) = slash_split(commitment.deposit, self.slash_rate_bps);
        let commitment = store.get_mut(commitment_id)?;
        commitment.status = CommitmentStatus::Slashed;

        info!(
            commitment_id = %commitment_id,
            batch_id = %batch.id,
            treasury_cut,
            trader_refund,
            "Unrevealed commitment slashed"
        );
        Ok(SlashReceipt {
            commitment_id,
            treasury_cut,
            trader_refund,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use veilswap_types::{BatchId, constants};

    struct Fixture {
        store: CommitmentStore,
        validator: RevealValidator,
        batch: Batch,
        trader: AccountId,
        commitment_id: CommitmentId,
        order: OrderReveal,
    }

    fn fixture() -> Fixture {
        let config = AuctionConfig::default();
        let mut store = CommitmentStore::new(config.clone());
        let validator = RevealValidator::new(&config);
        let mut batch = Batch::open(BatchId(1), Utc::now());
        let trader = AccountId::new();
        let order = OrderReveal::dummy_swap("ETH", "USDC", 1_000_000, 900_000);
        let commitment_id = store
            .commit(
                &mut batch,
                Phase::Commit,
                trader,
                order.commitment_hash(trader),
                constants::MIN_DEPOSIT,
                Utc::now(),
            )
            .unwrap();
        Fixture {
            store,
            validator,
            batch,
            trader,
            commitment_id,
            order,
        }
    }

    #[test]
    fn valid_reveal_enters_batch_and_refunds_deposit() {
        let mut f = fixture();
        let outcome = f
            .validator
            .reveal(
                &mut f.store,
                &mut f.batch,
                Phase::Reveal,
                f.commitment_id,
                f.trader,
                f.order.clone(),
                50,
                50,
            )
            .unwrap();

        assert_eq!(
            outcome,
            RevealOutcome::Verified {
                deposit_refund: constants::MIN_DEPOSIT,
                excess_returned: 0,
            }
        );
        assert_eq!(f.batch.revealed_orders.len(), 1);
        assert_eq!(f.batch.revealed_orders[0].priority_bid, 50);
        assert_eq!(f.batch.revealed_orders[0].reveal_index, 0);
        assert_eq!(f.batch.total_priority_bids, 50);

        let c = f.store.get(f.commitment_id).unwrap();
        assert_eq!(c.status, CommitmentStatus::Revealed);
        assert_eq!(c.priority_bid, 50);
        assert!(c.reveal.is_some());
    }

    #[test]
    fn overpaid_bid_returns_excess() {
        let mut f = fixture();
        let outcome = f
            .validator
            .reveal(
                &mut f.store,
                &mut f.batch,
                Phase::Reveal,
                f.commitment_id,
                f.trader,
                f.order.clone(),
                50,
                80,
            )
            .unwrap();
        assert_eq!(
            outcome,
            RevealOutcome::Verified {
                deposit_refund: constants::MIN_DEPOSIT,
                excess_returned: 30,
            }
        );
    }

    #[test]
    fn underpaid_bid_rejects_without_state_change() {
        let mut f = fixture();
        let err = f
            .validator
            .reveal(
                &mut f.store,
                &mut f.batch,
                Phase::Reveal,
                f.commitment_id,
                f.trader,
                f.order.clone(),
                100,
                99,
            )
            .unwrap_err();
        assert_eq!(err, VeilswapError::InsufficientPriorityBid { paid: 99, bid: 100 });

        // Commitment untouched: the trader can retry with correct value.
        let c = f.store.get(f.commitment_id).unwrap();
        assert_eq!(c.status, CommitmentStatus::Pending);
        assert!(f.batch.revealed_orders.is_empty());
        assert_eq!(f.batch.total_priority_bids, 0);
    }

    #[test]
    fn mismatched_hash_slashes_with_exact_split() {
        let mut f = fixture();
        let forged = f.order.clone().with_secret([0x99; 32]);
        let outcome = f
            .validator
            .reveal(
                &mut f.store,
                &mut f.batch,
                Phase::Reveal,
                f.commitment_id,
                f.trader,
                forged,
                0,
                25,
            )
            .unwrap();

        match outcome {
            RevealOutcome::Mismatched {
                treasury_cut,
                trader_refund,
                value_returned,
            } => {
                assert_eq!(treasury_cut + trader_refund, constants::MIN_DEPOSIT);
                assert_eq!(treasury_cut, constants::MIN_DEPOSIT / 2);
                assert_eq!(value_returned, 25);
            }
            RevealOutcome::Verified { .. } => panic!("expected slash"),
        }
        let c = f.store.get(f.commitment_id).unwrap();
        assert_eq!(c.status, CommitmentStatus::Slashed);
        assert!(f.batch.revealed_orders.is_empty());
    }

    #[test]
    fn reveal_during_commit_is_wrong_phase() {
        let mut f = fixture();
        let err = f
            .validator
            .reveal(
                &mut f.store,
                &mut f.batch,
                Phase::Commit,
                f.commitment_id,
                f.trader,
                f.order.clone(),
                0,
                0,
            )
            .unwrap_err();
        assert!(matches!(err, VeilswapError::WrongPhase { .. }));
    }

    #[test]
    fn reveal_during_settling_is_too_late() {
        let mut f = fixture();
        let err = f
            .validator
            .reveal(
                &mut f.store,
                &mut f.batch,
                Phase::Settling,
                f.commitment_id,
                f.trader,
                f.order.clone(),
                0,
                0,
            )
            .unwrap_err();
        assert_eq!(err, VeilswapError::RevealTooLate { batch_id: BatchId(1) });
    }

    #[test]
    fn non_committer_cannot_reveal() {
        let mut f = fixture();
        let stranger = AccountId::new();
        let err = f
            .validator
            .reveal(
                &mut f.store,
                &mut f.batch,
                Phase::Reveal,
                f.commitment_id,
                stranger,
                f.order.clone(),
                0,
                0,
            )
            .unwrap_err();
        assert!(matches!(err, VeilswapError::NotCommitter { .. }));
        assert_eq!(
            f.store.get(f.commitment_id).unwrap().status,
            CommitmentStatus::Pending
        );
    }

    #[test]
    fn double_reveal_rejected() {
        let mut f = fixture();
        f.validator
            .reveal(
                &mut f.store,
                &mut f.batch,
                Phase::Reveal,
                f.commitment_id,
                f.trader,
                f.order.clone(),
                0,
                0,
            )
            .unwrap();
        let err = f
            .validator
            .reveal(
                &mut f.store,
                &mut f.batch,
                Phase::Reveal,
                f.commitment_id,
                f.trader,
                f.order.clone(),
                0,
                0,
            )
            .unwrap_err();
        assert!(matches!(err, VeilswapError::CommitmentNotPending { .. }));
        // No duplicate order entered the batch.
        assert_eq!(f.batch.revealed_orders.len(), 1);
    }

    #[test]
    fn slash_before_settling_is_too_early() {
        let mut f = fixture();
        for phase in [Phase::Commit, Phase::Reveal] {
            let err = f
                .validator
                .slash_unrevealed(&mut f.store, &f.batch, phase, f.commitment_id)
                .unwrap_err();
            assert!(matches!(err, VeilswapError::SlashTooEarly { .. }));
        }
    }

    #[test]
    fn timeout_slash_splits_deposit_exactly() {
        let mut f = fixture();
        let receipt = f
            .validator
            .slash_unrevealed(&mut f.store, &f.batch, Phase::Settling, f.commitment_id)
            .unwrap();
        assert_eq!(
            receipt.treasury_cut + receipt.trader_refund,
            constants::MIN_DEPOSIT
        );
        assert_eq!(receipt.treasury_cut, constants::MIN_DEPOSIT / 2);
        assert_eq!(
            f.store.get(f.commitment_id).unwrap().status,
            CommitmentStatus::Slashed
        );
    }

    #[test]
    fn revealed_commitment_cannot_be_timeout_slashed() {
        let mut f = fixture();
        f.validator
            .reveal(
                &mut f.store,
                &mut f.batch,
                Phase::Reveal,
                f.commitment_id,
                f.trader,
                f.order.clone(),
                0,
                0,
            )
            .unwrap();
        let err = f
            .validator
            .slash_unrevealed(&mut f.store, &f.batch, Phase::Settling, f.commitment_id)
            .unwrap_err();
        assert!(matches!(err, VeilswapError::CommitmentNotPending { .. }));
    }

    #[test]
    fn double_slash_rejected() {
        let mut f = fixture();
        f.validator
            .slash_unrevealed(&mut f.store, &f.batch, Phase::Settling, f.commitment_id)
            .unwrap();
        let err = f
            .validator
            .slash_unrevealed(&mut f.store, &f.batch, Phase::Settling, f.commitment_id)
            .unwrap_err();
        assert!(matches!(err, VeilswapError::CommitmentNotPending { .. }));
    }
}
