//! Commitment store — accepts sealed orders during COMMIT and tracks
//! their lifecycle through reveal, slash, and execution.
//!
//! The store never inspects order contents; until REVEAL it holds nothing
//! but an opaque hash, a deposit, and the committer's identity.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;
use veilswap_types::{
    AccountId, AuctionConfig, Batch, BatchId, Commitment, CommitmentId, CommitmentStatus, Phase,
    Result, VeilswapError,
};

/// All commitments, indexed by id and by batch.
pub struct CommitmentStore {
    config: AuctionConfig,
    commitments: HashMap<CommitmentId, Commitment>,
    by_batch: BTreeMap<BatchId, Vec<CommitmentId>>,
}

impl CommitmentStore {
    #[must_use]
    pub fn new(config: AuctionConfig) -> Self {
        Self {
            config,
            commitments: HashMap::new(),
            by_batch: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuctionConfig {
        &self.config
    }

    /// Accept a commitment into `batch`.
    ///
    /// 1. Phase must be COMMIT (the caller derives `phase` from the clock)
    /// 2. Deposit must meet the minimum
    /// 3. Batch must have capacity
    ///
    /// The id is derived from (batch, arrival sequence), so a journal
    /// replay reproduces identical ids.
    ///
    /// # Errors
    /// `WrongPhase`, `InsufficientDeposit`, or `BatchFull`.
    pub fn commit(
        &mut self,
        batch: &mut Batch,
        phase: Phase,
        trader: AccountId,
        commit_hash: [u8; 32],
        deposit: u128,
        now: DateTime<Utc>,
    ) -> Result<CommitmentId> {
        if phase != Phase::Commit {
            return Err(VeilswapError::WrongPhase {
                expected: Phase::Commit,
                actual: phase,
            });
        }
        if deposit < self.config.min_deposit {
            return Err(VeilswapError::InsufficientDeposit {
                deposit,
                minimum: self.config.min_deposit,
            });
        }
        if batch.commitment_count as usize >= self.config.max_commitments_per_batch {
            return Err(VeilswapError::BatchFull {
                batch_id: batch.id,
                limit: self.config.max_commitments_per_batch,
            });
        }

        let sequence = batch.commitment_count;
        let id = CommitmentId::deterministic(batch.id.0, sequence);
        let commitment = Commitment {
            id,
            batch_id: batch.id,
            trader,
            commit_hash,
            deposit,
            priority_bid: 0,
            status: CommitmentStatus::Pending,
            sequence,
            committed_at: now,
            reveal: None,
        };

        self.commitments.insert(id, commitment);
        self.by_batch.entry(batch.id).or_default().push(id);
        batch.commitment_count += 1;

        debug!(commitment_id = %id, batch_id = %batch.id, deposit, "Commitment accepted");
        Ok(id)
    }

    /// Look up a commitment.
    ///
    /// # Errors
    /// `CommitmentNotFound` if the id is unknown.
    pub fn get(&self, id: CommitmentId) -> Result<&Commitment> {
        self.commitments
            .get(&id)
            .ok_or(VeilswapError::CommitmentNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: CommitmentId) -> Result<&mut Commitment> {
        self.commitments
            .get_mut(&id)
            .ok_or(VeilswapError::CommitmentNotFound(id))
    }

    /// Transition a revealed commitment to EXECUTED when settlement
    /// consumes its order.
    ///
    /// # Errors
    /// `CommitmentNotFound` or `CommitmentNotPending` if the commitment
    /// is not in REVEALED state.
    pub fn mark_executed(&mut self, id: CommitmentId) -> Result<()> {
        let commitment = self.get_mut(id)?;
        if commitment.status != CommitmentStatus::Revealed {
            return Err(VeilswapError::CommitmentNotPending {
                commitment_id: id,
                status: commitment.status.to_string(),
            });
        }
        commitment.status = CommitmentStatus::Executed;
        Ok(())
    }

    /// Ids of a batch's commitments in arrival order.
    #[must_use]
    pub fn batch_commitments(&self, batch_id: BatchId) -> &[CommitmentId] {
        self.by_batch.get(&batch_id).map_or(&[], Vec::as_slice)
    }

    /// Ids of a batch's commitments still awaiting reveal.
    #[must_use]
    pub fn pending_ids(&self, batch_id: BatchId) -> Vec<CommitmentId> {
        self.batch_commitments(batch_id)
            .iter()
            .filter(|id| {
                self.commitments
                    .get(id)
                    .is_some_and(Commitment::is_pending)
            })
            .copied()
            .collect()
    }

    /// Commitments in a batch with SLASHED status.
    #[must_use]
    pub fn slashed_count(&self, batch_id: BatchId) -> usize {
        self.batch_commitments(batch_id)
            .iter()
            .filter(|id| {
                self.commitments
                    .get(id)
                    .is_some_and(|c| c.status == CommitmentStatus::Slashed)
            })
            .count()
    }

    /// Total commitments tracked across all batches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commitments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty()
    }
}
