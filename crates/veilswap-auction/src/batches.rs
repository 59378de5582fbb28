//! Batch lifecycle manager.
//!
//! Exactly one batch is open at any time. Batch ids increase by one with
//! no gaps, and a new batch opens only after the previous one is marked
//! settled — both enforced structurally here rather than checked after
//! the fact.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::info;
use veilswap_types::{Batch, BatchId, Phase, Result, VeilswapError};

/// Owns the open batch and the settled history.
pub struct BatchManager {
    current: Batch,
    history: BTreeMap<BatchId, Batch>,
}

impl BatchManager {
    /// Start with batch 1 open at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current: Batch::open(BatchId(1), now),
            history: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn current(&self) -> &Batch {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Batch {
        &mut self.current
    }

    #[must_use]
    pub fn current_id(&self) -> BatchId {
        self.current.id
    }

    /// Look up any batch, open or settled.
    ///
    /// # Errors
    /// `BatchNotFound` for ids never opened.
    pub fn get(&self, id: BatchId) -> Result<&Batch> {
        if id == self.current.id {
            Ok(&self.current)
        } else {
            self.history.get(&id).ok_or(VeilswapError::BatchNotFound(id))
        }
    }

    /// Mark the open batch settled.
    ///
    /// # Errors
    /// `BatchAlreadySettled` on a second call.
    pub fn mark_settled(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.current.settled {
            return Err(VeilswapError::BatchAlreadySettled(self.current.id));
        }
        self.current.settled = true;
        self.current.settled_at = Some(now);
        self.current.phase = Phase::Settling;
        Ok(())
    }

    /// Archive the settled batch and open the next one.
    ///
    /// Ids are gap-free by construction: the new id is always
    /// `previous + 1`.
    ///
    /// # Errors
    /// `Internal` if the open batch has not been settled — callers must
    /// settle before rolling over.
    pub fn open_next(&mut self, now: DateTime<Utc>) -> Result<BatchId> {
        if !self.current.settled {
            return Err(VeilswapError::Internal(format!(
                "batch {} is not settled; cannot open the next batch",
                self.current.id
            )));
        }
        let next_id = self.current.id.next();
        let settled = std::mem::replace(&mut self.current, Batch::open(next_id, now));
        self.history.insert(settled.id, settled);

        info!(batch_id = %next_id, "Batch opened");
        Ok(next_id)
    }

    /// Number of batches ever opened, including the open one.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.history.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn genesis_batch_is_one() {
        let manager = BatchManager::new(t0());
        assert_eq!(manager.current_id(), BatchId(1));
        assert!(!manager.current().settled);
        assert_eq!(manager.batch_count(), 1);
    }

    #[test]
    fn rollover_requires_settlement() {
        let mut manager = BatchManager::new(t0());
        let err = manager.open_next(t0()).unwrap_err();
        assert!(matches!(err, VeilswapError::Internal(_)));
        assert_eq!(manager.current_id(), BatchId(1));
    }

    #[test]
    fn ids_are_monotonic_without_gaps() {
        let mut manager = BatchManager::new(t0());
        for expected in 2..=5u64 {
            manager.mark_settled(t0()).unwrap();
            let id = manager.open_next(t0() + Duration::seconds(1)).unwrap();
            assert_eq!(id, BatchId(expected));
        }
        assert_eq!(manager.batch_count(), 5);
    }

    #[test]
    fn double_settle_rejected() {
        let mut manager = BatchManager::new(t0());
        manager.mark_settled(t0()).unwrap();
        let err = manager.mark_settled(t0()).unwrap_err();
        assert_eq!(err, VeilswapError::BatchAlreadySettled(BatchId(1)));
    }

    #[test]
    fn settled_batches_remain_queryable() {
        let mut manager = BatchManager::new(t0());
        manager.mark_settled(t0()).unwrap();
        manager.open_next(t0()).unwrap();

        let old = manager.get(BatchId(1)).unwrap();
        assert!(old.settled);
        assert!(old.settled_at.is_some());

        let current = manager.get(BatchId(2)).unwrap();
        assert!(!current.settled);
    }

    #[test]
    fn unknown_batch_errors() {
        let manager = BatchManager::new(t0());
        let err = manager.get(BatchId(42)).unwrap_err();
        assert_eq!(err, VeilswapError::BatchNotFound(BatchId(42)));
    }
}
