//! Phase oracle — derives a batch's phase purely from elapsed time.
//!
//! No background timer exists anywhere in the engine. Every query
//! recomputes the phase from the batch's `opened_at` and the clock sample
//! the caller took at the top of its call. The stored `Batch::phase` field
//! is only a reconciled mirror for observers.

use chrono::{DateTime, Utc};
use veilswap_types::{Batch, Phase, PhaseSchedule, Result, VeilswapError};

/// Pure time-to-phase derivation for batches.
#[derive(Debug, Clone)]
pub struct PhaseOracle {
    schedule: PhaseSchedule,
}

impl PhaseOracle {
    #[must_use]
    pub fn new(schedule: PhaseSchedule) -> Self {
        Self { schedule }
    }

    #[must_use]
    pub fn schedule(&self) -> &PhaseSchedule {
        &self.schedule
    }

    /// The batch's phase at `now`.
    #[must_use]
    pub fn phase(&self, batch: &Batch, now: DateTime<Utc>) -> Phase {
        self.schedule.phase_at(batch.opened_at, now)
    }

    /// Require the batch to be in `expected` at `now`.
    ///
    /// # Errors
    /// Returns `WrongPhase` if the clock says otherwise.
    pub fn require(&self, batch: &Batch, now: DateTime<Utc>, expected: Phase) -> Result<()> {
        let actual = self.phase(batch, now);
        if actual == expected {
            Ok(())
        } else {
            Err(VeilswapError::WrongPhase { expected, actual })
        }
    }

    /// Whether the batch's REVEAL window has closed at `now`.
    ///
    /// Once true it stays true: unrevealed commitments are slashable from
    /// this point on, settled or not.
    #[must_use]
    pub fn reveal_closed(&self, batch: &Batch, now: DateTime<Utc>) -> bool {
        self.phase(batch, now) == Phase::Settling
    }
}
