//! Batch lifecycle phases for the commit-reveal auction model.
//!
//! Each batch cycles through three non-overlapping phases:
//! **COMMIT → REVEAL → SETTLING**
//!
//! During COMMIT, traders submit hashed order commitments with deposits.
//! During REVEAL, traders disclose the preimage of their commitment.
//! During SETTLING, revealed orders are sequenced and executed against the
//! AMM; unrevealed commitments become slashable.
//!
//! The current phase is a **pure function of elapsed time** since the batch
//! opened. No caller can advance or delay a phase; `advance_phase` merely
//! reconciles stored state with what the clock already dictates.

use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants;

/// The three non-overlapping phases of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Accepting hashed order commitments with deposits.
    Commit,
    /// Accepting preimage reveals for commitments made during COMMIT.
    Reveal,
    /// Sequencing and executing revealed orders; unrevealed deposits slashable.
    Settling,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => write!(f, "COMMIT"),
            Self::Reveal => write!(f, "REVEAL"),
            Self::Settling => write!(f, "SETTLING"),
        }
    }
}

impl Phase {
    /// Return the next phase, or `None` from SETTLING.
    ///
    /// SETTLING has no timed successor: it ends only when the batch is
    /// settled and the next batch opens its own COMMIT phase.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Commit => Some(Self::Reveal),
            Self::Reveal => Some(Self::Settling),
            Self::Settling => None,
        }
    }
}

/// Timing configuration for a batch's COMMIT and REVEAL windows.
///
/// SETTLING is untimed: it lasts until settlement completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSchedule {
    /// Duration of the COMMIT phase.
    pub commit_window: Duration,
    /// Duration of the REVEAL phase.
    pub reveal_window: Duration,
}

impl Default for PhaseSchedule {
    fn default() -> Self {
        Self {
            commit_window: Duration::from_millis(constants::DEFAULT_COMMIT_WINDOW_MS),
            reveal_window: Duration::from_millis(constants::DEFAULT_REVEAL_WINDOW_MS),
        }
    }
}

impl PhaseSchedule {
    /// Phase the batch is in at `now`, given when it opened.
    ///
    /// Window boundaries belong to the **later** phase: at exactly
    /// `opened_at + commit_window` the batch is in REVEAL, and at exactly
    /// `opened_at + commit_window + reveal_window` it is in SETTLING.
    /// A `now` before `opened_at` (clock skew) is treated as COMMIT.
    #[must_use]
    pub fn phase_at(&self, opened_at: DateTime<Utc>, now: DateTime<Utc>) -> Phase {
        let elapsed = match (now - opened_at).to_std() {
            Ok(elapsed) => elapsed,
            Err(_) => return Phase::Commit,
        };
        if elapsed < self.commit_window {
            Phase::Commit
        } else if elapsed < self.commit_window + self.reveal_window {
            Phase::Reveal
        } else {
            Phase::Settling
        }
    }

    /// When the REVEAL window opens.
    #[must_use]
    pub fn reveal_opens_at(&self, opened_at: DateTime<Utc>) -> DateTime<Utc> {
        opened_at + self.commit_window
    }

    /// When the REVEAL window closes and SETTLING begins.
    #[must_use]
    pub fn settling_opens_at(&self, opened_at: DateTime<Utc>) -> DateTime<Utc> {
        opened_at + self.commit_window + self.reveal_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn phase_display() {
        assert_eq!(format!("{}", Phase::Commit), "COMMIT");
        assert_eq!(format!("{}", Phase::Reveal), "REVEAL");
        assert_eq!(format!("{}", Phase::Settling), "SETTLING");
    }

    #[test]
    fn phase_succession() {
        assert_eq!(Phase::Commit.next(), Some(Phase::Reveal));
        assert_eq!(Phase::Reveal.next(), Some(Phase::Settling));
        assert_eq!(Phase::Settling.next(), None);
    }

    #[test]
    fn schedule_default_windows() {
        let schedule = PhaseSchedule::default();
        assert_eq!(schedule.commit_window.as_millis(), 8000);
        assert_eq!(schedule.reveal_window.as_millis(), 2000);
    }

    #[test]
    fn phase_is_pure_function_of_elapsed_time() {
        let schedule = PhaseSchedule::default();
        let opened = t0();
        assert_eq!(schedule.phase_at(opened, opened), Phase::Commit);
        assert_eq!(
            schedule.phase_at(opened, opened + Duration::from_millis(7_999)),
            Phase::Commit
        );
        assert_eq!(
            schedule.phase_at(opened, opened + Duration::from_secs(8)),
            Phase::Reveal
        );
        assert_eq!(
            schedule.phase_at(opened, opened + Duration::from_millis(9_999)),
            Phase::Reveal
        );
        assert_eq!(
            schedule.phase_at(opened, opened + Duration::from_secs(10)),
            Phase::Settling
        );
        assert_eq!(
            schedule.phase_at(opened, opened + Duration::from_secs(3600)),
            Phase::Settling
        );
    }

    #[test]
    fn boundary_belongs_to_later_phase() {
        let schedule = PhaseSchedule::default();
        let opened = t0();
        let reveal_open = schedule.reveal_opens_at(opened);
        assert_eq!(schedule.phase_at(opened, reveal_open), Phase::Reveal);
        let settling_open = schedule.settling_opens_at(opened);
        assert_eq!(schedule.phase_at(opened, settling_open), Phase::Settling);
    }

    #[test]
    fn now_before_open_is_commit() {
        let schedule = PhaseSchedule::default();
        let opened = t0();
        assert_eq!(
            schedule.phase_at(opened, opened - Duration::from_secs(1)),
            Phase::Commit
        );
    }

    #[test]
    fn phase_serde_roundtrip() {
        let phase = Phase::Reveal;
        let json = serde_json::to_string(&phase).unwrap();
        let back: Phase = serde_json::from_str(&json).unwrap();
        assert_eq!(phase, back);
    }
}
