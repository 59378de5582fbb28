//! Time source for the auction engine.
//!
//! Phase transitions are a pure function of elapsed time, so time itself
//! must be injectable: the engine samples its `Clock` exactly once at the
//! top of each state-mutating call, and tests drive a `Manual` clock
//! forward deterministically. The clock is a trusted, monotonic input;
//! nothing in the engine ever sleeps or schedules against it.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;

/// A sample of the clock taken at the top of one engine call.
///
/// Every decision inside that call (phase, guard windows, TWAP writes)
/// uses this single sample, never a fresh read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSample {
    pub now: DateTime<Utc>,
    pub block: u64,
}

/// Wall-clock or test-controlled time source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clock {
    /// Real time. The block number is derived from the Unix timestamp at
    /// the default block cadence, giving the flash-loan guard a stable
    /// notion of "same block" without a chain attached.
    System,
    /// Test-controlled time. Only moves when explicitly advanced.
    Manual { now: DateTime<Utc>, block: u64 },
}

impl Clock {
    /// A manual clock starting at `start`, block 0.
    #[must_use]
    pub fn manual(start: DateTime<Utc>) -> Self {
        Self::Manual { now: start, block: 0 }
    }

    /// Take one sample for the duration of an engine call.
    #[must_use]
    pub fn sample(&self) -> ClockSample {
        match self {
            Self::System => {
                let now = Utc::now();
                let millis = now.timestamp_millis().max(0) as u64;
                ClockSample {
                    now,
                    block: millis / constants::DEFAULT_BLOCK_TIME_MS,
                }
            }
            Self::Manual { now, block } => ClockSample { now: *now, block: *block },
        }
    }

    /// Advance a manual clock; no-op on the system clock.
    ///
    /// Time only moves forward. Block numbers are advanced separately via
    /// [`Clock::advance_blocks`], so tests control each independently.
    pub fn advance(&mut self, by: Duration) {
        if let Self::Manual { now, .. } = self {
            *now += ChronoDuration::from_std(by).unwrap_or(ChronoDuration::zero());
        }
    }

    /// Advance a manual clock's block counter; no-op on the system clock.
    pub fn advance_blocks(&mut self, count: u64) {
        if let Self::Manual { block, .. } = self {
            *block += count;
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::System
    }
}
