//! # veilswap-auction
//!
//! **Auction plane**: the commit-reveal state machine that feeds
//! settlement.
//!
//! ## Architecture
//!
//! 1. **PhaseOracle**: derives COMMIT/REVEAL/SETTLING purely from elapsed
//!    time — no timers, no stored countdowns
//! 2. **CommitmentStore**: holds sealed orders and their deposits
//! 3. **RevealValidator**: verifies preimages, applies the 50/50 slash to
//!    mismatches and timeouts
//! 4. **OrderSequencer**: fixes one execution order per batch — priority
//!    bids first, seeded shuffle for ties
//! 5. **BatchManager**: one open batch at a time, gap-free ids
//!
//! ## Order Flow
//!
//! ```text
//! commit(hash, deposit) → [time] → reveal(fields, secret, bid)
//!     → OrderSequencer.sequence() → execution order → settlement
//! ```
//!
//! During COMMIT nothing but an opaque hash exists anywhere, so there is
//! no order flow to front-run.

pub mod batches;
pub mod commitments;
pub mod phase_oracle;
pub mod reveal;
pub mod sequencer;

pub use batches::BatchManager;
pub use commitments::CommitmentStore;
pub use phase_oracle::PhaseOracle;
pub use reveal::{RevealOutcome, RevealValidator, SlashReceipt};
pub use sequencer::OrderSequencer;
