//! # veilswap-types
//!
//! Shared types, errors, and configuration for the **VeilSwap**
//! commit-reveal batch auction engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`BatchId`], [`CommitmentId`], [`PoolId`], [`TokenPair`]
//! - **Commitment model**: [`Commitment`], [`CommitmentStatus`], [`OrderReveal`], [`compute_commit_hash`]
//! - **Batch model**: [`Batch`], [`RevealedOrder`], [`OrderOutcome`], [`OrderFill`], [`SkipReason`], [`BatchSwapResult`], [`SettlementReport`]
//! - **Phase model**: [`Phase`], [`PhaseSchedule`]
//! - **Time**: [`Clock`], [`ClockSample`]
//! - **Configuration**: [`EngineConfig`], [`AuctionConfig`], [`FeeConfig`], [`GuardConfig`]
//! - **Errors**: [`VeilswapError`] with `VS_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod batch;
pub mod clock;
pub mod commitment;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod phase;

// Re-export all primary types at crate root for ergonomic imports:
//   use veilswap_types::{Commitment, Phase, Batch, VeilswapError, ...};

pub use batch::*;
pub use clock::*;
pub use commitment::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use phase::*;

// Constants are accessed via `veilswap_types::constants::FOO`
// (not re-exported to avoid name collisions).
