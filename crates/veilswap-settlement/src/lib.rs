//! # veilswap-settlement
//!
//! **The assembled VeilSwap engine: batch execution, payouts, treasury
//! forwarding, authorization, and the operation journal.**
//!
//! The auction plane collects sealed orders; the AMM plane prices them.
//! This crate is where the two meet:
//!
//! - **[`AuctionEngine`]** drives the full lifecycle: commit, reveal,
//!   sequence, execute, settle, roll the next batch open
//! - **The executor** runs a batch's orders against a staged pool copy,
//!   so a guard rejection aborts a pass without leaving partial fills
//! - **[`PayoutLedger`]** holds fills, refunds, and slash shares until
//!   their owners claim them
//! - **[`FeeSink`]** is the one exit for protocol revenue
//! - **[`Journal`]** records every mutating operation so a crashed
//!   engine rebuilds its exact state by replay
//!
//! Role checks sit at the engine boundary: settlement entry points
//! require SETTLER, parameter and treasury surfaces require ADMIN, and
//! everything a trader or keeper does is permissionless.

pub mod authorization;
pub mod engine;
pub mod executor;
pub mod journal;
pub mod payouts;
pub mod treasury;

pub use authorization::{AuthTable, Role};
pub use engine::AuctionEngine;
pub use executor::{ExecutionPass, execute_pool_orders};
pub use journal::{EngineOp, Journal, JournalRecord};
pub use payouts::PayoutLedger;
pub use treasury::{FeeSink, InMemoryTreasury};
