//! # veilswap-amm
//!
//! **Constant-product settlement plane for VeilSwap.**
//!
//! Holds the liquidity pools that batch settlement executes against, and
//! the direct trading surface between auctions. It has:
//!
//! - **`x * y = k` pricing** with basis-point fees split between
//!   liquidity providers and a protocol fee pot
//! - **A custody ledger** per pool, reconciled against reserves so
//!   unaccounted transfers are caught
//! - **A TWAP oracle** per pool, fed before every reserve mutation
//! - **Fail-closed guards**: trade-size cap, donation detection,
//!   same-block blocking, and TWAP deviation checks run before any state
//!   is touched

pub mod guards;
pub mod manager;
pub mod math;
pub mod pool;
pub mod twap;

pub use manager::{PoolManager, SwapReceipt};
pub use pool::{Pool, PoolInfo, SwapPlan};
pub use twap::{Observation, TwapOracle};
