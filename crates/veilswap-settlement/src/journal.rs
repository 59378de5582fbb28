//! Operation journal.
//!
//! Every successful state-mutating operation appends one JSON line:
//! `{seq, at, block, op}`. The journal is the engine's atomic-commit
//! boundary for durability — an operation that returned `Ok` is on disk
//! before the caller sees the result, and recovery replays the file
//! against a fresh engine to rebuild identical state (all ids are
//! deterministic, and each record carries the clock sample it ran
//! under).
//!
//! A crash can leave a torn final line; replay discards it. Corruption
//! anywhere else is refused rather than skipped.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use veilswap_types::{
    AccountId, BatchId, CommitmentId, OrderReveal, PoolId, Result, Token, VeilswapError,
};

use crate::authorization::Role;

/// One state-mutating engine operation, with every input needed to
/// re-run it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum EngineOp {
    /// Always the first record. Anchors the genesis batch's opening
    /// instant, which every later phase derivation keys off.
    EngineInit {
        admin: AccountId,
    },
    Commit {
        caller: AccountId,
        commit_hash: [u8; 32],
        deposit: u128,
    },
    Reveal {
        caller: AccountId,
        commitment_id: CommitmentId,
        order: OrderReveal,
        priority_bid: u128,
        paid_value: u128,
    },
    AdvancePhase {
        caller: AccountId,
    },
    SlashUnrevealed {
        caller: AccountId,
        commitment_id: CommitmentId,
    },
    ExecuteBatchSwap {
        caller: AccountId,
        pool_id: PoolId,
        batch_id: BatchId,
    },
    SettleBatch {
        caller: AccountId,
        batch_id: BatchId,
    },
    CreatePool {
        caller: AccountId,
        token_a: Token,
        token_b: Token,
        amount_a: u128,
        amount_b: u128,
        fee_rate_bps: Option<u32>,
    },
    AddLiquidity {
        caller: AccountId,
        pool_id: PoolId,
        amount0: u128,
        amount1: u128,
    },
    RemoveLiquidity {
        caller: AccountId,
        pool_id: PoolId,
        shares: u128,
    },
    Swap {
        caller: AccountId,
        token_in: Token,
        token_out: Token,
        amount_in: u128,
        min_amount_out: u128,
    },
    RecordExternalDeposit {
        pool_id: PoolId,
        token: Token,
        amount: u128,
    },
    SyncReserves {
        caller: AccountId,
        pool_id: PoolId,
    },
    CollectFees {
        caller: AccountId,
        token: Token,
    },
    ForwardProceeds {
        caller: AccountId,
    },
    ClaimNative {
        caller: AccountId,
    },
    ClaimToken {
        caller: AccountId,
        token: Token,
    },
    SetFlashLoanProtection {
        caller: AccountId,
        enabled: bool,
    },
    SetTwapValidation {
        caller: AccountId,
        enabled: bool,
    },
    SetPoolMaxTradeSize {
        caller: AccountId,
        pool_id: PoolId,
        max_bps: u32,
    },
    SetProtocolFeeShare {
        caller: AccountId,
        share_bps: u32,
    },
    GrantRole {
        caller: AccountId,
        account: AccountId,
        role: Role,
    },
    RevokeRole {
        caller: AccountId,
        account: AccountId,
        role: Role,
    },
}

/// One journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Monotonic sequence number, 1-based, gap-free.
    pub seq: u64,
    /// Wall-clock sample the operation ran under.
    pub at: DateTime<Utc>,
    /// Block sample the operation ran under.
    pub block: u64,
    pub op: EngineOp,
}

/// Append-only JSONL journal.
pub struct Journal {
    path: PathBuf,
    file: File,
    next_seq: u64,
}

impl Journal {
    /// Open (or create) the journal at `path`, positioned after the last
    /// intact record.
    ///
    /// # Errors
    /// I/O failures, or `Serialization` if the file is corrupt beyond a
    /// torn tail.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let next_seq = match Self::replay(&path) {
            Ok(records) => records.last().map_or(1, |r| r.seq + 1),
            Err(VeilswapError::Io(_)) => 1,
            Err(other) => return Err(other),
        };
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file,
            next_seq,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next sequence number to be assigned.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Append one record and sync it to disk.
    ///
    /// # Errors
    /// `Serialization` or I/O failures. On error nothing is considered
    /// committed; callers must propagate the failure.
    pub fn append(&mut self, at: DateTime<Utc>, block: u64, op: EngineOp) -> Result<u64> {
        let record = JournalRecord {
            seq: self.next_seq,
            at,
            block,
            op,
        };
        let line = serde_json::to_string(&record)?;
        writeln!(self.file, "{line}")?;
        self.file.sync_data()?;
        self.next_seq += 1;
        debug!(seq = record.seq, "Journal record appended");
        Ok(record.seq)
    }

    /// Read every intact record from `path`, in order.
    ///
    /// A torn final line (crash mid-append) is discarded with a warning.
    /// A malformed line anywhere earlier fails the whole read: that is
    /// corruption, not a crash artifact.
    ///
    /// # Errors
    /// I/O failures, or `Serialization` on mid-file corruption.
    pub fn replay(path: impl AsRef<Path>) -> Result<Vec<JournalRecord>> {
        let file = File::open(path.as_ref())?;
        let lines: Vec<String> = BufReader::new(file)
            .lines()
            .collect::<std::io::Result<_>>()?;

        let mut records = Vec::with_capacity(lines.len());
        let last_index = lines.len().saturating_sub(1);
        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalRecord>(line) {
                Ok(record) => records.push(record),
                Err(err) if index == last_index => {
                    warn!(line = index + 1, %err, "Discarding torn journal tail");
                    break;
                }
                Err(err) => {
                    return Err(VeilswapError::Serialization(format!(
                        "journal corrupt at line {}: {err}",
                        index + 1
                    )));
                }
            }
        }
        Ok(records)
    }
}
