//! Identifiers used throughout VeilSwap.
//!
//! `AccountId` uses UUIDv7 for time-ordered sorting. `CommitmentId` and
//! `PoolId` are **deterministic** UUIDs derived from domain-separated
//! SHA-256, so journal replay after a crash reproduces identical ids.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token symbol (e.g., "ETH", "USDC").
pub type Token = String;

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Identity of a caller: trader, liquidity provider, settler, or admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// BatchId
// ---------------------------------------------------------------------------

/// Monotonically increasing identifier for an auction batch.
///
/// Each batch runs: COMMIT → REVEAL → SETTLING. Ids are gap-free: a new
/// batch is only opened once the previous one is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl BatchId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CommitmentId
// ---------------------------------------------------------------------------

/// Unique identifier for an order commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CommitmentId(pub Uuid);

impl CommitmentId {
    /// Deterministic `CommitmentId` from batch id and intra-batch sequence.
    ///
    /// Replaying a journal reproduces the **exact same** id for the same
    /// commitment, which keeps every cross-reference stable across recovery.
    #[must_use]
    pub fn deterministic(batch_id: u64, sequence: u64) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"veilswap:commitment:v1:");
        hasher.update(batch_id.to_le_bytes());
        hasher.update(sequence.to_le_bytes());
        let hash = hasher.finalize();
        let bytes: [u8; 16] = hash[..16].try_into().expect("SHA-256 produces 32 bytes");
        Self(Uuid::from_bytes(bytes))
    }
}

impl fmt::Display for CommitmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TokenPair
// ---------------------------------------------------------------------------

/// A pool's token pair in canonical order (`token0 < token1` lexicographically).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TokenPair {
    pub token0: Token,
    pub token1: Token,
}

impl TokenPair {
    /// Build the canonical pair for two tokens, in either order.
    #[must_use]
    pub fn canonical(a: impl Into<Token>, b: impl Into<Token>) -> Self {
        let a = a.into();
        let b = b.into();
        if a <= b {
            Self { token0: a, token1: b }
        } else {
            Self { token0: b, token1: a }
        }
    }

    /// Whether `token` is one of the pair's two sides.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.token0 == token || self.token1 == token
    }

    #[must_use]
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.token0, self.token1)
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token0, self.token1)
    }
}

// ---------------------------------------------------------------------------
// PoolId
// ---------------------------------------------------------------------------

/// Unique identifier for a liquidity pool.
///
/// Derived deterministically from the canonical token pair: one pair, one
/// pool, and any holder of the pair can recompute the id locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PoolId(pub Uuid);

impl PoolId {
    #[must_use]
    pub fn for_pair(pair: &TokenPair) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"veilswap:pool_id:v1:");
        hasher.update((pair.token0.len() as u64).to_le_bytes());
        hasher.update(pair.token0.as_bytes());
        hasher.update((pair.token1.len() as u64).to_le_bytes());
        hasher.update(pair.token1.as_bytes());
        let hash = hasher.finalize();
        let bytes: [u8; 16] = hash[..16].try_into().expect("SHA-256 produces 32 bytes");
        Self(Uuid::from_bytes(bytes))
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
