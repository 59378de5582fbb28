//! Order commitments for the commit-reveal auction.
//!
//! During COMMIT a trader submits only `SHA-256(order ‖ secret)` plus a
//! deposit and an optional priority bid. The order itself stays private
//! until REVEAL, so searchers cannot front-run or sandwich what they
//! cannot see. Deposits make reveal economically binding: an unrevealed
//! or mismatched commitment is slashed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants;
use crate::ids::{AccountId, BatchId, CommitmentId, Token};

/// Domain separator for commitment hashes.
const COMMIT_DOMAIN: &[u8] = b"veilswap:commit:v1:";

/// Lifecycle status of a commitment.
///
/// Transitions are one-way: PENDING → {REVEALED | SLASHED}, then
/// REVEALED → EXECUTED once settlement consumes the order (filled or
/// skipped — either way it is consumed exactly once).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitmentStatus {
    /// Committed, awaiting reveal.
    Pending,
    /// Preimage disclosed and verified; deposit refunded in full.
    Revealed,
    /// Mismatched reveal or reveal timeout; deposit split between
    /// treasury and trader.
    Slashed,
    /// Consumed by settlement.
    Executed,
}

impl std::fmt::Display for CommitmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Revealed => write!(f, "REVEALED"),
            Self::Slashed => write!(f, "SLASHED"),
            Self::Executed => write!(f, "EXECUTED"),
        }
    }
}

/// The plaintext order a trader discloses during REVEAL.
///
/// `secret` is 32 bytes of trader-chosen entropy. It blinds the commitment
/// hash against dictionary attacks over plausible order shapes, and after
/// reveal it feeds the batch shuffle seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReveal {
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: u128,
    pub min_amount_out: u128,
    pub secret: [u8; 32],
}

impl OrderReveal {
    /// The commitment hash this reveal must match, bound to `trader`.
    ///
    /// Binding the trader identity into the hash stops a mempool observer
    /// from replaying someone else's commitment as their own.
    #[must_use]
    pub fn commitment_hash(&self, trader: AccountId) -> [u8; 32] {
        compute_commit_hash(trader, self)
    }
}

/// SHA-256 commitment hash over the trader identity and the full order.
///
/// Layout: domain separator, then the trader id, then each order field.
/// Strings are length-prefixed (u64 LE) so adjacent fields cannot be
/// reinterpreted across boundaries; integers are fixed-width LE.
#[must_use]
pub fn compute_commit_hash(trader: AccountId, reveal: &OrderReveal) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(COMMIT_DOMAIN);
    hasher.update(trader.0.as_bytes());
    hasher.update((reveal.token_in.len() as u64).to_le_bytes());
    hasher.update(reveal.token_in.as_bytes());
    hasher.update((reveal.token_out.len() as u64).to_le_bytes());
    hasher.update(reveal.token_out.as_bytes());
    hasher.update(reveal.amount_in.to_le_bytes());
    hasher.update(reveal.min_amount_out.to_le_bytes());
    hasher.update(reveal.secret);
    hasher.finalize().into()
}

/// Split a slashed deposit into (treasury cut, trader refund) at
/// `slash_rate_bps`.
///
/// The two parts always sum to the deposit exactly; rounding dust from
/// the bps division stays with the trader. Split into quotient and
/// remainder so the cut is exact for deposits near `u128::MAX`.
#[must_use]
pub fn slash_split(deposit: u128, slash_rate_bps: u32) -> (u128, u128) {
    let rate = u128::from(slash_rate_bps.min(constants::BPS_DENOMINATOR as u32));
    let quotient = deposit / constants::BPS_DENOMINATOR;
    let remainder = deposit % constants::BPS_DENOMINATOR;
    let cut = quotient * rate + (remainder * rate) / constants::BPS_DENOMINATOR;
    (cut, deposit - cut)
}

/// A trader's sealed order inside one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
    pub id: CommitmentId,
    pub batch_id: BatchId,
    pub trader: AccountId,
    /// SHA-256 hash binding the trader to an order they have not yet shown.
    pub commit_hash: [u8; 32],
    /// Deposit held until reveal; slashed on mismatch or timeout.
    pub deposit: u128,
    /// Bid for earlier execution, declared and paid at reveal time.
    /// Zero until revealed; zero bids are valid.
    pub priority_bid: u128,
    pub status: CommitmentStatus,
    /// Position in the batch's arrival order. Feeds deterministic ids and
    /// keeps the shuffle input stable across journal replay.
    pub sequence: u64,
    pub committed_at: DateTime<Utc>,
    /// Present once the commitment is revealed and verified.
    pub reveal: Option<OrderReveal>,
}

impl Commitment {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == CommitmentStatus::Pending
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.status == CommitmentStatus::Revealed
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl OrderReveal {
    pub fn dummy_swap(token_in: &str, token_out: &str, amount_in: u128, min_amount_out: u128) -> Self {
        Self {
            token_in: token_in.into(),
            token_out: token_out.into(),
            amount_in,
            min_amount_out,
            secret: [0x42; 32],
        }
    }

    pub fn with_secret(mut self, secret: [u8; 32]) -> Self {
        self.secret = secret;
        self
    }
}
