//! Treasury boundary.
//!
//! Collected protocol fees, the treasury half of slashed deposits, and
//! priority-bid proceeds all leave the engine through one pathway: an
//! authorized call that pushes value into a [`FeeSink`]. The engine
//! never decides how sunk value is spent; that responsibility ends at
//! this trait.

use std::collections::BTreeMap;

use tracing::info;
use veilswap_types::Token;

/// Receiving end of every protocol-revenue transfer.
pub trait FeeSink {
    /// Accept `amount` units of `token`.
    fn receive(&mut self, token: &str, amount: u128);

    /// Total received in `token` so far.
    fn received(&self, token: &str) -> u128;
}

/// Recording sink used in deployments without an external treasury and
/// throughout the test suite.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTreasury {
    received: BTreeMap<Token, u128>,
}

impl InMemoryTreasury {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens with a non-zero received total, in token order.
    pub fn holdings(&self) -> impl Iterator<Item = (&str, u128)> {
        self.received
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(token, amount)| (token.as_str(), *amount))
    }
}

impl FeeSink for InMemoryTreasury {
    fn receive(&mut self, token: &str, amount: u128) {
        if amount == 0 {
            return;
        }
        *self.received.entry(token.to_string()).or_insert(0) += amount;
        info!(token, amount, "Treasury received");
    }

    fn received(&self, token: &str) -> u128 {
        self.received.get(token).copied().unwrap_or(0)
    }
}
