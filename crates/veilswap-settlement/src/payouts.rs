//! Payout ledger.
//!
//! Everything the engine owes back to participants accumulates here:
//! deposit refunds and priority-bid change at reveal, the trader half of
//! slashed deposits, swap proceeds for filled orders, and input refunds
//! for skipped ones. Native value (deposits, bids) and token amounts are
//! tracked separately because they live in different custody.
//!
//! The ledger only ever grows within one settlement pass; an external
//! disbursement process drains it through [`PayoutLedger::drain_native`]
//! and [`PayoutLedger::drain_token`].

use std::collections::HashMap;

use veilswap_types::{AccountId, Result, Token, VeilswapError};

/// Per-account credits awaiting disbursement.
#[derive(Debug, Clone, Default)]
pub struct PayoutLedger {
    /// Native-value credits: deposit refunds, bid change, slash refunds.
    native: HashMap<AccountId, u128>,
    /// Token credits from settlement: fills and skip refunds.
    tokens: HashMap<(AccountId, Token), u128>,
}

impl PayoutLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit native value to `account`.
    ///
    /// # Errors
    /// `MathOverflow` if the account's balance would exceed `u128`.
    pub fn credit_native(&mut self, account: AccountId, amount: u128) -> Result<()> {
        let entry = self.native.entry(account).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(VeilswapError::MathOverflow {
                context: "native payout credit",
            })?;
        Ok(())
    }

    /// Credit `amount` of `token` to `account`.
    ///
    /// # Errors
    /// `MathOverflow` if the account's balance would exceed `u128`.
    pub fn credit_token(&mut self, account: AccountId, token: &str, amount: u128) -> Result<()> {
        let entry = self
            .tokens
            .entry((account, token.to_string()))
            .or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(VeilswapError::MathOverflow {
                context: "token payout credit",
            })?;
        Ok(())
    }

    /// Native value currently owed to `account`.
    #[must_use]
    pub fn native_owed(&self, account: &AccountId) -> u128 {
        self.native.get(account).copied().unwrap_or(0)
    }

    /// Units of `token` currently owed to `account`.
    #[must_use]
    pub fn token_owed(&self, account: &AccountId, token: &str) -> u128 {
        self.tokens
            .get(&(*account, token.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Take the full native credit for `account`, zeroing it.
    pub fn drain_native(&mut self, account: &AccountId) -> u128 {
        self.native.remove(account).unwrap_or(0)
    }

    /// Take the full `token` credit for `account`, zeroing it.
    pub fn drain_token(&mut self, account: &AccountId, token: &str) -> u128 {
        self.tokens.remove(&(*account, token.to_string())).unwrap_or(0)
    }

    /// Sum of all native credits outstanding.
    #[must_use]
    pub fn total_native_owed(&self) -> u128 {
        self.native.values().sum()
    }

    /// Sum of all credits outstanding in `token`.
    #[must_use]
    pub fn total_token_owed(&self, token: &str) -> u128 {
        self.tokens
            .iter()
            .filter(|((_, t), _)| t == token)
            .map(|(_, amount)| amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_accumulate_per_account() {
        let mut ledger = PayoutLedger::new();
        let alice = AccountId::new();
        let bob = AccountId::new();

        ledger.credit_native(alice, 100).unwrap();
        ledger.credit_native(alice, 50).unwrap();
        ledger.credit_native(bob, 7).unwrap();

        assert_eq!(ledger.native_owed(&alice), 150);
        assert_eq!(ledger.native_owed(&bob), 7);
        assert_eq!(ledger.total_native_owed(), 157);
    }

    #[test]
    fn token_credits_are_keyed_by_account_and_token() {
        let mut ledger = PayoutLedger::new();
        let alice = AccountId::new();

        ledger.credit_token(alice, "ETH", 3).unwrap();
        ledger.credit_token(alice, "USDC", 6_000).unwrap();
        ledger.credit_token(alice, "ETH", 2).unwrap();

        assert_eq!(ledger.token_owed(&alice, "ETH"), 5);
        assert_eq!(ledger.token_owed(&alice, "USDC"), 6_000);
        assert_eq!(ledger.token_owed(&alice, "DAI"), 0);
        assert_eq!(ledger.total_token_owed("ETH"), 5);
    }

    #[test]
    fn drain_zeroes_the_credit() {
        let mut ledger = PayoutLedger::new();
        let alice = AccountId::new();

        ledger.credit_native(alice, 42).unwrap();
        ledger.credit_token(alice, "USDC", 9).unwrap();

        assert_eq!(ledger.drain_native(&alice), 42);
        assert_eq!(ledger.native_owed(&alice), 0);
        assert_eq!(ledger.drain_native(&alice), 0);

        assert_eq!(ledger.drain_token(&alice, "USDC"), 9);
        assert_eq!(ledger.token_owed(&alice, "USDC"), 0);
    }

    #[test]
    fn credit_overflow_is_an_error() {
        let mut ledger = PayoutLedger::new();
        let alice = AccountId::new();

        ledger.credit_native(alice, u128::MAX).unwrap();
        let err = ledger.credit_native(alice, 1).unwrap_err();
        assert!(matches!(err, VeilswapError::MathOverflow { .. }));
        // Balance retains the pre-overflow value.
        assert_eq!(ledger.native_owed(&alice), u128::MAX);
    }
}
