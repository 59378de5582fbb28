//! Caller authorization.
//!
//! There are no signatures anywhere in the engine; every operation takes
//! an explicit caller identity and this table decides what that identity
//! may do. Two capabilities exist: ADMIN (parameter changes, fee
//! collection, role grants) and SETTLER (driving batch settlement).
//! Admins hold both.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;
use veilswap_types::{AccountId, Result, VeilswapError};

/// A grantable capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Settler,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Settler => write!(f, "SETTLER"),
        }
    }
}

/// The capability table every mutating operation is checked against.
///
/// Seeded with one root admin at engine construction; all later grants
/// flow through admin-gated calls, so the table can never lock itself
/// out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTable {
    admins: BTreeSet<AccountId>,
    settlers: BTreeSet<AccountId>,
}

impl AuthTable {
    /// Table with `root` as the only admin.
    #[must_use]
    pub fn new(root: AccountId) -> Self {
        let mut admins = BTreeSet::new();
        admins.insert(root);
        Self {
            admins,
            settlers: BTreeSet::new(),
        }
    }

    /// Grant `role` to `account`. Idempotent.
    pub fn grant(&mut self, account: AccountId, role: Role) {
        let inserted = match role {
            Role::Admin => self.admins.insert(account),
            Role::Settler => self.settlers.insert(account),
        };
        if inserted {
            info!(account = %account, role = %role, "Role granted");
        }
    }

    /// Revoke `role` from `account`. The last admin cannot be revoked.
    ///
    /// # Errors
    /// `NotAuthorized` when the revocation would leave zero admins.
    pub fn revoke(&mut self, account: AccountId, role: Role) -> Result<()> {
        match role {
            Role::Admin => {
                if self.admins.contains(&account) && self.admins.len() == 1 {
                    return Err(VeilswapError::NotAuthorized {
                        account,
                        action: "revoke the last admin".into(),
                    });
                }
                self.admins.remove(&account);
            }
            Role::Settler => {
                self.settlers.remove(&account);
            }
        }
        info!(account = %account, role = %role, "Role revoked");
        Ok(())
    }

    #[must_use]
    pub fn is_admin(&self, account: &AccountId) -> bool {
        self.admins.contains(account)
    }

    /// Settler capability. Admins settle too.
    #[must_use]
    pub fn is_settler(&self, account: &AccountId) -> bool {
        self.settlers.contains(account) || self.admins.contains(account)
    }

    /// Gate an admin-only operation.
    ///
    /// # Errors
    /// `NotAuthorized` naming the attempted action.
    pub fn require_admin(&self, account: AccountId, action: &str) -> Result<()> {
        if self.is_admin(&account) {
            Ok(())
        } else {
            Err(VeilswapError::NotAuthorized {
                account,
                action: action.to_string(),
            })
        }
    }

    /// Gate a settler-only operation.
    ///
    /// # Errors
    /// `NotAuthorized` naming the attempted action.
    pub fn require_settler(&self, account: AccountId, action: &str) -> Result<()> {
        if self.is_settler(&account) {
            Ok(())
        } else {
            Err(VeilswapError::NotAuthorized {
                account,
                action: action.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_admin_holds_both_capabilities() {
        let root = AccountId::new();
        let table = AuthTable::new(root);
        assert!(table.is_admin(&root));
        assert!(table.is_settler(&root));
        assert!(table.require_admin(root, "configure").is_ok());
        assert!(table.require_settler(root, "settle").is_ok());
    }

    #[test]
    fn strangers_are_rejected_with_the_action_named() {
        let table = AuthTable::new(AccountId::new());
        let stranger = AccountId::new();

        let err = table.require_admin(stranger, "collect fees").unwrap_err();
        assert_eq!(
            err,
            VeilswapError::NotAuthorized {
                account: stranger,
                action: "collect fees".into(),
            }
        );
        assert!(table.require_settler(stranger, "settle batch").is_err());
    }

    #[test]
    fn settler_grant_does_not_confer_admin() {
        let root = AccountId::new();
        let mut table = AuthTable::new(root);
        let keeper = AccountId::new();

        table.grant(keeper, Role::Settler);
        assert!(table.is_settler(&keeper));
        assert!(!table.is_admin(&keeper));
        assert!(table.require_settler(keeper, "settle").is_ok());
        assert!(table.require_admin(keeper, "configure").is_err());
    }

    #[test]
    fn revoke_removes_capability() {
        let root = AccountId::new();
        let mut table = AuthTable::new(root);
        let keeper = AccountId::new();

        table.grant(keeper, Role::Settler);
        table.revoke(keeper, Role::Settler).unwrap();
        assert!(!table.is_settler(&keeper));
    }

    #[test]
    fn last_admin_cannot_be_revoked() {
        let root = AccountId::new();
        let mut table = AuthTable::new(root);

        let err = table.revoke(root, Role::Admin).unwrap_err();
        assert!(matches!(err, VeilswapError::NotAuthorized { .. }));
        assert!(table.is_admin(&root));

        // With a second admin in place the original becomes revocable.
        let second = AccountId::new();
        table.grant(second, Role::Admin);
        table.revoke(root, Role::Admin).unwrap();
        assert!(!table.is_admin(&root));
        assert!(table.is_admin(&second));
    }

    #[test]
    fn grants_are_idempotent() {
        let root = AccountId::new();
        let mut table = AuthTable::new(root);
        table.grant(root, Role::Admin);
        table.grant(root, Role::Admin);
        assert!(table.is_admin(&root));
    }
}
