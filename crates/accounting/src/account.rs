use core::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use jurnal_core::{AccountId, DomainError, DomainResult, Entity, WorkspaceId};

use crate::entry::EntryRole;

/// High-level account kind (determines the customary normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountKind {
    pub const ALL: [AccountKind; 5] = [
        AccountKind::Asset,
        AccountKind::Liability,
        AccountKind::Equity,
        AccountKind::Revenue,
        AccountKind::Expense,
    ];

    /// The side on which accounts of this kind customarily increase.
    pub fn normal_balance(self) -> EntryRole {
        match self {
            AccountKind::Asset | AccountKind::Expense => EntryRole::Debit,
            AccountKind::Liability | AccountKind::Equity | AccountKind::Revenue => {
                EntryRole::Credit
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Asset => "asset",
            AccountKind::Liability => "liability",
            AccountKind::Equity => "equity",
            AccountKind::Revenue => "revenue",
            AccountKind::Expense => "expense",
        }
    }
}

impl core::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asset" => Ok(AccountKind::Asset),
            "liability" => Ok(AccountKind::Liability),
            "equity" => Ok(AccountKind::Equity),
            "revenue" => Ok(AccountKind::Revenue),
            "expense" => Ok(AccountKind::Expense),
            _ => Err(DomainError::validation(
                "kind must be one of: asset, liability, equity, revenue, expense",
            )),
        }
    }
}

/// An account in a workspace's chart of accounts.
///
/// Owned by the persistence service; the journal only holds references to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub kind: AccountKind,
    pub normal_balance: EntryRole,
    /// Parent in the account hierarchy, if any. Ordering is the backend's job.
    pub parent_id: Option<AccountId>,
}

impl Account {
    /// Amount signed so that this account's normal side is positive.
    pub fn signed(&self, role: EntryRole, amount: &BigDecimal) -> BigDecimal {
        if role == self.normal_balance {
            amount.clone()
        } else {
            -amount.clone()
        }
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Request to add an account to a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub kind: AccountKind,
    pub normal_balance: EntryRole,
    pub parent_id: Option<AccountId>,
}

impl NewAccount {
    pub fn new(
        name: &str,
        kind: AccountKind,
        normal_balance: EntryRole,
        parent_id: Option<AccountId>,
    ) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("account name is required"));
        }

        Ok(Self {
            name: name.to_string(),
            kind,
            normal_balance,
            parent_id,
        })
    }
}
