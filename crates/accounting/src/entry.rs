use core::str::FromStr;

use serde::{Deserialize, Serialize};

use jurnal_core::{AccountId, Amount, DomainError};

/// Which side of the journal a line posts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryRole {
    Debit,
    Credit,
}

impl EntryRole {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryRole::Debit => "debit",
            EntryRole::Credit => "credit",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            EntryRole::Debit => EntryRole::Credit,
            EntryRole::Credit => EntryRole::Debit,
        }
    }
}

impl core::fmt::Display for EntryRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debit" => Ok(EntryRole::Debit),
            "credit" => Ok(EntryRole::Credit),
            _ => Err(DomainError::validation("side must be one of: debit, credit")),
        }
    }
}

/// One side of a journal transaction, in the shape sent to the persistence
/// service: `{accountId, amount, role}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryLine {
    pub account_id: AccountId,
    pub amount: Amount,
    pub role: EntryRole,
}

impl EntryLine {
    pub fn debit(account_id: AccountId, amount: Amount) -> Self {
        Self {
            account_id,
            amount,
            role: EntryRole::Debit,
        }
    }

    pub fn credit(account_id: AccountId, amount: Amount) -> Self {
        Self {
            account_id,
            amount,
            role: EntryRole::Credit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_the_persistence_shape() {
        let account_id = AccountId::new();
        let line = EntryLine::debit(account_id, Amount::parse("8000000").unwrap());

        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["accountId"], account_id.to_string());
        assert_eq!(json["role"], "debit");
        assert_eq!(json["amount"], "8000000.00");
    }
}
