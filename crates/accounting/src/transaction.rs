use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use jurnal_core::{Entity, TransactionId, UserId, WorkspaceId};

use crate::draft::Totals;
use crate::entry::EntryLine;

/// Validated content of a transaction, ready for create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalPayload {
    pub description: String,
    pub date: NaiveDate,
    pub entries: Vec<EntryLine>,
}

impl JournalPayload {
    pub fn totals(&self) -> Totals {
        Totals::accumulate(self.entries.iter().map(|e| (e.role, e.amount.as_decimal())))
    }
}

/// A persisted journal transaction.
///
/// Workspace and creator are stamped by the persistence service; only
/// description, date and entries change on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub workspace_id: WorkspaceId,
    pub created_by: UserId,
    pub description: String,
    pub date: NaiveDate,
    pub entries: Vec<EntryLine>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn totals(&self) -> Totals {
        Totals::accumulate(self.entries.iter().map(|e| (e.role, e.amount.as_decimal())))
    }

    pub fn is_balanced(&self) -> bool {
        self.totals().is_balanced()
    }

    /// Full replace of the editable fields.
    pub fn replace(&mut self, payload: JournalPayload) {
        self.description = payload.description;
        self.date = payload.date;
        self.entries = payload.entries;
    }
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jurnal_core::{AccountId, Amount};

    fn transaction(debit: &str, credit: &str) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            workspace_id: WorkspaceId::new(),
            created_by: UserId::new(),
            description: "Sewa gedung".into(),
            date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            entries: vec![
                EntryLine::debit(AccountId::new(), Amount::parse(debit).unwrap()),
                EntryLine::credit(AccountId::new(), Amount::parse(credit).unwrap()),
            ],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn balance_flag_uses_currency_precision() {
        assert!(transaction("100", "100.00").is_balanced());
        assert!(!transaction("100", "99.99").is_balanced());
    }

    #[test]
    fn replace_keeps_identity_and_tenant() {
        let mut tx = transaction("10", "10");
        let (id, workspace) = (tx.id, tx.workspace_id);
        let entries = transaction("25", "25").entries;

        tx.replace(JournalPayload {
            description: "Sewa gedung (revisi)".into(),
            date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            entries: entries.clone(),
        });

        assert_eq!(tx.id, id);
        assert_eq!(tx.workspace_id, workspace);
        assert_eq!(tx.description, "Sewa gedung (revisi)");
        assert_eq!(tx.entries, entries);
    }
}
