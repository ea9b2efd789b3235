//! Journal Draft: the editable, not-yet-validated shape of a transaction.
//!
//! A draft holds raw user text (amounts are strings until validation) so that
//! partially filled forms can be represented faithfully. Mutation is
//! synchronous and local; nothing here talks to a backend.

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use jurnal_core::{AccountId, Amount, TransactionId, round_currency};

use crate::entry::EntryRole;
use crate::transaction::Transaction;

/// A draft never drops below this many lines.
pub const MIN_LINES: usize = 2;

/// One editable entry line.
///
/// A line carries a single amount and the side it was typed on, so a debit
/// and a credit can never coexist on the same line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLine {
    pub account: Option<AccountId>,
    pub amount: String,
    pub role: Option<EntryRole>,
}

impl DraftLine {
    pub fn debit(account: AccountId, amount: impl Into<String>) -> Self {
        Self {
            account: Some(account),
            amount: amount.into(),
            role: Some(EntryRole::Debit),
        }
    }

    pub fn credit(account: AccountId, amount: impl Into<String>) -> Self {
        Self {
            account: Some(account),
            amount: amount.into(),
            role: Some(EntryRole::Credit),
        }
    }

    /// Text shown in the debit column.
    pub fn debit_text(&self) -> &str {
        self.text_for(EntryRole::Debit)
    }

    /// Text shown in the credit column.
    pub fn credit_text(&self) -> &str {
        self.text_for(EntryRole::Credit)
    }

    fn text_for(&self, role: EntryRole) -> &str {
        if self.role == Some(role) {
            &self.amount
        } else {
            ""
        }
    }

    /// Both an account and an amount have been entered.
    pub fn is_specified(&self) -> bool {
        self.account.is_some() && self.role.is_some() && !self.amount.trim().is_empty()
    }

    /// Role and amount of a line that counts towards totals, if any.
    fn countable(&self) -> Option<(EntryRole, BigDecimal)> {
        self.account?;
        let role = self.role?;
        let amount = Amount::parse(&self.amount).ok()?;
        Some((role, amount.into_decimal()))
    }
}

/// A single field change on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEdit {
    Account(Option<AccountId>),
    Debit(String),
    Credit(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("line {0} does not exist")]
    NoSuchLine(usize),
}

/// Running debit/credit totals of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub debit: BigDecimal,
    pub credit: BigDecimal,
}

impl Totals {
    pub(crate) fn accumulate<'a>(lines: impl IntoIterator<Item = (EntryRole, &'a BigDecimal)>) -> Self {
        let mut debit = BigDecimal::zero();
        let mut credit = BigDecimal::zero();
        for (role, amount) in lines {
            match role {
                EntryRole::Debit => debit += amount,
                EntryRole::Credit => credit += amount,
            }
        }
        Self {
            debit: round_currency(&debit),
            credit: round_currency(&credit),
        }
    }

    /// Debits equal credits at currency precision.
    pub fn is_balanced(&self) -> bool {
        round_currency(&self.debit) == round_currency(&self.credit)
    }

    /// Debit minus credit.
    pub fn difference(&self) -> BigDecimal {
        round_currency(&(&self.debit - &self.credit))
    }
}

/// Editable journal transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalDraft {
    /// Set when the draft edits an existing transaction.
    pub transaction_id: Option<TransactionId>,
    pub description: String,
    /// Calendar date as typed (`YYYY-MM-DD`).
    pub date: String,
    lines: Vec<DraftLine>,
}

impl Default for JournalDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl JournalDraft {
    /// Blank draft with the minimum number of empty lines.
    pub fn new() -> Self {
        Self {
            transaction_id: None,
            description: String::new(),
            date: String::new(),
            lines: vec![DraftLine::default(); MIN_LINES],
        }
    }

    /// Draft with the given header and lines, padded up to the minimum.
    pub fn with_lines(
        description: impl Into<String>,
        date: impl Into<String>,
        lines: Vec<DraftLine>,
    ) -> Self {
        let mut draft = Self {
            transaction_id: None,
            description: description.into(),
            date: date.into(),
            lines,
        };
        draft.pad();
        draft
    }

    /// Draft that edits an existing transaction (submitting it replaces the
    /// transaction's description, date and entries).
    pub fn edit(transaction: &Transaction) -> Self {
        let lines = transaction
            .entries
            .iter()
            .map(|entry| DraftLine {
                account: Some(entry.account_id),
                amount: entry.amount.to_string(),
                role: Some(entry.role),
            })
            .collect();

        let mut draft = Self::with_lines(
            transaction.description.clone(),
            transaction.date.format("%Y-%m-%d").to_string(),
            lines,
        );
        draft.transaction_id = Some(transaction.id);
        draft
    }

    fn pad(&mut self) {
        while self.lines.len() < MIN_LINES {
            self.lines.push(DraftLine::default());
        }
    }

    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    pub fn is_edit(&self) -> bool {
        self.transaction_id.is_some()
    }

    pub fn add_line(&mut self) {
        self.lines.push(DraftLine::default());
    }

    pub fn set_line(&mut self, index: usize, edit: LineEdit) -> Result<(), DraftError> {
        let line = self
            .lines
            .get_mut(index)
            .ok_or(DraftError::NoSuchLine(index))?;

        match edit {
            LineEdit::Account(account) => line.account = account,
            LineEdit::Debit(text) => set_amount(line, EntryRole::Debit, text),
            LineEdit::Credit(text) => set_amount(line, EntryRole::Credit, text),
        }
        Ok(())
    }

    pub fn can_remove_line(&self) -> bool {
        self.lines.len() > MIN_LINES
    }

    /// Removes a line. Returns `false` (and leaves the draft untouched) when
    /// the draft is at its minimum size or the index is out of range.
    pub fn remove_line(&mut self, index: usize) -> bool {
        if !self.can_remove_line() || index >= self.lines.len() {
            return false;
        }
        self.lines.remove(index);
        true
    }

    /// Totals over lines with an account and a positive amount.
    pub fn totals(&self) -> Totals {
        let counted: Vec<(EntryRole, BigDecimal)> =
            self.lines.iter().filter_map(DraftLine::countable).collect();
        Totals::accumulate(counted.iter().map(|(role, amount)| (*role, amount)))
    }
}

fn set_amount(line: &mut DraftLine, role: EntryRole, text: String) {
    if text.trim().is_empty() {
        // Clearing one column leaves an amount typed in the other one alone.
        if line.role == Some(role) {
            line.amount.clear();
            line.role = None;
        }
        return;
    }
    line.amount = text;
    line.role = Some(role);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn filled(debit: &str, credit: &str) -> JournalDraft {
        let a = AccountId::new();
        let b = AccountId::new();
        JournalDraft::with_lines(
            "Gaji",
            "2025-01-01",
            vec![DraftLine::debit(a, debit), DraftLine::credit(b, credit)],
        )
    }

    #[test]
    fn new_draft_has_two_empty_lines() {
        let draft = JournalDraft::new();
        assert_eq!(draft.lines().len(), MIN_LINES);
        assert!(draft.lines().iter().all(|l| *l == DraftLine::default()));
        assert!(!draft.is_edit());
    }

    #[test]
    fn add_line_appends_an_empty_line() {
        let mut draft = JournalDraft::new();
        draft.add_line();
        assert_eq!(draft.lines().len(), 3);
        assert_eq!(draft.lines()[2], DraftLine::default());
    }

    #[test]
    fn remove_line_is_a_noop_at_the_minimum() {
        let mut draft = JournalDraft::new();
        assert!(!draft.can_remove_line());
        assert!(!draft.remove_line(0));
        assert_eq!(draft.lines().len(), 2);

        draft.add_line();
        assert!(draft.can_remove_line());
        assert!(!draft.remove_line(7));
        assert!(draft.remove_line(1));
        assert_eq!(draft.lines().len(), 2);
    }

    #[test]
    fn typing_a_debit_clears_the_credit_and_vice_versa() {
        let mut draft = JournalDraft::new();
        draft.set_line(0, LineEdit::Credit("250".into())).unwrap();
        assert_eq!(draft.lines()[0].credit_text(), "250");

        draft.set_line(0, LineEdit::Debit("100".into())).unwrap();
        assert_eq!(draft.lines()[0].debit_text(), "100");
        assert_eq!(draft.lines()[0].credit_text(), "");

        draft.set_line(0, LineEdit::Credit("75".into())).unwrap();
        assert_eq!(draft.lines()[0].debit_text(), "");
        assert_eq!(draft.lines()[0].credit_text(), "75");
    }

    #[test]
    fn clearing_the_other_column_keeps_the_amount() {
        let mut draft = JournalDraft::new();
        draft.set_line(1, LineEdit::Debit("100".into())).unwrap();
        draft.set_line(1, LineEdit::Credit(String::new())).unwrap();
        assert_eq!(draft.lines()[1].debit_text(), "100");

        draft.set_line(1, LineEdit::Debit(String::new())).unwrap();
        assert_eq!(draft.lines()[1], DraftLine::default());
    }

    #[test]
    fn set_line_out_of_range_is_an_error() {
        let mut draft = JournalDraft::new();
        assert_eq!(
            draft.set_line(5, LineEdit::Account(None)),
            Err(DraftError::NoSuchLine(5))
        );
    }

    #[test]
    fn totals_skip_lines_without_account_or_amount() {
        let mut draft = filled("8000000", "8000000");
        draft.add_line();
        draft.set_line(2, LineEdit::Debit("123".into())).unwrap();
        draft.add_line();
        draft.set_line(3, LineEdit::Account(Some(AccountId::new()))).unwrap();
        draft.set_line(3, LineEdit::Credit("0".into())).unwrap();

        let totals = draft.totals();
        assert_eq!(totals.debit, BigDecimal::from(8_000_000));
        assert_eq!(totals.credit, BigDecimal::from(8_000_000));
        assert!(totals.is_balanced());
        assert_eq!(draft.lines().len(), 4);
    }

    #[test]
    fn difference_is_debit_minus_credit() {
        let totals = filled("5000", "4999.99").totals();
        assert!(!totals.is_balanced());
        assert_eq!(totals.difference().to_string(), "0.01");
    }

    proptest! {
        #[test]
        fn totals_are_order_independent(
            amounts in prop::collection::vec((1u32..1_000_000u32, 0u32..100u32, any::<bool>()), 2..12),
            seed in any::<u64>()
        ) {
            let lines: Vec<DraftLine> = amounts
                .iter()
                .map(|(whole, cents, is_debit)| {
                    let text = format!("{whole}.{cents:02}");
                    if *is_debit {
                        DraftLine::debit(AccountId::new(), text)
                    } else {
                        DraftLine::credit(AccountId::new(), text)
                    }
                })
                .collect();

            let mut shuffled = lines.clone();
            let len = shuffled.len();
            let rotation = (seed % len as u64) as usize;
            shuffled.rotate_left(rotation);
            shuffled.reverse();

            let original = JournalDraft::with_lines("x", "2025-01-01", lines).totals();
            let reordered = JournalDraft::with_lines("x", "2025-01-01", shuffled).totals();
            prop_assert_eq!(original, reordered);
        }
    }
}
