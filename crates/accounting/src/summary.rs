use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use jurnal_core::round_currency;

use crate::account::AccountKind;

/// Total for one account kind, signed so the kind's normal side is positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTotal {
    pub kind: AccountKind,
    pub total: BigDecimal,
}

/// Dashboard figures for a workspace over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub totals: Vec<KindTotal>,
    pub total_assets: BigDecimal,
    pub total_liabilities: BigDecimal,
    pub total_equity: BigDecimal,
    pub total_revenue: BigDecimal,
    pub total_expense: BigDecimal,
    pub net_income: BigDecimal,
    pub total_liabilities_and_equity: BigDecimal,
    pub is_balanced: bool,
}

impl FinancialSummary {
    /// Build from per-kind totals. Kinds that are absent count as zero;
    /// repeated kinds are added together.
    pub fn from_totals(totals: impl IntoIterator<Item = KindTotal>) -> Self {
        let mut by_kind: Vec<KindTotal> = AccountKind::ALL
            .iter()
            .map(|kind| KindTotal {
                kind: *kind,
                total: BigDecimal::zero(),
            })
            .collect();
        for item in totals {
            if let Some(slot) = by_kind.iter_mut().find(|slot| slot.kind == item.kind) {
                slot.total += item.total;
            }
        }
        for slot in &mut by_kind {
            slot.total = round_currency(&slot.total);
        }

        let total_of = |kind: AccountKind| {
            by_kind
                .iter()
                .find(|slot| slot.kind == kind)
                .map(|slot| slot.total.clone())
                .unwrap_or_else(BigDecimal::zero)
        };

        let total_assets = total_of(AccountKind::Asset);
        let total_liabilities = total_of(AccountKind::Liability);
        let total_equity = total_of(AccountKind::Equity);
        let total_revenue = total_of(AccountKind::Revenue);
        let total_expense = total_of(AccountKind::Expense);

        let net_income = round_currency(&(&total_revenue - &total_expense));
        let total_liabilities_and_equity =
            round_currency(&(&total_liabilities + &total_equity + &net_income));
        let is_balanced = total_assets == total_liabilities_and_equity;

        Self {
            totals: by_kind,
            total_assets,
            total_liabilities,
            total_equity,
            total_revenue,
            total_expense,
            net_income,
            total_liabilities_and_equity,
            is_balanced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(kind: AccountKind, value: i64) -> KindTotal {
        KindTotal {
            kind,
            total: BigDecimal::from(value),
        }
    }

    #[test]
    fn net_income_flows_into_equity_side() {
        let summary = FinancialSummary::from_totals([
            total(AccountKind::Asset, 1_500),
            total(AccountKind::Liability, 300),
            total(AccountKind::Equity, 1_000),
            total(AccountKind::Revenue, 900),
            total(AccountKind::Expense, 700),
        ]);

        assert_eq!(summary.net_income, BigDecimal::from(200));
        assert_eq!(summary.total_liabilities_and_equity, BigDecimal::from(1_500));
        assert!(summary.is_balanced);
    }

    #[test]
    fn missing_kinds_count_as_zero() {
        let summary = FinancialSummary::from_totals([total(AccountKind::Asset, 10)]);
        assert_eq!(summary.totals.len(), AccountKind::ALL.len());
        assert_eq!(summary.total_expense, BigDecimal::zero());
        assert!(!summary.is_balanced);
    }

    #[test]
    fn repeated_kinds_are_summed() {
        let summary = FinancialSummary::from_totals([
            total(AccountKind::Expense, 10),
            total(AccountKind::Expense, 5),
        ]);
        assert_eq!(summary.total_expense, BigDecimal::from(15));
        assert_eq!(summary.net_income, BigDecimal::from(-15));
    }
}
