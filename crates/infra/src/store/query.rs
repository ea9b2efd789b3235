//! Listing parameters for transaction queries.
//!
//! All queries are workspace-scoped and paginated. Values that arrive from
//! query strings are parsed leniently: unknown sort columns and page sizes
//! fall back to their defaults instead of failing the request.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use jurnal_accounting::Transaction;
use jurnal_core::AccountId;

/// Page sizes offered by the listing.
pub const PER_PAGE_OPTIONS: [u32; 5] = [10, 20, 30, 40, 50];
pub const DEFAULT_PER_PAGE: u32 = 10;

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        let per_page = per_page
            .filter(|n| PER_PAGE_OPTIONS.contains(n))
            .unwrap_or(DEFAULT_PER_PAGE);
        Self {
            page: page.filter(|p| *p >= 1).unwrap_or(1),
            per_page,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.per_page))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    Date,
    Description,
    IsBalanced,
}

impl SortColumn {
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("description") => SortColumn::Description,
            Some("is_balanced") => SortColumn::IsBalanced,
            _ => SortColumn::Date,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub column: SortColumn,
    pub order: SortOrder,
}

/// Inclusive calendar-date range; open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub range: DateRange,
    /// Keep transactions touching at least one of these accounts. Empty means all.
    pub account_ids: Vec<AccountId>,
}

impl TransactionFilter {
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.range.contains(transaction.date)
            && (self.account_ids.is_empty()
                || transaction
                    .entries
                    .iter()
                    .any(|e| self.account_ids.contains(&e.account_id)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionQuery {
    pub filter: TransactionFilter,
    pub sort: Sort,
    pub pagination: Pagination,
}

/// One listed transaction with its balance flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub transaction: Transaction,
    pub is_balanced: bool,
}

impl From<Transaction> for TransactionRow {
    fn from(transaction: Transaction) -> Self {
        let is_balanced = transaction.is_balanced();
        Self {
            transaction,
            is_balanced,
        }
    }
}

/// Paginated listing result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPage {
    pub rows: Vec<TransactionRow>,
    /// Matching transactions across all pages.
    pub total: u64,
    pub pagination: Pagination,
    pub total_pages: u64,
}

impl TransactionPage {
    pub fn new(rows: Vec<TransactionRow>, total: u64, pagination: Pagination) -> Self {
        Self {
            rows,
            total,
            pagination,
            total_pages: pagination.total_pages(total),
        }
    }
}
