use serde::{Deserialize, Serialize};

use jurnal_accounting::{
    Account, AccountKind, Category, EntryRole, JournalDraft, LineEdit, NewAccount, NewCategory, Totals,
};
use jurnal_core::{AccountId, CategoryId, TransactionId};
use jurnal_infra::store::{
    DateRange, Pagination, Sort, SortColumn, SortOrder, TransactionFilter, TransactionPage,
    TransactionQuery,
};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectWorkspaceRequest {
    pub workspace_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub kind: String,
    pub normal_balance: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// One editable line as typed: an account and text in at most one of the
/// debit/credit columns.
#[derive(Debug, Default, Deserialize)]
pub struct DraftLineRequest {
    pub account_id: Option<String>,
    #[serde(default)]
    pub debit: String,
    #[serde(default)]
    pub credit: String,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub lines: Vec<DraftLineRequest>,
}

/// `/transactions` query string. `account_id` may repeat, so it is parsed
/// from the raw pairs rather than derived.
#[derive(Debug, Default)]
pub struct ListQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub account_ids: Vec<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl ListQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = ListQuery::default();
        for (key, value) in pairs {
            let value = Some(value).filter(|v| !v.trim().is_empty());
            match key.as_str() {
                "start_date" => query.start_date = value,
                "end_date" => query.end_date = value,
                "account_id" => query.account_ids.extend(value),
                "sort_by" => query.sort_by = value,
                "sort_order" => query.sort_order = value,
                "page" => query.page = value,
                "per_page" => query.per_page = value,
                _ => {}
            }
        }
        query
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct TotalsResponse {
    pub debit: String,
    pub credit: String,
    pub difference: String,
    pub is_balanced: bool,
}

impl From<Totals> for TotalsResponse {
    fn from(totals: Totals) -> Self {
        Self {
            debit: totals.debit.to_string(),
            credit: totals.credit.to_string(),
            difference: totals.difference().to_string(),
            is_balanced: totals.is_balanced(),
        }
    }
}

// -------------------------
// Mapping helpers
// -------------------------

pub fn parse_account_id(s: &str) -> Result<AccountId, axum::response::Response> {
    s.trim()
        .parse()
        .map_err(|_| errors::bad_request(format!("'{s}' is not a valid account id")))
}

pub fn parse_transaction_id(s: &str) -> Result<TransactionId, axum::response::Response> {
    s.trim()
        .parse()
        .map_err(|_| errors::json_error(axum::http::StatusCode::NOT_FOUND, "not_found", "not found"))
}

pub fn parse_category_id(s: &str) -> Result<CategoryId, axum::response::Response> {
    s.trim()
        .parse()
        .map_err(|_| errors::json_error(axum::http::StatusCode::NOT_FOUND, "not_found", "not found"))
}

fn parse_date(field: &str, value: Option<&str>) -> Result<Option<chrono::NaiveDate>, axum::response::Response> {
    match value {
        None => Ok(None),
        Some(text) => jurnal_accounting::parse_entry_date(text)
            .map(Some)
            .ok_or_else(|| errors::bad_request(format!("{field} must be a date in YYYY-MM-DD form"))),
    }
}

pub fn to_date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<DateRange, axum::response::Response> {
    Ok(DateRange::new(parse_date("start_date", start)?, parse_date("end_date", end)?))
}

pub fn to_transaction_query(query: ListQuery) -> Result<TransactionQuery, axum::response::Response> {
    let range = to_date_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let account_ids = query
        .account_ids
        .iter()
        .map(|id| parse_account_id(id))
        .collect::<Result<Vec<_>, _>>()?;

    // Unparseable numbers fall back to the defaults, like unknown values do.
    let page = query.page.and_then(|p| p.trim().parse().ok());
    let per_page = query.per_page.and_then(|p| p.trim().parse().ok());

    Ok(TransactionQuery {
        filter: TransactionFilter { range, account_ids },
        sort: Sort {
            column: SortColumn::parse_or_default(query.sort_by.as_deref()),
            order: SortOrder::parse_or_default(query.sort_order.as_deref()),
        },
        pagination: Pagination::new(page, per_page),
    })
}

pub fn to_new_account(body: CreateAccountRequest) -> Result<NewAccount, axum::response::Response> {
    let kind: AccountKind = body.kind.parse().map_err(|_| {
        errors::bad_request("kind must be one of: asset, liability, equity, revenue, expense")
    })?;
    let normal_balance: EntryRole = body
        .normal_balance
        .parse()
        .map_err(|_| errors::bad_request("normal_balance must be debit or credit"))?;
    let parent_id = body
        .parent_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .map(parse_account_id)
        .transpose()?;

    NewAccount::new(&body.name, kind, normal_balance, parent_id).map_err(errors::domain_error_to_response)
}

pub fn to_new_category(body: CreateCategoryRequest) -> Result<NewCategory, axum::response::Response> {
    NewCategory::new(&body.name, &body.kind).map_err(errors::domain_error_to_response)
}

/// Replay the request through the draft's own editing operations.
pub fn to_draft(
    body: DraftRequest,
    transaction_id: Option<TransactionId>,
) -> Result<JournalDraft, axum::response::Response> {
    let mut draft = JournalDraft::new();
    draft.transaction_id = transaction_id;
    draft.description = body.description;
    draft.date = body.date;

    while draft.lines().len() < body.lines.len() {
        draft.add_line();
    }

    for (index, line) in body.lines.into_iter().enumerate() {
        if !line.debit.trim().is_empty() && !line.credit.trim().is_empty() {
            return Err(errors::bad_request(format!(
                "line {} has both a debit and a credit amount",
                index + 1
            )));
        }
        let account = line
            .account_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(parse_account_id)
            .transpose()?;

        let edits = [
            LineEdit::Account(account),
            LineEdit::Debit(line.debit),
            LineEdit::Credit(line.credit),
        ];
        for edit in edits {
            draft
                .set_line(index, edit)
                .map_err(|e| errors::bad_request(e.to_string()))?;
        }
    }
    Ok(draft)
}

pub fn account_to_json(account: Account) -> serde_json::Value {
    serde_json::json!({
        "id": account.id.to_string(),
        "name": account.name,
        "kind": account.kind.as_str(),
        "normal_balance": account.normal_balance.as_str(),
        "parent_id": account.parent_id.map(|id| id.to_string()),
    })
}

pub fn category_to_json(category: Category) -> serde_json::Value {
    serde_json::json!({
        "id": category.id.to_string(),
        "name": category.name,
        "type": category.kind.as_str(),
    })
}

pub fn transaction_to_json(transaction: &jurnal_accounting::Transaction) -> serde_json::Value {
    let totals = transaction.totals();
    serde_json::json!({
        "id": transaction.id.to_string(),
        "workspace_id": transaction.workspace_id.to_string(),
        "created_by": transaction.created_by.to_string(),
        "description": transaction.description,
        "date": transaction.date.format("%Y-%m-%d").to_string(),
        "entries": transaction.entries,
        "total_debit": totals.debit.to_string(),
        "total_credit": totals.credit.to_string(),
        "is_balanced": totals.is_balanced(),
        "created_at": transaction.created_at.to_rfc3339(),
    })
}

pub fn page_to_json(page: TransactionPage) -> serde_json::Value {
    let items = page
        .rows
        .iter()
        .map(|row| transaction_to_json(&row.transaction))
        .collect::<Vec<_>>();
    serde_json::json!({
        "items": items,
        "total": page.total,
        "page": page.pagination.page,
        "per_page": page.pagination.per_page,
        "total_pages": page.total_pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(account: &AccountId, debit: &str, credit: &str) -> DraftLineRequest {
        DraftLineRequest {
            account_id: Some(account.to_string()),
            debit: debit.to_string(),
            credit: credit.to_string(),
        }
    }

    #[test]
    fn draft_request_replays_into_a_draft() {
        let (a, b, c) = (AccountId::new(), AccountId::new(), AccountId::new());
        let body = DraftRequest {
            description: "Gaji".into(),
            date: "2025-01-01".into(),
            lines: vec![line(&a, "8000000", ""), line(&b, "", "5000000"), line(&c, "", "3000000")],
        };

        let draft = to_draft(body, None).unwrap();

        assert_eq!(draft.lines().len(), 3);
        assert_eq!(draft.lines()[0].debit_text(), "8000000");
        assert_eq!(draft.lines()[2].credit_text(), "3000000");
        assert!(draft.totals().is_balanced());
    }

    #[test]
    fn both_columns_on_one_line_is_refused() {
        let a = AccountId::new();
        let body = DraftRequest {
            description: "Gaji".into(),
            date: "2025-01-01".into(),
            lines: vec![line(&a, "1", "1")],
        };
        assert!(to_draft(body, None).is_err());
    }

    #[test]
    fn listing_query_falls_back_to_defaults() {
        let pairs = vec![
            ("sort_by".to_string(), "nonsense".to_string()),
            ("per_page".to_string(), "25".to_string()),
            ("page".to_string(), "x".to_string()),
            ("account_id".to_string(), AccountId::new().to_string()),
            ("account_id".to_string(), AccountId::new().to_string()),
        ];

        let query = to_transaction_query(ListQuery::from_pairs(pairs)).unwrap();

        assert_eq!(query.sort.column, SortColumn::Date);
        assert_eq!(query.sort.order, SortOrder::Desc);
        assert_eq!(query.pagination, Pagination::default());
        assert_eq!(query.filter.account_ids.len(), 2);
    }
}
