use core::str::FromStr;

use serde::{Deserialize, Serialize};

use jurnal_core::{CategoryId, DomainError, DomainResult, Entity, WorkspaceId};

/// Whether a category groups money coming in or going out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryKind::Income => "income",
            CategoryKind::Expense => "expense",
        }
    }
}

impl core::fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(CategoryKind::Income),
            "expense" => Ok(CategoryKind::Expense),
            _ => Err(DomainError::validation("category type must be income or expense")),
        }
    }
}

/// A workspace's income or expense label, such as Transportasi or SPP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub kind: CategoryKind,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Request to add a category. Name and type are both required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub kind: CategoryKind,
}

impl NewCategory {
    pub fn new(name: &str, kind: &str) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() || kind.trim().is_empty() {
            return Err(DomainError::validation("category name and type are required"));
        }

        Ok(Self {
            name: name.to_string(),
            kind: kind.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_type_are_required() {
        let expected = DomainError::validation("category name and type are required");
        assert_eq!(NewCategory::new("  ", "income").unwrap_err(), expected);
        assert_eq!(NewCategory::new("Transportasi", "").unwrap_err(), expected);
    }

    #[test]
    fn type_is_income_or_expense() {
        let ok = NewCategory::new(" Transportasi ", "Expense").unwrap();
        assert_eq!(ok.name, "Transportasi");
        assert_eq!(ok.kind, CategoryKind::Expense);

        assert_eq!(
            NewCategory::new("Aset", "asset").unwrap_err(),
            DomainError::validation("category type must be income or expense")
        );
    }
}
