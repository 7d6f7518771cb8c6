//! Filtering and ordering options for paginated sale listings.

use std::str::FromStr;

/// Column a sale listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaleSortField {
    CreatedDate,
    CustomerName,
    BranchName,
}

impl SaleSortField {
    pub const ALL: [SaleSortField; 3] = [
        SaleSortField::CreatedDate,
        SaleSortField::CustomerName,
        SaleSortField::BranchName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleSortField::CreatedDate => "CreatedDate",
            SaleSortField::CustomerName => "CustomerName",
            SaleSortField::BranchName => "BranchName",
        }
    }
}

impl std::fmt::Display for SaleSortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a sort field or direction name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSortOption(pub String);

impl std::fmt::Display for UnknownSortOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown sort option '{}'", self.0)
    }
}

impl std::error::Error for UnknownSortOption {}

impl FromStr for SaleSortField {
    type Err = UnknownSortOption;

    /// Parses a field name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownSortOption(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "Ascending",
            SortDirection::Descending => "Descending",
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = UnknownSortOption;

    /// Accepts `asc`, `ascending`, `desc` and `descending` in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            _ => Err(UnknownSortOption(s.to_string())),
        }
    }
}

/// Filters and ordering for [`SaleRepository::get_paginated`](crate::SaleRepository::get_paginated).
///
/// Name filters are case-insensitive substring matches; blank filters are
/// ignored. Without a sort field, sales come back in number order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleSearchCriteria {
    pub customer_name: Option<String>,
    pub branch_name: Option<String>,
    /// Matches sales having at least one item with this product name.
    pub product_name: Option<String>,
    pub sort_field: Option<SaleSortField>,
    pub sort_direction: Option<SortDirection>,
}

impl SaleSearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn customer_name(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn branch_name(mut self, name: impl Into<String>) -> Self {
        self.branch_name = Some(name.into());
        self
    }

    pub fn product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    pub fn sort_by(mut self, field: SaleSortField, direction: SortDirection) -> Self {
        self.sort_field = Some(field);
        self.sort_direction = Some(direction);
        self
    }

    /// Returns a filter value only if it holds something besides whitespace.
    pub(crate) fn effective(filter: &Option<String>) -> Option<&str> {
        filter
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
