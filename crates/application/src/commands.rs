//! Sale commands and queries.
//!
//! Each type carries an explicit `validate` that checks presence and ranges
//! only. Business rules are left to the aggregate.

use common::{SaleId, SaleItemId};
use domain::{DomainError, ExternalReference, Money, Quantity, SaleItem};
use rust_decimal::Decimal;
use sale_store::{SaleSearchCriteria, SaleSortField, SortDirection};
use uuid::Uuid;

use crate::ValidationErrors;

/// Smallest page size a listing accepts.
pub const MIN_PAGE_SIZE: i64 = 1;

/// Largest page size a listing accepts.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Longest customer, branch or product name, in characters.
pub const MAX_NAME_LENGTH: usize = 255;

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn require_name(errors: &mut ValidationErrors, value: &str, field: &str, label: &str) {
    if is_blank(value) {
        errors.add(field, format!("{label} is required."));
    } else if value.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            field,
            format!("{label} must not exceed {MAX_NAME_LENGTH} characters."),
        );
    }
}

fn require_id(errors: &mut ValidationErrors, id: Uuid, field: &str, label: &str) {
    errors.require(!id.is_nil(), field, format!("{label} is required."));
}

/// One line of a create or update command.
#[derive(Debug, Clone)]
pub struct SaleItemCommand {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl SaleItemCommand {
    pub fn new(
        product_id: Uuid,
        product_name: impl Into<String>,
        quantity: i32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    fn validate_into(&self, errors: &mut ValidationErrors, index: usize) {
        let field = |name: &str| format!("items[{index}].{name}");
        require_id(errors, self.product_id, &field("product_id"), "Product ID");
        require_name(errors, &self.product_name, &field("product_name"), "Product Name");
        errors.require(
            (1..=Quantity::MAX_VALUE).contains(&self.quantity),
            field("quantity"),
            format!("Quantity must be between 1 and {}", Quantity::MAX_VALUE),
        );
        errors.require(
            self.unit_price > Decimal::ZERO,
            field("unit_price"),
            "Unit Price must be greater than zero.",
        );
        errors.require(
            self.unit_price <= Money::MAX,
            field("unit_price"),
            format!("Unit Price must not exceed {}.", Money::MAX),
        );
    }

    /// Builds a fresh, active sale item.
    pub fn to_sale_item(&self) -> Result<SaleItem, DomainError> {
        SaleItem::new(
            ExternalReference::new(self.product_id, self.product_name.clone())?,
            Quantity::new(self.quantity)?,
            Money::new(self.unit_price)?,
        )
    }
}

fn validate_header(
    errors: &mut ValidationErrors,
    customer_id: Uuid,
    customer_name: &str,
    branch_id: Uuid,
    branch_name: &str,
    items: &[SaleItemCommand],
) {
    require_id(errors, customer_id, "customer_id", "Customer ID");
    require_name(errors, customer_name, "customer_name", "Customer Name");
    require_id(errors, branch_id, "branch_id", "Branch ID");
    require_name(errors, branch_name, "branch_name", "Branch Name");
    errors.require(
        !items.is_empty(),
        "items",
        "Sale must contain at least one item.",
    );
    for (index, item) in items.iter().enumerate() {
        item.validate_into(errors, index);
    }
}

/// Creates a new sale with its items.
#[derive(Debug, Clone)]
pub struct CreateSaleCommand {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub items: Vec<SaleItemCommand>,
}

impl CreateSaleCommand {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_header(
            &mut errors,
            self.customer_id,
            &self.customer_name,
            self.branch_id,
            &self.branch_name,
            &self.items,
        );
        errors.into_result()
    }
}

/// Replaces the customer, branch and items of an existing sale.
#[derive(Debug, Clone)]
pub struct UpdateSaleCommand {
    pub sale_id: SaleId,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub items: Vec<SaleItemCommand>,
}

impl UpdateSaleCommand {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_id(&mut errors, self.sale_id.as_uuid(), "sale_id", "Sale ID");
        validate_header(
            &mut errors,
            self.customer_id,
            &self.customer_name,
            self.branch_id,
            &self.branch_name,
            &self.items,
        );
        errors.into_result()
    }
}

macro_rules! sale_command {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            pub sale_id: SaleId,
        }

        impl $name {
            pub fn new(sale_id: SaleId) -> Self {
                Self { sale_id }
            }

            pub fn validate(&self) -> Result<(), ValidationErrors> {
                let mut errors = ValidationErrors::new();
                require_id(&mut errors, self.sale_id.as_uuid(), "sale_id", "Sale ID");
                errors.into_result()
            }
        }
    };
}

macro_rules! sale_item_command {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            pub sale_id: SaleId,
            pub item_id: SaleItemId,
        }

        impl $name {
            pub fn new(sale_id: SaleId, item_id: SaleItemId) -> Self {
                Self { sale_id, item_id }
            }

            pub fn validate(&self) -> Result<(), ValidationErrors> {
                let mut errors = ValidationErrors::new();
                require_id(&mut errors, self.sale_id.as_uuid(), "sale_id", "Sale ID");
                require_id(&mut errors, self.item_id.as_uuid(), "item_id", "Item ID");
                errors.into_result()
            }
        }
    };
}

sale_command!(
    /// Cancels a sale and every item on it.
    CancelSaleCommand
);
sale_command!(
    /// Deletes a sale and its items.
    DeleteSaleCommand
);
sale_command!(
    /// Reads a single sale.
    GetSaleQuery
);
sale_item_command!(
    /// Cancels one item of a sale.
    CancelSaleItemCommand
);
sale_item_command!(
    /// Removes one item from a sale, deleting the sale if it was the last.
    DeleteSaleItemCommand
);

/// Reads one page of sales.
///
/// Sort options arrive as free text and are checked by `validate`.
#[derive(Debug, Clone)]
pub struct GetSalesQuery {
    pub page_number: i64,
    pub page_size: i64,
    pub customer_name: Option<String>,
    pub branch_name: Option<String>,
    pub product_name: Option<String>,
    pub sort_field: Option<String>,
    pub sort_direction: Option<String>,
}

impl Default for GetSalesQuery {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: 10,
            customer_name: None,
            branch_name: None,
            product_name: None,
            sort_field: None,
            sort_direction: None,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !is_blank(v))
}

impl GetSalesQuery {
    pub fn page(page_number: i64, page_size: i64) -> Self {
        Self {
            page_number,
            page_size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        self.errors().into_result()
    }

    /// Validates the query and returns the page number and page size in the
    /// units the repository takes.
    pub fn paging(&self) -> Result<(u32, u32), ValidationErrors> {
        let errors = self.errors();
        match (self.checked_page_number(), self.checked_page_size()) {
            (Some(page), Some(size)) if errors.is_empty() => Ok((page, size)),
            _ => Err(errors),
        }
    }

    fn checked_page_number(&self) -> Option<u32> {
        u32::try_from(self.page_number).ok().filter(|page| *page > 0)
    }

    fn checked_page_size(&self) -> Option<u32> {
        u32::try_from(self.page_size)
            .ok()
            .filter(|size| (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&i64::from(*size)))
    }

    fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require(
            self.checked_page_number().is_some(),
            "_page",
            format!(
                "The page number (_page) must be a positive integer no greater than {}.",
                u32::MAX
            ),
        );
        errors.require(
            self.checked_page_size().is_some(),
            "_size",
            format!(
                "The page size (_size) must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}."
            ),
        );
        if let Some(field) = non_blank(&self.sort_field) {
            let allowed: Vec<&str> = SaleSortField::ALL.iter().map(|f| f.as_str()).collect();
            errors.require(
                field.parse::<SaleSortField>().is_ok(),
                "_sort",
                format!("Invalid sort field. Allowed values: {}.", allowed.join(", ")),
            );
        }
        if let Some(direction) = non_blank(&self.sort_direction) {
            errors.require(
                direction.parse::<SortDirection>().is_ok(),
                "_order",
                "Invalid sort direction. Allowed values: asc, desc.",
            );
        }
        errors
    }

    /// Repository criteria for this query. Call after `validate`; unknown
    /// sort options are dropped.
    pub fn criteria(&self) -> SaleSearchCriteria {
        SaleSearchCriteria {
            customer_name: non_blank(&self.customer_name).map(str::to_string),
            branch_name: non_blank(&self.branch_name).map(str::to_string),
            product_name: non_blank(&self.product_name).map(str::to_string),
            sort_field: non_blank(&self.sort_field).and_then(|f| f.parse().ok()),
            sort_direction: non_blank(&self.sort_direction).and_then(|d| d.parse().ok()),
        }
    }

    /// Deterministic cache key covering pagination, filters and sort.
    ///
    /// Sort options are normalised, so `asc` and `Ascending` share a key.
    pub fn cache_key(&self) -> String {
        let criteria = self.criteria();
        let mut key = format!(
            "_PageNumber:{}_PageSize:{}",
            self.page_number, self.page_size
        );
        if let Some(customer) = &criteria.customer_name {
            key.push_str(&format!("_CustomerName:{customer}"));
        }
        if let Some(branch) = &criteria.branch_name {
            key.push_str(&format!("_BranchName:{branch}"));
        }
        if let Some(product) = &criteria.product_name {
            key.push_str(&format!("_ProductName:{product}"));
        }
        if let Some(field) = criteria.sort_field {
            key.push_str(&format!("_SortField:{field}"));
        }
        if let Some(direction) = criteria.sort_direction {
            key.push_str(&format!("_SortDirection:{direction}"));
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_item() -> SaleItemCommand {
        SaleItemCommand::new(Uuid::new_v4(), "Beer", 5, Decimal::new(1250, 2))
    }

    fn valid_create() -> CreateSaleCommand {
        CreateSaleCommand {
            customer_id: Uuid::new_v4(),
            customer_name: "Ana".to_string(),
            branch_id: Uuid::new_v4(),
            branch_name: "Main".to_string(),
            items: vec![valid_item()],
        }
    }

    #[test]
    fn test_valid_create_passes() {
        assert!(valid_create().validate().is_ok());
    }

    #[test]
    fn test_create_collects_every_failure() {
        let cmd = CreateSaleCommand {
            customer_id: Uuid::nil(),
            customer_name: "  ".to_string(),
            branch_id: Uuid::nil(),
            branch_name: String::new(),
            items: vec![],
        };
        let errors = cmd.validate().unwrap_err();
        for field in [
            "customer_id",
            "customer_name",
            "branch_id",
            "branch_name",
            "items",
        ] {
            assert!(errors.has_field(field), "missing {field}");
        }
        assert_eq!(errors.failures().len(), 5);
    }

    #[test]
    fn test_item_rules_are_indexed() {
        let mut cmd = valid_create();
        cmd.items.push(SaleItemCommand::new(Uuid::nil(), "", 21, Decimal::ZERO));
        let errors = cmd.validate().unwrap_err();

        assert!(errors.has_field("items[1].product_id"));
        assert!(errors.has_field("items[1].product_name"));
        assert!(errors.has_field("items[1].quantity"));
        assert!(errors.has_field("items[1].unit_price"));
        assert!(!errors.has_field("items[0].quantity"));
    }

    #[test]
    fn test_quantity_bounds() {
        for (quantity, ok) in [(0, false), (1, true), (20, true), (21, false)] {
            let mut cmd = valid_create();
            cmd.items[0].quantity = quantity;
            assert_eq!(cmd.validate().is_ok(), ok, "quantity {quantity}");
        }
    }

    #[test]
    fn test_update_requires_sale_id() {
        let create = valid_create();
        let cmd = UpdateSaleCommand {
            sale_id: SaleId::from_uuid(Uuid::nil()),
            customer_id: create.customer_id,
            customer_name: create.customer_name,
            branch_id: create.branch_id,
            branch_name: create.branch_name,
            items: create.items,
        };
        let errors = cmd.validate().unwrap_err();
        assert!(errors.has_field("sale_id"));
        assert_eq!(errors.failures().len(), 1);
    }

    #[test]
    fn test_item_command_ids() {
        let nil = CancelSaleItemCommand::new(
            SaleId::from_uuid(Uuid::nil()),
            SaleItemId::from_uuid(Uuid::nil()),
        );
        assert_eq!(nil.validate().unwrap_err().failures().len(), 2);
        assert!(
            DeleteSaleItemCommand::new(SaleId::new(), SaleItemId::new())
                .validate()
                .is_ok()
        );
        assert!(GetSaleQuery::new(SaleId::from_uuid(Uuid::nil())).validate().is_err());
    }

    #[test]
    fn test_to_sale_item() {
        let item = valid_item().to_sale_item().unwrap();
        assert_eq!(item.quantity().value(), 5);
        assert_eq!(item.discount_percentage(), Decimal::new(10, 2));
        assert!(!item.is_cancelled());
    }

    #[test]
    fn test_paging_rules() {
        assert!(GetSalesQuery::default().validate().is_ok());
        assert!(GetSalesQuery::page(0, 10).validate().unwrap_err().has_field("_page"));
        assert!(GetSalesQuery::page(1, 0).validate().unwrap_err().has_field("_size"));
        assert!(GetSalesQuery::page(1, 101).validate().unwrap_err().has_field("_size"));
        assert!(GetSalesQuery::page(1, 100).validate().is_ok());
    }

    #[test]
    fn test_page_number_must_fit_the_repository_range() {
        let max = i64::from(u32::MAX);
        assert_eq!(GetSalesQuery::page(max, 10).paging().unwrap(), (u32::MAX, 10));

        let errors = GetSalesQuery::page(max + 1, 10).paging().unwrap_err();
        assert!(errors.has_field("_page"));
        assert!(!errors.has_field("_size"));
        assert!(GetSalesQuery::page(5_000_000_000, 10).validate().is_err());
    }

    #[test]
    fn test_name_length_is_capped() {
        let mut command = valid_create();
        command.customer_name = "c".repeat(MAX_NAME_LENGTH);
        assert!(command.validate().is_ok());

        command.customer_name = "c".repeat(MAX_NAME_LENGTH + 1);
        command.branch_name = "b".repeat(MAX_NAME_LENGTH + 1);
        command.items[0].product_name = "p".repeat(MAX_NAME_LENGTH + 1);
        let errors = command.validate().unwrap_err();
        assert!(errors.has_field("customer_name"));
        assert!(errors.has_field("branch_name"));
        assert!(errors.has_field("items[0].product_name"));
    }

    #[test]
    fn test_unit_price_is_capped() {
        let mut command = valid_create();
        command.items[0].unit_price = Money::MAX;
        assert!(command.validate().is_ok());

        command.items[0].unit_price = "10000000000000000000000000000".parse().unwrap();
        let errors = command.validate().unwrap_err();
        assert!(errors.has_field("items[0].unit_price"));
    }

    #[test]
    fn test_sort_options_are_checked() {
        let mut query = GetSalesQuery::default();
        query.sort_field = Some("price".to_string());
        query.sort_direction = Some("up".to_string());
        let errors = query.validate().unwrap_err();
        assert!(errors.has_field("_sort"));
        assert!(errors.has_field("_order"));

        query.sort_field = Some("customername".to_string());
        query.sort_direction = Some("DESC".to_string());
        assert!(query.validate().is_ok());
        assert_eq!(query.criteria().sort_field, Some(SaleSortField::CustomerName));
        assert_eq!(query.criteria().sort_direction, Some(SortDirection::Descending));
    }

    #[test]
    fn test_cache_key_includes_each_filter_independently() {
        let mut query = GetSalesQuery::page(2, 25);
        assert_eq!(query.cache_key(), "_PageNumber:2_PageSize:25");

        query.branch_name = Some("North".to_string());
        query.product_name = Some("Lager".to_string());
        assert_eq!(
            query.cache_key(),
            "_PageNumber:2_PageSize:25_BranchName:North_ProductName:Lager"
        );

        query.customer_name = Some("  ".to_string());
        query.sort_field = Some("createddate".to_string());
        query.sort_direction = Some("asc".to_string());
        assert_eq!(
            query.cache_key(),
            "_PageNumber:2_PageSize:25_BranchName:North_ProductName:Lager\
             _SortField:CreatedDate_SortDirection:Ascending"
        );
    }

    #[test]
    fn test_equivalent_sort_spellings_share_a_key() {
        let mut a = GetSalesQuery::default();
        a.sort_direction = Some("asc".to_string());
        let mut b = GetSalesQuery::default();
        b.sort_direction = Some("Ascending".to_string());
        assert_eq!(a.cache_key(), b.cache_key());
    }
}
