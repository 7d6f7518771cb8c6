use std::collections::HashMap;

use async_trait::async_trait;
use common::{SaleId, SaleItemId, Version};
use domain::{ExternalReference, Money, Quantity, Sale, SaleItem, SaleSnapshot};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, SalePage, SaleRepository, SaleSearchCriteria, SaleSortField, SortDirection,
    StoreError, repository::page_offset,
};

const SALE_COLUMNS: &str = "s.id, s.number, s.created_date, s.customer_id, s.customer_name, \
     s.branch_id, s.branch_name, s.is_cancelled, s.version";

const ITEM_COLUMNS: &str = "id, sale_id, product_id, product_name, quantity, unit_price, is_cancelled";

/// PostgreSQL-backed sale repository.
///
/// Headers live in `sales`, items in `sale_items`. Every write runs in a
/// single transaction and is guarded by the `version` column, so two
/// concurrent edits of the same sale cannot both win.
#[derive(Clone)]
pub struct PostgresSaleRepository {
    pool: PgPool,
}

impl PostgresSaleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_item(row: &PgRow) -> Result<SaleItem> {
        let product = ExternalReference::new(
            row.try_get::<Uuid, _>("product_id")?,
            row.try_get::<String, _>("product_name")?,
        )?;
        Ok(SaleItem::restore(
            SaleItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            product,
            Quantity::new(row.try_get("quantity")?)?,
            Money::new(row.try_get::<Decimal, _>("unit_price")?)?,
            row.try_get("is_cancelled")?,
        )?)
    }

    fn row_to_sale(row: &PgRow, items: Vec<SaleItem>) -> Result<Sale> {
        Ok(Sale::restore(SaleSnapshot {
            id: SaleId::from_uuid(row.try_get::<Uuid, _>("id")?),
            number: row.try_get("number")?,
            created_date: row.try_get("created_date")?,
            customer: ExternalReference::new(
                row.try_get::<Uuid, _>("customer_id")?,
                row.try_get::<String, _>("customer_name")?,
            )?,
            branch: ExternalReference::new(
                row.try_get::<Uuid, _>("branch_id")?,
                row.try_get::<String, _>("branch_name")?,
            )?,
            is_cancelled: row.try_get("is_cancelled")?,
            items,
            version: Version::new(row.try_get("version")?),
        })?)
    }

    /// Loads the items of several sales at once, grouped by sale and kept in
    /// their stored order.
    async fn load_items(&self, sale_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<SaleItem>>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ANY($1) ORDER BY sale_id, position"
        ))
        .bind(sale_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<SaleItem>> = HashMap::new();
        for row in &rows {
            let sale_id: Uuid = row.try_get("sale_id")?;
            grouped
                .entry(sale_id)
                .or_default()
                .push(Self::row_to_item(row)?);
        }
        Ok(grouped)
    }

    async fn insert_items(tx: &mut Transaction<'_, Postgres>, sale: &Sale) -> Result<()> {
        for (position, item) in sale.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (id, sale_id, position, product_id, product_name, quantity,
                                        unit_price, discount_percentage, total_amount, is_cancelled)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(item.id().as_uuid())
            .bind(sale.id().as_uuid())
            .bind(position as i32)
            .bind(item.product().id())
            .bind(item.product().description())
            .bind(item.quantity().value())
            .bind(item.unit_price().value())
            .bind(item.discount_percentage())
            .bind(item.total_amount().value())
            .bind(item.is_cancelled())
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Works out why a version-guarded write touched no row.
    async fn write_rejection(tx: &mut Transaction<'_, Postgres>, sale: &Sale) -> StoreError {
        let current: std::result::Result<Option<i64>, sqlx::Error> =
            sqlx::query_scalar("SELECT version FROM sales WHERE id = $1")
                .bind(sale.id().as_uuid())
                .fetch_optional(&mut **tx)
                .await;

        match current {
            Ok(Some(actual)) => {
                metrics::counter!("sale_store_concurrency_conflicts_total").increment(1);
                StoreError::ConcurrencyConflict {
                    sale_id: sale.id(),
                    expected: sale.version(),
                    actual: Version::new(actual),
                }
            }
            Ok(None) => StoreError::NotFound(sale.id()),
            Err(e) => StoreError::Database(e),
        }
    }

    async fn fetch_one(&self, id: SaleId) -> Result<Option<Sale>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {SALE_COLUMNS} FROM sales s WHERE s.id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => {
                let mut items = self.load_items(&[id.as_uuid()]).await?;
                let items = items.remove(&id.as_uuid()).unwrap_or_default();
                Ok(Some(Self::row_to_sale(&row, items)?))
            }
            None => Ok(None),
        }
    }
}

/// Escapes LIKE wildcards and wraps the value for a substring match.
fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn order_by(criteria: &SaleSearchCriteria) -> String {
    let Some(field) = criteria.sort_field else {
        return " ORDER BY s.number ASC".to_string();
    };
    let column = match field {
        SaleSortField::CreatedDate => "s.created_date",
        SaleSortField::CustomerName => "s.customer_name",
        SaleSortField::BranchName => "s.branch_name",
    };
    let direction = match criteria.sort_direction.unwrap_or_default() {
        SortDirection::Ascending => "ASC",
        SortDirection::Descending => "DESC",
    };
    format!(" ORDER BY {column} {direction}, s.number ASC")
}

/// Builds the WHERE clause and returns it with the patterns to bind, in order.
fn where_clause(criteria: &SaleSearchCriteria) -> (String, Vec<String>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut params = Vec::new();

    if let Some(customer) = SaleSearchCriteria::effective(&criteria.customer_name) {
        params.push(like_pattern(customer));
        sql.push_str(&format!(" AND s.customer_name ILIKE ${}", params.len()));
    }
    if let Some(branch) = SaleSearchCriteria::effective(&criteria.branch_name) {
        params.push(like_pattern(branch));
        sql.push_str(&format!(" AND s.branch_name ILIKE ${}", params.len()));
    }
    if let Some(product) = SaleSearchCriteria::effective(&criteria.product_name) {
        params.push(like_pattern(product));
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM sale_items i WHERE i.sale_id = s.id AND i.product_name ILIKE ${})",
            params.len()
        ));
    }

    (sql, params)
}

#[async_trait]
impl SaleRepository for PostgresSaleRepository {
    async fn get_by_id(&self, id: SaleId) -> Result<Option<Sale>> {
        self.fetch_one(id).await
    }

    /// A plain read. Lost updates are prevented by the version check in
    /// `update` and `delete` rather than by holding a row lock across the
    /// request.
    async fn get_by_id_for_update(&self, id: SaleId) -> Result<Option<Sale>> {
        self.fetch_one(id).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_paginated(
        &self,
        page: u32,
        size: u32,
        criteria: &SaleSearchCriteria,
    ) -> Result<SalePage> {
        let (filter, params) = where_clause(criteria);

        let count_sql = format!("SELECT COUNT(*) FROM sales s{filter}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for param in &params {
            count_query = count_query.bind(param);
        }
        let total_count = count_query.fetch_one(&self.pool).await?;

        let page_sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales s{filter}{} LIMIT ${} OFFSET ${}",
            order_by(criteria),
            params.len() + 1,
            params.len() + 2,
        );
        let mut page_query = sqlx::query(&page_sql);
        for param in &params {
            page_query = page_query.bind(param);
        }
        let rows = page_query
            .bind(i64::from(size))
            .bind(page_offset(page, size) as i64)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<_, _>>()?;
        let mut items = self.load_items(&ids).await?;

        let sales = rows
            .iter()
            .zip(&ids)
            .map(|(row, id)| Self::row_to_sale(row, items.remove(id).unwrap_or_default()))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(returned = sales.len(), total_count, "loaded sales page");
        Ok(SalePage {
            sales,
            total_count: total_count.max(0) as u64,
        })
    }

    #[tracing::instrument(skip(self, sale), fields(sale_id = %sale.id()))]
    async fn create(&self, sale: &Sale) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let number: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sales (id, created_date, customer_id, customer_name, branch_id, branch_name,
                               total_amount, is_cancelled, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING number
            "#,
        )
        .bind(sale.id().as_uuid())
        .bind(sale.created_date())
        .bind(sale.customer().id())
        .bind(sale.customer().description())
        .bind(sale.branch().id())
        .bind(sale.branch().description())
        .bind(sale.total_amount())
        .bind(sale.is_cancelled())
        .bind(Version::first().as_i64())
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_items(&mut tx, sale).await?;
        tx.commit().await?;
        Ok(number)
    }

    #[tracing::instrument(skip(self, sale), fields(sale_id = %sale.id(), version = %sale.version()))]
    async fn update(&self, sale: &Sale) -> Result<Version> {
        let mut tx = self.pool.begin().await?;

        let new_version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE sales
            SET customer_id = $3, customer_name = $4, branch_id = $5, branch_name = $6,
                total_amount = $7, is_cancelled = $8, version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(sale.id().as_uuid())
        .bind(sale.version().as_i64())
        .bind(sale.customer().id())
        .bind(sale.customer().description())
        .bind(sale.branch().id())
        .bind(sale.branch().description())
        .bind(sale.total_amount())
        .bind(sale.is_cancelled())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(new_version) = new_version else {
            return Err(Self::write_rejection(&mut tx, sale).await);
        };

        // items are replaced wholesale
        sqlx::query("DELETE FROM sale_items WHERE sale_id = $1")
            .bind(sale.id().as_uuid())
            .execute(&mut *tx)
            .await?;
        Self::insert_items(&mut tx, sale).await?;

        tx.commit().await?;
        Ok(Version::new(new_version))
    }

    #[tracing::instrument(skip(self, sale), fields(sale_id = %sale.id(), version = %sale.version()))]
    async fn delete(&self, sale: &Sale) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM sales WHERE id = $1 AND version = $2")
            .bind(sale.id().as_uuid())
            .bind(sale.version().as_i64())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Self::write_rejection(&mut tx, sale).await);
        }

        tx.commit().await?;
        Ok(())
    }
}
