//! Sale endpoints.

use std::sync::Arc;

use application::{
    CancelSaleCommand, CancelSaleItemCommand, CreateSaleCommand, DeleteSaleCommand,
    DeleteSaleItemCommand, GetSaleQuery, GetSalesQuery, PaginatedList, SaleItemCommand,
    SaleResult, SaleService, UpdateSaleCommand,
};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{SaleId, SaleItemId};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::response::{ApiResponse, Envelope};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub sales: SaleService,
}

// -- Request types --

/// Body of `POST /sales` and `PUT /sales/{id}`.
///
/// Missing fields deserialize to empty values so that they are reported by
/// validation together with every other problem.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SaleRequest {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub items: Vec<SaleItemRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SaleItemRequest {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl SaleRequest {
    fn into_items(self) -> (Uuid, String, Uuid, String, Vec<SaleItemCommand>) {
        let items = self
            .items
            .into_iter()
            .map(|item| {
                SaleItemCommand::new(
                    item.product_id,
                    item.product_name,
                    item.quantity,
                    item.unit_price,
                )
            })
            .collect();
        (
            self.customer_id,
            self.customer_name,
            self.branch_id,
            self.branch_name,
            items,
        )
    }
}

/// Query string of `GET /sales`.
#[derive(Debug, Deserialize)]
pub struct ListSalesParams {
    #[serde(rename = "_page")]
    pub page: Option<i64>,
    #[serde(rename = "_size")]
    pub size: Option<i64>,
    #[serde(rename = "customerName")]
    pub customer_name: Option<String>,
    #[serde(rename = "branchName")]
    pub branch_name: Option<String>,
    #[serde(rename = "productName")]
    pub product_name: Option<String>,
    #[serde(rename = "_sort")]
    pub sort: Option<String>,
    #[serde(rename = "_order")]
    pub order: Option<String>,
}

impl From<ListSalesParams> for GetSalesQuery {
    fn from(params: ListSalesParams) -> Self {
        let defaults = GetSalesQuery::default();
        GetSalesQuery {
            page_number: params.page.unwrap_or(defaults.page_number),
            page_size: params.size.unwrap_or(defaults.page_size),
            customer_name: params.customer_name,
            branch_name: params.branch_name,
            product_name: params.product_name,
            sort_field: params.sort,
            sort_direction: params.order,
        }
    }
}

// -- Handlers --

/// POST /sales: create a sale with its items.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaleRequest>,
) -> Result<Envelope<SaleResult>, ApiError> {
    let (customer_id, customer_name, branch_id, branch_name, items) = req.into_items();
    let sale = state
        .sales
        .create_sale(CreateSaleCommand {
            customer_id,
            customer_name,
            branch_id,
            branch_name,
            items,
        })
        .await?;

    Ok(Envelope(
        StatusCode::CREATED,
        ApiResponse::ok("Sale created successfully", sale),
    ))
}

/// GET /sales: one page of sales, filtered and sorted.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSalesParams>,
) -> Result<Envelope<PaginatedList<SaleResult>>, ApiError> {
    let page = state.sales.get_sales(params.into()).await?;
    Ok(Envelope(
        StatusCode::OK,
        ApiResponse::ok("Sales retrieved successfully", page),
    ))
}

/// GET /sales/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Envelope<SaleResult>, ApiError> {
    let sale = state
        .sales
        .get_sale(GetSaleQuery::new(parse_sale_id(&id)?))
        .await?;
    Ok(Envelope(
        StatusCode::OK,
        ApiResponse::ok("Sale retrieved successfully", sale),
    ))
}

/// PUT /sales/{id}: replace customer, branch and items.
#[tracing::instrument(skip(state, req))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SaleRequest>,
) -> Result<Envelope<SaleResult>, ApiError> {
    let sale_id = parse_sale_id(&id)?;
    let (customer_id, customer_name, branch_id, branch_name, items) = req.into_items();
    let sale = state
        .sales
        .update_sale(UpdateSaleCommand {
            sale_id,
            customer_id,
            customer_name,
            branch_id,
            branch_name,
            items,
        })
        .await?;
    Ok(Envelope(
        StatusCode::OK,
        ApiResponse::ok("Sale updated successfully", sale),
    ))
}

/// PATCH /sales/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Envelope<SaleResult>, ApiError> {
    let sale = state
        .sales
        .cancel_sale(CancelSaleCommand::new(parse_sale_id(&id)?))
        .await?;
    Ok(Envelope(
        StatusCode::OK,
        ApiResponse::ok("Sale cancelled successfully", sale),
    ))
}

/// PATCH /sales/{sale_id}/items/{item_id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel_item(
    State(state): State<Arc<AppState>>,
    Path((sale_id, item_id)): Path<(String, String)>,
) -> Result<Envelope<SaleResult>, ApiError> {
    let sale = state
        .sales
        .cancel_sale_item(CancelSaleItemCommand::new(
            parse_sale_id(&sale_id)?,
            parse_item_id(&item_id)?,
        ))
        .await?;
    Ok(Envelope(
        StatusCode::OK,
        ApiResponse::ok("Sale item cancelled successfully", sale),
    ))
}

/// DELETE /sales/{id}
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .sales
        .delete_sale(DeleteSaleCommand::new(parse_sale_id(&id)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /sales/{sale_id}/items/{item_id}: removing the last item deletes the sale.
#[tracing::instrument(skip(state))]
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path((sale_id, item_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .sales
        .delete_sale_item(DeleteSaleItemCommand::new(
            parse_sale_id(&sale_id)?,
            parse_item_id(&item_id)?,
        ))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_uuid(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}

fn parse_sale_id(id: &str) -> Result<SaleId, ApiError> {
    parse_uuid(id).map(SaleId::from_uuid)
}

fn parse_item_id(id: &str) -> Result<SaleItemId, ApiError> {
    parse_uuid(id).map(SaleItemId::from_uuid)
}
