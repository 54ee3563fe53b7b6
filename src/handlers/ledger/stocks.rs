use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::handlers::common::{
    created_response, default_true, no_content_response, normalize_optional_string,
    normalize_string, parse_lookup_id, success_response, validate_input, validate_slug_field,
    JsonBody, PaginatedResponse, PaginationParams,
};
use crate::{
    errors::ApiError,
    services::stocks::{CreateStockInput, StockDetail, StockFilter, UpdateStockInput},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Creates the router for stock ledger endpoints
pub fn stocks_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_stocks))
        .route("/:id", get(get_stock))
        .with_permission(perm::STOCKS_READ);
    let create = Router::new()
        .route("/", post(create_stock))
        .with_permission(perm::STOCKS_CREATE);
    let update = Router::new()
        .route("/:id", put(update_stock))
        .with_permission(perm::STOCKS_UPDATE);
    let remove = Router::new()
        .route("/:id", delete(delete_stock))
        .with_permission(perm::STOCKS_DELETE);

    read.merge(create).merge(update).merge(remove)
}

/// Stock list filters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StockListQuery {
    pub product_slug: Option<String>,
    pub warehouse_slug: Option<String>,
    pub is_active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/v1/stocks",
    params(PaginationParams, StockListQuery),
    responses(
        (status = 200, description = "Stock rows listed", body = PaginatedResponse<StockResponse>),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stocks"
)]
pub async fn list_stocks(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(query): Query<StockListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = params.resolve(&state.config)?;
    let filter = StockFilter {
        product_slug: normalize_optional_string(query.product_slug),
        warehouse_slug: normalize_optional_string(query.warehouse_slug),
        is_active: query.is_active,
    };

    let (stocks, total) = state
        .services
        .stocks
        .list_stocks(filter, page, per_page)
        .await?;
    let data = stocks.into_iter().map(StockResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// Open a stock row for a (product, variant, warehouse) triple
#[utoipa::path(
    post,
    path = "/api/v1/stocks",
    request_body = CreateStockRequest,
    responses(
        (status = 201, description = "Stock row created", body = StockResponse),
        (status = 400, description = "Invalid payload or duplicate triple", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stocks"
)]
pub async fn create_stock(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateStockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateStockInput {
        product_slug: normalize_string(payload.product_slug),
        variant_slug: normalize_optional_string(payload.variant_slug),
        warehouse_slug: normalize_string(payload.warehouse_slug),
        quantity: payload.quantity,
        reserved_quantity: payload.reserved_quantity,
        min_quantity: payload.min_quantity,
        max_quantity: payload.max_quantity,
        is_active: payload.is_active,
    };

    let stock = state.services.stocks.create_stock(input).await?;
    Ok(created_response(StockResponse::from(stock)))
}

#[utoipa::path(
    get,
    path = "/api/v1/stocks/{id}",
    params(("id" = Uuid, Path, description = "Stock ID")),
    responses(
        (status = 200, description = "Stock row retrieved", body = StockResponse),
        (status = 404, description = "Stock row not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stocks"
)]
pub async fn get_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let stock_id = parse_lookup_id(&id, "Stock")?;
    let stock = state.services.stocks.get_stock(stock_id).await?;
    Ok(success_response(StockResponse::from(stock)))
}

/// Partially update a stock row.
///
/// Counters are stored as given; nothing is recomputed from transactions.
#[utoipa::path(
    put,
    path = "/api/v1/stocks/{id}",
    params(("id" = Uuid, Path, description = "Stock ID")),
    request_body = UpdateStockRequest,
    responses(
        (status = 200, description = "Stock row updated", body = StockResponse),
        (status = 400, description = "Invalid payload or duplicate triple", body = crate::errors::ErrorResponse),
        (status = 404, description = "Stock row not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stocks"
)]
pub async fn update_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateStockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let stock_id = parse_lookup_id(&id, "Stock")?;
    validate_input(&payload)?;

    let input = UpdateStockInput {
        product_slug: normalize_optional_string(payload.product_slug),
        variant_slug: normalize_optional_string(payload.variant_slug),
        warehouse_slug: normalize_optional_string(payload.warehouse_slug),
        quantity: payload.quantity,
        reserved_quantity: payload.reserved_quantity,
        min_quantity: payload.min_quantity,
        max_quantity: payload.max_quantity,
        is_active: payload.is_active,
    };

    let stock = state.services.stocks.update_stock(stock_id, input).await?;
    Ok(success_response(StockResponse::from(stock)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stocks/{id}",
    params(("id" = Uuid, Path, description = "Stock ID")),
    responses(
        (status = 204, description = "Stock row and its transactions deleted"),
        (status = 404, description = "Stock row not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stocks"
)]
pub async fn delete_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let stock_id = parse_lookup_id(&id, "Stock")?;
    state.services.stocks.delete_stock(stock_id).await?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStockRequest {
    #[validate(custom = "validate_slug_field")]
    #[schema(example = "widget")]
    pub product_slug: String,
    /// Omit for the product-level row
    #[validate(custom = "validate_slug_field")]
    #[serde(default)]
    #[schema(example = "widget-large")]
    pub variant_slug: Option<String>,
    #[validate(custom = "validate_slug_field")]
    #[schema(example = "central")]
    pub warehouse_slug: String,
    #[serde(default)]
    #[schema(example = 10)]
    pub quantity: i32,
    #[serde(default)]
    #[schema(example = 2)]
    pub reserved_quantity: i32,
    #[serde(default)]
    pub min_quantity: i32,
    #[serde(default)]
    pub max_quantity: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Omitted slugs keep the current reference.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateStockRequest {
    #[validate(custom = "validate_slug_field")]
    pub product_slug: Option<String>,
    #[validate(custom = "validate_slug_field")]
    pub variant_slug: Option<String>,
    #[validate(custom = "validate_slug_field")]
    pub warehouse_slug: Option<String>,
    pub quantity: Option<i32>,
    pub reserved_quantity: Option<i32>,
    pub min_quantity: Option<i32>,
    pub max_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockResponse {
    pub id: Uuid,
    pub slug: String,
    pub product_slug: String,
    pub product_name: String,
    pub variant_slug: Option<String>,
    pub variant_name: Option<String>,
    pub warehouse_slug: String,
    pub warehouse_name: String,
    /// `"{product} - {variant or Default} @ {warehouse}"`
    pub label: String,
    pub quantity: i32,
    pub reserved_quantity: i32,
    pub min_quantity: i32,
    pub max_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StockDetail> for StockResponse {
    fn from(detail: StockDetail) -> Self {
        let label = detail.label();
        let variant_name = detail.variant_label();
        let StockDetail {
            stock,
            product,
            variant,
            warehouse,
        } = detail;

        Self {
            id: stock.id,
            slug: stock.slug,
            product_slug: product.slug,
            product_name: product.name,
            variant_slug: variant.map(|v| v.slug),
            variant_name,
            warehouse_slug: warehouse.slug,
            warehouse_name: warehouse.name,
            label,
            quantity: stock.quantity,
            reserved_quantity: stock.reserved_quantity,
            min_quantity: stock.min_quantity,
            max_quantity: stock.max_quantity,
            is_active: stock.is_active,
            created_at: stock.created_at,
            updated_at: stock.updated_at,
        }
    }
}
