use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::entities::stock_transaction::TransactionType;
use crate::handlers::common::{
    created_response, no_content_response, normalize_optional_string, parse_choice,
    parse_lookup_id, patch_nullable, success_response, validate_input, JsonBody,
    PaginatedResponse, PaginationParams,
};
use crate::{
    errors::ApiError,
    services::stock_transactions::{
        CreateStockTransactionInput, StockTransactionFilter, TransactionDetail,
        UpdateStockTransactionInput,
    },
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

/// Creates the router for stock transaction log endpoints
pub fn stock_transactions_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_stock_transactions))
        .route("/:id", get(get_stock_transaction))
        .with_permission(perm::STOCK_TRANSACTIONS_READ);
    let create = Router::new()
        .route("/", post(create_stock_transaction))
        .with_permission(perm::STOCK_TRANSACTIONS_CREATE);
    let update = Router::new()
        .route("/:id", put(update_stock_transaction))
        .with_permission(perm::STOCK_TRANSACTIONS_UPDATE);
    let remove = Router::new()
        .route("/:id", delete(delete_stock_transaction))
        .with_permission(perm::STOCK_TRANSACTIONS_DELETE);

    read.merge(create).merge(update).merge(remove)
}

/// Transaction log filters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StockTransactionListQuery {
    pub stock_id: Option<Uuid>,
    /// One of `adjustment`, `sale`, `return`, `transfer`
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
}

/// List transactions, newest first
#[utoipa::path(
    get,
    path = "/api/v1/stock-transactions",
    params(PaginationParams, StockTransactionListQuery),
    responses(
        (status = 200, description = "Transactions listed", body = PaginatedResponse<StockTransactionResponse>),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stock Transactions"
)]
pub async fn list_stock_transactions(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(query): Query<StockTransactionListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = params.resolve(&state.config)?;
    let transaction_type = normalize_optional_string(query.transaction_type)
        .map(|raw| parse_choice::<TransactionType>("type", &raw))
        .transpose()?;
    let filter = StockTransactionFilter {
        stock_id: query.stock_id,
        transaction_type,
    };

    let (transactions, total) = state
        .services
        .stock_transactions
        .list_transactions(filter, page, per_page)
        .await?;
    let data = transactions
        .into_iter()
        .map(StockTransactionResponse::from)
        .collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// Append a transaction.
///
/// The referenced stock row's counters are not modified.
#[utoipa::path(
    post,
    path = "/api/v1/stock-transactions",
    request_body = CreateStockTransactionRequest,
    responses(
        (status = 201, description = "Transaction recorded", body = StockTransactionResponse),
        (status = 400, description = "Invalid payload or unknown stock", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stock Transactions"
)]
pub async fn create_stock_transaction(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateStockTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateStockTransactionInput {
        stock_id: payload.stock_id,
        transaction_type: parse_choice("type", &payload.transaction_type)?,
        quantity: payload.quantity,
        note: normalize_optional_string(payload.note),
        reference: normalize_optional_string(payload.reference),
    };

    let transaction = state
        .services
        .stock_transactions
        .create_transaction(input)
        .await?;
    Ok(created_response(StockTransactionResponse::from(transaction)))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock-transactions/{id}",
    params(("id" = Uuid, Path, description = "Stock transaction ID")),
    responses(
        (status = 200, description = "Transaction retrieved", body = StockTransactionResponse),
        (status = 404, description = "Transaction not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stock Transactions"
)]
pub async fn get_stock_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction_id = parse_lookup_id(&id, "Stock transaction")?;
    let transaction = state
        .services
        .stock_transactions
        .get_transaction(transaction_id)
        .await?;
    Ok(success_response(StockTransactionResponse::from(transaction)))
}

#[utoipa::path(
    put,
    path = "/api/v1/stock-transactions/{id}",
    params(("id" = Uuid, Path, description = "Stock transaction ID")),
    request_body = UpdateStockTransactionRequest,
    responses(
        (status = 200, description = "Transaction updated", body = StockTransactionResponse),
        (status = 400, description = "Invalid payload or unknown stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Transaction not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stock Transactions"
)]
pub async fn update_stock_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateStockTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction_id = parse_lookup_id(&id, "Stock transaction")?;
    validate_input(&payload)?;

    let transaction_type = payload
        .transaction_type
        .as_deref()
        .map(|raw| parse_choice("type", raw))
        .transpose()?;
    let input = UpdateStockTransactionInput {
        stock_id: payload.stock_id,
        transaction_type,
        quantity: payload.quantity,
        note: patch_nullable(payload.note),
        reference: patch_nullable(payload.reference),
    };

    let transaction = state
        .services
        .stock_transactions
        .update_transaction(transaction_id, input)
        .await?;
    Ok(success_response(StockTransactionResponse::from(transaction)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stock-transactions/{id}",
    params(("id" = Uuid, Path, description = "Stock transaction ID")),
    responses(
        (status = 204, description = "Transaction deleted"),
        (status = 404, description = "Transaction not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stock Transactions"
)]
pub async fn delete_stock_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction_id = parse_lookup_id(&id, "Stock transaction")?;
    state
        .services
        .stock_transactions
        .delete_transaction(transaction_id)
        .await?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStockTransactionRequest {
    pub stock_id: Uuid,
    #[serde(rename = "type")]
    #[schema(example = "sale")]
    pub transaction_type: String,
    /// Signed delta; negative for outbound movements
    pub quantity: i32,
    #[serde(default)]
    pub note: Option<String>,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    #[serde(default)]
    #[schema(example = "ORD-1001")]
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateStockTransactionRequest {
    pub stock_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub quantity: Option<i32>,
    pub note: Option<String>,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockTransactionResponse {
    pub id: Uuid,
    pub slug: String,
    pub stock_id: Uuid,
    pub stock_label: String,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub quantity: i32,
    pub note: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TransactionDetail> for StockTransactionResponse {
    fn from(detail: TransactionDetail) -> Self {
        let TransactionDetail {
            transaction,
            stock_label,
        } = detail;

        Self {
            id: transaction.id,
            slug: transaction.slug,
            stock_id: transaction.stock_id,
            stock_label,
            transaction_type: transaction.transaction_type.to_string(),
            quantity: transaction.quantity,
            note: transaction.note,
            reference: transaction.reference,
            created_at: transaction.created_at,
            updated_at: transaction.updated_at,
        }
    }
}
