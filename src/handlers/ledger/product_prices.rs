use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::handlers::common::{
    created_response, default_true, no_content_response, normalize_optional_string,
    normalize_string, parse_lookup_id, require_non_blank, success_response,
    validate_input, validate_money, validate_slug_field, JsonBody, PaginatedResponse,
    PaginationParams,
};
use crate::{
    errors::{ApiError, ServiceError},
    services::pricing::{
        CreateProductPriceInput, PriceDetail, ProductPriceFilter, UpdateProductPriceInput,
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
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Creates the router for price book endpoints
pub fn product_prices_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_product_prices))
        .route("/:id", get(get_product_price))
        .with_permission(perm::PRODUCT_PRICES_READ);
    let create = Router::new()
        .route("/", post(create_product_price))
        .with_permission(perm::PRODUCT_PRICES_CREATE);
    let update = Router::new()
        .route("/:id", put(update_product_price))
        .with_permission(perm::PRODUCT_PRICES_UPDATE);
    let remove = Router::new()
        .route("/:id", delete(delete_product_price))
        .with_permission(perm::PRODUCT_PRICES_DELETE);

    read.merge(create).merge(update).merge(remove)
}

const MAX_CURRENCY_LENGTH: usize = 5;

/// Trims and upper-cases a currency code, then checks its length.
fn upper_currency(field: &str, raw: String) -> Result<String, ApiError> {
    let code = require_non_blank(field, raw)?.to_uppercase();
    if code.chars().count() > MAX_CURRENCY_LENGTH {
        return Err(ServiceError::field(
            field,
            "Ensure this field has no more than 5 characters.",
        )
        .into());
    }
    Ok(code)
}

/// Price book list filters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductPriceListQuery {
    pub product_slug: Option<String>,
    pub warehouse_slug: Option<String>,
    /// ISO currency code, case-insensitive
    pub currency: Option<String>,
    pub is_active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/v1/product-prices",
    params(PaginationParams, ProductPriceListQuery),
    responses(
        (status = 200, description = "Prices listed", body = PaginatedResponse<ProductPriceResponse>),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Product Prices"
)]
pub async fn list_product_prices(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(query): Query<ProductPriceListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = params.resolve(&state.config)?;
    let filter = ProductPriceFilter {
        product_slug: normalize_optional_string(query.product_slug),
        warehouse_slug: normalize_optional_string(query.warehouse_slug),
        currency: normalize_optional_string(query.currency).map(|c| c.to_uppercase()),
        is_active: query.is_active,
    };

    let (prices, total) = state
        .services
        .product_prices
        .list_prices(filter, page, per_page)
        .await?;
    let data = prices.into_iter().map(ProductPriceResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// Add a price entry; omit `warehouse_slug` for a global price
#[utoipa::path(
    post,
    path = "/api/v1/product-prices",
    request_body = CreateProductPriceRequest,
    responses(
        (status = 201, description = "Price created", body = ProductPriceResponse),
        (status = 400, description = "Invalid payload, unknown reference or duplicate key", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Product Prices"
)]
pub async fn create_product_price(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateProductPriceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let currency = payload
        .currency
        .unwrap_or_else(|| state.config.default_currency.clone());
    let input = CreateProductPriceInput {
        product_slug: normalize_string(payload.product_slug),
        variant_slug: normalize_optional_string(payload.variant_slug),
        warehouse_slug: normalize_optional_string(payload.warehouse_slug),
        price: payload.price,
        compare_at_price: payload.compare_at_price,
        cost_price: payload.cost_price,
        currency: upper_currency("currency", currency)?,
        is_active: payload.is_active,
    };

    let price = state.services.product_prices.create_price(input).await?;
    Ok(created_response(ProductPriceResponse::from(price)))
}

#[utoipa::path(
    get,
    path = "/api/v1/product-prices/{id}",
    params(("id" = Uuid, Path, description = "Product price ID")),
    responses(
        (status = 200, description = "Price retrieved", body = ProductPriceResponse),
        (status = 404, description = "Price not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Product Prices"
)]
pub async fn get_product_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let price_id = parse_lookup_id(&id, "Product price")?;
    let price = state.services.product_prices.get_price(price_id).await?;
    Ok(success_response(ProductPriceResponse::from(price)))
}

#[utoipa::path(
    put,
    path = "/api/v1/product-prices/{id}",
    params(("id" = Uuid, Path, description = "Product price ID")),
    request_body = UpdateProductPriceRequest,
    responses(
        (status = 200, description = "Price updated", body = ProductPriceResponse),
        (status = 400, description = "Invalid payload, unknown reference or duplicate key", body = crate::errors::ErrorResponse),
        (status = 404, description = "Price not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Product Prices"
)]
pub async fn update_product_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateProductPriceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let price_id = parse_lookup_id(&id, "Product price")?;
    validate_input(&payload)?;

    let input = UpdateProductPriceInput {
        product_slug: normalize_optional_string(payload.product_slug),
        variant_slug: normalize_optional_string(payload.variant_slug),
        warehouse_slug: normalize_optional_string(payload.warehouse_slug),
        price: payload.price,
        compare_at_price: payload.compare_at_price,
        cost_price: payload.cost_price,
        currency: payload
            .currency
            .map(|raw| upper_currency("currency", raw))
            .transpose()?,
        is_active: payload.is_active,
    };

    let price = state
        .services
        .product_prices
        .update_price(price_id, input)
        .await?;
    Ok(success_response(ProductPriceResponse::from(price)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/product-prices/{id}",
    params(("id" = Uuid, Path, description = "Product price ID")),
    responses(
        (status = 204, description = "Price deleted"),
        (status = 404, description = "Price not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Product Prices"
)]
pub async fn delete_product_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let price_id = parse_lookup_id(&id, "Product price")?;
    state.services.product_prices.delete_price(price_id).await?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductPriceRequest {
    #[validate(custom = "validate_slug_field")]
    #[schema(example = "widget")]
    pub product_slug: String,
    #[validate(custom = "validate_slug_field")]
    #[serde(default)]
    pub variant_slug: Option<String>,
    /// Omit for a global price
    #[validate(custom = "validate_slug_field")]
    #[serde(default)]
    #[schema(example = "central")]
    pub warehouse_slug: Option<String>,
    #[validate(custom = "validate_money")]
    #[serde(default)]
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    #[validate(custom = "validate_money")]
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "24.99")]
    pub compare_at_price: Option<Decimal>,
    #[validate(custom = "validate_money")]
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "8.50")]
    pub cost_price: Option<Decimal>,
    /// Defaults to the configured currency
    #[serde(default)]
    #[schema(example = "USD")]
    pub currency: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateProductPriceRequest {
    #[validate(custom = "validate_slug_field")]
    pub product_slug: Option<String>,
    #[validate(custom = "validate_slug_field")]
    pub variant_slug: Option<String>,
    #[validate(custom = "validate_slug_field")]
    pub warehouse_slug: Option<String>,
    #[validate(custom = "validate_money")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[validate(custom = "validate_money")]
    #[schema(value_type = Option<String>)]
    pub compare_at_price: Option<Decimal>,
    #[validate(custom = "validate_money")]
    #[schema(value_type = Option<String>)]
    pub cost_price: Option<Decimal>,
    pub currency: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductPriceResponse {
    pub id: Uuid,
    pub slug: String,
    pub product_slug: String,
    pub product_name: String,
    pub variant_slug: Option<String>,
    pub variant_name: Option<String>,
    /// `null` for a global price
    pub warehouse_slug: Option<String>,
    pub warehouse_name: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    #[schema(value_type = Option<String>)]
    pub compare_at_price: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub cost_price: Option<Decimal>,
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PriceDetail> for ProductPriceResponse {
    fn from(detail: PriceDetail) -> Self {
        let variant_name = detail.variant_label();
        let PriceDetail {
            price,
            product,
            variant,
            warehouse,
        } = detail;
        let (warehouse_slug, warehouse_name) = match warehouse {
            Some(w) => (Some(w.slug), Some(w.name)),
            None => (None, None),
        };

        Self {
            id: price.id,
            slug: price.slug,
            product_slug: product.slug,
            product_name: product.name,
            variant_slug: variant.map(|v| v.slug),
            variant_name,
            warehouse_slug,
            warehouse_name,
            price: price.price,
            compare_at_price: price.compare_at_price,
            cost_price: price.cost_price,
            currency: price.currency,
            is_active: price.is_active,
            created_at: price.created_at,
            updated_at: price.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_is_uppercased() {
        assert_eq!(upper_currency("currency", " eur ".into()).unwrap(), "EUR");
        assert!(upper_currency("currency", "  ".into()).is_err());
    }

    #[test]
    fn currency_length_is_checked_after_trimming() {
        assert_eq!(upper_currency("currency", " usd  ".into()).unwrap(), "USD");
        assert_eq!(upper_currency("currency", "usdtx".into()).unwrap(), "USDTX");
        assert!(upper_currency("currency", "euros1".into()).is_err());
    }

    #[test]
    fn negative_and_overprecise_prices_are_field_errors() {
        let request: CreateProductPriceRequest = serde_json::from_value(serde_json::json!({
            "product_slug": "widget",
            "price": "-1.00",
            "cost_price": "1.234"
        }))
        .unwrap();

        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("price"));
        assert!(fields.contains_key("cost_price"));
        assert!(!fields.contains_key("compare_at_price"));
    }
}
