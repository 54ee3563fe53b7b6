use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::handlers::common::{
    created_response, default_true, no_content_response, normalize_optional_string,
    optional_non_blank, patch_nullable, require_non_blank, success_response, validate_input,
    validate_money, validate_slug_field, JsonBody, PaginatedResponse, PaginationParams,
};
use crate::{
    errors::ApiError,
    services::variants::{CreateVariantInput, UpdateVariantInput, VariantDetail},
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

pub fn variants_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_variants))
        .route("/:slug", get(get_variant))
        .with_permission(perm::VARIANTS_READ);
    let create = Router::new()
        .route("/", post(create_variant))
        .with_permission(perm::VARIANTS_CREATE);
    let update = Router::new()
        .route("/:slug", put(update_variant))
        .with_permission(perm::VARIANTS_UPDATE);
    let remove = Router::new()
        .route("/:slug", delete(delete_variant))
        .with_permission(perm::VARIANTS_DELETE);

    read.merge(create).merge(update).merge(remove)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VariantListQuery {
    /// Only variants of this product
    pub product_slug: Option<String>,
}

/// List variants ordered by name
#[utoipa::path(
    get,
    path = "/api/v1/variants",
    params(PaginationParams, VariantListQuery),
    responses(
        (status = 200, description = "Variants listed", body = PaginatedResponse<VariantResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Variants"
)]
pub async fn list_variants(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(query): Query<VariantListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = params.resolve(&state.config)?;
    let (variants, total) = state
        .services
        .variants
        .list_variants(
            normalize_optional_string(query.product_slug),
            page,
            per_page,
        )
        .await?;

    let data = variants.into_iter().map(VariantResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/variants",
    request_body = CreateVariantRequest,
    responses(
        (status = 201, description = "Variant created", body = VariantResponse),
        (status = 400, description = "Invalid payload or unknown product", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Variants"
)]
pub async fn create_variant(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateVariantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateVariantInput {
        product_slug: payload.product_slug,
        sku: require_non_blank("sku", payload.sku)?,
        barcode: normalize_optional_string(payload.barcode),
        name: normalize_optional_string(payload.name),
        price: payload.price,
        compare_at_price: payload.compare_at_price,
        cost_price: payload.cost_price,
        tax_code: normalize_optional_string(payload.tax_code),
        weight_grams: payload.weight_grams,
        is_active: payload.is_active,
    };

    let variant = state.services.variants.create_variant(input).await?;
    Ok(created_response(VariantResponse::from(variant)))
}

#[utoipa::path(
    get,
    path = "/api/v1/variants/{slug}",
    params(("slug" = String, Path, description = "Variant slug")),
    responses(
        (status = 200, description = "Variant retrieved", body = VariantResponse),
        (status = 404, description = "Variant not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Variants"
)]
pub async fn get_variant(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let variant = state.services.variants.get_variant(&slug).await?;
    Ok(success_response(VariantResponse::from(variant)))
}

#[utoipa::path(
    put,
    path = "/api/v1/variants/{slug}",
    params(("slug" = String, Path, description = "Variant slug")),
    request_body = UpdateVariantRequest,
    responses(
        (status = 200, description = "Variant updated", body = VariantResponse),
        (status = 400, description = "Invalid payload or unknown product", body = crate::errors::ErrorResponse),
        (status = 404, description = "Variant not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Variants"
)]
pub async fn update_variant(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    JsonBody(payload): JsonBody<UpdateVariantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = UpdateVariantInput {
        product_slug: payload.product_slug,
        sku: optional_non_blank("sku", payload.sku)?,
        barcode: patch_nullable(payload.barcode),
        name: patch_nullable(payload.name),
        price: payload.price,
        compare_at_price: payload.compare_at_price,
        cost_price: payload.cost_price,
        tax_code: patch_nullable(payload.tax_code),
        weight_grams: payload.weight_grams,
        is_active: payload.is_active,
    };

    let variant = state.services.variants.update_variant(&slug, input).await?;
    Ok(success_response(VariantResponse::from(variant)))
}

/// Delete a variant with its stock rows and prices
#[utoipa::path(
    delete,
    path = "/api/v1/variants/{slug}",
    params(("slug" = String, Path, description = "Variant slug")),
    responses(
        (status = 204, description = "Variant deleted"),
        (status = 404, description = "Variant not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Variants"
)]
pub async fn delete_variant(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.variants.delete_variant(&slug).await?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVariantRequest {
    #[validate(custom = "validate_slug_field")]
    #[schema(example = "trail-runner")]
    pub product_slug: String,
    #[validate(length(max = 120, message = "Ensure this field has no more than 120 characters."))]
    #[schema(example = "TR-100-42")]
    pub sku: String,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    #[serde(default)]
    pub barcode: Option<String>,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    #[serde(default)]
    #[schema(example = "Size 42")]
    pub name: Option<String>,
    #[validate(custom = "validate_money")]
    #[schema(value_type = String, example = "89.00")]
    pub price: Decimal,
    #[validate(custom = "validate_money")]
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub compare_at_price: Option<Decimal>,
    #[validate(custom = "validate_money")]
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub cost_price: Option<Decimal>,
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    #[serde(default)]
    pub tax_code: Option<String>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    #[serde(default)]
    pub weight_grams: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateVariantRequest {
    /// Move the variant to another product
    #[validate(custom = "validate_slug_field")]
    pub product_slug: Option<String>,
    #[validate(length(max = 120, message = "Ensure this field has no more than 120 characters."))]
    pub sku: Option<String>,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub barcode: Option<String>,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
    #[validate(custom = "validate_money")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[validate(custom = "validate_money")]
    #[schema(value_type = Option<String>)]
    pub compare_at_price: Option<Decimal>,
    #[validate(custom = "validate_money")]
    #[schema(value_type = Option<String>)]
    pub cost_price: Option<Decimal>,
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub tax_code: Option<String>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub weight_grams: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VariantResponse {
    pub id: Uuid,
    pub slug: String,
    pub product_id: Uuid,
    pub product_slug: String,
    pub product_name: String,
    /// Variant name, or product name and SKU when unnamed
    pub label: String,
    pub sku: String,
    pub barcode: Option<String>,
    pub name: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    #[schema(value_type = Option<String>)]
    pub compare_at_price: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub cost_price: Option<Decimal>,
    pub tax_code: Option<String>,
    pub weight_grams: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VariantDetail> for VariantResponse {
    fn from(detail: VariantDetail) -> Self {
        let VariantDetail { variant, product } = detail;
        let label = variant.label(&product.name);

        Self {
            id: variant.id,
            slug: variant.slug,
            product_id: product.id,
            product_slug: product.slug,
            product_name: product.name,
            label,
            sku: variant.sku,
            barcode: variant.barcode,
            name: variant.name,
            price: variant.price,
            compare_at_price: variant.compare_at_price,
            cost_price: variant.cost_price,
            tax_code: variant.tax_code,
            weight_grams: variant.weight_grams,
            is_active: variant.is_active,
            created_at: variant.created_at,
            updated_at: variant.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn price_is_required_and_checked() {
        let missing = serde_json::from_value::<CreateVariantRequest>(json!({
            "product_slug": "widget",
            "sku": "W-1"
        }));
        assert!(missing.is_err());

        let request: CreateVariantRequest = serde_json::from_value(json!({
            "product_slug": "widget",
            "sku": "W-1",
            "price": "10.005"
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));
    }

    #[test]
    fn numeric_and_string_prices_both_parse() {
        let request: CreateVariantRequest = serde_json::from_value(json!({
            "product_slug": "widget",
            "sku": "W-1",
            "price": 12.5,
            "cost_price": "7.25"
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.price, Decimal::new(125, 1));
        assert_eq!(request.cost_price, Some(Decimal::new(725, 2)));
    }
}
