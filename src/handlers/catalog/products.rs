use std::borrow::Cow;

use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::entities::product::{ProductStatus, ProductType};
use crate::handlers::common::{
    created_response, default_true, deserialize_some, no_content_response,
    normalize_optional_string, optional_non_blank, parse_choice, patch_nullable,
    require_non_blank, success_response, validate_input, JsonBody, PaginatedResponse,
    PaginationParams,
};
use crate::{
    errors::ApiError,
    services::products::{
        CreateProductInput, ProductDetail, ProductFilter, ProductOrdering, UpdateProductInput,
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
use serde_json::{json, Value};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Creates the router for product endpoints
pub fn products_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_products))
        .route("/:slug", get(get_product))
        .with_permission(perm::PRODUCTS_READ);
    let create = Router::new()
        .route("/", post(create_product))
        .with_permission(perm::PRODUCTS_CREATE);
    let update = Router::new()
        .route("/:slug", put(update_product))
        .with_permission(perm::PRODUCTS_UPDATE);
    let remove = Router::new()
        .route("/:slug", delete(delete_product))
        .with_permission(perm::PRODUCTS_DELETE);

    read.merge(create).merge(update).merge(remove)
}

fn field_rule(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err
}

/// Lower-case letters are rejected; digits and separators are fine.
fn validate_sku_case(value: &str) -> Result<(), ValidationError> {
    if value.chars().any(char::is_lowercase) {
        return Err(field_rule("uppercase", "SKU must be uppercase."));
    }
    Ok(())
}

/// Blank means "no country"; otherwise exactly two characters.
fn validate_country_code(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if !value.is_empty() && value.chars().count() != 2 {
        return Err(field_rule(
            "iso2",
            "Country code must be a 2-letter ISO2 code.",
        ));
    }
    Ok(())
}

/// Product list filters, search and ordering
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    /// `draft`, `published` or `archived`
    pub status: Option<String>,
    /// Category ID
    pub category: Option<Uuid>,
    /// Brand ID
    pub brand: Option<Uuid>,
    pub is_active: Option<bool>,
    /// Terms matched against name, slug, sku and descriptions
    pub search: Option<String>,
    /// `created_at`, `updated_at` or `name`; prefix with `-` for descending
    #[param(example = "-created_at")]
    pub ordering: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams, ProductListQuery),
    responses(
        (status = 200, description = "Products listed", body = PaginatedResponse<ProductResponse>),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = params.resolve(&state.config)?;
    let status = normalize_optional_string(query.status)
        .map(|raw| parse_choice::<ProductStatus>("status", &raw))
        .transpose()?;
    let filter = ProductFilter {
        status,
        category: query.category,
        brand: query.brand,
        is_active: query.is_active,
        search: normalize_optional_string(query.search),
        ordering: query
            .ordering
            .as_deref()
            .map(ProductOrdering::parse)
            .unwrap_or_default(),
    };

    let (products, total) = state
        .services
        .products
        .list_products(filter, page, per_page)
        .await?;
    let data = products.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product_type = match payload.product_type.as_deref() {
        Some(raw) => parse_choice("type", raw)?,
        None => ProductType::Simple,
    };
    let status = match payload.status.as_deref() {
        Some(raw) => parse_choice("status", raw)?,
        None => ProductStatus::Draft,
    };

    let input = CreateProductInput {
        name: require_non_blank("name", payload.name)?,
        sku: normalize_optional_string(payload.sku),
        product_type,
        category_id: payload.category_id,
        brand_id: payload.brand_id,
        short_description: normalize_optional_string(payload.short_description),
        description: normalize_optional_string(payload.description),
        status,
        weight_grams: payload.weight_grams,
        dimensions: payload.dimensions,
        country_of_origin: normalize_optional_string(payload.country_of_origin),
        is_returnable: payload.is_returnable,
        is_cod_allowed: payload.is_cod_allowed,
        seo_title: normalize_optional_string(payload.seo_title),
        seo_description: normalize_optional_string(payload.seo_description),
        metadata: payload.metadata.unwrap_or_else(|| json!({})),
        is_active: payload.is_active,
    };

    let product = state.services.products.create_product(input).await?;
    Ok(created_response(ProductResponse::from(product)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product retrieved", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.services.products.get_product(&slug).await?;
    Ok(success_response(ProductResponse::from(product)))
}

/// Partially update a product.
///
/// `"category_id": null` and `"brand_id": null` detach the reference. A
/// published product must still have a category after the update.
#[utoipa::path(
    put,
    path = "/api/v1/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    JsonBody(payload): JsonBody<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product_type = payload
        .product_type
        .as_deref()
        .map(|raw| parse_choice("type", raw))
        .transpose()?;
    let status = payload
        .status
        .as_deref()
        .map(|raw| parse_choice("status", raw))
        .transpose()?;

    let input = UpdateProductInput {
        name: optional_non_blank("name", payload.name)?,
        sku: patch_nullable(payload.sku),
        product_type,
        category_id: payload.category_id,
        brand_id: payload.brand_id,
        short_description: patch_nullable(payload.short_description),
        description: patch_nullable(payload.description),
        status,
        weight_grams: payload.weight_grams,
        dimensions: payload.dimensions,
        country_of_origin: patch_nullable(payload.country_of_origin),
        is_returnable: payload.is_returnable,
        is_cod_allowed: payload.is_cod_allowed,
        seo_title: patch_nullable(payload.seo_title),
        seo_description: patch_nullable(payload.seo_description),
        metadata: payload.metadata,
        is_active: payload.is_active,
    };

    let product = state.services.products.update_product(&slug, input).await?;
    Ok(success_response(ProductResponse::from(product)))
}

/// Delete a product with its variants, stock rows and prices
#[utoipa::path(
    delete,
    path = "/api/v1/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.products.delete_product(&slug).await?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(
        min = 3,
        max = 255,
        message = "Product name must be at least 3 characters long."
    ))]
    #[schema(example = "Trail Runner")]
    pub name: String,
    #[validate(
        custom = "validate_sku_case",
        length(max = 120, message = "Ensure this field has no more than 120 characters.")
    )]
    #[serde(default)]
    #[schema(example = "TR-100")]
    pub sku: Option<String>,
    /// `simple`, `variant_parent` or `bundle`; defaults to `simple`
    #[serde(default, rename = "type")]
    #[schema(example = "simple")]
    pub product_type: Option<String>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub brand_id: Option<Uuid>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// `draft`, `published` or `archived`; defaults to `draft`
    #[serde(default)]
    #[schema(example = "draft")]
    pub status: Option<String>,
    #[validate(range(min = 1, message = "Weight must be a positive number."))]
    #[serde(default)]
    #[schema(example = 320)]
    pub weight_grams: Option<i32>,
    /// Free-form `{"length", "width", "height"}` in millimetres
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub dimensions: Option<Value>,
    #[validate(custom = "validate_country_code")]
    #[serde(default)]
    #[schema(example = "US")]
    pub country_of_origin: Option<String>,
    #[serde(default = "default_true")]
    pub is_returnable: bool,
    #[serde(default = "default_true")]
    pub is_cod_allowed: bool,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateProductRequest {
    #[validate(length(
        min = 3,
        max = 255,
        message = "Product name must be at least 3 characters long."
    ))]
    pub name: Option<String>,
    #[validate(
        custom = "validate_sku_case",
        length(max = 120, message = "Ensure this field has no more than 120 characters.")
    )]
    pub sku: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    #[serde(deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub category_id: Option<Option<Uuid>>,
    #[serde(deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub brand_id: Option<Option<Uuid>>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    #[validate(range(min = 1, message = "Weight must be a positive number."))]
    pub weight_grams: Option<i32>,
    #[schema(value_type = Option<Object>)]
    pub dimensions: Option<Value>,
    #[validate(custom = "validate_country_code")]
    pub country_of_origin: Option<String>,
    pub is_returnable: Option<bool>,
    pub is_cod_allowed: Option<bool>,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub sku: Option<String>,
    #[serde(rename = "type")]
    pub product_type: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub brand_id: Option<Uuid>,
    pub brand_name: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub weight_grams: Option<i32>,
    #[schema(value_type = Option<Object>)]
    pub dimensions: Option<Value>,
    pub country_of_origin: Option<String>,
    pub is_returnable: bool,
    pub is_cod_allowed: bool,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductDetail> for ProductResponse {
    fn from(detail: ProductDetail) -> Self {
        let ProductDetail {
            product,
            category_name,
            brand_name,
        } = detail;

        Self {
            id: product.id,
            name: product.name,
            slug: product.slug,
            sku: product.sku,
            product_type: product.product_type.to_string(),
            category_id: product.category_id,
            category_name,
            brand_id: product.brand_id,
            brand_name,
            short_description: product.short_description,
            description: product.description,
            status: product.status.to_string(),
            weight_grams: product.weight_grams,
            dimensions: product.dimensions,
            country_of_origin: product.country_of_origin,
            is_returnable: product.is_returnable,
            is_cod_allowed: product.is_cod_allowed,
            seo_title: product.seo_title,
            seo_description: product.seo_description,
            metadata: product.metadata,
            is_active: product.is_active,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request(body: Value) -> CreateProductRequest {
        serde_json::from_value(body).unwrap()
    }

    fn messages(body: Value, field: &str) -> Vec<String> {
        match request(body).validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .field_errors()
                .get(field)
                .map(|errs| {
                    errs.iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    #[rstest]
    #[case(json!({"name": "ab"}), "name", "Product name must be at least 3 characters long.")]
    #[case(json!({"name": "Widget", "sku": "wid-1"}), "sku", "SKU must be uppercase.")]
    #[case(json!({"name": "Widget", "weight_grams": 0}), "weight_grams", "Weight must be a positive number.")]
    #[case(json!({"name": "Widget", "weight_grams": -5}), "weight_grams", "Weight must be a positive number.")]
    #[case(json!({"name": "Widget", "country_of_origin": "USA"}), "country_of_origin", "Country code must be a 2-letter ISO2 code.")]
    fn field_rules(#[case] body: Value, #[case] field: &str, #[case] expected: &str) {
        assert_eq!(messages(body, field), vec![expected.to_string()]);
    }

    #[test]
    fn valid_payload_passes() {
        let body = json!({
            "name": "Widget",
            "sku": "WID-1",
            "weight_grams": 250,
            "country_of_origin": "DE",
            "type": "bundle"
        });
        let parsed = request(body);
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.product_type.as_deref(), Some("bundle"));
    }

    #[test]
    fn explicit_null_category_detaches() {
        let update: UpdateProductRequest =
            serde_json::from_value(json!({"category_id": null})).unwrap();
        assert_eq!(update.category_id, Some(None));
        assert_eq!(update.brand_id, None);
    }
}
