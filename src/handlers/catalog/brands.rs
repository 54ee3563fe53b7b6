use std::borrow::Cow;

use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::entities::brand;
use crate::handlers::common::{
    created_response, default_true, no_content_response, normalize_optional_string,
    optional_non_blank, patch_nullable, require_non_blank, success_response, validate_input,
    JsonBody, PaginatedResponse, PaginationParams,
};
use crate::{
    errors::ApiError,
    services::brands::{CreateBrandInput, UpdateBrandInput},
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
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub fn brands_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_brands))
        .route("/:slug", get(get_brand))
        .with_permission(perm::BRANDS_READ);
    let create = Router::new()
        .route("/", post(create_brand))
        .with_permission(perm::BRANDS_CREATE);
    let update = Router::new()
        .route("/:slug", put(update_brand))
        .with_permission(perm::BRANDS_UPDATE);
    let remove = Router::new()
        .route("/:slug", delete(delete_brand))
        .with_permission(perm::BRANDS_DELETE);

    read.merge(create).merge(update).merge(remove)
}

#[utoipa::path(
    get,
    path = "/api/v1/brands",
    params(PaginationParams),
    responses(
        (status = 200, description = "Brands listed", body = PaginatedResponse<BrandResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Brands"
)]
pub async fn list_brands(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = params.resolve(&state.config)?;
    let (brands, total) = state.services.brands.list_brands(page, per_page).await?;

    let data = brands.into_iter().map(BrandResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/brands",
    request_body = CreateBrandRequest,
    responses(
        (status = 201, description = "Brand created", body = BrandResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Brands"
)]
pub async fn create_brand(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateBrandRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateBrandInput {
        name: require_non_blank("name", payload.name)?,
        description: normalize_optional_string(payload.description),
        website: normalize_optional_string(payload.website),
        is_active: payload.is_active,
    };

    let brand = state.services.brands.create_brand(input).await?;
    Ok(created_response(BrandResponse::from(brand)))
}

#[utoipa::path(
    get,
    path = "/api/v1/brands/{slug}",
    params(("slug" = String, Path, description = "Brand slug")),
    responses(
        (status = 200, description = "Brand retrieved", body = BrandResponse),
        (status = 404, description = "Brand not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Brands"
)]
pub async fn get_brand(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let brand = state.services.brands.get_brand(&slug).await?;
    Ok(success_response(BrandResponse::from(brand)))
}

#[utoipa::path(
    put,
    path = "/api/v1/brands/{slug}",
    params(("slug" = String, Path, description = "Brand slug")),
    request_body = UpdateBrandRequest,
    responses(
        (status = 200, description = "Brand updated", body = BrandResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Brand not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Brands"
)]
pub async fn update_brand(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    JsonBody(payload): JsonBody<UpdateBrandRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = UpdateBrandInput {
        name: optional_non_blank("name", payload.name)?,
        description: patch_nullable(payload.description),
        website: patch_nullable(payload.website),
        is_active: payload.is_active,
    };

    let brand = state.services.brands.update_brand(&slug, input).await?;
    Ok(success_response(BrandResponse::from(brand)))
}

/// Delete a brand; its products keep existing without one
#[utoipa::path(
    delete,
    path = "/api/v1/brands/{slug}",
    params(("slug" = String, Path, description = "Brand slug")),
    responses(
        (status = 204, description = "Brand deleted"),
        (status = 404, description = "Brand not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Brands"
)]
pub async fn delete_brand(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.brands.delete_brand(&slug).await?;
    Ok(no_content_response())
}

/// Blank clears the website, anything else must be a URL.
fn validate_website(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || validator::validate_url(value) {
        return Ok(());
    }
    let mut err = ValidationError::new("url");
    err.message = Some(Cow::from("Enter a valid URL."));
    Err(err)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBrandRequest {
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    #[schema(example = "Acme")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(
        custom = "validate_website",
        length(max = 200, message = "Ensure this field has no more than 200 characters.")
    )]
    #[serde(default)]
    #[schema(example = "https://acme.example")]
    pub website: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateBrandRequest {
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(
        custom = "validate_website",
        length(max = 200, message = "Ensure this field has no more than 200 characters.")
    )]
    pub website: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BrandResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<brand::Model> for BrandResponse {
    fn from(model: brand::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            website: model.website,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn website_must_be_a_url_unless_blank() {
        assert!(validate_website("https://acme.example").is_ok());
        assert!(validate_website("  ").is_ok());
        let err = validate_website("acme").unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Enter a valid URL."));
    }
}
