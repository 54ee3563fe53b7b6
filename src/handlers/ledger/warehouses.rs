use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::entities::warehouse;
use crate::handlers::common::{
    created_response, default_true, no_content_response, normalize_optional_string,
    optional_non_blank, patch_nullable, require_non_blank, success_response, validate_input,
    JsonBody, PaginatedResponse, PaginationParams,
};
use crate::{
    errors::ApiError,
    services::warehouses::{CreateWarehouseInput, UpdateWarehouseInput},
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
use validator::Validate;

/// Creates the router for warehouse endpoints
pub fn warehouses_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_warehouses))
        .route("/:slug", get(get_warehouse))
        .with_permission(perm::WAREHOUSES_READ);
    let create = Router::new()
        .route("/", post(create_warehouse))
        .with_permission(perm::WAREHOUSES_CREATE);
    let update = Router::new()
        .route("/:slug", put(update_warehouse))
        .with_permission(perm::WAREHOUSES_UPDATE);
    let remove = Router::new()
        .route("/:slug", delete(delete_warehouse))
        .with_permission(perm::WAREHOUSES_DELETE);

    read.merge(create).merge(update).merge(remove)
}

/// List warehouses ordered by name
#[utoipa::path(
    get,
    path = "/api/v1/warehouses",
    params(PaginationParams),
    responses(
        (status = 200, description = "Warehouses listed", body = PaginatedResponse<WarehouseResponse>),
        (status = 400, description = "Invalid pagination", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Warehouses"
)]
pub async fn list_warehouses(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = params.resolve(&state.config)?;
    let (warehouses, total) = state
        .services
        .warehouses
        .list_warehouses(page, per_page)
        .await?;

    let data = warehouses.into_iter().map(WarehouseResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// Register a warehouse
#[utoipa::path(
    post,
    path = "/api/v1/warehouses",
    request_body = CreateWarehouseRequest,
    responses(
        (status = 201, description = "Warehouse created", body = WarehouseResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Warehouses"
)]
pub async fn create_warehouse(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateWarehouseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateWarehouseInput {
        name: require_non_blank("name", payload.name)?,
        address: normalize_optional_string(payload.address),
        city: normalize_optional_string(payload.city),
        state: normalize_optional_string(payload.state),
        postal_code: normalize_optional_string(payload.postal_code),
        country: normalize_optional_string(payload.country),
        is_active: payload.is_active,
    };

    let warehouse = state.services.warehouses.create_warehouse(input).await?;
    Ok(created_response(WarehouseResponse::from(warehouse)))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses/{slug}",
    params(("slug" = String, Path, description = "Warehouse slug")),
    responses(
        (status = 200, description = "Warehouse retrieved", body = WarehouseResponse),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Warehouses"
)]
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let warehouse = state.services.warehouses.get_warehouse(&slug).await?;
    Ok(success_response(WarehouseResponse::from(warehouse)))
}

/// Partially update a warehouse; the slug never changes
#[utoipa::path(
    put,
    path = "/api/v1/warehouses/{slug}",
    params(("slug" = String, Path, description = "Warehouse slug")),
    request_body = UpdateWarehouseRequest,
    responses(
        (status = 200, description = "Warehouse updated", body = WarehouseResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Warehouses"
)]
pub async fn update_warehouse(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    JsonBody(payload): JsonBody<UpdateWarehouseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = UpdateWarehouseInput {
        name: optional_non_blank("name", payload.name)?,
        address: patch_nullable(payload.address),
        city: patch_nullable(payload.city),
        state: patch_nullable(payload.state),
        postal_code: patch_nullable(payload.postal_code),
        country: patch_nullable(payload.country),
        is_active: payload.is_active,
    };

    let warehouse = state
        .services
        .warehouses
        .update_warehouse(&slug, input)
        .await?;
    Ok(success_response(WarehouseResponse::from(warehouse)))
}

/// Delete a warehouse together with its stock and warehouse-scoped prices
#[utoipa::path(
    delete,
    path = "/api/v1/warehouses/{slug}",
    params(("slug" = String, Path, description = "Warehouse slug")),
    responses(
        (status = 204, description = "Warehouse deleted"),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Warehouses"
)]
pub async fn delete_warehouse(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.warehouses.delete_warehouse(&slug).await?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateWarehouseRequest {
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    #[schema(example = "Central")]
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    #[serde(default)]
    #[schema(example = "Springfield")]
    pub city: Option<String>,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    #[serde(default)]
    pub state: Option<String>,
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    #[serde(default)]
    pub postal_code: Option<String>,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    #[serde(default)]
    #[schema(example = "US")]
    pub country: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Absent fields are left unchanged; blank text clears an optional field.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateWarehouseRequest {
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub name: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub city: Option<String>,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub state: Option<String>,
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub country: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WarehouseResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<warehouse::Model> for WarehouseResponse {
    fn from(model: warehouse::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            address: model.address,
            city: model.city,
            state: model.state,
            postal_code: model.postal_code,
            country: model.country,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
