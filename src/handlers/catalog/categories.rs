use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::handlers::common::{
    created_response, default_true, deserialize_some, no_content_response,
    normalize_optional_string, optional_non_blank, patch_nullable, require_non_blank,
    success_response, validate_input, JsonBody, PaginatedResponse, PaginationParams,
};
use crate::{
    errors::ApiError,
    services::categories::{CategoryDetail, CreateCategoryInput, UpdateCategoryInput},
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

pub fn categories_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_categories))
        .route("/:slug", get(get_category))
        .with_permission(perm::CATEGORIES_READ);
    let create = Router::new()
        .route("/", post(create_category))
        .with_permission(perm::CATEGORIES_CREATE);
    let update = Router::new()
        .route("/:slug", put(update_category))
        .with_permission(perm::CATEGORIES_UPDATE);
    let remove = Router::new()
        .route("/:slug", delete(delete_category))
        .with_permission(perm::CATEGORIES_DELETE);

    read.merge(create).merge(update).merge(remove)
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(PaginationParams),
    responses(
        (status = 200, description = "Categories listed", body = PaginatedResponse<CategoryResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = params.resolve(&state.config)?;
    let (categories, total) = state
        .services
        .categories
        .list_categories(page, per_page)
        .await?;

    let data = categories.into_iter().map(CategoryResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Invalid payload or unknown parent", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateCategoryInput {
        name: require_non_blank("name", payload.name)?,
        description: normalize_optional_string(payload.description),
        parent_id: payload.parent_id,
        is_active: payload.is_active,
    };

    let category = state.services.categories.create_category(input).await?;
    Ok(created_response(CategoryResponse::from(category)))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category retrieved", body = CategoryResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.services.categories.get_category(&slug).await?;
    Ok(success_response(CategoryResponse::from(category)))
}

/// Partially update a category; `"parent_id": null` detaches it from its parent
#[utoipa::path(
    put,
    path = "/api/v1/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 400, description = "Invalid payload or unknown parent", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    JsonBody(payload): JsonBody<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = UpdateCategoryInput {
        name: optional_non_blank("name", payload.name)?,
        description: patch_nullable(payload.description),
        parent_id: payload.parent_id,
        is_active: payload.is_active,
    };

    let category = state
        .services
        .categories
        .update_category(&slug, input)
        .await?;
    Ok(success_response(CategoryResponse::from(category)))
}

/// Delete a category; child categories and products are detached
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.categories.delete_category(&slug).await?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    #[schema(example = "Outdoor")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateCategoryRequest {
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub parent_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CategoryDetail> for CategoryResponse {
    fn from(detail: CategoryDetail) -> Self {
        let CategoryDetail {
            category,
            parent_name,
        } = detail;

        Self {
            id: category.id,
            name: category.name,
            slug: category.slug,
            description: category.description,
            parent_id: category.parent_id,
            parent_name,
            is_active: category.is_active,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}
