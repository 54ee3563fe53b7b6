use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::entities::user;
use crate::handlers::common::{
    created_response, default_true, no_content_response, normalize_string, success_response,
    validate_input, JsonBody, PaginatedResponse, PaginationParams,
};
use crate::{
    errors::ApiError,
    services::users::{CreateUserInput, UpdateUserInput},
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

pub fn users_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_users))
        .route("/:slug", get(get_user))
        .with_permission(perm::USERS_READ);
    let create = Router::new()
        .route("/", post(create_user))
        .with_permission(perm::USERS_CREATE);
    let update = Router::new()
        .route("/:slug", put(update_user))
        .with_permission(perm::USERS_UPDATE);
    let remove = Router::new()
        .route("/:slug", delete(delete_user))
        .with_permission(perm::USERS_DELETE);

    read.merge(create).merge(update).merge(remove)
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(PaginationParams),
    responses(
        (status = 200, description = "Users listed", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = params.resolve(&state.config)?;
    let (users, total) = state.services.users.list_users(page, per_page).await?;

    let data = users.into_iter().map(UserResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// Create a user; the email is stored with its domain lower-cased
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid payload or email taken", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateUserInput {
        email: normalize_string(payload.email),
        full_name: normalize_string(payload.full_name),
        phone: normalize_string(payload.phone),
        is_active: payload.is_active,
    };

    let user = state.services.users.create_user(input).await?;
    Ok(created_response(UserResponse::from(user)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{slug}",
    params(("slug" = String, Path, description = "User slug")),
    responses(
        (status = 200, description = "User retrieved", body = UserResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.services.users.get_user(&slug).await?;
    Ok(success_response(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{slug}",
    params(("slug" = String, Path, description = "User slug")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid payload or email taken", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = UpdateUserInput {
        email: payload.email.map(normalize_string),
        full_name: payload.full_name.map(normalize_string),
        phone: payload.phone.map(normalize_string),
        is_active: payload.is_active,
    };

    let user = state.services.users.update_user(&slug, input).await?;
    Ok(success_response(UserResponse::from(user)))
}

/// Delete a user together with their addresses
#[utoipa::path(
    delete,
    path = "/api/v1/users/{slug}",
    params(("slug" = String, Path, description = "User slug")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.users.delete_user(&slug).await?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    #[serde(default)]
    #[schema(example = "Jane Doe")]
    pub full_name: String,
    #[validate(length(max = 15, message = "Ensure this field has no more than 15 characters."))]
    #[serde(default)]
    pub phone: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateUserRequest {
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    pub email: Option<String>,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub full_name: Option<String>,
    #[validate(length(max = 15, message = "Ensure this field has no more than 15 characters."))]
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub slug: String,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            slug: model.slug,
            email: model.email,
            full_name: model.full_name,
            phone: model.phone,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_is_validated_and_names_may_be_blank() {
        let ok: CreateUserRequest =
            serde_json::from_value(json!({"email": "jane@example.com"})).unwrap();
        assert!(ok.validate().is_ok());
        assert_eq!(ok.full_name, "");
        assert!(ok.is_active);

        let bad: CreateUserRequest =
            serde_json::from_value(json!({"email": "not-an-email"})).unwrap();
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }
}
