use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::handlers::common::{
    created_response, no_content_response, optional_non_blank, require_non_blank,
    success_response, validate_input, JsonBody, PaginatedResponse, PaginationParams,
};
use crate::{
    errors::ApiError,
    services::addresses::{AddressDetail, CreateAddressInput, UpdateAddressInput},
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

pub fn addresses_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_addresses))
        .route("/:slug", get(get_address))
        .with_permission(perm::ADDRESSES_READ);
    let create = Router::new()
        .route("/", post(create_address))
        .with_permission(perm::ADDRESSES_CREATE);
    let update = Router::new()
        .route("/:slug", put(update_address))
        .with_permission(perm::ADDRESSES_UPDATE);
    let remove = Router::new()
        .route("/:slug", delete(delete_address))
        .with_permission(perm::ADDRESSES_DELETE);

    read.merge(create).merge(update).merge(remove)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AddressListQuery {
    /// Only addresses owned by this user
    pub user_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/addresses",
    params(PaginationParams, AddressListQuery),
    responses(
        (status = 200, description = "Addresses listed", body = PaginatedResponse<AddressResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Addresses"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(query): Query<AddressListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = params.resolve(&state.config)?;
    let (addresses, total) = state
        .services
        .addresses
        .list_addresses(query.user_id, page, per_page)
        .await?;

    let data = addresses.into_iter().map(AddressResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// Add an address; a user may hold only one default address
#[utoipa::path(
    post,
    path = "/api/v1/addresses",
    request_body = CreateAddressRequest,
    responses(
        (status = 201, description = "Address created", body = AddressResponse),
        (status = 400, description = "Invalid payload, unknown user or second default", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Addresses"
)]
pub async fn create_address(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateAddressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateAddressInput {
        user_id: payload.user_id,
        full_name: require_non_blank("full_name", payload.full_name)?,
        street_address: require_non_blank("street_address", payload.street_address)?,
        city: require_non_blank("city", payload.city)?,
        state: require_non_blank("state", payload.state)?,
        postal_code: require_non_blank("postal_code", payload.postal_code)?,
        country: require_non_blank("country", payload.country)?,
        is_default: payload.is_default,
    };

    let address = state.services.addresses.create_address(input).await?;
    Ok(created_response(AddressResponse::from(address)))
}

#[utoipa::path(
    get,
    path = "/api/v1/addresses/{slug}",
    params(("slug" = String, Path, description = "Address slug")),
    responses(
        (status = 200, description = "Address retrieved", body = AddressResponse),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Addresses"
)]
pub async fn get_address(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let address = state.services.addresses.get_address(&slug).await?;
    Ok(success_response(AddressResponse::from(address)))
}

/// Partially update an address.
///
/// Marking it default clears the flag on the owner's other addresses.
#[utoipa::path(
    put,
    path = "/api/v1/addresses/{slug}",
    params(("slug" = String, Path, description = "Address slug")),
    request_body = UpdateAddressRequest,
    responses(
        (status = 200, description = "Address updated", body = AddressResponse),
        (status = 400, description = "Invalid payload or unknown user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Addresses"
)]
pub async fn update_address(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    JsonBody(payload): JsonBody<UpdateAddressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = UpdateAddressInput {
        user_id: payload.user_id,
        full_name: optional_non_blank("full_name", payload.full_name)?,
        street_address: optional_non_blank("street_address", payload.street_address)?,
        city: optional_non_blank("city", payload.city)?,
        state: optional_non_blank("state", payload.state)?,
        postal_code: optional_non_blank("postal_code", payload.postal_code)?,
        country: optional_non_blank("country", payload.country)?,
        is_default: payload.is_default,
    };

    let address = state
        .services
        .addresses
        .update_address(&slug, input)
        .await?;
    Ok(success_response(AddressResponse::from(address)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/addresses/{slug}",
    params(("slug" = String, Path, description = "Address slug")),
    responses(
        (status = 204, description = "Address deleted"),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Addresses"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.addresses.delete_address(&slug).await?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAddressRequest {
    pub user_id: Uuid,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    #[schema(example = "Jane Doe")]
    pub full_name: String,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    #[schema(example = "1 Main St")]
    pub street_address: String,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub city: String,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub state: String,
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub postal_code: String,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateAddressRequest {
    /// Reassign the address to another user
    pub user_id: Option<Uuid>,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub full_name: Option<String>,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub street_address: Option<String>,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub city: Option<String>,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub state: Option<String>,
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub country: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddressResponse {
    pub id: Uuid,
    pub slug: String,
    pub user_id: Uuid,
    pub user_email: String,
    pub full_name: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AddressDetail> for AddressResponse {
    fn from(detail: AddressDetail) -> Self {
        let AddressDetail {
            address,
            user_email,
        } = detail;

        Self {
            id: address.id,
            slug: address.slug,
            user_id: address.user_id,
            user_email,
            full_name: address.full_name,
            street_address: address.street_address,
            city: address.city,
            state: address.state,
            postal_code: address.postal_code,
            country: address.country,
            is_default: address.is_default,
            created_at: address.created_at,
            updated_at: address.updated_at,
        }
    }
}
