use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Per-field error messages, keyed by request field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Bad Request",
    "message": "Validation failed",
    "field_errors": { "warehouse_slug": ["Invalid warehouse slug."] },
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Bad Request")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "Validation failed")]
    pub message: String,
    /// Field-scoped messages; `non_field_errors` holds request-level rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FieldErrors>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    #[schema(example = "2024-12-09T10:30:00.000Z")]
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(status: StatusCode, message: String, field_errors: Option<FieldErrors>) -> Self {
        Self {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            field_errors,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    /// One or more single-field constraint violations.
    #[error("Invalid fields: {}", summarize(.0))]
    FieldValidation(FieldErrors),

    /// A rule spanning several fields of the same request.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A supplied natural key did not resolve to a row.
    #[error("Invalid reference for {field}: {message}")]
    ReferenceNotFound { field: String, message: String },

    /// A unique or composite-unique key is already taken.
    #[error("Uniqueness conflict: {0}")]
    UniquenessConflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

fn summarize(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errors) in err.field_errors() {
            let messages = errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code))
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }
        ServiceError::FieldValidation(fields)
    }
}

impl ServiceError {
    /// Single-field validation failure.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), vec![message.into()]);
        ServiceError::FieldValidation(fields)
    }

    /// Unresolvable natural key supplied for `field`.
    pub fn reference(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::ReferenceNotFound {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::FieldValidation(_)
            | Self::ValidationError(_)
            | Self::ReferenceNotFound { .. }
            | Self::UniquenessConflict(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::DatabaseError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            Self::FieldValidation(_) | Self::ReferenceNotFound { .. } => {
                "Validation failed".to_string()
            }
            Self::ValidationError(msg) | Self::UniquenessConflict(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }

    /// Field-scoped messages carried by validation failures.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            Self::FieldValidation(fields) => Some(fields.clone()),
            Self::ReferenceNotFound { field, message } => {
                Some(FieldErrors::from([(field.clone(), vec![message.clone()])]))
            }
            Self::ValidationError(msg) | Self::UniquenessConflict(msg) => Some(FieldErrors::from(
                [(NON_FIELD_ERRORS.to_string(), vec![msg.clone()])],
            )),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed with internal error");
        }

        let body = ErrorResponse::new(status, self.response_message(), self.field_errors());
        (status, Json(body)).into_response()
    }
}

/// API Error type for HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Bad request: {message}")]
    BadRequest { message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ServiceError(service_error) => service_error.into_response(),
            ApiError::BadRequest { message } => {
                let body = ErrorResponse::new(StatusCode::BAD_REQUEST, message, None);
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ServiceError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert!(payload.field_errors.is_none());
    }

    #[tokio::test]
    async fn reference_errors_are_field_scoped() {
        let response =
            ServiceError::reference("warehouse_slug", "Invalid warehouse slug.").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        let fields = payload.field_errors.expect("field errors");
        assert_eq!(
            fields.get("warehouse_slug"),
            Some(&vec!["Invalid warehouse slug.".to_string()])
        );
    }

    #[tokio::test]
    async fn cross_field_errors_use_non_field_key() {
        let response =
            ServiceError::ValidationError("Published products must have a category assigned.".into())
                .into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            payload.message,
            "Published products must have a category assigned."
        );
        assert!(payload
            .field_errors
            .expect("field errors")
            .contains_key(NON_FIELD_ERRORS));
    }

    #[tokio::test]
    async fn bad_request_api_error_has_no_field_errors() {
        let response = ApiError::BadRequest {
            message: "per_page must be greater than zero".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::field("name", "x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::UniquenessConflict("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::reference("product_slug", "x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_messages_are_hidden() {
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("secret dsn".into())).response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::InternalError("stack".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::NotFound("Warehouse central not found".into()).response_message(),
            "Not found: Warehouse central not found"
        );
    }

    #[derive(Validate)]
    struct Named {
        #[validate(length(min = 1, message = "This field may not be blank."))]
        name: String,
    }

    #[test]
    fn validator_errors_become_field_errors() {
        let err: ServiceError = Named {
            name: String::new(),
        }
        .validate()
        .unwrap_err()
        .into();

        let fields = err.field_errors().expect("field errors");
        assert_eq!(
            fields.get("name"),
            Some(&vec!["This field may not be blank.".to_string()])
        );
    }
}
