use std::borrow::Cow;
use std::str::FromStr;

use crate::config::AppConfig;
use crate::errors::{ApiError, ServiceError};
use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

const BLANK: &str = "This field may not be blank.";

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// JSON request body whose parse failures are reported as 400 error payloads.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::BadRequest {
                message: rejection.body_text(),
            }),
        }
    }
}

/// Validate request input, reporting failures per field
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input.validate().map_err(ApiError::from)
}

pub fn default_true() -> bool {
    true
}

pub fn normalize_string(value: String) -> String {
    value.trim().to_string()
}

pub fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .and_then(|v| if v.is_empty() { None } else { Some(v) })
}

/// Trims a required text field and rejects it when nothing is left.
pub fn require_non_blank(field: &str, value: String) -> Result<String, ServiceError> {
    let value = normalize_string(value);
    if value.is_empty() {
        return Err(ServiceError::field(field, BLANK));
    }
    Ok(value)
}

/// Like [`require_non_blank`] for a field that may be omitted from an update.
pub fn optional_non_blank(
    field: &str,
    value: Option<String>,
) -> Result<Option<String>, ServiceError> {
    value.map(|v| require_non_blank(field, v)).transpose()
}

/// Maps an update value for a nullable text column: absent leaves it alone,
/// blank clears it.
pub fn patch_nullable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| normalize_optional_string(Some(v)))
}

/// Parses an id-based lookup; anything that is not a UUID cannot match a row.
pub fn parse_lookup_id(raw: &str, label: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::NotFound(format!("{} {} not found", label, raw)))
}

/// Parses a choice field such as a status or a type tag.
pub fn parse_choice<T: FromStr>(field: &str, raw: &str) -> Result<T, ServiceError> {
    T::from_str(raw.trim())
        .map_err(|_| ServiceError::field(field, format!("\"{}\" is not a valid choice.", raw)))
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
///
/// Use with `#[serde(default, deserialize_with = "deserialize_some")]`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err
}

/// Natural-key parameters must look like a slug.
pub fn validate_slug_field(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(rule_error("blank", BLANK));
    }
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(rule_error(
            "slug",
            "Enter a valid \"slug\" consisting of letters, numbers, underscores or hyphens.",
        ));
    }
    Ok(())
}

/// Money columns are decimal(12, 2) and never negative.
pub fn validate_money(value: &Decimal) -> Result<(), ValidationError> {
    let normalized = value.normalize();
    let scale = normalized.scale() as usize;
    let significant = normalized.mantissa().unsigned_abs().to_string().len();
    let (digits, decimals) = if scale > significant {
        (scale, scale)
    } else {
        (significant, scale)
    };

    if digits > 12 {
        return Err(rule_error(
            "money",
            "Ensure that there are no more than 12 digits in total.",
        ));
    }
    if decimals > 2 {
        return Err(rule_error(
            "money",
            "Ensure that there are no more than 2 decimal places.",
        ));
    }
    if digits - decimals > 10 {
        return Err(rule_error(
            "money",
            "Ensure that there are no more than 10 digits before the decimal point.",
        ));
    }
    if value.is_sign_negative() && !value.is_zero() {
        return Err(rule_error(
            "money",
            "Ensure this value is greater than or equal to 0.",
        ));
    }
    Ok(())
}

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page number
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Page size, capped by configuration
    #[param(example = 20)]
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// Resolves `(page, per_page)` against the configured default and cap.
    pub fn resolve(&self, config: &AppConfig) -> Result<(u64, u64), ApiError> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(ApiError::BadRequest {
                message: "page must be greater than or equal to 1".to_string(),
            });
        }

        let per_page = self.per_page.unwrap_or(config.api_default_page_size);
        if per_page == 0 {
            return Err(ApiError::BadRequest {
                message: "per_page must be greater than zero".to_string(),
            });
        }

        let per_page = per_page.min(config.api_max_page_size);
        let in_range = (page - 1)
            .checked_mul(per_page)
            .is_some_and(|offset| offset <= i64::MAX as u64);
        if !in_range {
            return Err(ApiError::BadRequest {
                message: "page is out of range".to_string(),
            });
        }

        Ok((page, per_page))
    }
}

/// Standard pagination response metadata
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

/// Standard paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: u64, per_page: u64, total: u64) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(page, per_page, total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::stock_transaction::TransactionType;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(0), None)]
    #[case(dec!(19.99), None)]
    #[case(dec!(19.990), None)]
    #[case(dec!(9999999999.99), None)]
    #[case(dec!(-0.01), Some("Ensure this value is greater than or equal to 0."))]
    #[case(dec!(1.999), Some("Ensure that there are no more than 2 decimal places."))]
    #[case(dec!(0.001), Some("Ensure that there are no more than 2 decimal places."))]
    #[case(dec!(12345678901.5), Some("Ensure that there are no more than 12 digits in total."))]
    #[case(dec!(12345678901), Some("Ensure that there are no more than 10 digits before the decimal point."))]
    fn money_rules(#[case] value: Decimal, #[case] expected: Option<&str>) {
        let message = validate_money(&value)
            .err()
            .and_then(|e| e.message.map(|m| m.to_string()));
        assert_eq!(message.as_deref(), expected);
    }

    #[test]
    fn pagination_meta_rounds_up() {
        let meta = PaginationMeta::new(1, 20, 41);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(PaginationMeta::new(1, 20, 0).total_pages, 0);
    }

    #[test]
    fn pagination_is_capped_by_config() {
        let config = AppConfig::new(
            "sqlite::memory:".into(),
            "x".repeat(64),
            3600,
            "127.0.0.1".into(),
            8080,
            "test".into(),
        );
        let params = PaginationParams {
            page: None,
            per_page: Some(10_000),
        };
        assert_eq!(
            params.resolve(&config).unwrap(),
            (1, config.api_max_page_size)
        );

        let zero = PaginationParams {
            page: Some(1),
            per_page: Some(0),
        };
        assert!(zero.resolve(&config).is_err());

        let huge = PaginationParams {
            page: Some(u64::MAX),
            per_page: Some(20),
        };
        assert!(huge.resolve(&config).is_err());
    }

    #[test]
    fn blank_strings_are_rejected_or_cleared() {
        assert!(require_non_blank("name", "   ".into()).is_err());
        assert_eq!(require_non_blank("name", " Central ".into()).unwrap(), "Central");
        assert_eq!(patch_nullable(Some("  ".into())), Some(None));
        assert_eq!(patch_nullable(None), None);
    }

    #[test]
    fn unknown_choices_are_field_errors() {
        let err = parse_choice::<TransactionType>("type", "xyz").unwrap_err();
        let fields = err.field_errors().unwrap();
        assert_eq!(
            fields.get("type"),
            Some(&vec!["\"xyz\" is not a valid choice.".to_string()])
        );
        assert_eq!(
            parse_choice::<TransactionType>("type", "sale").unwrap(),
            TransactionType::Sale
        );
    }

    #[test]
    fn malformed_ids_are_not_found() {
        assert_matches::assert_matches!(
            parse_lookup_id("not-a-uuid", "Stock"),
            Err(ServiceError::NotFound(_))
        );
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "deserialize_some")]
        parent_id: Option<Option<Uuid>>,
    }

    #[test]
    fn explicit_null_differs_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.parent_id, None);
        let null: Patch = serde_json::from_str(r#"{"parent_id": null}"#).unwrap();
        assert_eq!(null.parent_id, Some(None));
    }
}
