//! Error types for the Stockroom API.
//!
//! ## Status Mapping
//!
//! | Variant        | Status | Typical source                              |
//! |----------------|--------|---------------------------------------------|
//! | `Validation`   | 400    | `ValidationError` with a field name          |
//! | `Conflict`     | 400    | duplicate name, SKU, barcode, email          |
//! | `BadRequest`   | 400    | state rules (cancelled PO, overpayment, ...) |
//! | `Unauthorized` | 401    | missing, invalid or expired token            |
//! | `Forbidden`    | 403    | role too low for the operation               |
//! | `NotFound`     | 404    | addressed record does not exist              |
//! | `Internal`     | 500    | database or I/O failure                      |
//!
//! Every error renders the same envelope as successful responses:
//!
//! ```json
//! { "success": false, "message": "name is required",
//!   "errors": [{ "field": "name", "message": "name is required" }] }
//! ```
//!
//! A 500 response carries its detail as an [`InternalErrorDetail`]
//! extension. The [`expose_internal_errors`] middleware copies it into the
//! `error` field when [`AppState::expose_internal_errors`] is set.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use stockroom_core::{CoreError, ValidationError};
use stockroom_db::DbError;

use crate::AppState;

/// Underlying error text of a 500 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalErrorDetail(pub String);

/// One offending input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        ApiError::Validation {
            errors: vec![FieldError {
                field: field.into(),
                message: message.clone(),
            }],
            message,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Authentication required".to_string())
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden("You do not have permission to perform this action".to_string())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    /// Unified login failure, so emails cannot be enumerated.
    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized("Invalid email or password".to_string())
    }

    pub fn no_store_selected() -> Self {
        ApiError::BadRequest(CoreError::NoStoreSelected.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::Conflict(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation { message, errors } => ErrorBody {
                success: false,
                message,
                errors,
                error: None,
            },
            ApiError::Internal(detail) => {
                error!(error = %detail, "Internal error occurred");
                let mut response = (status, Json(internal_body(None))).into_response();
                response.extensions_mut().insert(InternalErrorDetail(detail));
                return response;
            }
            other => ErrorBody {
                success: false,
                message: other.to_string(),
                errors: Vec::new(),
                error: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

fn internal_body(detail: Option<String>) -> ErrorBody {
    ErrorBody {
        success: false,
        message: "Internal server error".to_string(),
        errors: Vec::new(),
        error: detail,
    }
}

/// Adds the detail of 500 responses to their body when the state allows it.
pub async fn expose_internal_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !state.expose_internal_errors {
        return response;
    }

    let detail = response
        .extensions()
        .get::<InternalErrorDetail>()
        .map(|InternalErrorDetail(detail)| detail.clone());
    match detail {
        Some(detail) => (response.status(), Json(internal_body(Some(detail)))).into_response(),
        None => response,
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Duplicate { .. } => ApiError::Conflict(err.to_string()),
            other => ApiError::validation(other.field(), other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(validation) => validation.into(),
            CoreError::DuplicateName { .. } => ApiError::Conflict(err.to_string()),
            err if err.is_not_found() => ApiError::NotFound(err.to_string()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } => ApiError::Conflict(err.to_string()),
            DbError::ForeignKeyViolation { .. } => {
                ApiError::BadRequest("Referenced record does not exist".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let err: ApiError = CoreError::CategoryNotFound("c1".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = CoreError::DuplicateName {
            entity: "Category".into(),
            name: "Drinks".into(),
        }
        .into();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = CoreError::NoStoreSelected.into();
        assert_eq!(err.to_string(), "No store selected");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validation_carries_field() {
        let err: ApiError = CoreError::Validation(ValidationError::Required {
            field: "sku".into(),
        })
        .into();
        match err {
            ApiError::Validation { message, errors } => {
                assert_eq!(message, "sku is required");
                assert_eq!(errors[0].field, "sku");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    async fn internal_error_body(expose: bool) -> serde_json::Value {
        use axum::body::Body;
        use axum::routing::get;
        use http_body_util::BodyExt;
        use stockroom_db::{Database, DbConfig};
        use tower::ServiceExt;

        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut state = AppState::new(db, crate::ApiConfig::default());
        state.expose_internal_errors = expose;

        let router = axum::Router::new()
            .route(
                "/boom",
                get(|| async { Err::<(), _>(ApiError::internal("disk on fire")) }),
            )
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                expose_internal_errors,
            ))
            .with_state(state);

        let response = router
            .oneshot(axum::http::Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_internal_detail_follows_each_router_state() {
        let hidden = internal_error_body(false).await;
        let shown = internal_error_body(true).await;
        let hidden_again = internal_error_body(false).await;

        assert_eq!(shown["message"], "Internal server error");
        assert_eq!(shown["error"], "disk on fire");
        assert_eq!(hidden["message"], "Internal server error");
        assert!(hidden.get("error").is_none());
        assert!(hidden_again.get("error").is_none());
    }

    #[test]
    fn test_db_error_mapping() {
        let err: ApiError = DbError::duplicate("email", "a@b.io").into();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err: ApiError = DbError::not_found("Bill", "b1").into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = DbError::QueryFailed("syntax".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
