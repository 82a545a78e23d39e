/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`. Library errors convert into
/// [`ApiError`] with `?`, and `ApiError` renders as a JSON body:
///
/// ```json
/// { "error": "insufficient_role", "message": "...", "details": [...] }
/// ```
///
/// # Example
///
/// ```
/// use cyclectl_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(name: String) -> ApiResult<Json<serde_json::Value>> {
///     if name.is_empty() {
///         return Err(ApiError::validation("name", "Name is required"));
///     }
///     Ok(Json(json!({ "name": name })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cyclectl_shared::auth::authorization::AuthzError;
use cyclectl_shared::auth::jwt::JwtError;
use cyclectl_shared::auth::middleware::AuthError;
use cyclectl_shared::auth::oauth::SignatureError;
use cyclectl_shared::board::transfer::ImportError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request (400)
    BadRequest(String),

    /// Missing or invalid session (401)
    Unauthorized(String),

    /// Actor is not on the project roster (403)
    NotAMember(String),

    /// Actor's role does not allow the action (403)
    InsufficientRole(String),

    /// Change would leave a project without an owner (409)
    LastOwnerViolation(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. inviting an existing member
    Conflict(String),

    /// Unprocessable entity (422)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "not_a_member")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.into(),
            message: message.into(),
        }])
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotAMember(_) | ApiError::InsufficientRole(_) => StatusCode::FORBIDDEN,
            ApiError::LastOwnerViolation(_) | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotAMember(_) => "not_a_member",
            ApiError::InsufficientRole(_) => "insufficient_role",
            ApiError::LastOwnerViolation(_) => "last_owner_violation",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::InternalError(_) => "internal_error",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotAMember(msg) => write!(f, "Not a member: {}", msg),
            ApiError::InsufficientRole(msg) => write!(f, "Insufficient role: {}", msg),
            ApiError::LastOwnerViolation(msg) => write!(f, "Last owner: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.code().to_string();

        let (message, details) = match self {
            ApiError::ValidationError(errors) => ("Request validation failed".to_string(), Some(errors)),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!(error = %msg, "Internal error");
                ("An internal error occurred".to_string(), None)
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotAMember(msg)
            | ApiError::InsufficientRole(msg)
            | ApiError::LastOwnerViolation(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => (msg, None),
        };

        let body = Json(ErrorResponse {
            error,
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    return ApiError::Conflict("Resource already exists".to_string());
                }
                if db_err.is_check_violation() {
                    return ApiError::validation("end", "Start date must not be after end date");
                }
                if db_err.is_foreign_key_violation() {
                    return ApiError::NotFound("Referenced resource not found".to_string());
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert session errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        // Any header that does not resolve to a user is a missing session
        ApiError::Unauthorized(err.to_string())
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        let message = err.to_string();
        match err {
            AuthzError::NotMember => ApiError::NotAMember(message),
            AuthzError::InsufficientRole { .. } => ApiError::InsufficientRole(message),
            AuthzError::LastOwner => ApiError::LastOwnerViolation(message),
            AuthzError::MemberNotFound(_) => ApiError::NotFound(message),
            AuthzError::AlreadyMember(_) => ApiError::Conflict(message),
            AuthzError::RoleRequired => ApiError::validation("role", message),
        }
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert callback signature errors to API errors
impl From<SignatureError> for ApiError {
    fn from(err: SignatureError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

/// Convert import errors to API errors
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::validation("records", err.to_string())
    }
}

/// Convert validator errors to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", field)),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyclectl_shared::auth::authorization::Action;
    use cyclectl_shared::models::team_member::ProjectRole;
    use uuid::Uuid;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");
    }

    #[test]
    fn test_authz_error_mapping() {
        let cases = [
            (AuthzError::NotMember, StatusCode::FORBIDDEN, "not_a_member"),
            (
                AuthzError::InsufficientRole {
                    action: Action::DeleteTask,
                    actual: ProjectRole::Editor,
                },
                StatusCode::FORBIDDEN,
                "insufficient_role",
            ),
            (AuthzError::LastOwner, StatusCode::CONFLICT, "last_owner_violation"),
            (AuthzError::MemberNotFound(Uuid::nil()), StatusCode::NOT_FOUND, "not_found"),
            (AuthzError::AlreadyMember(Uuid::nil()), StatusCode::CONFLICT, "conflict"),
            (AuthzError::RoleRequired, StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
        ];

        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status(), status);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::Unauthorized("Missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = ApiError::from(ImportError::EmptyBatch).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = ApiError::InternalError("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_errors_are_unauthorized() {
        let cases = [
            AuthError::MissingCredentials,
            AuthError::InvalidFormat,
            AuthError::Expired,
            AuthError::InvalidToken("bad signature".to_string()),
        ];

        for err in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(api.code(), "unauthorized");
        }
    }

    #[test]
    fn test_validation_error() {
        let err = ApiError::validation("title", "Title is required");
        assert_eq!(err.to_string(), "Validation failed: 1 errors");
    }
}
