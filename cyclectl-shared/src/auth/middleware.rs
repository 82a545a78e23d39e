/// Session resolution for Axum requests
///
/// Turns the `Authorization: Bearer <token>` header into an [`AuthContext`].
/// The API wraps [`authenticate`] in a `from_fn_with_state` layer that inserts
/// the context into request extensions; handlers then take
/// `Extension<AuthContext>`.
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use cyclectl_shared::auth::jwt::issue_token_pair;
/// use cyclectl_shared::auth::middleware::authenticate;
/// use uuid::Uuid;
///
/// let secret = "jwt-secret-at-least-32-bytes-long!!";
/// let user_id = Uuid::new_v4();
/// let pair = issue_token_pair(user_id, secret).unwrap();
///
/// let mut headers = HeaderMap::new();
/// let bearer = format!("Bearer {}", pair.access_token);
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&bearer).unwrap());
///
/// let auth = authenticate(&headers, secret).unwrap();
/// assert_eq!(auth.user_id, user_id);
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// The signed-in user behind a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
}

/// Why a request could not be authenticated
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Expected Bearer token")]
    InvalidFormat,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::Expired,
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

/// Extracts the bearer token from the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

/// Resolves the request's session
///
/// # Errors
///
/// Fails if the header is missing or malformed, or the token is not a valid
/// access token for `secret`.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_access_token(token, secret)?;

    Ok(AuthContext { user_id: claims.sub })
}
