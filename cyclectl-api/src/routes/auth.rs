/// Sign-in and session endpoints
///
/// The OAuth handshake itself happens in an external gateway. Once the
/// provider has verified the user, the gateway posts the profile here,
/// signed with the shared callback secret, and gets back a session.
///
/// # Endpoints
///
/// - `POST /v1/auth/session` - Exchange a signed profile for tokens
/// - `POST /v1/auth/refresh` - Refresh access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::HeaderMap, Json};
use bytes::Bytes;
use cyclectl_shared::{
    auth::{jwt, oauth},
    models::user::{UpsertUser, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Profile posted by the sign-in gateway
#[derive(Debug, Deserialize, Validate)]
pub struct SessionRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(url(message = "Image must be a URL"))]
    pub image: Option<String>,

    /// OAuth provider that verified the user, e.g. "google"
    #[validate(length(min = 1, max = 50, message = "Provider is required"))]
    pub provider: String,
}

/// Session response
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user_id: String,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,

    /// Seconds until the access token expires
    pub expires_in: i64,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,

    pub expires_in: i64,
}

/// Signed sign-in callback
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/session
/// X-CycleCtl-Signature: <hex hmac-sha256 of body>
/// Content-Type: application/json
///
/// { "email": "user@example.com", "name": "Ada", "provider": "google" }
/// ```
///
/// The signature is checked against the raw body before anything is parsed.
/// The user is created on first sign-in and refreshed on later ones.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or wrong signature
/// - `400 Bad Request`: Body is not a profile
/// - `422 Unprocessable Entity`: Profile fails validation
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<SessionResponse>> {
    let signature = headers
        .get(oauth::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing signature".to_string()))?;

    oauth::verify_signature(&state.config.oauth.callback_secret, &body, signature).map_err(|e| {
        tracing::warn!(error = %e, "Rejected sign-in callback");
        ApiError::from(e)
    })?;

    let req: SessionRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid profile: {}", e)))?;
    req.validate()?;

    let user = User::upsert_by_email(
        &state.db,
        UpsertUser {
            email: req.email,
            name: req.name,
            image: req.image,
            provider: req.provider,
        },
    )
    .await?;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, provider = %user.provider, "User signed in");

    Ok(Json(SessionResponse {
        user_id: user.id.to_string(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
    }))
}

/// Refresh access token
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/refresh
/// Content-Type: application/json
///
/// { "refresh_token": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired, or non-refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let (access_token, claims) = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    tracing::debug!(user_id = %claims.sub, "Access token refreshed");

    Ok(Json(RefreshResponse {
        access_token,
        expires_in: claims.expires_in_seconds(),
    }))
}
