/// Authentication and authorization
///
/// # Modules
///
/// - [`jwt`]: Session tokens (access + refresh)
/// - [`oauth`]: Signed sign-in callbacks from the OAuth gateway
/// - [`middleware`]: Bearer token resolution into an [`middleware::AuthContext`]
/// - [`authorization`]: Per-project role checks
///
/// # Example
///
/// ```
/// use cyclectl_shared::auth::jwt::{issue_token_pair, validate_access_token};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "jwt-secret-at-least-32-bytes-long!!";
/// let pair = issue_token_pair(Uuid::new_v4(), secret)?;
/// let claims = validate_access_token(&pair.access_token, secret)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod oauth;
