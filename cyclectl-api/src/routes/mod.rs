/// API route handlers
///
/// Handlers are thin: resolve the session, load the roster, ask the
/// authorization matrix, then call the store.
///
/// - `health`: Health check endpoint
/// - `auth`: Signed sign-in callback and token refresh
/// - `projects`: Project listing, creation, and lookup
/// - `tasks`: The month-by-month board
/// - `team`: Roster management

pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod team;
