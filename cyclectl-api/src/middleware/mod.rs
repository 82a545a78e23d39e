/// Middleware for the API server
///
/// Session resolution lives in [`crate::app`] as a `from_fn_with_state`
/// layer; this module holds the tower layers.

pub mod security;
