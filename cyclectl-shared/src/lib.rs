//! # CycleCtl Shared Library
//!
//! This crate contains the types, store operations, and decision logic used by
//! the CycleCtl API server.
//!
//! ## Module Organization
//!
//! - `auth`: Session tokens, sign-in signatures, and the project authorization matrix
//! - `board`: Month calendar, task status derivation, and JSON import/export
//! - `db`: Connection pool lifecycle and migrations
//! - `models`: Database models and data structures

pub mod auth;
pub mod board;
pub mod db;
pub mod models;

/// Current version of the CycleCtl shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
