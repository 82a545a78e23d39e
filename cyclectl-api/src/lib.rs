//! # CycleCtl API Server Library
//!
//! HTTP surface of the CycleCtl project planner: a month-by-month task board
//! shared by a team with owner, editor, and viewer roles.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
