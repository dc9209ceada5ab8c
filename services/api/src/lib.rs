//! Attendance and payroll HTTP service
//!
//! The binary in `main.rs` only wires configuration, the PostgreSQL store
//! and the scheduler around [`routes::create_router`]; everything else lives
//! here so integration tests can drive the router over a
//! [`common::MemoryStore`].

pub mod config;
pub mod error;
pub mod extract;
pub mod maintenance;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use crate::config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
