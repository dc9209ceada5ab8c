//! Authentication for the attendance and payroll service
//!
//! Credential checks, login lockout, session tokens and password management.
//! Persistence goes through [`common::Store`], so the same service runs
//! against PostgreSQL in production and the in-memory store in tests.

pub mod config;
pub mod error;
pub mod jwt;
pub mod password;
pub mod rate_limiter;
pub mod service;
pub mod session;
pub mod validation;

pub use crate::config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use service::{AuthService, AuthenticatedAccount, LoginOutcome, LoginRequest};
pub use session::{ClientInfo, IssuedToken};
