//! API models for request and response payloads

use axum::{Json, http::StatusCode};
use serde::Serialize;

pub mod auth;
pub mod queries;

pub use self::auth::{
    ChangePasswordRequest, LoginResponse, LogoutResponse, MeResponse, RefreshResponse,
    ResetPasswordRequest, SessionView, UserView,
};
pub use self::queries::{
    AttendanceQuery, ClockAction, ClockRequest, DeleteEmployeeQuery, PayrollQuery, StatsQuery,
    StatusUpdate,
};

/// Success envelope: `{"success": true, "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(data))
}
