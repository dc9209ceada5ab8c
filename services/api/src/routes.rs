//! API service routes

use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::error;

use crate::{middleware::auth_middleware, state::AppState};

pub mod attendance;
pub mod auth;
pub mod employees;
pub mod payroll;
pub mod settings;

/// Create the router for the API service
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/sessions", get(auth::sessions))
        .route("/api/auth/change-password", post(auth::change_password))
        .route(
            "/api/employees",
            get(employees::list_employees).post(employees::create_employee),
        )
        .route(
            "/api/employees/:id",
            get(employees::get_employee)
                .put(employees::update_employee)
                .delete(employees::delete_employee),
        )
        .route(
            "/api/employees/:id/reset-password",
            post(employees::reset_password),
        )
        .route(
            "/api/attendance",
            get(attendance::list_attendance).post(attendance::create_attendance),
        )
        .route("/api/attendance/clock", post(attendance::clock))
        .route("/api/attendance/stats", get(attendance::stats))
        .route(
            "/api/attendance/:id",
            put(attendance::update_attendance).delete(attendance::delete_attendance),
        )
        .route("/api/payroll", get(payroll::list_payroll))
        .route("/api/payroll/generate", post(payroll::generate_payroll))
        .route("/api/payroll/:id/status", put(payroll::update_status))
        .route(
            "/api/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/refresh", post(auth::refresh))
        .merge(protected_routes)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "api-service",
                "database": "up"
            })),
        ),
        outcome => {
            if let Err(e) = outcome {
                error!("Health check failed: {}", e);
            }
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "service": "api-service",
                    "database": "down"
                })),
            )
        }
    }
}
