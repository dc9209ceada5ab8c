//! Employee management handlers

use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use common::models::{EmployeeFilter, EmployeeId, EmployeeUpdate, Role};
use serde_json::json;

use crate::{
    error::{ApiError, ApiResult},
    extract::{Body, Params, PathParam},
    middleware::AuthUser,
    models::{DeleteEmployeeQuery, ResetPasswordRequest, created, ok},
    services::employees::NewEmployee,
    state::AppState,
};

pub async fn list_employees(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(filter): Params<EmployeeFilter>,
) -> ApiResult<impl IntoResponse> {
    user.require_staff()?;
    let employees = state.employees.list_employees(&filter).await?;
    Ok(ok(employees))
}

pub async fn create_employee(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Body(payload): Body<NewEmployee>,
) -> ApiResult<impl IntoResponse> {
    user.require_staff()?;
    if matches!(payload.role, Some(Role::Admin | Role::Manager)) {
        user.require_admin()?;
    }

    let created_employee = state.employees.create_employee(payload, Utc::now()).await?;
    Ok(created(created_employee))
}

pub async fn get_employee(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    PathParam(id): PathParam<String>,
) -> ApiResult<impl IntoResponse> {
    let id = EmployeeId::parse(&id)?;
    user.require_access(&id)?;

    let employee = state.employees.get_employee(&id).await?;
    let account = state.employees.account_of(&id).await?;
    Ok(ok(json!({
        "employee": employee,
        "username": account.as_ref().map(|a| a.username.clone()),
        "role": account.map(|a| a.role),
    })))
}

pub async fn update_employee(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    PathParam(id): PathParam<String>,
    Body(patch): Body<EmployeeUpdate>,
) -> ApiResult<impl IntoResponse> {
    user.require_staff()?;
    let id = EmployeeId::parse(&id)?;
    let employee = state.employees.update_employee(&id, patch, Utc::now()).await?;
    Ok(ok(employee))
}

/// Soft delete; history is kept
pub async fn delete_employee(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    PathParam(id): PathParam<String>,
    Params(query): Params<DeleteEmployeeQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;
    let id = EmployeeId::parse(&id)?;
    if id == user.employee_id {
        return Err(ApiError::invalid_field(
            "employee_id",
            "You cannot deactivate your own record",
        ));
    }

    let employee = state
        .employees
        .soft_delete_employee(&id, query.status, Utc::now())
        .await?;
    Ok(ok(employee))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    PathParam(id): PathParam<String>,
    Body(payload): Body<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;
    let id = EmployeeId::parse(&id)?;
    state
        .employees
        .reset_password(&id, &payload.new_password, Utc::now())
        .await?;
    Ok(ok(json!({ "passwordReset": true })))
}
