//! Attendance handlers

use axum::{Extension, extract::State, response::IntoResponse};
use chrono::{Local, Utc};
use common::models::AttendanceFilter;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::ApiResult,
    extract::{Body, Params, PathParam},
    middleware::AuthUser,
    models::{AttendanceQuery, ClockAction, ClockRequest, StatsQuery, created, ok},
    services::attendance::{AttendanceUpdate, NewAttendance},
    state::AppState,
};

/// Employees are pinned to their own records
fn scoped(user: &AuthUser, mut filter: AttendanceFilter) -> ApiResult<AttendanceFilter> {
    if !user.role.is_staff() {
        if let Some(id) = &filter.employee_id {
            user.require_access(id)?;
        }
        filter.employee_id = Some(user.employee_id.clone());
    }
    Ok(filter)
}

pub async fn list_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<AttendanceQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = scoped(&user, query.into_filter()?)?;
    let records = state.attendance.list(&filter).await?;
    Ok(ok(records))
}

/// Manual entry by a manager
pub async fn create_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Body(payload): Body<NewAttendance>,
) -> ApiResult<impl IntoResponse> {
    user.require_staff()?;
    let record = state.attendance.create_entry(payload, Utc::now()).await?;
    Ok(created(record))
}

pub async fn clock(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Body(payload): Body<ClockRequest>,
) -> ApiResult<impl IntoResponse> {
    let employee_id = match payload.target()? {
        Some(id) if id != user.employee_id => {
            user.require_staff()?;
            id
        }
        _ => user.employee_id.clone(),
    };

    let at = Local::now().naive_local();
    let now = Utc::now();
    let record = match payload.action {
        ClockAction::In => state.attendance.clock_in(&employee_id, at, now).await?,
        ClockAction::Out => state.attendance.clock_out(&employee_id, at, now).await?,
    };
    Ok(ok(record))
}

pub async fn update_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
    Body(patch): Body<AttendanceUpdate>,
) -> ApiResult<impl IntoResponse> {
    user.require_staff()?;
    let record = state.attendance.update_entry(id, patch, Utc::now()).await?;
    Ok(ok(record))
}

pub async fn delete_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;
    state.attendance.delete_entry(id).await?;
    Ok(ok(json!({ "deleted": true, "id": id })))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<StatsQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require_staff()?;
    let stats = state.attendance.stats(&query.into_filter()?).await?;
    Ok(ok(stats))
}
