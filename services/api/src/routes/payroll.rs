//! Payroll handlers

use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::ApiResult,
    extract::{Body, Params, PathParam},
    middleware::AuthUser,
    models::{PayrollQuery, StatusUpdate, ok},
    services::payroll::GeneratePayroll,
    state::AppState,
};

pub async fn generate_payroll(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Body(payload): Body<GeneratePayroll>,
) -> ApiResult<impl IntoResponse> {
    user.require_staff()?;
    let report = state.payroll.generate_payroll(&payload, Utc::now()).await?;
    Ok(ok(report))
}

pub async fn list_payroll(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<PayrollQuery>,
) -> ApiResult<impl IntoResponse> {
    let mut filter = query.into_filter()?;
    if !user.role.is_staff() {
        if let Some(id) = &filter.employee_id {
            user.require_access(id)?;
        }
        filter.employee_id = Some(user.employee_id.clone());
    }

    let records = state.payroll.list_payroll(&filter).await?;
    Ok(ok(records))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
    Body(payload): Body<StatusUpdate>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;
    let record = state
        .payroll
        .update_status(id, payload.status, Utc::now())
        .await?;
    Ok(ok(record))
}
