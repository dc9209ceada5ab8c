//! Policy settings handlers

use std::collections::BTreeMap;

use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::Value;

use crate::{
    error::{ApiError, ApiResult},
    extract::Body,
    middleware::AuthUser,
    models::ok,
    state::AppState,
};

pub async fn get_settings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;
    Ok(ok(state.settings.view().await?))
}

/// Accepts `{"key": value}` where value is a string or number
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Body(payload): Body<BTreeMap<String, Value>>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    let changes = payload
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => Ok((key, text)),
            Value::Number(number) => Ok((key, number.to_string())),
            _ => Err(ApiError::invalid_field(
                key.clone(),
                format!("{key} must be a string or a number"),
            )),
        })
        .collect::<ApiResult<BTreeMap<_, _>>>()?;

    let view = state.settings.update(&changes, Utc::now()).await?;
    Ok(ok(view))
}
