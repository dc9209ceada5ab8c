//! Login, logout, refresh, session and password handlers

use auth::{AuthenticatedAccount, LoginRequest};
use axum::{Extension, extract::State, http::HeaderMap, response::IntoResponse};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::Utc;
use serde_json::json;

use crate::{
    error::{ApiError, ApiResult},
    extract::{Body, client_info},
    middleware::AuthUser,
    models::{
        ChangePasswordRequest, LoginResponse, LogoutResponse, MeResponse, RefreshResponse,
        SessionView, UserView, ok,
    },
    state::AppState,
};

type BearerHeader = Option<TypedHeader<Authorization<Bearer>>>;

fn token_of(header: &BearerHeader) -> ApiResult<&str> {
    header
        .as_ref()
        .map(|TypedHeader(authorization)| authorization.token())
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::TokenMissing)
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Body(payload): Body<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .auth
        .login(&payload, &client_info(&headers), Utc::now())
        .await?;

    let user = UserView::new(&outcome.account, &outcome.employee);
    Ok(ok(LoginResponse::new(user, outcome.issued)))
}

/// Accepts expired tokens; ending an ended session is not an error
pub async fn logout(
    State(state): State<AppState>,
    bearer: BearerHeader,
) -> ApiResult<impl IntoResponse> {
    let token = token_of(&bearer)?;
    state.auth.logout(token).await?;
    Ok(ok(LogoutResponse { logged_out: true }))
}

pub async fn refresh(
    State(state): State<AppState>,
    bearer: BearerHeader,
) -> ApiResult<impl IntoResponse> {
    let token = token_of(&bearer)?;
    let issued = state.auth.refresh(token, Utc::now()).await?;
    Ok(ok(RefreshResponse::from(issued)))
}

pub async fn me(
    Extension(authenticated): Extension<AuthenticatedAccount>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(MeResponse::new(
        &authenticated.account,
        &authenticated.employee,
        &authenticated.session,
    )))
}

/// Sessions of the calling account, newest first
pub async fn sessions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let sessions: Vec<SessionView> = state
        .auth
        .sessions_of(user.account_id)
        .await?
        .into_iter()
        .map(|session| SessionView::new(session, user.session_id))
        .collect();
    Ok(ok(sessions))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Body(payload): Body<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .auth
        .change_password(
            user.account_id,
            &payload.current_password,
            &payload.new_password,
            Utc::now(),
        )
        .await?;
    Ok(ok(json!({ "passwordChanged": true })))
}
