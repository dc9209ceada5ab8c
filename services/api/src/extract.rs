//! Extractors whose rejections use the error envelope

use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{HeaderMap, header, request::Parts},
};
use auth::ClientInfo;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON request body
pub struct Body<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Body<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        Ok(Body(value))
    }
}

/// Query string
pub struct Params<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        Ok(Params(value))
    }
}

/// Path segment
pub struct PathParam<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        Ok(PathParam(value))
    }
}

/// Caller address and agent, as reported by the proxy headers
pub fn client_info(headers: &HeaderMap) -> ClientInfo {
    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let ip_address = text("x-forwarded-for")
        .and_then(|chain| chain.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| text("x-real-ip"));

    ClientInfo {
        ip_address,
        user_agent: text(header::USER_AGENT.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_info_takes_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.9.9.9"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8"));

        let info = client_info(&headers);
        assert_eq!(info.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(info.user_agent.as_deref(), Some("curl/8"));
    }

    #[test]
    fn test_client_info_without_headers() {
        let info = client_info(&HeaderMap::new());
        assert_eq!(info.ip_address, None);
        assert_eq!(info.user_agent, None);
    }
}
