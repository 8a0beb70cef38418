// Extractors whose rejections use the API's `{"error": ...}` body
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;

/// A single `:id` path segment parsed as a UUID
#[derive(Debug, Clone, Copy)]
pub struct Id(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Id {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::bad_request("Invalid id"))?;
        raw.parse::<Uuid>()
            .map(Id)
            .map_err(|_| ApiError::bad_request("Invalid id"))
    }
}

/// `Json<T>` with malformed bodies reported as 422 in the API error shape
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(JsonBody(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http, http::StatusCode};
    use serde_json::Value;

    fn json_request(body: impl Into<Body>) -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_body_is_unprocessable() {
        let err = JsonBody::<Value>::from_request(json_request("{not json"), &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn oversized_body_is_payload_too_large() {
        // Past axum's 2MB default, which applies when no DefaultBodyLimit layer is set
        let body = vec![b' '; 3 * 1024 * 1024];
        let err = JsonBody::<Value>::from_request(json_request(body), &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.message(), "Request body too large");
    }
}
