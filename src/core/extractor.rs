use axum::{
    body::Body,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use std::convert::Infallible;

use crate::core::error::AppError;

/// Custom JSON extractor that provides consistent error responses
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppJsonRejection;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => Err(AppJsonRejection(rejection)),
        }
    }
}

pub struct AppJsonRejection(JsonRejection);

impl IntoResponse for AppJsonRejection {
    fn into_response(self) -> Response {
        let message = match self.0 {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON data: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("Invalid JSON syntax: {}", err),
            JsonRejection::MissingJsonContentType(err) => {
                format!("Missing JSON content type: {}", err)
            }
            _ => "Failed to parse JSON body".to_string(),
        };

        AppError::BadRequest(message).into_response()
    }
}

/// Origin (`scheme://host[:port]`) under which this request reached the server.
///
/// Taken from `X-Forwarded-Proto` and the `Host` header; the scheme defaults
/// to `http` when no proxy header is present and the host to `localhost`
/// when neither a `Host` header nor an absolute URI is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin(pub String);

impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        let scheme = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| s == "http" || s == "https")
            .unwrap_or_else(|| "http".to_string());

        Ok(Self(format!("{}://{}", scheme, host)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    async fn origin_of(request: HttpRequest<()>) -> String {
        let (mut parts, _) = request.into_parts();
        let RequestOrigin(origin) = RequestOrigin::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        origin
    }

    #[tokio::test]
    async fn test_request_origin_from_host_header() {
        let request = HttpRequest::builder()
            .uri("/api/models")
            .header(header::HOST, "example.com:5000")
            .body(())
            .unwrap();
        assert_eq!(origin_of(request).await, "http://example.com:5000");
    }

    #[tokio::test]
    async fn test_request_origin_honours_forwarded_proto() {
        let request = HttpRequest::builder()
            .uri("/api/models")
            .header(header::HOST, "example.com")
            .header("x-forwarded-proto", "https, http")
            .body(())
            .unwrap();
        assert_eq!(origin_of(request).await, "https://example.com");
    }

    #[tokio::test]
    async fn test_request_origin_fallback() {
        let request = HttpRequest::builder().uri("/").body(()).unwrap();
        assert_eq!(origin_of(request).await, "http://localhost");
    }
}
