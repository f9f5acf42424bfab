//! Request tracking middleware.
//!
//! Every request gets a request ID, taken from the `X-Request-Id` header when
//! the caller sent a valid UUID and generated otherwise. Handler logs run in
//! a span carrying it, and the response echoes it back.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for the request ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Request ID stored in the request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

/// Tag the request with an ID, run it in a span, echo the ID.
///
/// Install with `axum::middleware::from_fn(request_id)`.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    req.extensions_mut().insert(RequestId(id));

    let span = tracing::info_span!(
        "http_request",
        request_id = %id,
        method = %req.method(),
        uri = %req.uri(),
    );

    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Extension, Router, http::HeaderName, routing::get};
    use axum_test::TestServer;

    fn server() -> TestServer {
        let app = Router::new()
            .route(
                "/test",
                get(|Extension(RequestId(id)): Extension<RequestId>| async move { id.to_string() }),
            )
            .layer(axum::middleware::from_fn(request_id));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_request_id_generated_if_missing() {
        let response = server().get("/test").await;

        let header = response.headers().get(REQUEST_ID_HEADER).unwrap();
        let id = Uuid::parse_str(header.to_str().unwrap()).unwrap();
        assert_eq!(response.text(), id.to_string());
    }

    #[tokio::test]
    async fn test_request_id_preserved() {
        let id = Uuid::new_v4();
        let response = server()
            .get("/test")
            .add_header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_str(&id.to_string()).unwrap(),
            )
            .await;

        assert_eq!(response.text(), id.to_string());
    }

    #[tokio::test]
    async fn test_invalid_request_id_replaced() {
        let response = server()
            .get("/test")
            .add_header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("not-a-uuid"),
            )
            .await;

        let header = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(header.to_str().unwrap()).is_ok());
    }
}
