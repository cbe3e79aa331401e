//! Request-ID correlation middleware.
//!
//! Mirrors a forwarded `X-Request-ID` or generates one, exposes it to
//! handlers via request extensions, and logs request start/completion.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use ragd_domain::utils::id;

/// Header carrying the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id stored in request extensions
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Middleware entry point
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| id::prefixed("req"));

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    tracing::info!(request_id = %request_id, %method, path, "request started");

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    tracing::info!(
        request_id = %request_id,
        status = response.status().as_u16(),
        "request completed"
    );
    response
}
