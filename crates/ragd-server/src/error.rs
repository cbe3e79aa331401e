//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ragd_domain::Error;
use serde_json::json;

/// Wrapper turning domain errors into HTTP responses
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::AdmissionDenied { .. } | Error::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Error::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Error::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("error"),
            "detail": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(Error::validation("bad"), StatusCode::BAD_REQUEST)]
    #[case(Error::not_found("job"), StatusCode::NOT_FOUND)]
    #[case(Error::unauthorized("no token"), StatusCode::UNAUTHORIZED)]
    #[case(Error::AdmissionDenied { limit: 10 }, StatusCode::TOO_MANY_REQUESTS)]
    #[case(Error::RateLimited, StatusCode::TOO_MANY_REQUESTS)]
    #[case(Error::timeout("request"), StatusCode::REQUEST_TIMEOUT)]
    #[case(Error::StoreUnavailable, StatusCode::SERVICE_UNAVAILABLE)]
    #[case(Error::provider("llm down"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn domain_errors_map_to_expected_statuses(#[case] error: Error, #[case] expected: StatusCode) {
        assert_eq!(ApiError(error).status(), expected);
    }
}
