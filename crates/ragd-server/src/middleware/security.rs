//! Security middleware.
//!
//! Per-IP sliding-window rate limiting, request body cap, trusted-host
//! check, a server-side request timeout, and the standard security
//! headers on every response.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use ragd_domain::utils::time;
use ragd_infrastructure::config::AppConfig;
use serde_json::json;

/// Rate-limit and limits state shared across requests
pub struct SecurityState {
    rate_limit_requests: usize,
    rate_limit_window: f64,
    max_request_size: usize,
    request_timeout: Duration,
    allowed_hosts: Vec<String>,
    request_log: Mutex<HashMap<String, Vec<f64>>>,
}

impl SecurityState {
    /// Build from configuration.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let rate_limit_window = config.rate_limit_window as f64;
        Self {
            rate_limit_requests: config.rate_limit_requests as usize,
            rate_limit_window,
            max_request_size: config.max_request_size,
            request_timeout: Duration::from_secs(config.request_timeout),
            allowed_hosts: config.allowed_host_list(),
            request_log: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request for `client_ip`; returns `false` once the window
    /// is full. Unknown clients are always admitted.
    pub fn check_rate_limit(&self, client_ip: &str, now: f64) -> bool {
        if client_ip == "unknown" {
            return true;
        }
        let Ok(mut log) = self.request_log.lock() else {
            return true;
        };
        let window_start = now - self.rate_limit_window;
        let timestamps = log.entry(client_ip.to_owned()).or_default();
        timestamps.retain(|&stamp| stamp > window_start);

        if timestamps.len() >= self.rate_limit_requests {
            tracing::warn!(
                client_ip,
                requests_in_window = timestamps.len(),
                limit = self.rate_limit_requests,
                "rate limit exceeded"
            );
            return false;
        }
        timestamps.push(now);
        true
    }

    fn host_allowed(&self, host: Option<&str>) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }
        let Some(host) = host else {
            return false;
        };
        // Compare without a port suffix.
        let bare = host.rsplit_once(':').map_or(host, |(name, _)| name);
        self.allowed_hosts
            .iter()
            .any(|allowed| allowed == host || allowed == bare)
    }
}

fn client_ip(request: &Request) -> String {
    let headers = request.headers();
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_owned();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|value| value.to_str().ok()) {
        return real_ip.to_owned();
    }
    "unknown".to_owned()
}

fn reject(status: StatusCode, body: serde_json::Value) -> Response {
    (status, Json(body)).into_response()
}

/// Middleware entry point
pub async fn security_middleware(
    State(state): State<crate::state::AppState>,
    request: Request,
    next: Next,
) -> Response {
    let security = &state.security;
    let ip = client_ip(&request);

    // Trusted hosts (only when configured).
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());
    if !security.host_allowed(host) {
        return reject(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Invalid host header" }),
        );
    }

    // Rate limit.
    let now = time::epoch_secs_f64().unwrap_or_default();
    if !security.check_rate_limit(&ip, now) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let retry_after = security.rate_limit_window as u64;
        return reject(
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "error": "Rate limit exceeded", "retry_after": retry_after }),
        );
    }

    // Declared body size.
    let declared_size = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared_size.is_some_and(|size| size > security.max_request_size) {
        tracing::warn!(client_ip = %ip, size = declared_size, "request too large");
        return reject(
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "error": "Request too large" }),
        );
    }

    // Server-side timeout around the rest of the stack.
    let mut response =
        match tokio::time::timeout(security.request_timeout, next.run(request)).await {
            Ok(response) => response,
            Err(_) => {
                tracing::error!(client_ip = %ip, "request timeout");
                reject(
                    StatusCode::REQUEST_TIMEOUT,
                    json!({ "error": "Request timeout" }),
                )
            }
        };

    add_security_headers(&mut response);
    response
}

fn add_security_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'self'"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security(limit: u32, window: u64) -> SecurityState {
        let config = AppConfig {
            rate_limit_requests: limit,
            rate_limit_window: window,
            ..AppConfig::default()
        };
        SecurityState::new(&config)
    }

    #[test]
    fn rate_limit_fills_and_slides() {
        let state = security(2, 60);
        assert!(state.check_rate_limit("1.2.3.4", 100.0));
        assert!(state.check_rate_limit("1.2.3.4", 101.0));
        assert!(!state.check_rate_limit("1.2.3.4", 102.0));
        // Another client has its own window.
        assert!(state.check_rate_limit("5.6.7.8", 102.0));
        // After the window slides, the first client is admitted again.
        assert!(state.check_rate_limit("1.2.3.4", 161.5));
    }

    #[test]
    fn unknown_clients_bypass_the_limiter() {
        let state = security(1, 60);
        assert!(state.check_rate_limit("unknown", 100.0));
        assert!(state.check_rate_limit("unknown", 100.0));
    }

    #[test]
    fn host_allowlist_matches_with_and_without_port() {
        let config = AppConfig {
            allowed_hosts: Some("api.example.com".to_owned()),
            ..AppConfig::default()
        };
        let state = SecurityState::new(&config);
        assert!(state.host_allowed(Some("api.example.com")));
        assert!(state.host_allowed(Some("api.example.com:8000")));
        assert!(!state.host_allowed(Some("evil.example.com")));
        assert!(!state.host_allowed(None));

        let open = security(10, 60);
        assert!(open.host_allowed(Some("anything.example.com")));
        assert!(open.host_allowed(None));
    }
}
