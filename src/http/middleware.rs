//! Request middleware applying a limiter to an HTTP pipeline.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;

use crate::limit::{resolve_client_key, Allowance, Decision, Denial, RateLimiter};

/// The configured request ceiling.
pub const HEADER_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
/// Quota left in the current window.
pub const HEADER_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
/// When the current window resets, as an ISO 8601 timestamp.
pub const HEADER_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Per-request limiter decision, for use with
/// `axum::middleware::from_fn_with_state`.
///
/// Requests matching the policy's skip rule pass through with no
/// accounting. Everything else is bucketed by client key and either
/// denied with a 429 or allowed with quota headers on the response.
/// With `count_success_only`, a response that finishes below status 400
/// is retroactively un-counted.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if limiter.policy().skip.matches(&request) {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = resolve_client_key(request.headers(), peer);

    match limiter.check(&key, Utc::now()) {
        Decision::Denied(denial) => too_many_requests(&denial),
        Decision::Allowed(allowance) => {
            let count_success_only = limiter.policy().count_success_only;
            let mut response = next.run(request).await;

            if count_success_only && response.status().as_u16() < 400 {
                limiter.decrement(&key);
            }

            apply_quota_headers(&mut response, &allowance);
            response
        }
    }
}

fn apply_quota_headers(response: &mut Response, allowance: &Allowance) {
    let headers = response.headers_mut();
    headers.insert(HEADER_LIMIT, HeaderValue::from(allowance.limit));
    headers.insert(HEADER_REMAINING, HeaderValue::from(allowance.remaining));

    let reset = allowance.reset_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    if let Ok(value) = HeaderValue::from_str(&reset) {
        headers.insert(HEADER_RESET, value);
    }
}

fn too_many_requests(denial: &Denial) -> Response {
    let body = json!({
        "error": "rate_limit_exceeded",
        "message": denial.message,
        "retryAfter": denial.retry_after_mins,
    });
    (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
}
