//! HTTP rendering of admission decisions.
//!
//! Every guarded response carries `X-RateLimit-Limit`, `X-RateLimit-Remaining`
//! and `X-RateLimit-Reset` (epoch seconds). Rejections are answered with
//! `429 Too Many Requests`, a `Retry-After` header and a JSON body:
//!
//! ```json
//! {
//!   "error": "Too Many Requests",
//!   "message": "Rate limit exceeded. Please try again in 60 seconds.",
//!   "retryAfter": 60
//! }
//! ```

use crate::domain::decision::Decision;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderMap, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// `X-RateLimit-Limit` header.
pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
/// `X-RateLimit-Remaining` header.
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
/// `X-RateLimit-Reset` header.
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Rate-limit headers derived from a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// Policy limit
    pub limit: u64,
    /// Admissions left in the window
    pub remaining: u64,
    /// Window end in epoch seconds
    pub reset: u64,
    /// Seconds to wait; only present on rejection
    pub retry_after: Option<u64>,
}

impl RateLimitHeaders {
    /// Derive headers from a decision.
    pub fn from_decision(decision: &Decision) -> Self {
        Self {
            limit: decision.limit,
            remaining: decision.remaining,
            reset: decision.reset_at_secs(),
            retry_after: decision.retry_after_secs,
        }
    }

    /// Write the headers into `headers`, replacing existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset));
        match self.retry_after {
            Some(secs) => {
                headers.insert(RETRY_AFTER, HeaderValue::from(secs));
            }
            None => {
                headers.remove(RETRY_AFTER);
            }
        }
    }
}

impl From<&Decision> for RateLimitHeaders {
    fn from(decision: &Decision) -> Self {
        Self::from_decision(decision)
    }
}

/// JSON body of a 429 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionBody {
    /// Always `"Too Many Requests"`
    pub error: String,
    /// Human-readable retry hint
    pub message: String,
    /// Seconds to wait before retrying
    pub retry_after: u64,
}

impl RejectionBody {
    /// Body for a request that must wait `retry_after` seconds.
    pub fn new(retry_after: u64) -> Self {
        Self {
            error: "Too Many Requests".to_string(),
            message: format!(
                "Rate limit exceeded. Please try again in {} seconds.",
                retry_after
            ),
            retry_after,
        }
    }

    /// Body for a rejected decision.
    pub fn from_decision(decision: &Decision) -> Self {
        Self::new(decision.retry_after_secs.unwrap_or_default())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> String {
        // A struct of strings and integers always serializes
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Build the complete 429 response for a rejected decision.
///
/// Works with any body type constructible from a `String`, such as
/// `axum::body::Body`.
pub fn too_many_requests<B>(decision: &Decision) -> Response<B>
where
    B: From<String>,
{
    let body = RejectionBody::from_decision(decision).to_json();
    let mut response = Response::new(B::from(body));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    RateLimitHeaders::from_decision(decision).apply(headers);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
        headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_admitted_headers() {
        let decision = Decision::admitted(5, 3, 1_700_000_060_000);
        let mut headers = HeaderMap::new();
        RateLimitHeaders::from_decision(&decision).apply(&mut headers);

        assert_eq!(header(&headers, &X_RATELIMIT_LIMIT), Some("5"));
        assert_eq!(header(&headers, &X_RATELIMIT_REMAINING), Some("3"));
        assert_eq!(header(&headers, &X_RATELIMIT_RESET), Some("1700000060"));
        assert!(headers.get(RETRY_AFTER).is_none());
    }

    #[test]
    fn test_rejected_headers() {
        let decision = Decision::rejected(5, 60_500, 60);
        let mut headers = HeaderMap::new();
        RateLimitHeaders::from(&decision).apply(&mut headers);

        assert_eq!(header(&headers, &X_RATELIMIT_REMAINING), Some("0"));
        assert_eq!(header(&headers, &X_RATELIMIT_RESET), Some("61"));
        assert_eq!(header(&headers, &RETRY_AFTER), Some("60"));
    }

    #[test]
    fn test_admitted_clears_stale_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        RateLimitHeaders::from_decision(&Decision::admitted(5, 4, 0)).apply(&mut headers);
        assert!(headers.get(RETRY_AFTER).is_none());
    }

    #[test]
    fn test_rejection_body_json() {
        let json = RejectionBody::new(42).to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["error"], "Too Many Requests");
        assert_eq!(
            value["message"],
            "Rate limit exceeded. Please try again in 42 seconds."
        );
        assert_eq!(value["retryAfter"], 42);
    }

    #[test]
    fn test_too_many_requests_response() {
        let decision = Decision::rejected(10, 120_000, 7);
        let response: Response<String> = too_many_requests(&decision);

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            header(response.headers(), &CONTENT_TYPE),
            Some("application/json")
        );
        assert_eq!(header(response.headers(), &X_RATELIMIT_LIMIT), Some("10"));
        assert_eq!(header(response.headers(), &RETRY_AFTER), Some("7"));

        let body: RejectionBody = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body, RejectionBody::new(7));
    }
}
