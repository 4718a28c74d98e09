//! Caller identity extraction.
//!
//! The admission controller accepts any string as an identity and never looks
//! at requests. These extractors derive that string from request headers for
//! the HTTP middleware; hosts can plug in their own.

use crate::application::controller::UNKNOWN_IDENTITY;
use http::HeaderMap;
use std::fmt::Debug;

/// Header carrying the proxy chain, client first.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
/// Header carrying the client address as seen by the edge proxy.
pub const X_REAL_IP: &str = "x-real-ip";

/// Derives the counter identity for a request.
pub trait IdentityExtractor: Send + Sync + Debug {
    /// Return the identity for a request. Must not be empty.
    fn extract(&self, headers: &HeaderMap) -> String;
}

/// Identifies callers by client IP.
///
/// Uses the first entry of `X-Forwarded-For`, then `X-Real-IP`, then
/// [`UNKNOWN_IDENTITY`].
///
/// # Example
/// ```
/// use admission_control::{ForwardedIpExtractor, IdentityExtractor};
/// use http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
/// assert_eq!(ForwardedIpExtractor.extract(&headers), "203.0.113.7");
///
/// assert_eq!(ForwardedIpExtractor.extract(&HeaderMap::new()), "unknown");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardedIpExtractor;

impl IdentityExtractor for ForwardedIpExtractor {
    fn extract(&self, headers: &HeaderMap) -> String {
        let forwarded = header_str(headers, X_FORWARDED_FOR)
            .and_then(|chain| chain.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        forwarded
            .or_else(|| header_str(headers, X_REAL_IP))
            .unwrap_or(UNKNOWN_IDENTITY)
            .to_string()
    }
}

/// Identifies callers by an API key header, for partner and agency traffic.
///
/// Requests without the header fall back to [`ForwardedIpExtractor`].
#[derive(Debug, Clone)]
pub struct ApiKeyExtractor {
    header: String,
}

impl ApiKeyExtractor {
    /// Use the named header as the identity.
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into().to_ascii_lowercase(),
        }
    }

    /// Header this extractor reads.
    pub fn header(&self) -> &str {
        &self.header
    }
}

impl Default for ApiKeyExtractor {
    fn default() -> Self {
        Self::new("x-api-key")
    }
}

impl IdentityExtractor for ApiKeyExtractor {
    fn extract(&self, headers: &HeaderMap) -> String {
        match header_str(headers, &self.header) {
            Some(key) => format!("key:{}", key),
            None => ForwardedIpExtractor.extract(headers),
        }
    }
}

/// Non-empty, trimmed, valid-ASCII value of a header.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
