//! CORS / origin policy (spec §6, SPEC_FULL §6 additions).
//!
//! `ALLOWED_ORIGINS` unset or empty means every origin is allowed
//! (`Access-Control-Allow-Origin: *`). When set, the request's `Origin`
//! header (falling back to `Referer`) is matched case-insensitively against
//! the configured allow-list of hosts or full origin URLs; a match echoes
//! the exact origin back with `Vary: Origin`, a mismatch is rejected with
//! 403 before the handler runs. `OPTIONS` preflight gets the same decision
//! applied directly, never reaching a route handler.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// The outcome of checking a request's origin against the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginDecision {
    /// No allow-list configured: every origin is allowed, echoed as `*`.
    AllowAny,
    /// Allow-list configured and the request's origin matched it.
    AllowExact(String),
    /// Allow-list configured and the request's origin did not match (or was absent).
    Reject,
}

/// Extract the host (and, for full-origin entries, the scheme) portion of an
/// origin string, lowercased, for comparison purposes.
fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Does `origin` match one allow-list `entry`?
///
/// An entry containing `://` is compared as a full origin string; a bare
/// entry is compared against the origin's host (and optional port).
fn entry_matches(entry: &str, origin: &str) -> bool {
    if entry.contains("://") {
        return entry == origin;
    }
    let host = origin.split("://").nth(1).unwrap_or(origin);
    let host = host.split('/').next().unwrap_or(host);
    entry == host
}

/// Decide whether `origin_header` is allowed under `allowed_origins`.
///
/// Per spec.md §9/§6 CORS additions: an empty allow-list means "allow
/// everything"; a non-empty list requires a matching `Origin` (or `Referer`)
/// header.
pub fn evaluate_origin(allowed_origins: &[String], origin_header: Option<&str>) -> OriginDecision {
    if allowed_origins.is_empty() {
        return OriginDecision::AllowAny;
    }

    match origin_header {
        Some(raw) => {
            let origin = normalize(raw);
            if allowed_origins.iter().any(|entry| entry_matches(entry, &origin)) {
                OriginDecision::AllowExact(raw.to_string())
            } else {
                OriginDecision::Reject
            }
        }
        None => OriginDecision::Reject,
    }
}

fn request_origin(req: &Request) -> Option<String> {
    req.headers()
        .get(header::ORIGIN)
        .or_else(|| req.headers().get(header::REFERER))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn apply_headers(headers: &mut axum::http::HeaderMap, decision: &OriginDecision) {
    match decision {
        OriginDecision::AllowAny => {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
        OriginDecision::AllowExact(origin) => {
            if let Ok(value) = HeaderValue::from_str(origin) {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
            }
            headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        }
        OriginDecision::Reject => {}
    }
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, POST, OPTIONS"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("content-type, authorization"));
}

/// Axum middleware applying the origin policy above: rejects non-matching
/// origins with 403, answers `OPTIONS` preflight directly, and stamps CORS
/// headers on every other response.
pub async fn cors_middleware(
    State(allowed_origins): State<Arc<Vec<String>>>,
    req: Request,
    next: Next,
) -> Response {
    let origin = request_origin(&req);
    let decision = evaluate_origin(&allowed_origins, origin.as_deref());

    if req.method() == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        if decision == OriginDecision::Reject {
            *response.status_mut() = StatusCode::FORBIDDEN;
        }
        apply_headers(response.headers_mut(), &decision);
        return response;
    }

    if decision == OriginDecision::Reject {
        return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }

    let mut response = next.run(req).await;
    apply_headers(response.headers_mut(), &decision);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allow_list_allows_everything() {
        assert_eq!(evaluate_origin(&[], None), OriginDecision::AllowAny);
        assert_eq!(evaluate_origin(&[], Some("https://evil.example.com")), OriginDecision::AllowAny);
    }

    #[test]
    fn bare_host_entry_matches_full_origin() {
        let allowed = vec!["example.com".to_string()];
        assert_eq!(
            evaluate_origin(&allowed, Some("https://example.com")),
            OriginDecision::AllowExact("https://example.com".to_string())
        );
    }

    #[test]
    fn full_origin_entry_requires_exact_match() {
        let allowed = vec!["https://example.com".to_string()];
        assert_eq!(
            evaluate_origin(&allowed, Some("https://example.com")),
            OriginDecision::AllowExact("https://example.com".to_string())
        );
        assert_eq!(evaluate_origin(&allowed, Some("http://example.com")), OriginDecision::Reject);
    }

    #[test]
    fn non_matching_origin_is_rejected() {
        let allowed = vec!["example.com".to_string()];
        assert_eq!(evaluate_origin(&allowed, Some("https://evil.example.com")), OriginDecision::Reject);
    }

    #[test]
    fn missing_origin_header_is_rejected_when_list_configured() {
        let allowed = vec!["example.com".to_string()];
        assert_eq!(evaluate_origin(&allowed, None), OriginDecision::Reject);
    }

    #[test]
    fn match_is_case_insensitive() {
        let allowed = vec!["Example.COM".to_lowercase()];
        assert_eq!(
            evaluate_origin(&allowed, Some("HTTPS://EXAMPLE.COM")),
            OriginDecision::AllowExact("HTTPS://EXAMPLE.COM".to_string())
        );
    }
}
