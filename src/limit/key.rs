//! Client key resolution.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Header carrying the forwarded client address when a proxy sits in front.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Derive the bucketing key for a request origin.
///
/// An explicit forwarded-address header takes priority; otherwise the
/// transport peer address is used. No validation is performed on the
/// header value: this is a bucketing heuristic, not a security boundary,
/// and any string (including the empty string when neither source is
/// available) is a usable key.
pub fn resolve_client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get(FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        // The header may carry the whole proxy chain; the first hop is the client.
        let first = forwarded.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.1:40000".parse().unwrap())
    }

    #[test]
    fn test_peer_address_used_without_header() {
        let headers = HeaderMap::new();
        assert_eq!(resolve_client_key(&headers, peer()), "10.0.0.1");
    }

    #[test]
    fn test_forwarded_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("203.0.113.5"));
        assert_eq!(resolve_client_key(&headers, peer()), "203.0.113.5");
    }

    #[test]
    fn test_forwarded_chain_uses_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.5, 198.51.100.7, 10.0.0.1"),
        );
        assert_eq!(resolve_client_key(&headers, peer()), "203.0.113.5");
    }

    #[test]
    fn test_empty_header_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("  "));
        assert_eq!(resolve_client_key(&headers, peer()), "10.0.0.1");
    }

    #[test]
    fn test_degenerate_key_when_nothing_available() {
        let headers = HeaderMap::new();
        assert_eq!(resolve_client_key(&headers, None), "");
    }

    #[test]
    fn test_header_value_not_validated_as_ip() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("not-an-ip"));
        assert_eq!(resolve_client_key(&headers, peer()), "not-an-ip");
    }
}
