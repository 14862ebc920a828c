//! Transport layer for wterm.
//!
//! The terminal bridge speaks STOMP over a WebSocket. URLs may be given as
//! `ws://`/`wss://` or as the `http://`/`https://` form of the same endpoint.

pub mod websocket;

pub use websocket::{StompChannel, StompConnector};

use wterm_core::error::{TermError, TermResult};

/// Normalize a bridge URL to a WebSocket URL.
///
/// `http` and `https` are mapped to `ws` and `wss`; other schemes are rejected.
pub fn websocket_url(url: &str) -> TermResult<String> {
    let lower = url.to_lowercase();
    if lower.starts_with("ws://") || lower.starts_with("wss://") {
        Ok(url.to_string())
    } else if lower.starts_with("http://") {
        Ok(format!("ws://{}", &url["http://".len()..]))
    } else if lower.starts_with("https://") {
        Ok(format!("wss://{}", &url["https://".len()..]))
    } else {
        Err(TermError::Transport(format!(
            "unsupported URL scheme: {url} (expected ws://, wss://, http://, or https://)"
        )))
    }
}

/// Host part of a URL, used for the STOMP `host` header.
pub fn url_host(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = without_scheme.split('/').next().unwrap_or(without_scheme);
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if authority.starts_with('[') {
        return authority
            .split_once(']')
            .map_or(authority, |(host, _)| &host[1..]);
    }
    authority.split(':').next().unwrap_or(authority)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_urls_pass_through() {
        assert_eq!(websocket_url("ws://h:8080/ws").unwrap(), "ws://h:8080/ws");
        assert_eq!(websocket_url("wss://h/ws").unwrap(), "wss://h/ws");
    }

    #[test]
    fn http_urls_are_mapped() {
        assert_eq!(
            websocket_url("http://h:8080/ws/websocket").unwrap(),
            "ws://h:8080/ws/websocket"
        );
        assert_eq!(websocket_url("https://h/ws").unwrap(), "wss://h/ws");
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(websocket_url("ftp://h").is_err());
        assert!(websocket_url("localhost:8080").is_err());
    }

    #[test]
    fn host_is_extracted() {
        assert_eq!(url_host("ws://example.com:8080/ws"), "example.com");
        assert_eq!(url_host("wss://user@example.com/ws"), "example.com");
        assert_eq!(url_host("ws://[::1]:8080/ws"), "::1");
        assert_eq!(url_host("ws://localhost"), "localhost");
    }
}
