//! Request snapshots for event building.
//!
//! # Responsibilities
//! - Capture the parts of a request an event needs before the request is
//!   moved into the handler or the client
//! - Resolve host, protocol and peer address uniformly for inbound and
//!   outbound requests

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderName, Method, Request, Uri, Version};

use crate::event::url::decoded_path;

/// The request data events are built from.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    /// Peer address as reported by the server, e.g. `10.0.0.1:51234`.
    pub peer_addr: Option<String>,
}

impl RequestSnapshot {
    /// Snapshot a request, reading the peer address from axum's
    /// `ConnectInfo` extension when the server provides it.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let peer_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string());

        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            version: req.version(),
            headers: req.headers().clone(),
            peer_addr,
        }
    }

    pub fn with_peer_addr(mut self, addr: impl Into<String>) -> Self {
        self.peer_addr = Some(addr.into());
        self
    }

    /// `Host` header, falling back to the uri authority.
    pub fn host(&self) -> String {
        if let Some(host) = self.headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
            return host.to_string();
        }
        self.uri
            .authority()
            .map(|a| a.as_str().to_string())
            .unwrap_or_default()
    }

    /// Percent-decoded path, as written into event messages.
    pub fn path(&self) -> Cow<'_, str> {
        decoded_path(&self.uri)
    }

    /// Whether the request carries a non-empty query string.
    pub fn has_query(&self) -> bool {
        self.uri.query().is_some_and(|q| !q.is_empty())
    }

    /// Protocol version as written on the wire, e.g. `HTTP/1.1`.
    pub fn proto(&self) -> &'static str {
        match self.version {
            Version::HTTP_09 => "HTTP/0.9",
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_2 => "HTTP/2.0",
            Version::HTTP_3 => "HTTP/3.0",
            _ => "HTTP/1.1",
        }
    }

    /// Header value as a string, empty when missing or not visible ASCII.
    pub fn header(&self, name: HeaderName) -> String {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reads_connect_info() {
        let mut req = Request::get("/foo").body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("10.1.2.3:4567".parse::<SocketAddr>().unwrap()));

        let snapshot = RequestSnapshot::from_request(&req);
        assert_eq!(snapshot.peer_addr.as_deref(), Some("10.1.2.3:4567"));
    }

    #[test]
    fn test_host_prefers_header() {
        let req = Request::get("http://authority.example/foo")
            .header("Host", "header.example")
            .body(())
            .unwrap();
        assert_eq!(RequestSnapshot::from_request(&req).host(), "header.example");

        let req = Request::get("http://authority.example:8080/foo").body(()).unwrap();
        assert_eq!(RequestSnapshot::from_request(&req).host(), "authority.example:8080");

        let req = Request::get("/foo").body(()).unwrap();
        assert_eq!(RequestSnapshot::from_request(&req).host(), "");
    }

    #[test]
    fn test_query_detection() {
        let with = Request::get("/foo?q=1").body(()).unwrap();
        let empty = Request::get("/foo?").body(()).unwrap();
        let without = Request::get("/foo").body(()).unwrap();

        assert!(RequestSnapshot::from_request(&with).has_query());
        assert!(!RequestSnapshot::from_request(&empty).has_query());
        assert!(!RequestSnapshot::from_request(&without).has_query());
    }

    #[test]
    fn test_proto() {
        let req = Request::get("/").version(Version::HTTP_2).body(()).unwrap();
        assert_eq!(RequestSnapshot::from_request(&req).proto(), "HTTP/2.0");

        let req = Request::get("/").body(()).unwrap();
        assert_eq!(RequestSnapshot::from_request(&req).proto(), "HTTP/1.1");
    }
}
