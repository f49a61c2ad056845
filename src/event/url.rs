//! Request-derived field values: redacted urls, remote ip, cookies.

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::http::{header, HeaderMap, Uri};
use url::form_urlencoded;

use crate::redaction::{RedactionPolicy, MASK};

/// Percent-decoded request path.
///
/// A path that does not decode to UTF-8 is returned as sent.
pub fn decoded_path(uri: &Uri) -> Cow<'_, str> {
    urlencoding::decode(uri.path()).unwrap_or(Cow::Borrowed(uri.path()))
}

/// Path plus query with anonymized parameter values masked.
///
/// Parameters keep their original order. Path and query are decoded for
/// readability, and the `?` is omitted when there are no parameters.
pub fn build_redacted_path(uri: &Uri, policy: &RedactionPolicy) -> String {
    let path = decoded_path(uri);
    let query = uri.query().map(|q| redact_query(q, policy)).unwrap_or_default();

    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    }
}

/// `scheme://host[:port]` followed by the redacted path.
///
/// Falls back to the `Host` header when the uri is not absolute.
pub fn build_full_url(uri: &Uri, headers: &HeaderMap, policy: &RedactionPolicy) -> String {
    let scheme = uri.scheme_str().unwrap_or("http");
    let mut url = format!("{}://", scheme);

    match uri.host() {
        Some(host) => {
            url.push_str(host);
            if let Some(port) = uri.port_u16() {
                url.push(':');
                url.push_str(&port.to_string());
            }
        }
        None => {
            if let Some(host) = headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
                url.push_str(host);
            }
        }
    }

    url.push_str(&build_redacted_path(uri, policy));
    url
}

fn redact_query(query: &str, policy: &RedactionPolicy) -> String {
    form_urlencoded::parse(query.as_bytes())
        .map(|(name, value)| {
            if policy.is_query_param_anonymized(&name) {
                format!("{}={}", name, MASK)
            } else {
                format!("{}={}", name, value)
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Client address, honouring proxy headers.
///
/// First non-empty of `X-Cluster-Client-Ip`, `X-Real-Ip`, then the host
/// portion of the peer address.
pub fn remote_ip(headers: &HeaderMap, peer_addr: Option<&str>) -> String {
    for name in ["x-cluster-client-ip", "x-real-ip"] {
        if let Some(ip) = headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        {
            return ip.to_string();
        }
    }

    match peer_addr {
        Some(addr) => match addr.parse::<SocketAddr>() {
            Ok(sock) => sock.ip().to_string(),
            Err(_) => addr.split(':').next().unwrap_or_default().to_string(),
        },
        None => String::new(),
    }
}

/// Cookies sent with the request, in header order.
pub fn request_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn policy(anonymized: &[&str]) -> RedactionPolicy {
        RedactionPolicy::new(
            Vec::new(),
            anonymized.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_redacted_path_untouched_without_policy() {
        let uri: Uri = "http://www.example.org/foo?q=bar&page=2".parse().unwrap();
        assert_eq!(build_redacted_path(&uri, &policy(&[])), "/foo?q=bar&page=2");
    }

    #[test]
    fn test_redacted_path_masks_values() {
        let uri: Uri = "/search?q1=hello&q2=world".parse().unwrap();
        let path = build_redacted_path(&uri, &policy(&["q1", "q3"]));

        assert!(path.contains("q1=*****"));
        assert!(path.contains("q2=world"));
        assert!(!path.contains("q3="));
        assert!(!path.contains("hello"));
    }

    #[test]
    fn test_redacted_path_is_idempotent() {
        let uri: Uri = "/foo?q=bar".parse().unwrap();
        let p = policy(&["q"]);
        assert_eq!(build_redacted_path(&uri, &p), "/foo?q=*****");
        assert_eq!(build_redacted_path(&uri, &p), "/foo?q=*****");
    }

    #[test]
    fn test_redacted_path_without_query() {
        let plain: Uri = "/foo".parse().unwrap();
        assert_eq!(build_redacted_path(&plain, &policy(&["q"])), "/foo");

        let dangling: Uri = "/foo?".parse().unwrap();
        assert_eq!(build_redacted_path(&dangling, &policy(&[])), "/foo");
    }

    #[test]
    fn test_redacted_path_decodes_for_readability() {
        let uri: Uri = "/foo?name=J%C3%BCrgen&city=New+York".parse().unwrap();
        assert_eq!(
            build_redacted_path(&uri, &policy(&[])),
            "/foo?name=Jürgen&city=New York"
        );
    }

    #[test]
    fn test_path_is_decoded() {
        let uri: Uri = "/files/annual%20report/J%C3%BCrgen+x?q=1".parse().unwrap();
        assert_eq!(decoded_path(&uri), "/files/annual report/Jürgen+x");
        assert_eq!(
            build_redacted_path(&uri, &policy(&[])),
            "/files/annual report/Jürgen+x?q=1"
        );

        let invalid: Uri = "/bytes/%FF".parse().unwrap();
        assert_eq!(decoded_path(&invalid), "/bytes/%FF");
    }

    #[test]
    fn test_full_url() {
        let uri: Uri = "http://www.example.org/foo?q=bar".parse().unwrap();
        let headers = HeaderMap::new();
        assert_eq!(
            build_full_url(&uri, &headers, &policy(&[])),
            "http://www.example.org/foo?q=bar"
        );
        assert_eq!(
            build_full_url(&uri, &headers, &policy(&["q"])),
            "http://www.example.org/foo?q=*****"
        );

        let with_port: Uri = "https://api.example.org:8443/v1".parse().unwrap();
        assert_eq!(
            build_full_url(&with_port, &headers, &policy(&[])),
            "https://api.example.org:8443/v1"
        );
    }

    #[test]
    fn test_full_url_from_host_header() {
        let uri: Uri = "/v1/items".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("svc.internal:8080"));
        assert_eq!(
            build_full_url(&uri, &headers, &policy(&[])),
            "http://svc.internal:8080/v1/items"
        );
    }

    #[test]
    fn test_remote_ip_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Cluster-Client-Ip", HeaderValue::from_static("1234"));
        headers.insert("X-Real-Ip", HeaderValue::from_static("5678"));
        assert_eq!(remote_ip(&headers, Some("10.0.0.1:80")), "1234");

        headers.remove("X-Cluster-Client-Ip");
        assert_eq!(remote_ip(&headers, Some("10.0.0.1:80")), "5678");

        headers.remove("X-Real-Ip");
        assert_eq!(remote_ip(&headers, Some("10.0.0.1:80")), "10.0.0.1");
    }

    #[test]
    fn test_remote_ip_peer_forms() {
        let headers = HeaderMap::new();
        assert_eq!(remote_ip(&headers, Some("1234:80")), "1234");
        assert_eq!(remote_ip(&headers, Some("127.0.0.1")), "127.0.0.1");
        assert_eq!(remote_ip(&headers, Some("[::1]:8080")), "::1");
        assert_eq!(remote_ip(&headers, None), "");
    }

    #[test]
    fn test_remote_ip_skips_empty_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Cluster-Client-Ip", HeaderValue::from_static(""));
        headers.insert("X-Real-Ip", HeaderValue::from_static("5678"));
        assert_eq!(remote_ip(&headers, None), "5678");
    }

    #[test]
    fn test_request_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("ignore=me; foo=bar;"));
        headers.append(header::COOKIE, HeaderValue::from_static("quoted=\"v\"; =nameless; flag"));

        assert_eq!(
            request_cookies(&headers),
            vec![
                ("ignore".to_string(), "me".to_string()),
                ("foo".to_string(), "bar".to_string()),
                ("quoted".to_string(), "v".to_string()),
            ]
        );
    }
}
