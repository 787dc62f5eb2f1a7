//! Request → invocation event.
//!
//! # Responsibilities
//! - Turn a routed HTTP request into the event a handler receives
//! - Decode path, query string and body the way the gateway does
//!
//! # Design Decisions
//! - Pure transformation: no I/O, safe to call concurrently
//! - Repeated query keys and headers collapse to the last value
//! - Binary bodies are not supported; a non-UTF-8 body fails the request

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::http::{header, HeaderMap, Method};
use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::framework::{Identity, InvocationEvent, RequestContext};

/// The request body could not be decoded as text.
#[derive(Debug, Error)]
#[error("request body is not valid UTF-8: {0}")]
pub struct EncodingError(#[from] pub std::str::Utf8Error);

/// Everything the synthesizer needs from one routed request.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    pub method: &'a Method,
    /// Path as received, still percent-encoded.
    pub path: &'a str,
    /// Parameters captured by the router, already decoded.
    pub path_params: &'a [(String, String)],
    pub query: Option<&'a str>,
    pub headers: &'a HeaderMap,
    pub peer: Option<SocketAddr>,
    pub body: &'a [u8],
}

/// Build the event for `request`.
///
/// `resource` is the matched pattern in gateway syntax; without it the
/// decoded request path stands in.
pub fn synthesize_event(
    request: &InboundRequest<'_>,
    resource: Option<&str>,
) -> Result<InvocationEvent, EncodingError> {
    let body = std::str::from_utf8(request.body)?.to_owned();
    let path = percent_decode_str(request.path).decode_utf8_lossy().into_owned();

    let path_parameters = request
        .path_params
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let query_string_parameters = request
        .query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    let headers = request
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let user_agent = request
        .headers
        .get(header::USER_AGENT)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    Ok(InvocationEvent {
        http_method: request.method.as_str().to_owned(),
        resource: resource.map(str::to_owned).unwrap_or_else(|| path.clone()),
        path,
        path_parameters,
        query_string_parameters,
        headers,
        request_context: RequestContext {
            identity: Identity {
                source_ip: request.peer.map(|addr| addr.ip().to_string()),
                user_agent,
            },
        },
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn builds_event_from_routed_request() {
        let params = vec![("id".to_string(), "42".to_string())];
        let headers = headers(&[("x-test", "a"), ("user-agent", "curl/8.0")]);
        let request = InboundRequest {
            method: &Method::GET,
            path: "/items/42",
            path_params: &params,
            query: Some("x=1&y=two%20words"),
            headers: &headers,
            peer: Some("127.0.0.1:50000".parse().unwrap()),
            body: b"",
        };

        let event = synthesize_event(&request, Some("/items/{id}")).unwrap();
        assert_eq!(event.http_method, "GET");
        assert_eq!(event.path, "/items/42");
        assert_eq!(event.path_parameters["id"], "42");
        assert_eq!(event.query_string_parameters["x"], "1");
        assert_eq!(event.query_string_parameters["y"], "two words");
        assert_eq!(event.header("X-Test"), Some("a"));
        assert_eq!(event.source_ip(), Some("127.0.0.1"));
        assert_eq!(event.user_agent(), Some("curl/8.0"));
        assert_eq!(event.resource, "/items/{id}");
        assert_eq!(event.body, "");
    }

    #[test]
    fn resource_falls_back_to_path() {
        let headers = HeaderMap::new();
        let request = InboundRequest {
            method: &Method::POST,
            path: "/a%20b",
            path_params: &[],
            query: None,
            headers: &headers,
            peer: None,
            body: "héllo".as_bytes(),
        };

        let event = synthesize_event(&request, None).unwrap();
        assert_eq!(event.path, "/a b");
        assert_eq!(event.resource, "/a b");
        assert_eq!(event.body, "héllo");
        assert!(event.query_string_parameters.is_empty());
        assert!(event.source_ip().is_none());
        assert!(event.user_agent().is_none());
    }

    #[test]
    fn repeated_keys_keep_last_value() {
        let headers = headers(&[("x-dup", "first"), ("x-dup", "second")]);
        let request = InboundRequest {
            method: &Method::GET,
            path: "/",
            path_params: &[],
            query: Some("k=1&k=2"),
            headers: &headers,
            peer: None,
            body: b"",
        };

        let event = synthesize_event(&request, Some("/")).unwrap();
        assert_eq!(event.query_string_parameters["k"], "2");
        assert_eq!(event.header("x-dup"), Some("second"));
    }

    #[test]
    fn non_utf8_body_is_an_encoding_error() {
        let headers = HeaderMap::new();
        let request = InboundRequest {
            method: &Method::POST,
            path: "/upload",
            path_params: &[],
            query: None,
            headers: &headers,
            peer: None,
            body: &[0xff, 0xfe, 0x00],
        };

        assert!(synthesize_event(&request, Some("/upload")).is_err());
    }
}
