//! # HTTP Transport
//!
//! The dispatcher talks to the network through the [`Transport`] trait so that
//! the retry and classification policy can be driven by scripted responses in
//! tests. [`ReqwestTransport`] is the production implementation and owns the
//! single outbound connection pool, built on `reqwest_middleware` so callers
//! can layer their own middleware (tracing, caching, ...) underneath the
//! dispatcher.

use std::error::Error as StdError;
use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Method;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Home page embedded in the user agent.
pub const REPO_URL: &str = env!("CARGO_PKG_REPOSITORY");

/// Version of the HTTP library embedded in the user agent.
pub const REQWEST_VERSION: &str = "0.12";

/// Toolchain that compiled this crate, captured by the build script.
pub const RUSTC_VERSION: &str = env!("VALORANT_RUSTC_VERSION");

type BoxError = Box<dyn StdError + Send + Sync>;

/// The user agent sent with every request.
///
/// `valorant-rs/<crate version> (<repo>) (Rust/<rustc>; reqwest/<version>)`
pub fn user_agent() -> String {
    format!(
        "valorant-rs/{} ({}) (Rust/{}; reqwest/{})",
        env!("CARGO_PKG_VERSION"),
        REPO_URL,
        RUSTC_VERSION,
        REQWEST_VERSION
    )
}

/// A fully prepared request, ready to go on the wire.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    /// HTTP verb.
    pub method: Method,
    /// Absolute URL.
    pub url: Url,
    /// Complete header set, credential included.
    pub headers: HeaderMap,
    /// Serialized body, if any.
    pub body: Option<Bytes>,
}

/// What came back from the wire, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Numeric status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw body bytes.
    pub body: Bytes,
}

/// A response body decoded according to its content type.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The server declared JSON and the body parsed as JSON.
    Json(Value),
    /// Anything else, kept verbatim.
    Bytes(Bytes),
}

impl ResponseBody {
    /// Whether the body is structured JSON.
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json(_))
    }

    /// The JSON value, if the body is structured.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Bytes(_) => None,
        }
    }
}

/// Decodes a body as JSON when the content type says so; otherwise keeps the
/// bytes. A body that claims to be JSON but does not parse is kept as bytes.
pub fn decode_body(headers: &HeaderMap, body: Bytes) -> ResponseBody {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false);

    if is_json {
        if let Ok(value) = serde_json::from_slice::<Value>(&body) {
            return ResponseBody::Json(value);
        }
    }
    ResponseBody::Bytes(body)
}

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer reset the connection. Retried like a 5xx.
    #[error("connection reset by peer: {0}")]
    ConnectionReset(#[source] BoxError),

    /// Anything else. Propagated immediately.
    #[error("{0}")]
    Other(#[source] BoxError),
}

impl TransportError {
    /// Whether the dispatcher may retry this failure.
    pub fn is_connection_reset(&self) -> bool {
        matches!(self, Self::ConnectionReset(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if caused_by_connection_reset(&err) {
            Self::ConnectionReset(Box::new(err))
        } else {
            Self::Other(Box::new(err))
        }
    }
}

impl From<reqwest_middleware::Error> for TransportError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => e.into(),
            other => {
                if caused_by_connection_reset(&other) {
                    Self::ConnectionReset(Box::new(other))
                } else {
                    Self::Other(Box::new(other))
                }
            }
        }
    }
}

/// Walks the source chain looking for an `io::ErrorKind::ConnectionReset`.
pub fn caused_by_connection_reset(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::ConnectionReset {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// Executes prepared requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and returns the raw response.
    async fn execute(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError>;
}

/// The production transport: one pooled `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    inner: ClientWithMiddleware,
}

impl ReqwestTransport {
    /// Creates a transport with a fresh connection pool and no middleware.
    pub fn new() -> Self {
        Self::from_client(ClientBuilder::new(reqwest::Client::new()).build())
    }

    /// Wraps an existing (possibly middleware-decorated) client.
    pub fn from_client(inner: ClientWithMiddleware) -> Self {
        Self { inner }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError> {
        let mut req = self
            .inner
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            req = req.body(body);
        }

        let response = req.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(RawResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers_with(ct: &'static str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        h
    }

    #[test]
    fn json_content_type_is_decoded() {
        let body = decode_body(
            &headers_with("application/json; charset=utf-8"),
            Bytes::from_static(br#"{"status":200,"data":[]}"#),
        );
        assert_eq!(body.as_json().unwrap()["status"], 200);
    }

    #[test]
    fn other_content_types_stay_opaque() {
        let body = decode_body(&headers_with("text/html"), Bytes::from_static(b"<html>banned</html>"));
        assert_eq!(body, ResponseBody::Bytes(Bytes::from_static(b"<html>banned</html>")));
        assert!(!decode_body(&HeaderMap::new(), Bytes::from_static(b"{}")).is_json());
    }

    #[test]
    fn unparseable_json_is_kept_as_bytes() {
        let body = decode_body(&headers_with("application/json"), Bytes::from_static(b"{not json"));
        assert!(!body.is_json());
    }

    #[test]
    fn connection_reset_is_found_in_the_source_chain() {
        #[derive(Debug, Error)]
        #[error("wrapper")]
        struct Wrapper(#[source] io::Error);

        let reset = Wrapper(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(caused_by_connection_reset(&reset));

        let refused = Wrapper(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(!caused_by_connection_reset(&refused));
    }

    #[test]
    fn user_agent_names_library_runtime_and_transport() {
        let ua = user_agent();
        assert!(ua.starts_with(&format!("valorant-rs/{}", env!("CARGO_PKG_VERSION"))));
        assert!(ua.contains("Rust/"));
        assert!(ua.contains("reqwest/0.12"));
        assert!(ua.contains(&format!("({})", env!("CARGO_PKG_REPOSITORY"))));
        assert!(!ua.contains("rsdev"));
    }
}
