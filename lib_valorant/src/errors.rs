//! # Error Taxonomy
//!
//! Every failure the request pipeline can surface to a caller is a variant of
//! [`ValorantError`]. HTTP-level failures carry an [`HttpFailure`] snapshot of
//! the response (method, URL, status, headers and decoded body) so callers can
//! diagnose the problem without re-issuing the request.
//!
//! Retryable conditions (500/502/504, connection resets, proxied 429s) never
//! reach this module unless the attempt budget is exhausted.

use std::fmt;

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

use crate::retrieve::transport::{ResponseBody, TransportError};

/// A snapshot of a non-success HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpFailure {
    /// The HTTP verb of the failed request.
    pub method: Method,
    /// The fully resolved URL that was requested.
    pub url: String,
    /// The numeric status code returned by the server.
    pub status: u16,
    /// Response headers as received.
    pub headers: HeaderMap,
    /// The decoded response body (JSON or opaque bytes).
    pub body: ResponseBody,
}

impl HttpFailure {
    /// Best-effort human readable message extracted from the body.
    ///
    /// Both API families report errors as `{"status": .., "error": ".."}` or
    /// `{"status": {"message": ".."}}`; anything else falls back to the raw text.
    pub fn message(&self) -> Option<String> {
        match &self.body {
            ResponseBody::Json(value) => extract_message(value),
            ResponseBody::Bytes(bytes) if !bytes.is_empty() => {
                Some(String::from_utf8_lossy(bytes).into_owned())
            }
            ResponseBody::Bytes(_) => None,
        }
    }
}

fn extract_message(value: &Value) -> Option<String> {
    value
        .get("error")
        .and_then(Value::as_str)
        .or_else(|| value.pointer("/status/message").and_then(Value::as_str))
        .or_else(|| value.get("message").and_then(Value::as_str))
        .map(str::to_owned)
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} returned {}", self.method, self.url, self.status)?;
        if let Some(msg) = self.message() {
            write!(f, ": {}", msg)?;
        }
        Ok(())
    }
}

/// All errors raised by this crate.
#[derive(Debug, Error)]
pub enum ValorantError {
    /// 400: the request was malformed and should not be repeated as is.
    #[error("bad request ({0})")]
    BadRequest(HttpFailure),

    /// 401: no credential was supplied.
    #[error("unauthorized ({0})")]
    Unauthorized(HttpFailure),

    /// 403: the credential was rejected or the path is not allowed.
    #[error("forbidden ({0})")]
    Forbidden(HttpFailure),

    /// 404: nothing matches the requested resource.
    #[error("not found ({0})")]
    NotFound(HttpFailure),

    /// 415: the request body was in a format the server does not accept.
    #[error("unsupported media type ({0})")]
    UnsupportedMediaType(HttpFailure),

    /// A server side failure that survived every retry.
    #[error("internal server error ({0})")]
    InternalServerError(HttpFailure),

    /// 503: the service is temporarily unable to handle requests.
    #[error("service unavailable ({0})")]
    ServiceUnavailable(HttpFailure),

    /// Any other non-success status.
    #[error("HTTP exception ({0})")]
    HttpException(HttpFailure),

    /// A 429 without the rate-limit proxy signature. This is an edge-level
    /// block, not ordinary throttling, and is never retried.
    #[error("request rejected at the edge ({0})")]
    EdgeRejected(HttpFailure),

    /// A transport failure that was not retryable or exhausted its budget.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The endpoint family wraps responses in `{"data": ..}` but the body did
    /// not have that shape.
    #[error("malformed response envelope from {url}: {reason}")]
    MalformedEnvelope {
        /// The URL that produced the response.
        url: String,
        /// What was wrong with the body.
        reason: String,
    },

    /// A payload could not be mapped to an entity.
    #[error("failed to decode {kind} payload: {source}")]
    Decode {
        /// The entity kind being decoded (e.g. "agent").
        kind: &'static str,
        /// The underlying serde failure.
        #[source]
        source: serde_json::Error,
    },

    /// A request body could not be serialized.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The route could not be turned into a URL.
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    /// A configuration value is unusable (bad credential, zero attempts, ...).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An internal consistency violation in the dispatcher.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ValorantError {
    /// Maps a non-success response onto its error kind.
    ///
    /// 429 is not handled here: whether it is an edge rejection or an
    /// exhausted rate limit depends on context the dispatcher owns.
    pub fn classify(failure: HttpFailure) -> Self {
        match failure.status {
            400 => Self::BadRequest(failure),
            401 => Self::Unauthorized(failure),
            403 => Self::Forbidden(failure),
            404 => Self::NotFound(failure),
            415 => Self::UnsupportedMediaType(failure),
            503 => Self::ServiceUnavailable(failure),
            s if s >= 500 => Self::InternalServerError(failure),
            _ => Self::HttpException(failure),
        }
    }

    /// Error for a failure that is still unresolved when the attempt budget
    /// runs out.
    pub fn exhausted(failure: HttpFailure) -> Self {
        if failure.status >= 500 {
            Self::InternalServerError(failure)
        } else {
            Self::HttpException(failure)
        }
    }

    /// The HTTP response snapshot, for HTTP-level kinds.
    pub fn failure(&self) -> Option<&HttpFailure> {
        match self {
            Self::BadRequest(f)
            | Self::Unauthorized(f)
            | Self::Forbidden(f)
            | Self::NotFound(f)
            | Self::UnsupportedMediaType(f)
            | Self::InternalServerError(f)
            | Self::ServiceUnavailable(f)
            | Self::HttpException(f)
            | Self::EdgeRejected(f) => Some(f),
            _ => None,
        }
    }

    /// The HTTP status code, for HTTP-level kinds.
    pub fn status(&self) -> Option<u16> {
        self.failure().map(|f| f.status)
    }
}

/// Statuses the dispatcher retries unconditionally after a backoff.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 500 | 502 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    fn failure(status: u16, body: ResponseBody) -> HttpFailure {
        HttpFailure {
            method: Method::GET,
            url: "https://valorant-api.com/v1/agents".into(),
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    #[test]
    fn classify_maps_each_documented_status() {
        let json = || ResponseBody::Json(json!({"status": 0}));
        assert!(matches!(ValorantError::classify(failure(400, json())), ValorantError::BadRequest(_)));
        assert!(matches!(ValorantError::classify(failure(401, json())), ValorantError::Unauthorized(_)));
        assert!(matches!(ValorantError::classify(failure(403, json())), ValorantError::Forbidden(_)));
        assert!(matches!(ValorantError::classify(failure(404, json())), ValorantError::NotFound(_)));
        assert!(matches!(ValorantError::classify(failure(415, json())), ValorantError::UnsupportedMediaType(_)));
        assert!(matches!(ValorantError::classify(failure(503, json())), ValorantError::ServiceUnavailable(_)));
        assert!(matches!(ValorantError::classify(failure(501, json())), ValorantError::InternalServerError(_)));
        assert!(matches!(ValorantError::classify(failure(418, json())), ValorantError::HttpException(_)));
    }

    #[test]
    fn exhausted_splits_on_server_errors() {
        let body = || ResponseBody::Bytes(Bytes::new());
        assert!(matches!(ValorantError::exhausted(failure(502, body())), ValorantError::InternalServerError(_)));
        assert!(matches!(ValorantError::exhausted(failure(429, body())), ValorantError::HttpException(_)));
    }

    #[test]
    fn message_prefers_structured_error_fields() {
        let f = failure(404, ResponseBody::Json(json!({"status": 404, "error": "the requested uuid was not found"})));
        assert_eq!(f.message().as_deref(), Some("the requested uuid was not found"));

        let riot = failure(403, ResponseBody::Json(json!({"status": {"message": "Forbidden", "status_code": 403}})));
        assert_eq!(riot.message().as_deref(), Some("Forbidden"));

        let text = failure(502, ResponseBody::Bytes(Bytes::from_static(b"bad gateway")));
        assert_eq!(text.message().as_deref(), Some("bad gateway"));
        assert!(text.to_string().contains("502"));
    }

    #[test]
    fn status_is_exposed_only_for_http_kinds() {
        let err = ValorantError::classify(failure(404, ResponseBody::Bytes(Bytes::new())));
        assert_eq!(err.status(), Some(404));
        assert_eq!(ValorantError::Internal("x".into()).status(), None);
        assert!(is_retryable_status(502));
        assert!(!is_retryable_status(503));
    }
}
