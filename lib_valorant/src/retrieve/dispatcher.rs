//! # Request Dispatcher
//!
//! Turns a [`Route`] into a rate-limited, retried and classified HTTP exchange.
//!
//! ## Logic:
//! 1.  The bucket key is the route's path template; its lock is looked up (or
//!     created) in the [`BucketLocks`] table.
//! 2.  The caller takes the bucket lock. The lock guard lives for the whole
//!     logical call, across every retry, and is dropped on any exit path
//!     including cancellation.
//! 3.  Up to `max_attempts` exchanges are made, each one waiting for the
//!     [`GlobalGate`] to be open first:
//!     - **2xx**: the body is decoded, unwrapped per the family's envelope and
//!       returned.
//!     - **429**: without the proxy marker header, or with a non-JSON body, it
//!       is an edge rejection and fails at once. Otherwise it is retried with
//!       no extra delay, unless the response names a `Retry-After` (capped
//!       at [`MAX_RETRY_AFTER`]).
//!     - **500/502/504** and connection resets: retried after
//!       `base + attempt_index * step` (1s, 3s, 5s, 7s by default).
//!     - Anything else is classified and returned as an error immediately.
//! 4.  When the budget runs out the last response decides the error:
//!     5xx becomes `InternalServerError`, anything else `HttpException`.
//!
//! A [`RequestEvent`] is broadcast before every attempt for logging or
//! metrics; nothing waits on its receivers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::sleep;
use url::Url;

use crate::errors::{is_retryable_status, HttpFailure, ValorantError};
use crate::retrieve::buckets::BucketLocks;
use crate::retrieve::gate::GlobalGate;
use crate::retrieve::route::{EndpointFamily, Envelope, FamilyProfile, PlatformRouting, Route};
use crate::retrieve::transport::{
    decode_body, user_agent, OutgoingRequest, ReqwestTransport, ResponseBody, Transport,
};

/// Header naming the scope of a Riot rate limit.
pub const RATE_LIMIT_TYPE_HEADER: &str = "x-rate-limit-type";

/// Longest `Retry-After` the dispatcher will honour; larger values are
/// clamped to it.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

const EVENT_CAPACITY: usize = 256;

/// Attempt budget and backoff schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per logical call, first attempt included.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub backoff_base: Duration,
    /// Added to the delay for every further attempt.
    pub backoff_step: Duration,
    /// Header whose presence marks a 429 as coming from the rate-limit proxy
    /// rather than the edge.
    pub proxy_marker_header: HeaderName,
}

impl RetryPolicy {
    /// Delay after the failed attempt `attempt_index` (0-based). Saturates
    /// at `Duration::MAX`.
    pub fn backoff(&self, attempt_index: u32) -> Duration {
        self.backoff_base
            .saturating_add(self.backoff_step.saturating_mul(attempt_index))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(1),
            backoff_step: Duration::from_secs(2),
            proxy_marker_header: HeaderName::from_static("via"),
        }
    }
}

/// Emitted before every attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEvent {
    /// HTTP verb.
    pub method: String,
    /// Resolved URL.
    pub url: String,
    /// Bucket key (path template).
    pub bucket: String,
    /// Outgoing path and query parameters.
    pub params: Value,
    /// 0-based attempt index within the logical call.
    pub attempt: u32,
}

/// The request pipeline shared by every façade call.
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
    profiles: HashMap<EndpointFamily, FamilyProfile>,
    locks: BucketLocks,
    gate: GlobalGate,
    policy: RetryPolicy,
    user_agent: HeaderValue,
    events: broadcast::Sender<RequestEvent>,
}

impl RequestDispatcher {
    /// Creates a dispatcher over the production transport with default
    /// profiles for both families and the default retry policy.
    pub fn new(community_token: Option<String>, riot_api_key: Option<String>) -> Self {
        Self::with_transport(Arc::new(ReqwestTransport::new()), RetryPolicy::default())
            .with_profile(EndpointFamily::Community, FamilyProfile::community(community_token))
            .with_profile(EndpointFamily::Riot, FamilyProfile::riot(PlatformRouting::Americas, riot_api_key))
    }

    /// Creates a dispatcher over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut profiles = HashMap::new();
        profiles.insert(EndpointFamily::Community, FamilyProfile::community(None));
        profiles.insert(EndpointFamily::Riot, FamilyProfile::riot(PlatformRouting::Americas, None));

        let user_agent = HeaderValue::from_str(&user_agent())
            .unwrap_or_else(|_| HeaderValue::from_static("valorant-rs"));

        Self {
            transport,
            profiles,
            locks: BucketLocks::new(),
            gate: GlobalGate::new(),
            policy,
            user_agent,
            events,
        }
    }

    /// Installs the profile used for `family`.
    pub fn with_profile(mut self, family: EndpointFamily, profile: FamilyProfile) -> Self {
        self.profiles.insert(family, profile);
        self
    }

    /// The profile in use for `family`.
    pub fn profile(&self, family: EndpointFamily) -> Result<&FamilyProfile, ValorantError> {
        self.profiles
            .get(&family)
            .ok_or_else(|| ValorantError::InvalidConfig(format!("no profile for {:?} endpoints", family)))
    }

    /// The retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The global cooldown gate.
    pub fn gate(&self) -> &GlobalGate {
        &self.gate
    }

    /// The bucket lock table.
    pub fn buckets(&self) -> &BucketLocks {
        &self.locks
    }

    /// Subscribes to per-attempt request events.
    pub fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        self.events.subscribe()
    }

    /// Performs the exchange and returns the payload, unwrapped according to
    /// the route family's envelope.
    ///
    /// # Errors
    /// Any classified [`ValorantError`] the retry policy could not absorb.
    pub async fn send<B>(&self, route: &Route, body: Option<&B>) -> Result<Value, ValorantError>
    where
        B: Serialize + ?Sized,
    {
        let profile = self.profile(route.endpoint_family())?;
        let url = route.url(&profile.base_url)?;
        let raw = self.exchange(route, profile, &url, body).await?;
        unwrap_envelope(profile.envelope, url.as_str(), raw)
    }

    /// Performs the exchange and returns the decoded body as is, without
    /// envelope unwrapping.
    pub async fn send_raw<B>(&self, route: &Route, body: Option<&B>) -> Result<ResponseBody, ValorantError>
    where
        B: Serialize + ?Sized,
    {
        let profile = self.profile(route.endpoint_family())?;
        let url = route.url(&profile.base_url)?;
        self.exchange(route, profile, &url, body).await
    }

    async fn exchange<B>(
        &self,
        route: &Route,
        profile: &FamilyProfile,
        url: &Url,
        body: Option<&B>,
    ) -> Result<ResponseBody, ValorantError>
    where
        B: Serialize + ?Sized,
    {
        let method = route.method().clone();
        let bucket = route.bucket();
        let headers = self.build_headers(profile, body.is_some())?;
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(ValorantError::Encode)?
            .map(Bytes::from);

        let lock = self.locks.lock_for(bucket);
        let _guard = lock.lock_owned().await;

        let max_attempts = self.policy.max_attempts;
        let mut last: Option<HttpFailure> = None;

        for attempt in 0..max_attempts {
            let more_attempts = attempt + 1 < max_attempts;
            self.gate.wait_open().await;
            self.emit(route, url.as_str(), attempt);

            let request = OutgoingRequest {
                method: method.clone(),
                url: url.clone(),
                headers: headers.clone(),
                body: payload.clone(),
            };

            let response = match self.transport.execute(request).await {
                Ok(response) => response,
                Err(e) if e.is_connection_reset() && more_attempts => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(%method, %url, attempt, ?delay, "connection reset, retrying");
                    sleep(delay).await;
                    continue;
                }
                Err(e) => {
                    tracing::error!(%method, %url, attempt, error = %e, "transport failure");
                    return Err(e.into());
                }
            };

            let status = response.status;
            let body = decode_body(&response.headers, response.body);
            tracing::debug!(%method, %url, bucket, status, "request returned");

            if (200..300).contains(&status) {
                return Ok(body);
            }

            let failure = HttpFailure {
                method: method.clone(),
                url: url.to_string(),
                status,
                headers: response.headers,
                body,
            };

            if status == 429 {
                if !failure.headers.contains_key(&self.policy.proxy_marker_header) || !failure.body.is_json() {
                    tracing::error!(%method, %url, "429 without rate-limit proxy signature, treating as edge rejection");
                    return Err(ValorantError::EdgeRejected(failure));
                }

                let retry_after = retry_after(&failure.headers);
                let global = is_global_limit(&failure.headers);
                tracing::debug!(bucket, ?retry_after, global, "rate limited: {:?}", failure.body.as_json());
                last = Some(failure);

                if more_attempts {
                    match retry_after {
                        Some(delay) if global => {
                            self.gate.close_for(delay);
                        }
                        Some(delay) => {
                            tracing::warn!(bucket, ?delay, "rate limited, honouring Retry-After");
                            sleep(delay).await;
                        }
                        None => {}
                    }
                }
                continue;
            }

            if is_retryable_status(status) {
                last = Some(failure);
                if more_attempts {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(%method, %url, status, attempt, ?delay, "server error, retrying");
                    sleep(delay).await;
                }
                continue;
            }

            let err = ValorantError::classify(failure);
            tracing::error!(%method, %url, status, "{}", err);
            return Err(err);
        }

        match last {
            Some(failure) => {
                let err = ValorantError::exhausted(failure);
                tracing::error!(%method, %url, attempts = max_attempts, "{}", err);
                Err(err)
            }
            None => Err(ValorantError::Internal(format!(
                "retry loop for {} {} ended without a response",
                method, url
            ))),
        }
    }

    fn build_headers(&self, profile: &FamilyProfile, has_body: bool) -> Result<HeaderMap, ValorantError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, self.user_agent.clone());

        if let Some(credential) = &profile.credential {
            let mut value = HeaderValue::from_str(credential).map_err(|_| {
                ValorantError::InvalidConfig(format!(
                    "credential for header '{}' is not a valid header value",
                    profile.credential_header
                ))
            })?;
            value.set_sensitive(true);
            headers.insert(profile.credential_header.clone(), value);
        }

        if has_body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(headers)
    }

    fn emit(&self, route: &Route, url: &str, attempt: u32) {
        let event = RequestEvent {
            method: route.method().to_string(),
            url: url.to_string(),
            bucket: route.bucket().to_string(),
            params: route.params_json(),
            attempt,
        };
        tracing::debug!(method = %event.method, url = %event.url, bucket = %event.bucket, params = %event.params, attempt, "request");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Applies the family's envelope policy to a successful body.
pub fn unwrap_envelope(envelope: Envelope, url: &str, body: ResponseBody) -> Result<Value, ValorantError> {
    match (envelope, body) {
        (Envelope::Data, ResponseBody::Json(Value::Object(mut map))) => {
            map.remove("data").ok_or_else(|| ValorantError::MalformedEnvelope {
                url: url.to_string(),
                reason: "missing 'data' field".to_string(),
            })
        }
        (Envelope::Data, ResponseBody::Json(_)) => Err(ValorantError::MalformedEnvelope {
            url: url.to_string(),
            reason: "body is not a JSON object".to_string(),
        }),
        (Envelope::Data, ResponseBody::Bytes(_)) => Err(ValorantError::MalformedEnvelope {
            url: url.to_string(),
            reason: "body is not JSON".to_string(),
        }),
        (Envelope::Raw, ResponseBody::Json(value)) => Ok(value),
        (Envelope::Raw, ResponseBody::Bytes(bytes)) if bytes.is_empty() => Ok(Value::Null),
        (Envelope::Raw, ResponseBody::Bytes(bytes)) => Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned())),
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .map(|delay| delay.min(MAX_RETRY_AFTER))
}

fn is_global_limit(headers: &HeaderMap) -> bool {
    headers
        .get(RATE_LIMIT_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.eq_ignore_ascii_case("application"))
        .unwrap_or(false)
}
