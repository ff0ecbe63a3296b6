//! # Routes and Endpoint Families
//!
//! A [`Route`] names one logical API operation: an HTTP verb, a path template
//! such as `/agents/{uuid}`, the values for its placeholders, and the endpoint
//! family it belongs to. The resolved URL is never stored; it is recomputed
//! from the current base host every time it is asked for, so overriding the
//! base host (e.g. switching Riot region) can never leave a stale URL behind.
//!
//! Routes that share a path template share a rate-limit bucket, whatever their
//! parameter values are.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use reqwest::header::{HeaderName, AUTHORIZATION};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use crate::errors::ValorantError;

/// Base URL of the community game-data API.
pub const COMMUNITY_BASE: &str = "https://valorant-api.com/v1";

/// Header carrying the API key on the official Riot API.
pub const RIOT_TOKEN_HEADER: &str = "x-riot-token";

/// The API family a route belongs to. Families differ in host, credential
/// header and response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointFamily {
    /// valorant-api.com: static game content wrapped in `{"status", "data"}`.
    Community,
    /// The official Riot Games API: account and match data, unwrapped.
    Riot,
}

/// How a successful JSON response is unwrapped before it is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// The payload lives under a top-level `data` field.
    Data,
    /// The body is the payload.
    Raw,
}

/// Per-family transport settings handed to the dispatcher.
#[derive(Debug, Clone)]
pub struct FamilyProfile {
    /// Default base host, used unless a route overrides it.
    pub base_url: String,
    /// Name of the header that carries the credential.
    pub credential_header: HeaderName,
    /// The credential value, if one is configured.
    pub credential: Option<String>,
    /// Unwrapping policy for successful responses.
    pub envelope: Envelope,
}

impl FamilyProfile {
    /// Profile for valorant-api.com.
    pub fn community(token: Option<String>) -> Self {
        Self {
            base_url: COMMUNITY_BASE.to_string(),
            credential_header: AUTHORIZATION,
            credential: token,
            envelope: Envelope::Data,
        }
    }

    /// Profile for the Riot API on the given regional host.
    pub fn riot(region: PlatformRouting, api_key: Option<String>) -> Self {
        Self {
            base_url: region.base_url(),
            credential_header: HeaderName::from_static(RIOT_TOKEN_HEADER),
            credential: api_key,
            envelope: Envelope::Raw,
        }
    }

    /// Replaces the default base host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Regional hosts of the Riot API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformRouting {
    Br1,
    Eun1,
    Euw1,
    Jp1,
    Kr,
    La1,
    La2,
    Na1,
    Na,
    Oc1,
    Tri,
    Ru,
    Americas,
}

impl PlatformRouting {
    /// All known regions.
    pub const ALL: [PlatformRouting; 13] = [
        Self::Br1,
        Self::Eun1,
        Self::Euw1,
        Self::Jp1,
        Self::Kr,
        Self::La1,
        Self::La2,
        Self::Na1,
        Self::Na,
        Self::Oc1,
        Self::Tri,
        Self::Ru,
        Self::Americas,
    ];

    /// The short region code, e.g. `euw1`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Br1 => "br1",
            Self::Eun1 => "eun1",
            Self::Euw1 => "euw1",
            Self::Jp1 => "jp1",
            Self::Kr => "kr",
            Self::La1 => "la1",
            Self::La2 => "la2",
            Self::Na1 => "na1",
            Self::Na => "na",
            Self::Oc1 => "oc1",
            Self::Tri => "tri",
            Self::Ru => "ru",
            Self::Americas => "americas",
        }
    }

    /// `https://{region}.api.riotgames.com`
    pub fn base_url(&self) -> String {
        format!("https://{}.api.riotgames.com", self.as_str())
    }
}

impl fmt::Display for PlatformRouting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformRouting {
    type Err = ValorantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| ValorantError::InvalidRoute(format!("unknown platform routing '{}'", s)))
    }
}

/// One logical API operation.
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    path: String,
    params: BTreeMap<String, String>,
    query: Vec<(String, String)>,
    family: EndpointFamily,
    base: Option<String>,
}

impl Route {
    /// Creates a route from a verb and a path template. Placeholders are
    /// whole path segments written as `{name}`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: BTreeMap::new(),
            query: Vec::new(),
            family: EndpointFamily::Community,
            base: None,
        }
    }

    /// Shorthand for a `GET` route.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Sets the endpoint family (defaults to [`EndpointFamily::Community`]).
    pub fn family(mut self, family: EndpointFamily) -> Self {
        self.family = family;
        self
    }

    /// Binds a value to a `{name}` placeholder.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    /// Appends a query-string parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Overrides the base host for this route only.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// The HTTP verb.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The endpoint family.
    pub fn endpoint_family(&self) -> EndpointFamily {
        self.family
    }

    /// The unresolved path template.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The serialization bucket: the path template, not the resolved URL.
    pub fn bucket(&self) -> &str {
        &self.path
    }

    /// Resolves the full URL against the route's own base override, or
    /// `default_base` when there is none.
    ///
    /// # Errors
    /// Returns [`ValorantError::InvalidRoute`] when the base is not an absolute
    /// URL or a placeholder has no bound value.
    pub fn url(&self, default_base: &str) -> Result<Url, ValorantError> {
        let base = self.base.as_deref().unwrap_or(default_base);
        let mut url = Url::parse(base)
            .map_err(|e| ValorantError::InvalidRoute(format!("bad base url '{}': {}", base, e)))?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ValorantError::InvalidRoute(format!("base url '{}' cannot have a path", base)))?;
            segments.pop_if_empty();
            for segment in self.path.split('/').filter(|s| !s.is_empty()) {
                match placeholder(segment) {
                    Some(name) => {
                        let value = self.params.get(name).ok_or_else(|| {
                            ValorantError::InvalidRoute(format!("missing parameter '{}' for {}", name, self.path))
                        })?;
                        segments.push(value);
                    }
                    None => {
                        segments.push(segment);
                    }
                }
            }
        }

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }

    /// The outgoing parameters reported with each request event.
    pub fn params_json(&self) -> Value {
        let query: Map<String, Value> = self
            .query
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        json!({ "path": self.params, "query": query })
    }
}

fn placeholder(segment: &str) -> Option<&str> {
    segment.strip_prefix('{').and_then(|s| s.strip_suffix('}'))
}
