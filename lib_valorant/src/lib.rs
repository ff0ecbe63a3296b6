//! # lib_valorant
//!
//! Async client for the Valorant game-data APIs: the community
//! `valorant-api.com` catalogue and the official Riot account API.
//!
//! Two pieces do the real work:
//! - [`retrieve::RequestDispatcher`] serializes requests per route, honours a
//!   global cooldown, retries transient failures with a linear backoff and
//!   classifies everything else into [`ValorantError`].
//! - [`state::ConnectionState`] maps every decoded entity to one shared
//!   instance per natural key, so repeated fetches hand back the same `Arc`.
//!
//! [`ValorantClient`] ties the two together. Layered configuration and
//! logging setup live behind the `configs` and `loggers` features.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// The client façade.
pub mod client;
/// Error types.
pub mod errors;
/// Entity models.
pub mod models;
/// The request pipeline.
pub mod retrieve;
/// Identity-mapped entity caches.
pub mod state;

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "loggers")]
pub mod loggers;

pub use client::ValorantClient;
pub use errors::{HttpFailure, ValorantError};
pub use models::{Account, Agent, Buddy, BuddyLevel, Ceremony, Icon, Language};
pub use retrieve::{EndpointFamily, PlatformRouting, RequestDispatcher, RetryPolicy, Route};
pub use state::ConnectionState;
