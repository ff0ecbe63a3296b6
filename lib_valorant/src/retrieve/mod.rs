//! # Data Retrieval Module
//!
//! The request pipeline: everything between "call this API operation" and
//! "here is the decoded payload, or a classified error".
//!
//! ## Contained Modules:
//!
//! - **`route`**: routes, path templates, endpoint families and regional hosts.
//! - **`transport`**: the `Transport` seam and the pooled `reqwest` client
//!   behind it.
//! - **`buckets`**: the per-route lock table that serializes requests sharing
//!   a path template.
//! - **`gate`**: the global cooldown gate that pauses every bucket at once.
//! - **`dispatcher`**: the retry, backoff and error-classification loop that
//!   ties the above together.

/// Per-bucket request serialization.
pub mod buckets;
/// Retry loop, backoff and error classification.
pub mod dispatcher;
/// Global cooldown gate.
pub mod gate;
/// Routes and endpoint families.
pub mod route;
/// HTTP transport abstraction.
pub mod transport;

pub use dispatcher::{RequestDispatcher, RequestEvent, RetryPolicy};
pub use route::{EndpointFamily, Envelope, FamilyProfile, PlatformRouting, Route};
pub use transport::{ReqwestTransport, ResponseBody, Transport, TransportError};
