//! Jikan API v4 client implementation.
//!
//! This module provides a paced, backoff-enabled client for the Jikan API
//! (MyAnimeList unofficial API), behind an injectable transport.

pub mod client;
pub mod pacer;
pub mod request;
pub mod transport;
pub mod types;

pub use client::{BackoffHttpClient, BackoffPolicy, BackoffState};
pub use pacer::RequestPacer;
pub use request::{ItemKind, RequestSpec, Resource, SearchEndpoint};
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportError};
pub use types::*;
