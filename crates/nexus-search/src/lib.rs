//! Search and suggestion fetch engine for the Jikan API.
//!
//! This library drives paginated character search with infinite scroll,
//! debounced type-ahead suggestions, and the landing/detail fetches around
//! them. Responses superseded by newer user input are discarded through
//! per-session sequence numbers, and rate-limited requests are retried with a
//! bounded backoff.

pub mod api;
pub mod detail;
pub mod edge;
pub mod error;
pub mod join;
pub mod pagination;
pub mod sequencer;
pub mod suggestions;
pub mod trending;

pub use api::{BackoffHttpClient, BackoffPolicy, Item, ItemPage, RequestSpec, SearchEndpoint};
pub use detail::{load_character_detail, CharacterDetail};
pub use edge::{ScrollEdgeDetector, SentinelDetector, Viewport};
pub use error::{ErrorKind, FetchError};
pub use pagination::{Disposition, PaginationController, SearchSnapshot, SearchStatus};
pub use sequencer::{RequestSequencer, SessionId};
pub use suggestions::{Suggestion, SuggestionCategory, SuggestionController, SuggestionSettings};
pub use trending::{fetch_trending, Trending};
