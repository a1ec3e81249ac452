//! Tracksync Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog;
pub mod client;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod normalize;
pub mod reconcile;
pub mod sources;
pub mod store;

// Re-export commonly used types for convenience
pub use catalog::{CatalogClient, CatalogSearch, CatalogSong, Resolver};
pub use client::{ClientError, RateLimitedClient, ReqwestTransport};
pub use reconcile::{merge, MatchType, Source, SourceObservation, TrackRecord};
pub use store::{JsonTrackStore, TrackStore};
