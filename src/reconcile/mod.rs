//! Entity reconciliation: merging per-source track observations into one
//! canonical, cross-source record list.

mod merge;
mod models;

pub use merge::merge;
pub use models::{MatchType, Source, SourceAttachment, SourceObservation, TrackRecord};
