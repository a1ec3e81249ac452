//! Multi-key entity merge.
//!
//! A batch of observations from one source is folded into the canonical list
//! using a strict key priority: resolved-catalog ISRC, then title+artist,
//! then bare title. The lookup indices are built once over the list as it
//! stood at call start, so observations never match siblings added earlier in
//! the same batch.

use std::collections::HashMap;

use tracing::info;

use super::models::{MatchType, Source, SourceAttachment, SourceObservation, TrackRecord};

/// Merge a batch of per-source observations into the canonical list.
///
/// The list is updated in place: matched observations are attached to their
/// record under `sources[source]`, unmatched ones append a new record unless
/// an identical payload for this source is already present (re-run guard).
pub fn merge(source: Source, observations: Vec<SourceObservation>, records: &mut Vec<TrackRecord>) {
    // Indices are frozen here; appended records intentionally never join them.
    let mut by_isrc: HashMap<String, usize> = HashMap::new();
    let mut by_title_artist: HashMap<(String, String), usize> = HashMap::new();
    let mut by_title: HashMap<String, usize> = HashMap::new();
    for (idx, record) in records.iter().enumerate() {
        if let Some(isrc) = record.catalog_isrc() {
            by_isrc.insert(isrc.to_string(), idx);
        }
        if !record.title.is_empty() && !record.artist.is_empty() {
            by_title_artist.insert((record.title.clone(), record.artist.clone()), idx);
        }
        if !record.title.is_empty() {
            by_title.insert(record.title.clone(), idx);
        }
    }

    let total = observations.len();
    for (i, observation) in observations.into_iter().enumerate() {
        info!("Processing track {}/{}...", i + 1, total);

        let matched = lookup(&observation, &by_isrc, &by_title_artist, &by_title);
        match matched {
            Some((idx, match_type)) => {
                records[idx].attach(source, observation, match_type);
            }
            None => {
                let attachment = SourceAttachment {
                    match_type: MatchType::New,
                    observation,
                };
                // Re-run guard: the same payload already landed as a new
                // record in a previous invocation.
                if records
                    .iter()
                    .any(|record| record.sources.get(&source) == Some(&attachment))
                {
                    continue;
                }
                info!(
                    "No match found for {} by {}",
                    attachment.observation.title, attachment.observation.artist
                );
                let mut record = TrackRecord {
                    title: attachment.observation.title.clone(),
                    artist: attachment.observation.artist.clone(),
                    album: attachment.observation.album.clone(),
                    sources: Default::default(),
                };
                record.sources.insert(source, attachment);
                records.push(record);
            }
        }
    }
}

fn lookup(
    observation: &SourceObservation,
    by_isrc: &HashMap<String, usize>,
    by_title_artist: &HashMap<(String, String), usize>,
    by_title: &HashMap<String, usize>,
) -> Option<(usize, MatchType)> {
    if let Some(isrc) = observation.isrc.as_deref().filter(|s| !s.is_empty()) {
        if let Some(&idx) = by_isrc.get(isrc) {
            return Some((idx, MatchType::Isrc));
        }
    }
    if !observation.title.is_empty() && !observation.artist.is_empty() {
        let key = (observation.title.clone(), observation.artist.clone());
        if let Some(&idx) = by_title_artist.get(&key) {
            return Some((idx, MatchType::TitleArtist));
        }
    }
    if !observation.title.is_empty() {
        if let Some(&idx) = by_title.get(&observation.title) {
            return Some((idx, MatchType::Title));
        }
    }
    None
}
