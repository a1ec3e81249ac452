//! Streaming playlist export adapter.
//!
//! Pages through the playlist-tracks endpoint (or the user's liked songs)
//! and maps every entry into a source observation. The export is authoritative
//! for ISRCs: an entry without one is malformed, logged and skipped.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::client::{ClientError, RateLimitedClient};
use crate::normalize::normalize;
use crate::reconcile::SourceObservation;

pub const DEFAULT_BASE_URL: &str = "https://api.streaming.example.com";

/// Playlist selector for the user's liked songs.
pub const LIKED: &str = "liked";

const PAGE_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(default)]
    limit: u32,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    track: Option<ExportedTrack>,
}

#[derive(Debug, Deserialize)]
struct ExportedTrack {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<NamedEntity>,
    #[serde(default)]
    album: Option<NamedEntity>,
    #[serde(default)]
    external_urls: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    external_ids: ExternalIds,
}

#[derive(Debug, Deserialize)]
struct NamedEntity {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalIds {
    #[serde(default)]
    isrc: Option<String>,
}

/// Client for the streaming service's playlist export.
pub struct StreamingClient {
    client: RateLimitedClient,
    base_url: String,
}

impl StreamingClient {
    pub fn new(client: RateLimitedClient, base_url: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Fetch every track of a playlist (`"liked"` for the user's saved
    /// tracks) as observations, in export order.
    pub async fn playlist_observations(
        &self,
        playlist: &str,
    ) -> Result<Vec<SourceObservation>, ClientError> {
        let mut observations = Vec::new();
        let mut offset: u32 = 0;
        loop {
            let url = self.page_url(playlist, offset);
            let body = self.client.get(&url).await?;
            let page: PlaylistPage =
                serde_json::from_value(body).map_err(ClientError::InvalidBody)?;

            for item in &page.items {
                match observation_from_item(item) {
                    Some(observation) => observations.push(observation),
                    None => {
                        let name = item
                            .track
                            .as_ref()
                            .map(|t| t.name.as_str())
                            .unwrap_or("<missing track>");
                        warn!("Skipping playlist entry {}: no ISRC in export", name);
                    }
                }
            }

            if page.next.is_none() {
                break;
            }
            offset += page.limit.max(1);
        }
        Ok(observations)
    }

    fn page_url(&self, playlist: &str, offset: u32) -> String {
        if playlist == LIKED {
            format!(
                "{}/v1/me/tracks?offset={}&limit={}",
                self.base_url, offset, PAGE_LIMIT
            )
        } else {
            format!(
                "{}/v1/playlists/{}/tracks?offset={}&limit={}",
                self.base_url,
                urlencoding::encode(playlist),
                offset,
                PAGE_LIMIT
            )
        }
    }
}

fn observation_from_item(item: &PlaylistItem) -> Option<SourceObservation> {
    let track = item.track.as_ref()?;
    let isrc = track
        .external_ids
        .isrc
        .as_ref()
        .map(|isrc| isrc.trim().to_uppercase())
        .filter(|isrc| !isrc.is_empty())?;
    Some(SourceObservation {
        title: normalize(&track.name),
        artist: track
            .artists
            .first()
            .map(|a| normalize(&a.name))
            .unwrap_or_default(),
        album: track
            .album
            .as_ref()
            .map(|a| normalize(&a.name))
            .unwrap_or_default(),
        isrc: Some(isrc),
        id: track.id.clone(),
        url: track.external_urls.values().next().cloned(),
        date_added: item.added_at,
        ..Default::default()
    })
}
