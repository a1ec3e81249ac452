//! Client for the target music catalog.
//!
//! Only the endpoints the resolution strategy needs: free-text song search,
//! ISRC lookup, and the two library-mutation calls behind the sync command.
//! Everything goes through the rate-limited request layer.

pub mod resolver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::client::{ClientError, RateLimitedClient};
use crate::reconcile::SourceObservation;

pub use resolver::Resolver;

pub const DEFAULT_BASE_URL: &str = "https://amp-api.music.example.com";

/// A candidate song returned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSong {
    pub id: String,
    pub attributes: SongAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongAttributes {
    pub name: String,
    #[serde(rename = "artistName")]
    pub artist_name: String,
    #[serde(rename = "albumName")]
    pub album_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<&CatalogSong> for SourceObservation {
    fn from(song: &CatalogSong) -> Self {
        SourceObservation {
            title: song.attributes.name.clone(),
            artist: song.attributes.artist_name.clone(),
            album: song.attributes.album_name.clone(),
            isrc: song.attributes.isrc.clone(),
            id: Some(song.id.clone()),
            url: song.attributes.url.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: SearchResults,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResults {
    #[serde(default)]
    songs: SongPage,
}

#[derive(Debug, Default, Deserialize)]
struct SongPage {
    #[serde(default)]
    data: Vec<CatalogSong>,
}

/// Search surface the resolver depends on; seamed for tests.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Free-text search, best matches first.
    async fn search_songs(&self, term: &str) -> Result<Vec<CatalogSong>, ClientError>;

    /// Exact lookup by ISRC; at most one candidate.
    async fn lookup_isrc(&self, isrc: &str) -> Result<Option<CatalogSong>, ClientError>;
}

/// Catalog API client bound to one storefront.
pub struct CatalogClient {
    client: RateLimitedClient,
    base_url: String,
    storefront: String,
    limit: usize,
}

impl CatalogClient {
    pub fn new(
        client: RateLimitedClient,
        base_url: String,
        storefront: String,
        limit: usize,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            storefront,
            limit,
        }
    }

    fn catalog_url(&self) -> String {
        format!("{}/v1/catalog/{}", self.base_url, self.storefront)
    }

    /// Add songs to the user's library.
    pub async fn add_to_library(&self, song_ids: &[String]) -> Result<(), ClientError> {
        let url = format!(
            "{}/v1/me/library?ids[songs]={}",
            self.base_url,
            urlencoding::encode(&song_ids.join(","))
        );
        self.client.post(&url, None).await?;
        Ok(())
    }

    /// Create a private playlist holding the given songs.
    pub async fn create_playlist(
        &self,
        name: &str,
        song_ids: &[String],
    ) -> Result<(), ClientError> {
        let url = format!("{}/v1/me/library/playlists", self.base_url);
        let body = json!({
            "attributes": {
                "name": name,
                "description": "",
                "isPublic": false,
            },
            "relationships": {
                "tracks": {
                    "data": song_ids
                        .iter()
                        .map(|id| json!({"id": id, "type": "songs"}))
                        .collect::<Vec<_>>(),
                }
            }
        });
        self.client.post(&url, Some(&body)).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogSearch for CatalogClient {
    async fn search_songs(&self, term: &str) -> Result<Vec<CatalogSong>, ClientError> {
        let url = format!(
            "{}/search?term={}&types=songs&limit={}",
            self.catalog_url(),
            urlencoding::encode(term),
            self.limit
        );
        let body = self.client.get(&url).await?;
        let response: SearchResponse =
            serde_json::from_value(body).map_err(ClientError::InvalidBody)?;
        Ok(response.results.songs.data)
    }

    async fn lookup_isrc(&self, isrc: &str) -> Result<Option<CatalogSong>, ClientError> {
        let url = format!(
            "{}/songs?filter[isrc]={}",
            self.catalog_url(),
            urlencoding::encode(isrc)
        );
        let body = self.client.get(&url).await?;
        let page: SongPage = serde_json::from_value(body).map_err(ClientError::InvalidBody)?;
        let song = page.data.into_iter().next();
        if song.is_none() {
            info!("Track with ISRC {} not found", isrc);
        }
        Ok(song)
    }
}
