//! End-to-end reconciliation flows: merge observations into a track list,
//! resolve them against a scripted catalog and persist the result.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Mutex;

use async_trait::async_trait;
use tracksync::catalog::{CatalogSearch, CatalogSong, SongAttributes};
use tracksync::client::ClientError;
use tracksync::commands::resolve_pending;
use tracksync::confirm::{ConfirmPrompt, MatchReview};
use tracksync::store::{JsonTrackStore, TrackStore};
use tracksync::{merge, MatchType, Source, SourceObservation};

struct NeverConfirm;

impl ConfirmPrompt for NeverConfirm {
    fn confirm(&self, _review: &MatchReview) -> bool {
        false
    }
}

/// Catalog fake with scripted responses per search term and per ISRC.
#[derive(Default)]
struct ScriptedCatalog {
    search_hits: HashMap<String, Vec<CatalogSong>>,
    isrc_hits: HashMap<String, CatalogSong>,
    search_terms: Mutex<Vec<String>>,
}

#[async_trait]
impl CatalogSearch for ScriptedCatalog {
    async fn search_songs(&self, term: &str) -> Result<Vec<CatalogSong>, ClientError> {
        self.search_terms.lock().unwrap().push(term.to_string());
        Ok(self.search_hits.get(term).cloned().unwrap_or_default())
    }

    async fn lookup_isrc(&self, isrc: &str) -> Result<Option<CatalogSong>, ClientError> {
        Ok(self.isrc_hits.get(isrc).cloned())
    }
}

fn song(id: &str, name: &str, artist: &str, isrc: Option<&str>) -> CatalogSong {
    CatalogSong {
        id: id.to_string(),
        attributes: SongAttributes {
            name: name.to_string(),
            artist_name: artist.to_string(),
            album_name: "Album".to_string(),
            isrc: isrc.map(str::to_string),
            url: Some(format!("https://music.example.com/song/{}", id)),
        },
    }
}

fn observation(title: &str, artist: &str, album: &str) -> SourceObservation {
    SourceObservation {
        title: title.to_string(),
        artist: artist.to_string(),
        album: album.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_noisy_local_title_resolves_through_cascade_and_persists() {
    // "Song (feat. X)" misses the literal queries; the qualifier-stripped
    // query hits.
    let mut catalog = ScriptedCatalog::default();
    catalog
        .search_hits
        .insert("Song Band".to_string(), vec![song("101", "Song", "Band", None)]);

    let mut records = Vec::new();
    merge(
        Source::Local,
        vec![observation("Song (feat. X)", "Band", "Album")],
        &mut records,
    );
    assert_eq!(records.len(), 1);

    let interrupted = AtomicBool::new(false);
    resolve_pending(&catalog, &NeverConfirm, &mut records, false, &interrupted)
        .await
        .unwrap();

    let attachment = &records[0].sources[&Source::Catalog];
    assert_eq!(attachment.match_type, MatchType::StrippedTitleArtist);
    assert_eq!(attachment.observation.id.as_deref(), Some("101"));
    assert_eq!(
        *catalog.search_terms.lock().unwrap(),
        vec![
            "Song (feat. X) Band Album".to_string(),
            "Song (feat. X) Band".to_string(),
            "Song Band".to_string(),
        ]
    );

    // The persisted form carries the serialized strategy name.
    let dir = tempfile::tempdir().unwrap();
    let store = JsonTrackStore::new(dir.path().join("tracks.list"));
    store.save(&records).unwrap();
    let text = std::fs::read_to_string(dir.path().join("tracks.list")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        value[0]["sources"]["catalog"]["match_type"],
        "title-without-supp_artist"
    );
    assert_eq!(value[0]["sources"]["local"]["match_type"], "new");
}

#[tokio::test]
async fn test_streaming_rerun_reuses_local_record_via_isrc() {
    let mut catalog = ScriptedCatalog::default();
    catalog.isrc_hits.insert(
        "USAB11234567".to_string(),
        song("202", "Song", "Band", Some("USAB11234567")),
    );

    // First run: a local file without an ISRC, resolved through the catalog.
    let mut records = Vec::new();
    let mut local = observation("Song", "Band", "Album");
    local.filename = Some("song.mp3".to_string());
    merge(Source::Local, vec![local], &mut records);

    catalog
        .search_hits
        .insert(
            "Song Band Album".to_string(),
            vec![song("202", "Song", "Band", Some("USAB11234567"))],
        );
    let interrupted = AtomicBool::new(false);
    resolve_pending(&catalog, &NeverConfirm, &mut records, false, &interrupted)
        .await
        .unwrap();
    assert_eq!(records[0].catalog_isrc(), Some("USAB11234567"));

    // Save and reload, as a separate invocation would.
    let dir = tempfile::tempdir().unwrap();
    let store = JsonTrackStore::new(dir.path().join("tracks.list"));
    store.save(&records).unwrap();
    let mut records = store.load().unwrap();

    // Second run: the streaming export reports the same track by ISRC. It
    // must fold into the existing record instead of creating a new one.
    let mut streaming = observation("Song - Remastered", "Band", "Album (Deluxe)");
    streaming.isrc = Some("USAB11234567".to_string());
    streaming.id = Some("track:abc123".to_string());
    merge(Source::Streaming, vec![streaming], &mut records);

    assert_eq!(records.len(), 1);
    let attachment = &records[0].sources[&Source::Streaming];
    assert_eq!(attachment.match_type, MatchType::Isrc);
    // Canonical fields keep the first source's spelling.
    assert_eq!(records[0].title, "Song");

    // The record is already resolved, so a rerun performs no searches.
    catalog.search_terms.lock().unwrap().clear();
    resolve_pending(&catalog, &NeverConfirm, &mut records, false, &interrupted)
        .await
        .unwrap();
    assert!(catalog.search_terms.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_streaming_isrc_resolves_without_text_search() {
    let mut catalog = ScriptedCatalog::default();
    catalog.isrc_hits.insert(
        "GBXYZ7654321".to_string(),
        song("303", "Other Song", "Other Band", Some("GBXYZ7654321")),
    );

    let mut records = Vec::new();
    let mut streaming = observation("Other Song", "Other Band", "Other Album");
    streaming.isrc = Some("GBXYZ7654321".to_string());
    merge(Source::Streaming, vec![streaming], &mut records);

    let interrupted = AtomicBool::new(false);
    resolve_pending(&catalog, &NeverConfirm, &mut records, false, &interrupted)
        .await
        .unwrap();

    let attachment = &records[0].sources[&Source::Catalog];
    assert_eq!(attachment.match_type, MatchType::Isrc);
    assert_eq!(attachment.observation.id.as_deref(), Some("303"));
    assert!(catalog.search_terms.lock().unwrap().is_empty());
}
