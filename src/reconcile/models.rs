//! Data model for canonical track records and per-source observations.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a track observation came from.
///
/// `catalog` is reserved for attachments produced by catalog resolution; the
/// sync command only accepts the two real input sources.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Local,
    Streaming,
    #[value(skip)]
    Catalog,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Local => "local",
            Source::Streaming => "streaming",
            Source::Catalog => "catalog",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a source attachment was established.
///
/// The serialized names are part of the persisted track-list contract: the
/// first four are merge keys, the rest are cascade strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    #[serde(rename = "isrc")]
    Isrc,
    #[serde(rename = "title_artist")]
    TitleArtist,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "new")]
    New,
    #[serde(rename = "title_artist_album")]
    TitleArtistAlbum,
    #[serde(rename = "title-without-supp_artist")]
    StrippedTitleArtist,
    #[serde(rename = "title-without-supp-and-symbols_artist")]
    PlainTitleArtist,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Isrc => "isrc",
            MatchType::TitleArtist => "title_artist",
            MatchType::Title => "title",
            MatchType::New => "new",
            MatchType::TitleArtistAlbum => "title_artist_album",
            MatchType::StrippedTitleArtist => "title-without-supp_artist",
            MatchType::PlainTitleArtist => "title-without-supp-and-symbols_artist",
        }
    }
}

/// One source's view of a track, prior to reconciliation.
///
/// `title`/`artist`/`album` are expected to be normalized by the adapter that
/// produced the observation. Everything else is source-specific payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceObservation {
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<DateTime<Utc>>,
}

/// A source's attribute bag attached to a canonical record.
///
/// Full-attachment semantics: the whole observation is preserved next to the
/// match tag, so a resumed run can audit how each source was matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttachment {
    pub match_type: MatchType,
    #[serde(flatten)]
    pub observation: SourceObservation,
}

/// The deduplicated, cross-source unit of truth for one logical track.
///
/// `title`/`artist`/`album` are fixed at creation from whichever source
/// supplied them first; later attachments only touch `sources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<Source, SourceAttachment>,
}

impl TrackRecord {
    /// Seed a new canonical record from an unmatched observation.
    pub fn from_observation(source: Source, observation: SourceObservation) -> Self {
        let mut record = Self {
            title: observation.title.clone(),
            artist: observation.artist.clone(),
            album: observation.album.clone(),
            sources: BTreeMap::new(),
        };
        record.attach(source, observation, MatchType::New);
        record
    }

    /// Attach (or replace) a source's view of this track.
    pub fn attach(&mut self, source: Source, observation: SourceObservation, match_type: MatchType) {
        self.sources.insert(
            source,
            SourceAttachment {
                match_type,
                observation,
            },
        );
    }

    /// The resolved catalog identifier, if resolution already happened.
    pub fn catalog_id(&self) -> Option<&str> {
        self.sources
            .get(&Source::Catalog)
            .and_then(|a| a.observation.id.as_deref())
    }

    /// The ISRC of the resolved catalog attachment, if any. Only resolved
    /// records contribute to the ISRC merge index.
    pub fn catalog_isrc(&self) -> Option<&str> {
        self.sources
            .get(&Source::Catalog)
            .and_then(|a| a.observation.isrc.as_deref())
            .filter(|isrc| !isrc.is_empty())
    }

    pub fn is_resolved(&self) -> bool {
        self.sources.contains_key(&Source::Catalog)
    }

    /// An ISRC supplied by any non-catalog source, used for ISRC-first
    /// resolution before falling back to the text cascade.
    pub fn pending_isrc(&self) -> Option<&str> {
        self.sources
            .iter()
            .filter(|(source, _)| **source != Source::Catalog)
            .find_map(|(_, a)| a.observation.isrc.as_deref())
            .filter(|isrc| !isrc.is_empty())
    }
}
