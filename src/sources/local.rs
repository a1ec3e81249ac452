//! Local file collection adapter.
//!
//! Walks a folder for audio files and turns each into a source observation.
//! Tag values win; files with missing or unreadable tags fall back to path
//! segments (configurable artist/album positions) and the cleaned file name.
//! A broken file is logged and skipped, never fatal for the batch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use lofty::prelude::{ItemKey, TaggedFileExt};
use regex::Regex;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::normalize::normalize;
use crate::reconcile::SourceObservation;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "flac", "ogg", "opus", "wav"];

const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_ALBUM: &str = "Unknown Album";

lazy_static! {
    /// Leading track number ("01. ", "12 ") on a file name.
    static ref TRACK_NUMBER_RE: Regex = Regex::new(r"^\d+\.?\s*").unwrap();
}

/// Where in the file path to find artist and album names when tags are
/// missing. Positions are indices into the parent directory components,
/// negative values counting from the end (`-2`/`-1` fits
/// `.../Artist/Album/Title.mp3`).
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    pub artist_path_position: i32,
    pub album_path_position: i32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            artist_path_position: -2,
            album_path_position: -1,
        }
    }
}

/// Scan a folder recursively and build observations for every audio file.
pub fn scan(folder: &Path, config: &ScanConfig) -> Vec<SourceObservation> {
    let files = collect_audio_files(folder);
    info!("Found {} audio files", files.len());

    let total = files.len();
    let mut observations = Vec::with_capacity(total);
    for (i, path) in files.into_iter().enumerate() {
        info!("Processing audio tags: {}/{}...", i + 1, total);
        match observation_from_file(&path, config) {
            Ok(observation) => observations.push(observation),
            Err(err) => warn!("Error reading {}: {:#}", path.display(), err),
        }
    }
    observations
}

fn collect_audio_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Error walking {}: {}", folder.display(), err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let is_audio = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if is_audio {
            files.push(entry.into_path());
        }
    }
    files.sort();
    files
}

fn observation_from_file(path: &Path, config: &ScanConfig) -> Result<SourceObservation> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("file name is not valid UTF-8")?
        .to_string();

    let (tag_title, tag_artist, tag_album, tag_isrc) = match read_tags(path) {
        Ok(tags) => tags,
        Err(err) => {
            warn!("Error reading tags from {}: {:#}", path.display(), err);
            (None, None, None, None)
        }
    };

    let title = tag_title.unwrap_or_else(|| clean_file_name(path));
    let artist = tag_artist
        .or_else(|| path_segment(path, config.artist_path_position))
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
    let album = tag_album
        .or_else(|| path_segment(path, config.album_path_position))
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

    Ok(SourceObservation {
        title: normalize(&title),
        artist: normalize(&artist),
        album: normalize(&album),
        isrc: tag_isrc,
        path: Some(path.to_path_buf()),
        filename: Some(filename),
        date_added: Some(file_date_added(path)?),
        ..Default::default()
    })
}

type TagFields = (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn read_tags(path: &Path) -> Result<TagFields> {
    let tagged_file = lofty::read_from_path(path)?;
    let tag = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        Some(tag) => tag,
        None => return Ok((None, None, None, None)),
    };
    let title = tag.get_string(&ItemKey::TrackTitle).map(str::to_string);
    let artist = tag
        .get_string(&ItemKey::TrackArtist)
        .or_else(|| tag.get_string(&ItemKey::AlbumArtist))
        .map(str::to_string);
    let album = tag.get_string(&ItemKey::AlbumTitle).map(str::to_string);
    let isrc = tag
        .get_string(&ItemKey::Isrc)
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty());
    Ok((title, artist, album, isrc))
}

/// File name without extension and leading track number.
fn clean_file_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    TRACK_NUMBER_RE.replace(stem, "").to_string()
}

/// Pick a component of the file's parent directory by position, negative
/// positions counting from the end.
fn path_segment(path: &Path, position: i32) -> Option<String> {
    let segments: Vec<String> = path
        .parent()?
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let index = if position < 0 {
        segments.len().checked_sub(position.unsigned_abs() as usize)?
    } else {
        position as usize
    };
    segments.get(index).cloned()
}

fn file_date_added(path: &Path) -> Result<DateTime<Utc>> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?;
    let timestamp = metadata.created().or_else(|_| metadata.modified())?;
    Ok(timestamp.into())
}
