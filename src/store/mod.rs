//! Persistence for the canonical track list.
//!
//! The engine only depends on the load/save contract; the JSON layout and
//! file handling live here. Saves go through a temp file in the target
//! directory followed by a rename, so an interrupted run never leaves a
//! half-written list behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::reconcile::TrackRecord;

/// Load/save contract for the canonical list.
pub trait TrackStore: Send + Sync {
    /// Load the persisted list; an absent file is an empty list.
    fn load(&self) -> Result<Vec<TrackRecord>>;

    /// Persist the list atomically.
    fn save(&self, records: &[TrackRecord]) -> Result<()>;
}

/// Pretty-printed JSON file store.
pub struct JsonTrackStore {
    path: PathBuf,
}

impl JsonTrackStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrackStore for JsonTrackStore {
    fn load(&self) -> Result<Vec<TrackRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        info!("Loading tracks from {}...", self.path.display());
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read track list {}", self.path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid track list JSON in {}", self.path.display()))
    }

    fn save(&self, records: &[TrackRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records).context("failed to serialize tracks")?;
        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut temp = tempfile::NamedTempFile::new_in(dir.unwrap_or(Path::new(".")))
            .context("failed to create temp file for track list")?;
        temp.write_all(json.as_bytes())
            .context("failed to write track list")?;
        temp.persist(&self.path)
            .with_context(|| format!("failed to move track list into {}", self.path.display()))?;
        info!("Progress saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{Source, SourceObservation};

    fn record(title: &str) -> TrackRecord {
        TrackRecord::from_observation(
            Source::Local,
            SourceObservation {
                title: title.to_string(),
                artist: "Band".to_string(),
                album: "Album".to_string(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTrackStore::new(dir.path().join("tracks.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTrackStore::new(dir.path().join("tracks.json"));
        let records = vec![record("One"), record("Two")];

        store.save(&records).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_save_overwrites_previous_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTrackStore::new(dir.path().join("tracks.json"));

        store.save(&[record("One")]).unwrap();
        store.save(&[record("One"), record("Two")]).unwrap();
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.json");
        std::fs::write(&path, "not json").unwrap();
        let store = JsonTrackStore::new(path);
        assert!(store.load().is_err());
    }
}
