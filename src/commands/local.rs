use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::commands::{resolve_pending, AppContext};
use crate::confirm::ConsolePrompt;
use crate::reconcile::{merge, Source};
use crate::sources::local::{self, ScanConfig};
use crate::store::TrackStore;

/// Scan a local music folder, merge what it holds into the track list and
/// resolve everything still missing a catalog match.
pub async fn run(
    context: &AppContext,
    folder: &Path,
    artist_path_position: i32,
    album_path_position: i32,
) -> Result<()> {
    let mut records = context.store.load()?;

    info!("Loading local music files...");
    let scan_config = ScanConfig {
        artist_path_position,
        album_path_position,
    };
    let observations = local::scan(folder, &scan_config);
    info!("Found {} local tracks", observations.len());
    merge(Source::Local, observations, &mut records);
    // Checkpoint before the long resolution phase.
    context.store.save(&records)?;

    let confirm = ConsolePrompt;
    let result = resolve_pending(
        &context.catalog,
        &confirm,
        &mut records,
        context.config.require_confirm,
        &context.interrupted,
    )
    .await;
    context.store.save(&records)?;
    result.context("catalog resolution aborted")?;

    info!("Search complete!");
    Ok(())
}
