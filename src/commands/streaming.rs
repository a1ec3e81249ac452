use anyhow::{Context, Result};
use tracing::info;

use crate::commands::{resolve_pending, AppContext};
use crate::confirm::ConsolePrompt;
use crate::reconcile::{merge, Source};
use crate::store::TrackStore;

/// Fetch a streaming playlist export, merge its tracks into the track list
/// and resolve everything still missing a catalog match.
pub async fn run(context: &AppContext, playlist: &str) -> Result<()> {
    let mut records = context.store.load()?;

    info!("Fetching playlist {:?}...", playlist);
    let streaming = context.streaming_client();
    let observations = streaming
        .playlist_observations(playlist)
        .await
        .context("failed to fetch the playlist export")?;
    info!("Found {} streaming tracks", observations.len());
    merge(Source::Streaming, observations, &mut records);
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
