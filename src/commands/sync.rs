use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::commands::AppContext;
use crate::reconcile::Source;
use crate::store::TrackStore;

/// Push resolved tracks that came from one source into the catalog library
/// and/or a freshly created playlist, preserving the order in which the
/// source saw them.
pub async fn run(
    context: &AppContext,
    source: Source,
    add_to_library: bool,
    create_playlist: bool,
) -> Result<()> {
    let records = context.store.load()?;

    let mut entries: Vec<_> = records
        .iter()
        .filter(|record| record.sources.contains_key(&source))
        .collect();
    entries.sort_by_key(|record| record.sources[&source].observation.date_added);
    let song_ids: Vec<String> = entries
        .iter()
        .filter_map(|record| record.catalog_id().map(str::to_string))
        .collect();

    let unresolved = entries.len() - song_ids.len();
    if unresolved > 0 {
        warn!("Skipping {} unresolved {} tracks", unresolved, source);
    }
    if song_ids.is_empty() {
        warn!("No resolved {} tracks to sync", source);
        return Ok(());
    }

    if add_to_library {
        context
            .catalog
            .add_to_library(&song_ids)
            .await
            .context("failed to add tracks to the library")?;
        info!("Added {} tracks to the library", song_ids.len());
    }
    if create_playlist {
        let name = format!("Imported from {}", capitalize(source.as_str()));
        context
            .catalog
            .create_playlist(&name, &song_ids)
            .await
            .with_context(|| format!("failed to create playlist {:?}", name))?;
        info!("Created playlist {:?} with {} tracks", name, song_ids.len());
    }
    Ok(())
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("streaming"), "Streaming");
        assert_eq!(capitalize(""), "");
    }
}
