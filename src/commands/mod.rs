//! Subcommand implementations and the shared resolution driver.

pub mod local;
pub mod streaming;
pub mod sync;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::catalog::{CatalogClient, CatalogSearch, CatalogSong, Resolver};
use crate::client::{ClientError, HttpTransport, RateLimitedClient, ReqwestTransport};
use crate::config::{self, AppConfig};
use crate::confirm::ConfirmPrompt;
use crate::reconcile::{MatchType, Source, SourceObservation, TrackRecord};
use crate::sources::streaming::StreamingClient;
use crate::store::JsonTrackStore;

/// Shared wiring for every subcommand: resolved config, the store, one HTTP
/// session, and the interrupt flag set by the Ctrl-C handler.
pub struct AppContext {
    pub config: AppConfig,
    pub store: JsonTrackStore,
    pub transport: Arc<dyn HttpTransport>,
    pub catalog: CatalogClient,
    pub interrupted: Arc<AtomicBool>,
}

impl AppContext {
    pub fn initialize(config: AppConfig) -> Result<Self> {
        let headers = config::read_request_headers(&config.request_headers)?;
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(&headers)?);
        let catalog = CatalogClient::new(
            RateLimitedClient::new(transport.clone(), config.request_delay_secs),
            config.catalog_base_url.clone(),
            config.storefront.clone(),
            config.search_limit,
        );
        let store = JsonTrackStore::new(config.track_list.clone());
        Ok(Self {
            config,
            store,
            transport,
            catalog,
            interrupted: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn streaming_client(&self) -> StreamingClient {
        StreamingClient::new(
            RateLimitedClient::new(self.transport.clone(), self.config.request_delay_secs),
            self.config.streaming_base_url.clone(),
        )
    }
}

/// Resolve every record that does not carry a catalog attachment yet.
///
/// Records whose pending source supplied an ISRC go through the exact lookup
/// first and only fall back to the text cascade on a miss. An authentication
/// failure aborts the remaining batch; everything resolved so far stays in
/// the list so the caller can persist it. The interrupt flag is checked
/// between records, which keeps a Ctrl-C checkpoint consistent.
pub async fn resolve_pending(
    catalog: &dyn CatalogSearch,
    confirm: &dyn ConfirmPrompt,
    records: &mut [TrackRecord],
    require_confirm: bool,
    interrupted: &AtomicBool,
) -> Result<(), ClientError> {
    let resolver = Resolver::new(catalog, confirm, require_confirm);
    let total = records.len();
    let progress = ProgressBar::new(total as u64);

    for (i, record) in records.iter_mut().enumerate() {
        if interrupted.load(Ordering::SeqCst) {
            warn!("Interrupted, checkpointing before track {}", i + 1);
            break;
        }
        if record.is_resolved() {
            progress.inc(1);
            continue;
        }
        info!(
            "Searching track {}/{}: {} by {}",
            i + 1,
            total,
            record.title,
            record.artist
        );

        let mut accepted: Option<(CatalogSong, MatchType)> = None;
        if let Some(isrc) = record.pending_isrc().map(str::to_string) {
            match catalog.lookup_isrc(&isrc).await {
                Ok(Some(song)) => accepted = Some((song, MatchType::Isrc)),
                Ok(None) => info!("Searching by title and artist instead..."),
                Err(err) if err.is_authentication() => {
                    progress.abandon();
                    return Err(err);
                }
                Err(err) => warn!("ISRC lookup failed for {}: {}", isrc, err),
            }
        }
        if accepted.is_none() {
            match resolver
                .resolve(&record.title, &record.artist, &record.album)
                .await
            {
                Ok(result) => accepted = result,
                Err(err) => {
                    progress.abandon();
                    return Err(err);
                }
            }
        }

        match accepted {
            Some((song, match_type)) => {
                info!(
                    "Found {} by {} ({})",
                    song.attributes.name,
                    song.attributes.artist_name,
                    match_type.as_str()
                );
                record.attach(Source::Catalog, SourceObservation::from(&song), match_type);
            }
            None => info!(
                "No results found for {} by {}",
                record.title, record.artist
            ),
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    Ok(())
}
