//! Time-bounded manifest cache shared by concurrent data source reads.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use bref_api::{FetchError, ManifestFetcher};
use bref_types::LayerManifest;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default time-to-live for cached manifests.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    fetched_at: Instant,
    manifest: Arc<LayerManifest>,
}

/// Manifest URL to (fetch time, manifest) map with a fixed time-to-live.
///
/// Concurrent lookups of the same URL share one fetch: the first caller
/// holds the URL's gate while fetching, later callers wait on the gate and
/// then read the freshly stored entry. Failed fetches are not cached, so the
/// next waiter fetches again.
pub struct ManifestCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    time_to_live: Duration,
}

impl fmt::Debug for ManifestCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestCache")
            .field("time_to_live", &self.time_to_live)
            .finish()
    }
}

impl Default for ManifestCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ManifestCache {
    pub fn new(time_to_live: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            time_to_live,
        }
    }

    pub fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    /// Return the cached manifest for `url` or fetch it.
    pub async fn get_or_fetch(
        &self,
        url: &str,
        fetcher: &ManifestFetcher,
        cancellation: &CancellationToken,
    ) -> Result<Arc<LayerManifest>, FetchError> {
        if let Some(manifest) = self.lookup_fresh(url) {
            debug!(%url, "manifest cache hit");
            return Ok(manifest);
        }

        let gate = self.gate_for(url);
        let _guard = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(FetchError::Cancelled { url: url.to_string() }),
            guard = gate.lock() => guard,
        };

        // Another reader may have filled the entry while this one waited.
        if let Some(manifest) = self.lookup_fresh(url) {
            debug!(%url, "manifest cache hit after waiting on in-flight fetch");
            return Ok(manifest);
        }

        debug!(%url, "manifest cache miss");
        let manifest = Arc::new(fetcher.fetch(url, cancellation).await?);
        self.store(url, Arc::clone(&manifest));
        Ok(manifest)
    }

    /// Drop every cached manifest.
    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn lookup_fresh(&self, url: &str) -> Option<Arc<LayerManifest>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(url)?;
        (entry.fetched_at.elapsed() < self.time_to_live).then(|| Arc::clone(&entry.manifest))
    }

    fn store(&self, url: &str, manifest: Arc<LayerManifest>) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).insert(
            url.to_string(),
            CacheEntry {
                fetched_at: Instant::now(),
                manifest,
            },
        );
    }

    fn gate_for(&self, url: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(url.to_string()).or_default())
    }
}
