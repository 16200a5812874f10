//! Provider facade driven by the plugin host.

use std::{
    env,
    sync::{Arc, OnceLock},
};

use bref_api::{FetchSettings, ManifestFetcher};
use bref_types::LayerKind;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    cache::ManifestCache,
    config::{ProviderConfig, ProviderSettings},
    data_source::{DataSourceHandler, DataSourceRead},
    error::{Diagnostic, ProviderError, Severity},
    schema::{ProviderSchema, SchemaSettings},
};

/// One provider instance: schema settings, the manifest fetcher, an optional
/// manifest cache, and the configuration set by [`BrefProvider::configure`].
///
/// Reads take `&self` and only share immutable state, so the host may run
/// any number of them concurrently.
#[derive(Debug)]
pub struct BrefProvider {
    version: String,
    schema_settings: SchemaSettings,
    fetcher: ManifestFetcher,
    cache: Option<ManifestCache>,
    config: OnceLock<Arc<ProviderConfig>>,
}

impl BrefProvider {
    /// Provider without a manifest cache; every read fetches.
    pub fn new(version: impl Into<String>, fetcher: ManifestFetcher) -> Self {
        Self {
            version: version.into(),
            schema_settings: SchemaSettings::default(),
            fetcher,
            cache: None,
            config: OnceLock::new(),
        }
    }

    /// Provider backed by the production HTTP transport and the default cache.
    pub fn with_default_http(version: impl Into<String>) -> anyhow::Result<Self> {
        let fetcher = ManifestFetcher::with_default_http(FetchSettings::default())?;
        Ok(Self::new(version, fetcher).with_cache(ManifestCache::default()))
    }

    pub fn with_cache(mut self, cache: ManifestCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_schema_settings(mut self, schema_settings: SchemaSettings) -> Self {
        self.schema_settings = schema_settings;
        self
    }

    /// Provider build version reported to the host.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn schema(&self) -> ProviderSchema {
        ProviderSchema::build(&self.schema_settings)
    }

    /// Resolve provider settings into the configuration shared by all reads.
    ///
    /// The first successful call wins; later calls return the configuration
    /// already in place.
    pub fn configure(&self, settings: &ProviderSettings) -> Result<Arc<ProviderConfig>, ProviderError> {
        self.configure_with_env(settings, |name| env::var(name).ok())
    }

    /// [`BrefProvider::configure`] with an explicit environment lookup.
    pub fn configure_with_env<F>(&self, settings: &ProviderSettings, lookup_env: F) -> Result<Arc<ProviderConfig>, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(config) = self.config.get() {
            debug!("provider already configured");
            return Ok(Arc::clone(config));
        }
        let config = Arc::new(ProviderConfig::build_with_env(settings, lookup_env)?);
        let config = self.config.get_or_init(|| config);
        info!(region = %config.region(), "provider configured");
        Ok(Arc::clone(config))
    }

    /// [`BrefProvider::configure`] for a provider block handed over as JSON.
    pub fn configure_from_value(&self, block: Value) -> Result<Arc<ProviderConfig>, Vec<Diagnostic>> {
        let settings: ProviderSettings = serde_json::from_value(block).map_err(|error| {
            vec![Diagnostic {
                severity: Severity::Error,
                summary: "Invalid provider configuration".to_string(),
                detail: error.to_string(),
                attribute: None,
            }]
        })?;
        self.configure(&settings).map_err(|error| vec![error.to_diagnostic()])
    }

    pub fn config(&self) -> Option<Arc<ProviderConfig>> {
        self.config.get().cloned()
    }

    /// Type names of every registered data source.
    pub fn data_source_type_names(&self) -> Vec<&'static str> {
        LayerKind::ALL.iter().map(|kind| kind.type_name()).collect()
    }

    /// Read the data source registered under `type_name`.
    pub async fn read_data_source(&self, type_name: &str, cancellation: &CancellationToken) -> Result<DataSourceRead, ProviderError> {
        let handler = DataSourceHandler::for_type_name(type_name).ok_or_else(|| ProviderError::UnknownDataSource {
            type_name: type_name.to_string(),
        })?;
        let config = self.config.get().ok_or(ProviderError::NotConfigured)?;

        handler
            .read(config, &self.fetcher, self.cache.as_ref(), cancellation)
            .await
    }
}
