//! Data source handlers, one per [`LayerKind`].
//!
//! A read picks the manifest URL and version for its kind from the shared
//! [`ProviderConfig`], loads the manifest (through the cache when one is
//! configured), resolves the ARN for the configured region, and shapes the
//! result into [`DataSourceState`].

use std::sync::Arc;

use bref_api::ManifestFetcher;
use bref_types::{LayerKind, LayerManifest, ResolvedLayer};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    cache::ManifestCache,
    config::ProviderConfig,
    error::{Diagnostic, ProviderError},
    resolver::LayerResolver,
};

/// Attributes written back to the host after a successful read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSourceState {
    pub id: String,
    pub arn: String,
    pub region: String,
    pub version: String,
    pub account_id: String,
    pub manifest_url: String,
}

/// Successful read: the state plus any warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceRead {
    pub layer: ResolvedLayer,
    pub state: DataSourceState,
    pub diagnostics: Vec<Diagnostic>,
}

/// Reads the layer ARN for a fixed [`LayerKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSourceHandler {
    layer_kind: LayerKind,
}

impl DataSourceHandler {
    pub fn new(layer_kind: LayerKind) -> Self {
        Self { layer_kind }
    }

    /// Handler registered under the host type name, e.g. `bref_lambda_layer`.
    pub fn for_type_name(type_name: &str) -> Option<Self> {
        LayerKind::ALL
            .into_iter()
            .find(|kind| kind.type_name() == type_name)
            .map(Self::new)
    }

    pub fn layer_kind(&self) -> LayerKind {
        self.layer_kind
    }

    pub fn type_name(&self) -> &'static str {
        self.layer_kind.type_name()
    }

    /// Resolve the layer ARN for the configured region and version.
    ///
    /// Fetch and lookup failures come back wrapped with the kind, region,
    /// version, and manifest URL they concern; the inner errors are kept
    /// unchanged. No retries happen here beyond the fetcher's own.
    pub async fn read(
        &self,
        config: &ProviderConfig,
        fetcher: &ManifestFetcher,
        cache: Option<&ManifestCache>,
        cancellation: &CancellationToken,
    ) -> Result<DataSourceRead, ProviderError> {
        let layer_kind = self.layer_kind;
        let region = config.region();
        let version = config.version(layer_kind);
        let manifest_url = config.manifest_url(layer_kind);

        let manifest = load_manifest(manifest_url, fetcher, cache, cancellation)
            .await
            .map_err(|source| ProviderError::Fetch {
                layer_kind,
                region: region.to_string(),
                version: version.to_string(),
                source,
            })?;

        let layer = LayerResolver
            .resolve(&manifest, layer_kind, region, version)
            .map_err(|source| ProviderError::Resolve {
                layer_kind,
                manifest_url: manifest_url.to_string(),
                source,
            })?;

        let expected_account = config.account_id(layer_kind);
        let mut diagnostics = Vec::new();
        if layer.arn_account_id() != Some(expected_account) {
            warn!(
                layer_kind = %layer_kind,
                arn = %layer.arn,
                expected_account,
                "resolved layer ARN is not owned by the expected account"
            );
            diagnostics.push(Diagnostic::warning(
                "Unexpected layer publisher",
                format!(
                    "layer ARN '{}' from {} is not owned by the {} layer account {}",
                    layer.arn, manifest_url, layer_kind, expected_account
                ),
            ));
        }

        info!(layer_kind = %layer_kind, %region, %version, arn = %layer.arn, "layer resolved");
        let state = DataSourceState {
            id: layer.arn.clone(),
            arn: layer.arn.clone(),
            region: layer.region.clone(),
            version: layer.version.clone(),
            account_id: expected_account.to_string(),
            manifest_url: manifest_url.to_string(),
        };
        Ok(DataSourceRead {
            layer,
            state,
            diagnostics,
        })
    }
}

async fn load_manifest(
    url: &str,
    fetcher: &ManifestFetcher,
    cache: Option<&ManifestCache>,
    cancellation: &CancellationToken,
) -> Result<Arc<LayerManifest>, bref_api::FetchError> {
    match cache {
        Some(cache) => cache.get_or_fetch(url, fetcher, cancellation).await,
        None => fetcher.fetch(url, cancellation).await.map(Arc::new),
    }
}
