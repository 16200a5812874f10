//! Provider errors and the diagnostics reported to the host.

use bref_api::FetchError;
use bref_types::LayerKind;
use serde::Serialize;
use thiserror::Error;

use crate::{config::ConfigError, resolver::ResolveError};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("could not load the {layer_kind} layer manifest for region '{region}' and version '{version}': {source}")]
    Fetch {
        layer_kind: LayerKind,
        region: String,
        version: String,
        #[source]
        source: FetchError,
    },

    #[error("{source} (manifest {manifest_url})")]
    Resolve {
        layer_kind: LayerKind,
        manifest_url: String,
        #[source]
        source: ResolveError,
    },

    #[error("unknown data source type '{type_name}'")]
    UnknownDataSource { type_name: String },

    #[error("provider has not been configured")]
    NotConfigured,
}

impl ProviderError {
    /// The underlying fetch failure, unchanged.
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            Self::Fetch { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The underlying lookup miss, unchanged.
    pub fn resolve_error(&self) -> Option<&ResolveError> {
        match self {
            Self::Resolve { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Map the error onto a host diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let summary = match self {
            Self::Config(ConfigError::MissingRegion) => "Missing AWS region",
            Self::Config(ConfigError::InvalidVersion { .. }) => "Invalid Bref version",
            Self::Fetch { .. } => "Unable to fetch Bref layer manifest",
            Self::Resolve {
                source: ResolveError::UnknownRegion { .. },
                ..
            } => "Region not published for Bref layer",
            Self::Resolve {
                source: ResolveError::UnknownRuntimeVersion { .. },
                ..
            } => "Runtime version not published for Bref layer",
            Self::UnknownDataSource { .. } => "Unknown data source",
            Self::NotConfigured => "Provider not configured",
        };
        let attribute = match self {
            Self::Config(ConfigError::MissingRegion) => Some("region".to_string()),
            Self::Config(ConfigError::InvalidVersion { attribute, .. }) => Some(attribute.to_string()),
            _ => None,
        };
        Diagnostic {
            severity: Severity::Error,
            summary: summary.to_string(),
            detail: self.to_string(),
            attribute,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// User-facing message attached to a configure or read response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    /// Provider attribute the diagnostic points at, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }
}

impl From<&ProviderError> for Diagnostic {
    fn from(error: &ProviderError) -> Self {
        error.to_diagnostic()
    }
}

#[cfg(test)]
mod tests {
    use bref_api::{FailureCause, StatusCode};

    use super::*;

    #[test]
    fn fetch_diagnostic_names_region_version_url_and_status() {
        let error = ProviderError::Fetch {
            layer_kind: LayerKind::Standard,
            region: "eu-west-1".into(),
            version: "9.9.9".into(),
            source: FetchError::Unreachable {
                url: "https://raw.githubusercontent.com/brefphp/bref/9.9.9/layers.json".into(),
                attempts: 1,
                cause: FailureCause::Status(StatusCode::NOT_FOUND),
            },
        };

        let diagnostic = error.to_diagnostic();

        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.summary, "Unable to fetch Bref layer manifest");
        for needle in ["eu-west-1", "9.9.9", "brefphp/bref/9.9.9/layers.json", "404"] {
            assert!(diagnostic.detail.contains(needle), "missing {needle}: {}", diagnostic.detail);
        }
        assert!(error.fetch_error().is_some());
    }

    #[test]
    fn resolve_diagnostic_names_unmatched_key_and_manifest() {
        let error = ProviderError::Resolve {
            layer_kind: LayerKind::Extra,
            manifest_url: "https://raw.githubusercontent.com/brefphp/extra-php-extensions/0.11.34/layers.json".into(),
            source: ResolveError::UnknownRuntimeVersion {
                region: "eu-west-1".into(),
                version: "0.11.34".into(),
            },
        };

        let diagnostic = Diagnostic::from(&error);

        assert_eq!(diagnostic.summary, "Runtime version not published for Bref layer");
        assert!(diagnostic.detail.contains("'0.11.34'"));
        assert!(diagnostic.detail.contains("extra-php-extensions/0.11.34/layers.json"));
        assert_eq!(
            error.resolve_error(),
            Some(&ResolveError::UnknownRuntimeVersion {
                region: "eu-west-1".into(),
                version: "0.11.34".into(),
            })
        );
    }

    #[test]
    fn config_diagnostics_point_at_the_attribute() {
        let diagnostic = ProviderError::from(ConfigError::MissingRegion).to_diagnostic();
        assert_eq!(diagnostic.attribute.as_deref(), Some("region"));
        assert_eq!(diagnostic.summary, "Missing AWS region");
    }
}
