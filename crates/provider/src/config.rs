//! Provider configuration.
//!
//! The host hands over the raw provider block as [`ProviderSettings`]. Each
//! attribute resolves in the same order: an explicit non-blank value, then
//! its environment variables in declaration order, then its default. `region`
//! has no default, so leaving it unset everywhere is a configuration error.
//!
//! The resolved [`ProviderConfig`] is immutable and shared by every data
//! source read of the provider instance.

use std::{collections::BTreeMap, env};

use bref_types::LayerKind;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Environment variables consulted for the region, in order.
pub const REGION_ENV_VARS: &[&str] = &["AWS_REGION", "AWS_DEFAULT_REGION"];

/// Raw provider block as supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub bref_version: Option<String>,
    #[serde(default)]
    pub bref_extra_version: Option<String>,
}

impl ProviderSettings {
    fn explicit_version(&self, kind: LayerKind) -> Option<&str> {
        match kind {
            LayerKind::Standard => self.bref_version.as_deref(),
            LayerKind::Extra => self.bref_extra_version.as_deref(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing region: set the `region` attribute or one of the {} environment variables", env_var_list(REGION_ENV_VARS))]
    MissingRegion,

    #[error("invalid {attribute} '{value}': versions may only contain letters, digits, '.', '-', '_' and '+'")]
    InvalidVersion { attribute: &'static str, value: String },
}

fn env_var_list(names: &[&str]) -> String {
    names.iter().map(|name| format!("`{name}`")).collect::<Vec<_>>().join(", ")
}

/// Resolved provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    region: String,
    runtime_version: String,
    extra_version: String,
    account_ids: BTreeMap<LayerKind, String>,
    manifest_urls: BTreeMap<LayerKind, String>,
}

impl ProviderConfig {
    /// Resolve settings against the process environment.
    pub fn build(settings: &ProviderSettings) -> Result<Self, ConfigError> {
        Self::build_with_env(settings, |name| env::var(name).ok())
    }

    /// Resolve settings using `lookup_env` for environment fallbacks.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingRegion`] when no region is set anywhere
    /// - [`ConfigError::InvalidVersion`] when a version cannot form a
    ///   manifest URL
    pub fn build_with_env<F>(settings: &ProviderSettings, lookup_env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let region = resolve_value(settings.region.as_deref(), REGION_ENV_VARS, &lookup_env).ok_or(ConfigError::MissingRegion)?;

        let mut versions = BTreeMap::new();
        for kind in LayerKind::ALL {
            let version = resolve_value(settings.explicit_version(kind), &[kind.version_env_var()], &lookup_env)
                .unwrap_or_else(|| kind.default_version().to_string());
            validate_version(kind, &version)?;
            versions.insert(kind, version);
        }

        let account_ids = LayerKind::ALL
            .into_iter()
            .map(|kind| (kind, kind.account_id().to_string()))
            .collect();
        let manifest_urls = versions
            .iter()
            .map(|(kind, version)| (*kind, kind.manifest_url(version)))
            .collect();

        let config = Self {
            region,
            runtime_version: versions.remove(&LayerKind::Standard).unwrap_or_default(),
            extra_version: versions.remove(&LayerKind::Extra).unwrap_or_default(),
            account_ids,
            manifest_urls,
        };
        debug!(
            region = %config.region,
            bref_version = %config.runtime_version,
            bref_extra_version = %config.extra_version,
            "provider configured"
        );
        Ok(config)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }

    pub fn extra_version(&self) -> &str {
        &self.extra_version
    }

    /// Version configured for `kind`.
    pub fn version(&self, kind: LayerKind) -> &str {
        match kind {
            LayerKind::Standard => &self.runtime_version,
            LayerKind::Extra => &self.extra_version,
        }
    }

    // Both maps hold an entry for every LayerKind; `build_with_env` is the only constructor.
    pub fn account_id(&self, kind: LayerKind) -> &str {
        &self.account_ids[&kind]
    }

    pub fn manifest_url(&self, kind: LayerKind) -> &str {
        &self.manifest_urls[&kind]
    }

    pub fn account_ids(&self) -> &BTreeMap<LayerKind, String> {
        &self.account_ids
    }

    pub fn manifest_urls(&self) -> &BTreeMap<LayerKind, String> {
        &self.manifest_urls
    }
}

fn resolve_value<F>(explicit: Option<&str>, env_vars: &[&str], lookup_env: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_blank(explicit.map(str::to_string)).or_else(|| env_vars.iter().find_map(|name| non_blank(lookup_env(name))))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn validate_version(kind: LayerKind, version: &str) -> Result<(), ConfigError> {
    let valid = version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidVersion {
            attribute: kind.version_attribute(),
            value: version.to_string(),
        })
    }
}
