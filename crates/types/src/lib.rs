//! Shared type definitions for the Bref layers provider.
//!
//! The provider exposes two data sources, one per [`LayerKind`]. Each kind
//! carries its own fixed AWS account, manifest location, and version setting,
//! so most per-kind knowledge lives as `match` arms on the enum rather than in
//! string-keyed lookup tables.

use std::{error::Error, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

mod manifest;

pub use manifest::{LayerManifest, RegionLayers};

/// The two layer families published for Bref.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// PHP runtime layers published by `brefphp/bref`.
    Standard,
    /// Extension layers published by `brefphp/extra-php-extensions`.
    Extra,
}

impl LayerKind {
    /// Every kind, in registration order.
    pub const ALL: [LayerKind; 2] = [LayerKind::Standard, LayerKind::Extra];

    /// Data source type name registered with the host.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Standard => "bref_lambda_layer",
            Self::Extra => "bref_extra_lambda_layer",
        }
    }

    /// AWS account that publishes layers of this kind.
    pub fn account_id(&self) -> &'static str {
        match self {
            Self::Standard => "209497400698",
            Self::Extra => "403367587399",
        }
    }

    /// Provider attribute holding the version for this kind.
    pub fn version_attribute(&self) -> &'static str {
        match self {
            Self::Standard => "bref_version",
            Self::Extra => "bref_extra_version",
        }
    }

    /// Environment variable consulted when the version attribute is unset.
    pub fn version_env_var(&self) -> &'static str {
        match self {
            Self::Standard => "BREF_VERSION",
            Self::Extra => "BREF_EXTRA_VERSION",
        }
    }

    /// Version used when neither the attribute nor its environment variable is set.
    pub fn default_version(&self) -> &'static str {
        match self {
            Self::Standard => "1.5.0",
            Self::Extra => "0.11.34",
        }
    }

    /// GitHub repository that publishes the `layers.json` manifest.
    pub fn repository(&self) -> &'static str {
        match self {
            Self::Standard => "brefphp/bref",
            Self::Extra => "brefphp/extra-php-extensions",
        }
    }

    /// Raw manifest URL for a tagged release of this kind.
    pub fn manifest_url(&self, version: &str) -> String {
        format!("https://raw.githubusercontent.com/{}/{}/layers.json", self.repository(), version)
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Extra => f.write_str("extra"),
        }
    }
}

impl FromStr for LayerKind {
    type Err = ParseLayerKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" | "bref_lambda_layer" => Ok(Self::Standard),
            "extra" | "bref_extra_lambda_layer" => Ok(Self::Extra),
            _ => Err(ParseLayerKindError),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLayerKindError;

impl fmt::Display for ParseLayerKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid layer kind; expected 'standard' or 'extra'")
    }
}

impl Error for ParseLayerKindError {}

/// A layer ARN resolved for a single data source read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLayer {
    /// ARN exactly as published in the manifest.
    pub arn: String,
    pub layer_kind: LayerKind,
    pub region: String,
    /// Runtime version key the ARN was resolved for.
    pub version: String,
}

impl ResolvedLayer {
    /// Account id embedded in the ARN (`arn:aws:lambda:<region>:<account>:layer:...`).
    pub fn arn_account_id(&self) -> Option<&str> {
        self.arn.split(':').nth(4).filter(|account| !account.is_empty())
    }
}

/// How schema descriptions are rendered for documentation and language servers.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionKind {
    Plain,
    #[default]
    Markdown,
}
