//! Layer ARN lookup within a fetched manifest.

use bref_types::{LayerKind, LayerManifest, ResolvedLayer};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("region '{region}' is not published in the layer manifest ({available} regions available)")]
    UnknownRegion { region: String, available: usize },

    #[error("runtime version '{version}' is not published for region '{region}'")]
    UnknownRuntimeVersion { region: String, version: String },
}

/// Stateless lookup of `manifest[region][version]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerResolver;

impl LayerResolver {
    /// Resolve the ARN published for `region` under the exact key `version`.
    ///
    /// The ARN is returned verbatim. A missing region is always reported as
    /// [`ResolveError::UnknownRegion`], regardless of the version requested.
    pub fn resolve(
        &self,
        manifest: &LayerManifest,
        layer_kind: LayerKind,
        region: &str,
        version: &str,
    ) -> Result<ResolvedLayer, ResolveError> {
        let region_layers = manifest.region(region).ok_or_else(|| ResolveError::UnknownRegion {
            region: region.to_string(),
            available: manifest.len(),
        })?;

        let arn = region_layers
            .arn_for(version)
            .ok_or_else(|| ResolveError::UnknownRuntimeVersion {
                region: region.to_string(),
                version: version.to_string(),
            })?;

        Ok(ResolvedLayer {
            arn: arn.to_string(),
            layer_kind,
            region: region.to_string(),
            version: version.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> LayerManifest {
        [
            (
                "eu-west-1",
                vec![
                    ("1.5.0", "arn:aws:lambda:eu-west-1:209497400698:layer:php-80:24"),
                    ("1.4.0", "arn:aws:lambda:eu-west-1:209497400698:layer:php-80:19"),
                ],
            ),
            ("us-east-1", vec![("1.5.0", "arn:aws:lambda:us-east-1:209497400698:layer:php-80:21")]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn returns_the_stored_arn_verbatim() {
        let manifest = manifest();
        for region in manifest.regions() {
            let layers = manifest.region(region).unwrap();
            for key in layers.runtime_keys() {
                let resolved = LayerResolver.resolve(&manifest, LayerKind::Standard, region, key).unwrap();
                assert_eq!(resolved.arn, layers.arn_for(key).unwrap());
                assert_eq!(resolved.region, region);
                assert_eq!(resolved.version, key);
                assert_eq!(resolved.layer_kind, LayerKind::Standard);
            }
        }
    }

    #[test]
    fn unknown_region_wins_over_unknown_version() {
        let error = LayerResolver
            .resolve(&manifest(), LayerKind::Extra, "af-south-1", "9.9.9")
            .unwrap_err();
        assert_eq!(
            error,
            ResolveError::UnknownRegion {
                region: "af-south-1".into(),
                available: 2
            }
        );
    }

    #[test]
    fn unknown_version_in_known_region() {
        let error = LayerResolver
            .resolve(&manifest(), LayerKind::Standard, "us-east-1", "1.4.0")
            .unwrap_err();
        assert_eq!(
            error,
            ResolveError::UnknownRuntimeVersion {
                region: "us-east-1".into(),
                version: "1.4.0".into()
            }
        );
        assert!(error.to_string().contains("'1.4.0'"));
    }

    #[test]
    fn keys_match_exactly() {
        let manifest = manifest();
        assert!(LayerResolver.resolve(&manifest, LayerKind::Standard, "eu-west-1", "1.5").is_err());
        assert!(LayerResolver.resolve(&manifest, LayerKind::Standard, "EU-WEST-1", "1.5.0").is_err());
    }
}
