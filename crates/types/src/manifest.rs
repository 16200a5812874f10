//! Parsed `layers.json` manifests.
//!
//! A manifest maps `region -> runtime key -> ARN`. Both levels preserve
//! document order. When the upstream document repeats a key at either level,
//! the first occurrence in document order wins and later duplicates are
//! skipped. This tie-break is implementation-defined; upstream manifests are
//! not expected to contain duplicates.

use std::{fmt, marker::PhantomData};

use indexmap::IndexMap;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{IgnoredAny, MapAccess, Visitor},
};

/// Read-only view of an upstream layer manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LayerManifest {
    regions: IndexMap<String, RegionLayers>,
}

/// Runtime key to ARN entries published for one region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RegionLayers {
    entries: IndexMap<String, String>,
}

impl LayerManifest {
    /// Entries for `region`, if the manifest publishes any.
    pub fn region(&self, region: &str) -> Option<&RegionLayers> {
        self.regions.get(region)
    }

    /// Region names in document order.
    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl RegionLayers {
    /// ARN stored under `runtime_key`. Keys are matched exactly.
    pub fn arn_for(&self, runtime_key: &str) -> Option<&str> {
        self.entries.get(runtime_key).map(String::as_str)
    }

    /// Runtime keys in document order.
    pub fn runtime_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<R, K, A> FromIterator<(R, Vec<(K, A)>)> for LayerManifest
where
    R: Into<String>,
    K: Into<String>,
    A: Into<String>,
{
    /// Builds a manifest with the same first-wins rule used when decoding JSON.
    fn from_iter<I: IntoIterator<Item = (R, Vec<(K, A)>)>>(iter: I) -> Self {
        let mut regions: IndexMap<String, RegionLayers> = IndexMap::new();
        for (region, layers) in iter {
            let region = region.into();
            if regions.contains_key(&region) {
                continue;
            }
            let mut entries = IndexMap::new();
            for (key, arn) in layers {
                entries.entry(key.into()).or_insert_with(|| arn.into());
            }
            regions.insert(region, RegionLayers { entries });
        }
        Self { regions }
    }
}

impl<'de> Deserialize<'de> for LayerManifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let FirstWins(regions) = FirstWins::<RegionLayers>::deserialize(deserializer)?;
        Ok(Self { regions })
    }
}

impl<'de> Deserialize<'de> for RegionLayers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let FirstWins(entries) = FirstWins::<String>::deserialize(deserializer)?;
        Ok(Self { entries })
    }
}

/// JSON object decoded into an ordered map, keeping the first value per key.
struct FirstWins<V>(IndexMap<String, V>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for FirstWins<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FirstWinsVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for FirstWinsVisitor<V> {
            type Value = FirstWins<V>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(key) = access.next_key::<String>()? {
                    if entries.contains_key(&key) {
                        access.next_value::<IgnoredAny>()?;
                        continue;
                    }
                    let value = access.next_value::<V>()?;
                    entries.insert(key, value);
                }
                Ok(FirstWins(entries))
            }
        }

        deserializer.deserialize_map(FirstWinsVisitor(PhantomData))
    }
}
