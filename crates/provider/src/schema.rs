//! Schema metadata exposed to the host for documentation and validation.
//!
//! Descriptions are authored in Markdown. [`SchemaSettings`] decides, once
//! per provider instance, whether they are handed over as Markdown or
//! flattened to plain text.

use std::collections::BTreeMap;

use bref_types::{DescriptionKind, LayerKind};
use serde::Serialize;

use crate::config::REGION_ENV_VARS;

/// Region suggested to interactive users when none is configured.
pub const REGION_INPUT_DEFAULT: &str = "us-east-1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaSettings {
    pub description_kind: DescriptionKind,
}

impl SchemaSettings {
    fn render(&self, markdown: &str) -> String {
        match self.description_kind {
            DescriptionKind::Markdown => markdown.to_string(),
            DescriptionKind::Plain => markdown.replace('`', ""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSchema {
    pub name: String,
    /// Always `string` for this provider.
    pub value_type: &'static str,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub description: String,
    pub description_kind: DescriptionKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env_vars: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockSchema {
    pub description: String,
    pub description_kind: DescriptionKind,
    pub attributes: Vec<AttributeSchema>,
}

impl BlockSchema {
    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }
}

/// Provider block plus one block per data source type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSchema {
    pub provider: BlockSchema,
    pub data_sources: BTreeMap<String, BlockSchema>,
}

impl ProviderSchema {
    pub fn build(settings: &SchemaSettings) -> Self {
        let provider = BlockSchema {
            description: settings.render("Resolves AWS Lambda layer ARNs for the Bref PHP runtime and its extra extensions."),
            description_kind: settings.description_kind,
            attributes: vec![
                AttributeSchema {
                    env_vars: REGION_ENV_VARS.iter().map(|name| name.to_string()).collect(),
                    input_default: Some(REGION_INPUT_DEFAULT.to_string()),
                    ..configurable(
                        settings,
                        "region",
                        "AWS Region of Bref PHP runtime layers. Can be specified with the `AWS_REGION` \
                         or `AWS_DEFAULT_REGION` environment variable.",
                    )
                },
                version_attribute(settings, LayerKind::Standard),
                version_attribute(settings, LayerKind::Extra),
            ],
        };

        let data_sources = LayerKind::ALL
            .into_iter()
            .map(|kind| (kind.type_name().to_string(), data_source_block(settings, kind)))
            .collect();

        Self { provider, data_sources }
    }
}

fn configurable(settings: &SchemaSettings, name: &str, description: &str) -> AttributeSchema {
    AttributeSchema {
        name: name.to_string(),
        value_type: "string",
        required: false,
        optional: true,
        computed: false,
        description: settings.render(description),
        description_kind: settings.description_kind,
        env_vars: Vec::new(),
        default: None,
        input_default: None,
    }
}

fn computed(settings: &SchemaSettings, name: &str, description: &str) -> AttributeSchema {
    AttributeSchema {
        optional: false,
        computed: true,
        ..configurable(settings, name, description)
    }
}

fn version_attribute(settings: &SchemaSettings, kind: LayerKind) -> AttributeSchema {
    let description = match kind {
        LayerKind::Standard => "The Bref PHP runtime version to work with. Can be specified with the `BREF_VERSION` environment variable.",
        LayerKind::Extra => {
            "The Bref Extra PHP runtime version to work with. Can be specified with the `BREF_EXTRA_VERSION` environment variable."
        }
    };
    AttributeSchema {
        env_vars: vec![kind.version_env_var().to_string()],
        default: Some(kind.default_version().to_string()),
        ..configurable(settings, kind.version_attribute(), description)
    }
}

fn data_source_block(settings: &SchemaSettings, kind: LayerKind) -> BlockSchema {
    let description = match kind {
        LayerKind::Standard => "ARN of the Bref PHP runtime layer published for the configured region and `bref_version`.",
        LayerKind::Extra => "ARN of the Bref extra extensions layer published for the configured region and `bref_extra_version`.",
    };
    BlockSchema {
        description: settings.render(description),
        description_kind: settings.description_kind,
        attributes: vec![
            computed(settings, "id", "Same as `arn`."),
            computed(settings, "arn", "Layer ARN exactly as published in the upstream `layers.json`."),
            computed(settings, "region", "AWS Region the layer was resolved for."),
            computed(settings, "version", "Release version the layer was resolved for."),
            computed(settings, "account_id", "AWS account expected to publish the layer."),
            computed(settings, "manifest_url", "URL of the manifest the ARN was read from."),
        ],
    }
}
