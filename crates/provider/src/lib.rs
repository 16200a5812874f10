//! # Bref Layers Provider
//!
//! Core of a Terraform provider that resolves AWS Lambda layer ARNs for the
//! Bref PHP runtime (`bref_lambda_layer`) and its extra extensions
//! (`bref_extra_lambda_layer`).
//!
//! The plugin host (handshake, schema negotiation, RPC transport) is outside
//! this crate. The host configures a [`BrefProvider`] once and then calls
//! [`BrefProvider::read_data_source`] by type name, possibly many times in
//! parallel.
//!
//! ## Read path
//!
//! 1. [`DataSourceHandler`] picks the manifest URL and version for its
//!    [`LayerKind`](bref_types::LayerKind) from the shared [`ProviderConfig`].
//! 2. The manifest is loaded through [`ManifestCache`] when one is attached,
//!    otherwise straight from [`bref_api::ManifestFetcher`].
//! 3. [`LayerResolver`] looks up `manifest[region][version]`.
//! 4. The handler returns the ARN with the attributes the host stores.
//!
//! ## Usage
//!
//! ```ignore
//! use bref_provider::{BrefProvider, ProviderSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run() -> anyhow::Result<()> {
//!     let provider = BrefProvider::with_default_http(env!("CARGO_PKG_VERSION"))?;
//!     provider.configure(&ProviderSettings {
//!         region: Some("eu-west-1".into()),
//!         ..Default::default()
//!     })?;
//!     let read = provider
//!         .read_data_source("bref_lambda_layer", &CancellationToken::new())
//!         .await?;
//!     println!("{}", read.state.arn);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod data_source;
pub mod error;
pub mod provider;
pub mod resolver;
pub mod schema;

pub use cache::{DEFAULT_CACHE_TTL, ManifestCache};
pub use config::{ConfigError, ProviderConfig, ProviderSettings, REGION_ENV_VARS};
pub use data_source::{DataSourceHandler, DataSourceRead, DataSourceState};
pub use error::{Diagnostic, ProviderError, Severity};
pub use provider::BrefProvider;
pub use resolver::{LayerResolver, ResolveError};
pub use schema::{AttributeSchema, BlockSchema, ProviderSchema, SchemaSettings};
