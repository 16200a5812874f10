//! Bref layer manifest client.
//!
//! This crate retrieves the `layers.json` manifests published alongside Bref
//! releases. It focuses on:
//!
//! - Validating manifest URLs before any request is made
//! - Bounding every attempt with a timeout and retrying transient failures
//!   (network errors, timeouts, 5xx) with exponential backoff
//! - Surfacing 4xx responses immediately, without retrying
//! - Aborting promptly when the caller's [`CancellationToken`] fires
//!
//! The primary entry point is [`ManifestFetcher`]. Production code builds one
//! with [`ManifestFetcher::with_default_http`]; tests inject their own
//! [`ManifestTransport`].
//!
//! # Example
//!
//! ```ignore
//! use bref_api::{FetchSettings, ManifestFetcher};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run() -> anyhow::Result<()> {
//!     let fetcher = ManifestFetcher::with_default_http(FetchSettings::default())?;
//!     let manifest = fetcher
//!         .fetch("https://raw.githubusercontent.com/brefphp/bref/1.5.0/layers.json", &CancellationToken::new())
//!         .await?;
//!     println!("regions: {}", manifest.len());
//!     Ok(())
//! }
//! ```
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod error;
mod fetcher;
mod transport;

pub use error::{FailureCause, FetchError};
pub use fetcher::{FetchSettings, ManifestFetcher};
pub use transport::{ManifestTransport, ReqwestTransport, TransportError, TransportResponse};

// Types that appear in the transport seam.
pub use reqwest::{StatusCode, Url};
