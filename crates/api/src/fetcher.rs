//! Manifest retrieval with bounded retries.

use std::{sync::Arc, time::Duration};

use bref_types::LayerManifest;
use reqwest::Url;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{FailureCause, FetchError, ManifestTransport, ReqwestTransport};

/// Hostnames allowed to serve manifests over plain HTTP (local mirrors and tests).
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Timeout and retry policy for manifest fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    /// Upper bound on a single attempt.
    pub timeout: Duration,
    /// Additional attempts after the first one fails transiently.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for every retry after it.
    pub initial_backoff: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            initial_backoff: Duration::from_millis(250),
        }
    }
}

impl FetchSettings {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.checked_mul(factor).unwrap_or(Duration::MAX)
    }
}

/// Fetches and decodes layer manifests.
#[derive(Clone)]
pub struct ManifestFetcher {
    transport: Arc<dyn ManifestTransport>,
    settings: FetchSettings,
}

impl std::fmt::Debug for ManifestFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestFetcher").field("settings", &self.settings).finish()
    }
}

impl ManifestFetcher {
    pub fn new(transport: Arc<dyn ManifestTransport>, settings: FetchSettings) -> Self {
        Self { transport, settings }
    }

    /// Fetcher backed by [`ReqwestTransport`].
    pub fn with_default_http(settings: FetchSettings) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(settings.timeout)?;
        Ok(Self::new(Arc::new(transport), settings))
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Retrieve and decode the manifest at `url`.
    ///
    /// Transient failures are retried up to `max_retries` times with
    /// exponential backoff. A 4xx response ends the fetch on the first
    /// attempt. Cancelling `cancellation` aborts both in-flight requests and
    /// pending backoff sleeps.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] when `url` does not parse or is not HTTPS
    /// - [`FetchError::Unreachable`] when attempts are exhausted or the
    ///   server answers with a non-retryable status
    /// - [`FetchError::InvalidManifest`] when the body is not a manifest
    /// - [`FetchError::Cancelled`] when the caller cancels
    pub async fn fetch(&self, url: &str, cancellation: &CancellationToken) -> Result<LayerManifest, FetchError> {
        let parsed_url = validate_manifest_url(url)?;
        let max_attempts = self.settings.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(%url, attempt, max_attempts, "fetching layer manifest");

            let outcome = tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(FetchError::Cancelled { url: url.to_string() }),
                outcome = tokio::time::timeout(self.settings.timeout, self.transport.get(&parsed_url)) => outcome,
            };

            let cause = match outcome {
                Ok(Ok(response)) if response.status.is_success() => {
                    let manifest = serde_json::from_slice::<LayerManifest>(&response.body).map_err(|source| {
                        FetchError::InvalidManifest {
                            url: url.to_string(),
                            source,
                        }
                    })?;
                    info!(%url, attempt, region_count = manifest.len(), "layer manifest fetched");
                    return Ok(manifest);
                }
                Ok(Ok(response)) => FailureCause::Status(response.status),
                Ok(Err(error)) => FailureCause::Transport(error.to_string()),
                Err(_) => FailureCause::TimedOut(self.settings.timeout),
            };

            if !cause.is_transient() || attempt >= max_attempts {
                warn!(%url, attempt, cause = %cause, "layer manifest fetch failed");
                return Err(FetchError::Unreachable {
                    url: url.to_string(),
                    attempts: attempt,
                    cause,
                });
            }

            let delay = self.settings.backoff_after(attempt);
            warn!(%url, attempt, cause = %cause, delay_ms = delay.as_millis() as u64, "retrying layer manifest fetch");
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(FetchError::Cancelled { url: url.to_string() }),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Validate that a manifest URL is acceptable.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS
fn validate_manifest_url(url: &str) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let parsed_url = Url::parse(url).map_err(|error| invalid(error.to_string()))?;
    let host_name = parsed_url.host_str().ok_or_else(|| invalid("URL must include a host".into()))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(parsed_url);
    }

    if parsed_url.scheme() != "https" {
        return Err(invalid(format!(
            "manifests must be fetched over https for non-localhost hosts; got '{}://'",
            parsed_url.scheme()
        )));
    }

    Ok(parsed_url)
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use super::*;
    use crate::{TransportError, TransportResponse};

    const MANIFEST_URL: &str = "https://raw.githubusercontent.com/brefphp/bref/1.5.0/layers.json";
    const MANIFEST_BODY: &str = r#"{"eu-west-1": {"1.5.0": "arn:aws:lambda:eu-west-1:209497400698:layer:php-80:24"}}"#;

    /// Replays scripted outcomes; the last one repeats once the script runs out.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<TransportResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ManifestTransport for ScriptedTransport {
        async fn get(&self, _url: &Url) -> Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            }
        }
    }

    /// Never answers.
    struct HangingTransport;

    #[async_trait]
    impl ManifestTransport for HangingTransport {
        async fn get(&self, _url: &Url) -> Result<TransportResponse, TransportError> {
            std::future::pending().await
        }
    }

    fn fast_settings() -> FetchSettings {
        FetchSettings {
            timeout: Duration::from_secs(5),
            max_retries: 2,
            initial_backoff: Duration::ZERO,
        }
    }

    fn status(code: StatusCode) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse::new(code, Vec::new()))
    }

    #[tokio::test]
    async fn decodes_successful_response() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::new(StatusCode::OK, MANIFEST_BODY))]);
        let fetcher = ManifestFetcher::new(transport.clone(), fast_settings());

        let manifest = fetcher.fetch(MANIFEST_URL, &CancellationToken::new()).await.expect("fetch succeeds");

        assert_eq!(
            manifest.region("eu-west-1").and_then(|region| region.arn_for("1.5.0")),
            Some("arn:aws:lambda:eu-west-1:209497400698:layer:php-80:24")
        );
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn server_errors_are_retried_twice_then_surface_unreachable() {
        let transport = ScriptedTransport::new(vec![status(StatusCode::INTERNAL_SERVER_ERROR)]);
        let fetcher = ManifestFetcher::new(transport.clone(), fast_settings());

        let error = fetcher.fetch(MANIFEST_URL, &CancellationToken::new()).await.unwrap_err();

        match error {
            FetchError::Unreachable { attempts, cause, .. } => {
                assert_eq!(attempts, 3);
                assert_eq!(cause, FailureCause::Status(StatusCode::INTERNAL_SERVER_ERROR));
            }
            other => panic!("expected Unreachable, got {other:?}"),
        }
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let transport = ScriptedTransport::new(vec![status(StatusCode::NOT_FOUND)]);
        let fetcher = ManifestFetcher::new(transport.clone(), fast_settings());

        let error = fetcher.fetch(MANIFEST_URL, &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(error, FetchError::Unreachable { attempts: 1, .. }), "got {error:?}");
        assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn recovers_when_a_retry_succeeds() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::new("connection reset by peer")),
            status(StatusCode::SERVICE_UNAVAILABLE),
            Ok(TransportResponse::new(StatusCode::OK, MANIFEST_BODY)),
        ]);
        let fetcher = ManifestFetcher::new(transport.clone(), fast_settings());

        let manifest = fetcher.fetch(MANIFEST_URL, &CancellationToken::new()).await.expect("third attempt succeeds");

        assert_eq!(manifest.len(), 1);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_manifest() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::new(StatusCode::OK, "<html>rate limited</html>"))]);
        let fetcher = ManifestFetcher::new(transport.clone(), fast_settings());

        let error = fetcher.fetch(MANIFEST_URL, &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(error, FetchError::InvalidManifest { .. }), "got {error:?}");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn attempts_time_out_and_count_as_transient() {
        let settings = FetchSettings {
            timeout: Duration::from_millis(20),
            max_retries: 1,
            initial_backoff: Duration::ZERO,
        };
        let fetcher = ManifestFetcher::new(Arc::new(HangingTransport), settings);

        let error = fetcher.fetch(MANIFEST_URL, &CancellationToken::new()).await.unwrap_err();

        match error {
            FetchError::Unreachable { attempts, cause, .. } => {
                assert_eq!(attempts, 2);
                assert_eq!(cause, FailureCause::TimedOut(Duration::from_millis(20)));
            }
            other => panic!("expected Unreachable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_request() {
        let fetcher = ManifestFetcher::new(Arc::new(HangingTransport), FetchSettings::default());
        let cancellation = CancellationToken::new();
        let trigger = cancellation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let error = fetcher.fetch(MANIFEST_URL, &cancellation).await.unwrap_err();

        assert!(matches!(error, FetchError::Cancelled { .. }), "got {error:?}");
    }

    #[tokio::test]
    async fn cancellation_interrupts_backoff() {
        let settings = FetchSettings {
            initial_backoff: Duration::from_secs(60),
            ..fast_settings()
        };
        let transport = ScriptedTransport::new(vec![status(StatusCode::BAD_GATEWAY)]);
        let fetcher = ManifestFetcher::new(transport.clone(), settings);
        let cancellation = CancellationToken::new();
        let trigger = cancellation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let error = fetcher.fetch(MANIFEST_URL, &cancellation).await.unwrap_err();

        assert!(matches!(error, FetchError::Cancelled { .. }), "got {error:?}");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn plain_http_is_rejected_before_any_request() {
        let transport = ScriptedTransport::new(vec![status(StatusCode::OK)]);
        let fetcher = ManifestFetcher::new(transport.clone(), fast_settings());

        let error = fetcher
            .fetch("http://raw.githubusercontent.com/brefphp/bref/1.5.0/layers.json", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::InvalidUrl { .. }), "got {error:?}");
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn validate_manifest_url_allows_localhost_over_http() {
        assert!(validate_manifest_url("http://127.0.0.1:8080/layers.json").is_ok());
        assert!(validate_manifest_url("http://localhost/layers.json").is_ok());
        assert!(validate_manifest_url("not a url").is_err());
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let settings = FetchSettings::default();
        assert_eq!(settings.backoff_after(1), Duration::from_millis(250));
        assert_eq!(settings.backoff_after(2), Duration::from_millis(500));
        assert_eq!(settings.backoff_after(3), Duration::from_millis(1000));
    }
}
