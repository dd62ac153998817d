//! Shared test helpers: a scriptable fetch backend and service builders.

use crate::config::Config;
use crate::fetcher::{FetchBackend, FetchRequest};
use crate::service::MediaService;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Fetch backend that writes a fixed-size file instead of running yt-dlp
pub(crate) struct StubBackend {
    payload_bytes: usize,
    write_output: bool,
    sidecar: Option<String>,
    intermediates: Vec<String>,
    failure: Option<String>,
    delay: Option<Duration>,
    probe_response: serde_json::Value,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubBackend {
    /// Backend that writes `payload_bytes` zero bytes to the output path
    pub(crate) fn writing(payload_bytes: usize) -> Self {
        Self {
            payload_bytes,
            write_output: true,
            sidecar: None,
            intermediates: Vec::new(),
            failure: None,
            delay: None,
            probe_response: serde_json::json!({}),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Also write this raw text as the `.info.json` sidecar
    pub(crate) fn with_sidecar(mut self, contents: &str) -> Self {
        self.sidecar = Some(contents.to_string());
        self
    }

    /// Also write `<stem><suffix>` next to the output, like a yt-dlp merge part
    pub(crate) fn with_intermediate(mut self, suffix: &str) -> Self {
        self.intermediates.push(suffix.to_string());
        self
    }

    /// Write the output (and sidecar), then report this error
    pub(crate) fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Sleep before doing anything
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report success without writing the media file
    pub(crate) fn without_output(mut self) -> Self {
        self.write_output = false;
        self
    }

    /// JSON returned by `probe`
    pub(crate) fn with_probe(mut self, response: serde_json::Value) -> Self {
        self.probe_response = response;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetchBackend for StubBackend {
    async fn fetch(&self, request: &FetchRequest) -> crate::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = async {
            if self.write_output {
                tokio::fs::write(&request.output_path, vec![0u8; self.payload_bytes]).await?;
            }
            if let (Some(sidecar), true) = (&self.sidecar, request.write_info_json) {
                tokio::fs::write(request.output_path.with_extension("info.json"), sidecar).await?;
            }
            for suffix in &self.intermediates {
                let stem = request.output_path.file_stem().unwrap().to_string_lossy();
                let path = request.output_path.with_file_name(format!("{stem}{suffix}"));
                tokio::fs::write(path, b"partial").await?;
            }
            match &self.failure {
                Some(message) => Err(crate::Error::ExternalTool(message.clone())),
                None => Ok(()),
            }
        }
        .await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn probe(&self, _url: &str) -> crate::Result<serde_json::Value> {
        match &self.failure {
            Some(message) => Err(crate::Error::ExternalTool(message.clone())),
            None => Ok(self.probe_response.clone()),
        }
    }

    async fn version(&self) -> crate::Result<String> {
        Ok("stub-1.0".into())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Config rooted in a fresh temp dir, with rate limiting disabled
pub(crate) fn test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.download.storage_dir = temp_dir.path().join("artifacts");
    config.download.fetch_timeout = Duration::from_secs(5);
    config.api.rate_limit.enabled = false;
    (config, temp_dir)
}

/// Service over a stub backend. Keep the TempDir alive for the test.
pub(crate) async fn create_test_service(
    backend: StubBackend,
) -> (Arc<MediaService>, TempDir) {
    let (config, temp_dir) = test_config();
    create_test_service_with_config(backend, config, temp_dir).await
}

/// Service over a stub backend with a caller-adjusted config
pub(crate) async fn create_test_service_with_config(
    backend: StubBackend,
    config: Config,
    temp_dir: TempDir,
) -> (Arc<MediaService>, TempDir) {
    let service = MediaService::with_backend(config, Arc::new(backend))
        .await
        .unwrap();
    (Arc::new(service), temp_dir)
}
