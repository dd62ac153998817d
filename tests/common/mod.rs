//! Common test utilities for mediagrab integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use mediagrab::{Config, FetchBackend, FetchRequest, MediaService};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Backend that writes a fixed payload and a metadata sidecar
pub struct FakeBackend {
    pub payload_bytes: usize,
    pub sidecar: serde_json::Value,
}

#[async_trait]
impl FetchBackend for FakeBackend {
    async fn fetch(&self, request: &FetchRequest) -> mediagrab::Result<()> {
        tokio::fs::write(&request.output_path, vec![7u8; self.payload_bytes]).await?;
        if request.write_info_json {
            tokio::fs::write(
                request.output_path.with_extension("info.json"),
                self.sidecar.to_string(),
            )
            .await?;
        }
        Ok(())
    }

    async fn probe(&self, _url: &str) -> mediagrab::Result<serde_json::Value> {
        Ok(self.sidecar.clone())
    }

    async fn version(&self) -> mediagrab::Result<String> {
        Ok("fake-2024.01.01".into())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// A running server bound to an ephemeral port
pub struct TestServer {
    pub address: SocketAddr,
    pub service: Arc<MediaService>,
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<mediagrab::Result<()>>>,
    _temp_dir: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    /// Stop accepting, then shut the service down
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("server did not stop")
                .expect("server task panicked")
                .expect("server returned an error");
        }
        self.service.shutdown().await;
    }
}

/// Config rooted in a temp dir with rate limiting off
pub fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.download.storage_dir = temp_dir.path().join("artifacts");
    config.download.fetch_timeout = Duration::from_secs(5);
    config.api.rate_limit.enabled = false;
    config
}

/// Start a server over `backend`, letting the caller adjust the config
pub async fn start_server(backend: FakeBackend, adjust: impl FnOnce(&mut Config)) -> TestServer {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut config = test_config(&temp_dir);
    adjust(&mut config);

    let service = Arc::new(
        MediaService::with_backend(config, Arc::new(backend))
            .await
            .expect("service should build"),
    );
    service.start();

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("local addr");
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(mediagrab::api::serve(listener, service.clone(), async {
        let _ = stop_rx.await;
    }));

    TestServer {
        address,
        service,
        stop: Some(stop_tx),
        handle: Some(handle),
        _temp_dir: temp_dir,
    }
}
