//! Ephemeral artifact tracking and timed deletion
//!
//! Every file produced by a download is registered here with its creation
//! time. A sweep task owned by the registry deletes files once they are
//! older than the configured TTL. The registry is also the authority the
//! retrieval route consults: a file is only served while its entry exists.

use crate::platform::MediaPlatform;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Opaque artifact identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ArtifactId(pub Uuid);

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A tracked downloaded file. Never mutated after registration.
#[derive(Clone, Debug, Serialize)]
pub struct Artifact {
    /// Registry identifier
    pub id: ArtifactId,
    /// Absolute path of the file on disk
    pub file_path: PathBuf,
    /// File name, as exposed under the artifact prefix
    pub filename: String,
    /// Platform the media came from
    pub platform: MediaPlatform,
    /// Registration time
    pub created_at: DateTime<Utc>,
    /// Time after which the sweep deletes the file
    pub ttl_expiry: DateTime<Utc>,
}

/// Data needed to register a new artifact
#[derive(Clone, Debug)]
pub struct NewArtifact {
    /// Absolute path of the file on disk
    pub file_path: PathBuf,
    /// File name under the artifact prefix
    pub filename: String,
    /// Platform the media came from
    pub platform: MediaPlatform,
}

/// In-memory registry of ephemeral artifacts
pub struct ArtifactRegistry {
    entries: Mutex<HashMap<ArtifactId, Artifact>>,
    ttl: chrono::Duration,
    cancel_token: CancellationToken,
    sweeper: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ArtifactRegistry {
    /// Create an empty registry whose artifacts live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
            cancel_token: CancellationToken::new(),
            sweeper: std::sync::Mutex::new(None),
        }
    }

    /// Track a freshly written file, stamped with the current time
    pub async fn register(&self, artifact: NewArtifact) -> ArtifactId {
        let id = ArtifactId(Uuid::new_v4());
        let created_at = Utc::now();
        let entry = Artifact {
            id,
            file_path: artifact.file_path,
            filename: artifact.filename,
            platform: artifact.platform,
            created_at,
            ttl_expiry: created_at + self.ttl,
        };

        tracing::debug!(artifact_id = %id, filename = %entry.filename, "artifact registered");
        self.entries.lock().await.insert(id, entry);
        id
    }

    /// Look up an artifact by id
    pub async fn get(&self, id: ArtifactId) -> Option<Artifact> {
        self.entries.lock().await.get(&id).cloned()
    }

    /// Look up an artifact by its public file name
    pub async fn find_by_filename(&self, filename: &str) -> Option<Artifact> {
        self.entries
            .lock()
            .await
            .values()
            .find(|a| a.filename == filename)
            .cloned()
    }

    /// Number of tracked artifacts
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether nothing is tracked
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Delete expired artifacts as of `now`
    ///
    /// An artifact is expired once `created_at <= now - ttl`. Files that are
    /// already gone count as deleted. Any other deletion failure is logged and
    /// the entry is kept so the next sweep retries it. Returns the number of
    /// entries removed.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.ttl;
        let expired: Vec<(ArtifactId, PathBuf, String)> = self
            .entries
            .lock()
            .await
            .values()
            .filter(|a| a.created_at <= cutoff)
            .map(|a| (a.id, a.file_path.clone(), a.filename.clone()))
            .collect();

        if expired.is_empty() {
            return 0;
        }

        let mut deleted = Vec::with_capacity(expired.len());
        for (id, path, filename) in expired {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::info!(artifact_id = %id, filename = %filename, "expired artifact deleted");
                    deleted.push(id);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => deleted.push(id),
                Err(e) => {
                    tracing::warn!(
                        artifact_id = %id,
                        path = %path.display(),
                        error = %e,
                        "failed to delete expired artifact, will retry next sweep"
                    );
                }
            }
        }

        let mut entries = self.entries.lock().await;
        deleted
            .into_iter()
            .filter(|id| entries.remove(id).is_some())
            .count()
    }

    /// Start the periodic sweep task
    ///
    /// The task is owned by the registry and stopped by [`shutdown`](Self::shutdown).
    /// Calling this twice replaces nothing; the second call is ignored.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) {
        let mut slot = match self.sweeper.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_some() {
            return;
        }

        let registry = Arc::clone(self);
        let cancel_token = self.cancel_token.clone();
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = registry.sweep(Utc::now()).await;
                        if removed > 0 {
                            tracing::info!(removed, "artifact sweep completed");
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        tracing::debug!("artifact sweeper stopped");
                        break;
                    }
                }
            }
        }));
    }

    /// Stop the sweep task and wait for it to exit
    ///
    /// Tracked files are left on disk; the storage directory is ephemeral.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        let handle = match self.sweeper.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::warn!(error = %e, "artifact sweeper task panicked");
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TTL: Duration = Duration::from_secs(15 * 60);

    async fn register_file(registry: &ArtifactRegistry, dir: &TempDir, name: &str) -> Artifact {
        let path = dir.path().join(name);
        tokio::fs::write(&path, vec![0u8; 2000]).await.unwrap();
        let id = registry
            .register(NewArtifact {
                file_path: path,
                filename: name.to_string(),
                platform: MediaPlatform::YouTube,
            })
            .await;
        registry.get(id).await.unwrap()
    }

    #[tokio::test]
    async fn register_stamps_creation_and_expiry() {
        let dir = TempDir::new().unwrap();
        let registry = ArtifactRegistry::new(TTL);
        let artifact = register_file(&registry, &dir, "youtube_1.mp4").await;

        assert_eq!(
            artifact.ttl_expiry - artifact.created_at,
            chrono::Duration::seconds(900)
        );
        assert_eq!(registry.len().await, 1);
        assert_eq!(
            registry.find_by_filename("youtube_1.mp4").await.unwrap().id,
            artifact.id
        );
        assert!(registry.find_by_filename("other.mp4").await.is_none());
    }

    #[tokio::test]
    async fn sweep_before_ttl_removes_nothing() {
        let dir = TempDir::new().unwrap();
        let registry = ArtifactRegistry::new(TTL);
        let artifact = register_file(&registry, &dir, "youtube_1.mp4").await;

        let removed = registry
            .sweep(artifact.created_at + chrono::Duration::seconds(899))
            .await;
        assert_eq!(removed, 0);
        assert!(artifact.file_path.exists());
    }

    #[tokio::test]
    async fn sweep_removes_exactly_the_expired_artifacts() {
        let dir = TempDir::new().unwrap();
        let registry = ArtifactRegistry::new(TTL);
        let old = register_file(&registry, &dir, "youtube_1.mp4").await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        let fresh = register_file(&registry, &dir, "twitter_2.mp4").await;

        // exactly at the boundary for `old`, still inside the TTL for `fresh`
        let now = old.created_at + chrono::Duration::seconds(900);
        assert_eq!(registry.sweep(now).await, 1);

        assert!(!old.file_path.exists());
        assert!(registry.get(old.id).await.is_none());
        assert!(fresh.file_path.exists());
        assert!(registry.get(fresh.id).await.is_some());
    }

    #[tokio::test]
    async fn sweep_is_idempotent_for_same_instant() {
        let dir = TempDir::new().unwrap();
        let registry = ArtifactRegistry::new(TTL);
        let artifact = register_file(&registry, &dir, "youtube_1.mp4").await;
        let now = artifact.created_at + chrono::Duration::hours(1);

        assert_eq!(registry.sweep(now).await, 1);
        assert_eq!(registry.sweep(now).await, 0);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn sweep_drops_entries_whose_file_is_already_gone() {
        let dir = TempDir::new().unwrap();
        let registry = ArtifactRegistry::new(TTL);
        let artifact = register_file(&registry, &dir, "youtube_1.mp4").await;
        tokio::fs::remove_file(&artifact.file_path).await.unwrap();

        let removed = registry
            .sweep(artifact.created_at + chrono::Duration::hours(1))
            .await;
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn sweep_keeps_entry_when_deletion_fails() {
        let dir = TempDir::new().unwrap();
        let registry = ArtifactRegistry::new(TTL);
        // a non-empty directory cannot be removed with remove_file
        let blocker = dir.path().join("stuck.mp4");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("inner"), b"x").unwrap();
        let id = registry
            .register(NewArtifact {
                file_path: blocker.clone(),
                filename: "stuck.mp4".into(),
                platform: MediaPlatform::Instagram,
            })
            .await;
        let ok = register_file(&registry, &dir, "instagram_1.mp4").await;

        let removed = registry
            .sweep(ok.created_at + chrono::Duration::hours(1))
            .await;
        assert_eq!(removed, 1);
        assert!(registry.get(id).await.is_some());
    }

    #[tokio::test]
    async fn sweeper_task_deletes_expired_files_and_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(ArtifactRegistry::new(Duration::from_millis(10)));
        let artifact = register_file(&registry, &dir, "youtube_1.mp4").await;

        registry.start_sweeper(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(registry.is_empty().await);
        assert!(!artifact.file_path.exists());

        tokio::time::timeout(Duration::from_secs(1), registry.shutdown())
            .await
            .expect("sweeper should stop promptly");
    }

    #[tokio::test]
    async fn shutdown_without_sweeper_is_a_no_op() {
        let registry = ArtifactRegistry::new(TTL);
        registry.shutdown().await;
    }
}
