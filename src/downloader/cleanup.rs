//! Best-effort removal of partial output and sidecar files

use crate::fetcher::sidecar_candidates;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Remove a single file, treating "already gone" as success
///
/// Errors are logged as warnings and never propagated.
pub(crate) async fn remove_file_best_effort(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove file"),
    }
}

/// Remove the metadata sidecars that may accompany `output`
pub(crate) async fn remove_sidecars(output: &Path) {
    for sidecar in sidecar_candidates(output) {
        remove_file_best_effort(&sidecar).await;
    }
}

/// Remove everything a failed fetch may have left behind
///
/// Covers the media file, yt-dlp's in-progress `.part` file, both
/// sidecar naming conventions and any `<stem>.*` merge intermediates
/// (`youtube_1.f137.mp4`, `youtube_1.f140.m4a.part`, ...).
pub(crate) async fn remove_partial_output(output: &Path) {
    remove_file_best_effort(output).await;
    remove_file_best_effort(&with_suffix(output, ".part")).await;
    remove_sidecars(output).await;
    remove_stem_siblings(output).await;
}

/// Remove every file in `output`'s directory whose name starts with `<stem>.`
async fn remove_stem_siblings(output: &Path) {
    let (Some(dir), Some(stem)) = (output.parent(), output.file_stem()) else {
        return;
    };
    let mut prefix = stem.to_os_string();
    prefix.push(".");
    let Some(prefix) = prefix.to_str() else {
        return;
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to scan for partial files");
            return;
        }
    };
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let name = entry.file_name();
                if name.to_str().is_some_and(|n| n.starts_with(prefix)) {
                    remove_file_best_effort(&entry.path()).await;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to scan for partial files");
                break;
            }
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
