//! yt-dlp backend using the external binary

use super::traits::{FetchBackend, FetchRequest};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Longest stderr excerpt carried into an error message
const STDERR_EXCERPT_LEN: usize = 500;

/// Fetch backend that runs the external `yt-dlp` binary
///
/// The child process is spawned with `kill_on_drop`, so cancelling the
/// future (for example when a deadline elapses) terminates the download.
///
/// # Examples
///
/// ```no_run
/// use mediagrab::fetcher::{FetchBackend, YtDlpBackend};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = YtDlpBackend::from_path().expect("yt-dlp not found in PATH");
/// println!("{}", backend.version().await?);
/// # Ok(())
/// # }
/// ```
pub struct YtDlpBackend {
    binary_path: PathBuf,
}

impl YtDlpBackend {
    /// Create a backend with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// Returns `None` when the binary is not installed.
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Path of the binary this backend runs
    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }

    async fn run(&self, args: Vec<OsString>) -> crate::Result<Output> {
        let output = Command::new(&self.binary_path)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            return Err(crate::Error::ExternalTool(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr_excerpt(&output.stderr)
            )));
        }
        Ok(output)
    }
}

/// Command-line arguments for a fetch
pub(crate) fn fetch_args(request: &FetchRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        request.source_url.clone().into(),
        "-f".into(),
        request.format_selector.clone().into(),
        "-o".into(),
        request.output_path.clone().into_os_string(),
        "--no-warnings".into(),
        "--quiet".into(),
        "--no-playlist".into(),
    ];
    if request.write_info_json {
        args.push("--write-info-json".into());
    }
    if let Some(container) = &request.merge_container {
        args.push("--merge-output-format".into());
        args.push(container.into());
    }
    args
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    if trimmed.len() <= STDERR_EXCERPT_LEN {
        return trimmed.to_string();
    }
    // keep the tail, yt-dlp prints the actual error last
    let mut start = trimmed.len() - STDERR_EXCERPT_LEN;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &trimmed[start..])
}

#[async_trait]
impl FetchBackend for YtDlpBackend {
    async fn fetch(&self, request: &FetchRequest) -> crate::Result<()> {
        tracing::debug!(
            url = %request.source_url,
            format = %request.format_selector,
            output = %request.output_path.display(),
            "running yt-dlp"
        );
        self.run(fetch_args(request)).await.map(|_| ())
    }

    async fn probe(&self, url: &str) -> crate::Result<serde_json::Value> {
        let args: Vec<OsString> = vec![
            url.into(),
            "--dump-json".into(),
            "--no-warnings".into(),
            "--no-playlist".into(),
        ];
        let output = self.run(args).await?;
        Ok(serde_json::from_slice(&output.stdout)?)
    }

    async fn version(&self) -> crate::Result<String> {
        let output = self.run(vec!["--version".into()]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn request(write_info_json: bool, merge: Option<&str>) -> FetchRequest {
        FetchRequest {
            source_url: "https://youtu.be/abc".into(),
            format_selector: "bestaudio[ext=m4a]/bestaudio/best".into(),
            output_path: PathBuf::from("/tmp/youtube_1.m4a"),
            write_info_json,
            merge_container: merge.map(String::from),
        }
    }

    #[test]
    fn fetch_args_put_url_first_and_pass_selector_and_output() {
        let args = fetch_args(&request(true, None));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[0], "https://youtu.be/abc");
        assert_eq!(args[1..3], ["-f", "bestaudio[ext=m4a]/bestaudio/best"]);
        assert_eq!(args[3..5], ["-o", "/tmp/youtube_1.m4a"]);
        assert!(args.contains(&"--write-info-json".to_string()));
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn fetch_args_request_merge_container_when_set() {
        let args = fetch_args(&request(false, Some("mp4")));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert!(!args.contains(&"--write-info-json".to_string()));
        let idx = args.iter().position(|a| a == "--merge-output-format").unwrap();
        assert_eq!(args[idx + 1], "mp4");
    }

    #[test]
    fn stderr_excerpt_keeps_short_output_and_tail_of_long_output() {
        assert_eq!(stderr_excerpt(b"  ERROR: private video \n"), "ERROR: private video");

        let long = format!("{}ERROR: the end", "x".repeat(1000));
        let excerpt = stderr_excerpt(long.as_bytes());
        assert!(excerpt.starts_with("..."));
        assert!(excerpt.ends_with("ERROR: the end"));
        assert_eq!(excerpt.len(), STDERR_EXCERPT_LEN + 3);
    }

    #[test]
    fn from_path_consistency_with_which_crate() {
        let which_result = which::which("yt-dlp");
        let from_path_result = YtDlpBackend::from_path();
        assert_eq!(
            which_result.is_ok(),
            from_path_result.is_some(),
            "from_path() should return Some if and only if which::which() succeeds"
        );
    }

    #[tokio::test]
    async fn missing_binary_surfaces_external_tool_error() {
        let backend = YtDlpBackend::new(PathBuf::from("/nonexistent/yt-dlp-binary-xyz"));
        let result = backend.fetch(&request(true, None)).await;
        assert!(matches!(result, Err(crate::Error::ExternalTool(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_reported_with_stderr() {
        // `false` ignores its arguments and exits with status 1
        let backend = YtDlpBackend::new(PathBuf::from("false"));
        match backend.version().await {
            Err(crate::Error::ExternalTool(msg)) => assert!(msg.contains("yt-dlp exited")),
            other => panic!("expected ExternalTool error, got {other:?}"),
        }
    }
}
