//! Asset fetching.
//!
//! The pipeline treats "fetch asset by locator, produce local file" as
//! an opaque operation behind the [`AssetFetcher`] trait. Absence of an
//! output file signals failure; a fetcher never faults the pipeline.
//!
//! The default implementation shells out to `yt-dlp`, which handles the
//! stream selection and audio transcoding this crate deliberately does
//! not reimplement.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

/// Fetches one audio asset into a local file.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetches the asset at `source_url` into `<dir>/<base_name>.<ext>`.
    ///
    /// Returns the path of the produced file, or `None` when no file was
    /// produced, whatever the reason.
    async fn fetch(&self, source_url: &str, dir: &Path, base_name: &str) -> Option<PathBuf>;
}

/// Default fetcher: `yt-dlp` subprocess extracting a 192k MP3.
pub struct YtDlpFetcher {
    /// Program name or path; normally just `yt-dlp` on `$PATH`.
    program: String,
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self {
            program: String::from("yt-dlp"),
        }
    }
}

impl YtDlpFetcher {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl AssetFetcher for YtDlpFetcher {
    async fn fetch(&self, source_url: &str, dir: &Path, base_name: &str) -> Option<PathBuf> {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("cannot create download directory {}: {e}", dir.display());
            return None;
        }

        // `%(ext)s` lets yt-dlp name the intermediate container; the
        // post-processor replaces it with `.mp3`.
        let template = dir.join(format!("{base_name}.%(ext)s"));

        let output = Command::new(&self.program)
            .arg("--extract-audio")
            .arg("--audio-format")
            .arg("mp3")
            .arg("--audio-quality")
            .arg("192K")
            .arg("--output")
            .arg(&template)
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(source_url)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                warn!(
                    "{} exited with {} for {source_url}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                return None;
            }
            Err(e) => {
                warn!("failed to run {}: {e}", self.program);
                return None;
            }
        }

        let produced = dir.join(format!("{base_name}.mp3"));
        if produced.exists() {
            debug!("fetched {source_url} to {}", produced.display());
            Some(produced)
        } else {
            warn!("{} reported success but {} is missing", self.program, produced.display());
            None
        }
    }
}

/// Derives a safe file base name from a display string.
///
/// Strips characters that are invalid on common filesystems, collapses
/// whitespace runs to a single space, trims, and truncates to 200
/// characters.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    const INVALID: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    let stripped: String = name.chars().filter(|c| !INVALID.contains(c)).collect();

    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(200)
        .collect()
}
