//! YouTube client: search, direct-video metadata, playlist listing.
//!
//! Everything here works off public pages, scraping the JSON blobs they
//! embed (see [`crate::protocol::youtube`]). The search surface returns
//! candidates in YouTube's own relevance order; ranking and filtering
//! policy lives in [`crate::matcher`], not here.

use std::time::Duration;

use exponential_backoff::Backoff;
use reqwest::Url;

use crate::{
    config::Config,
    error::{Error, Result},
    http::Client as HttpClient,
    protocol::{
        youtube::{self, SearchCandidate},
        TrackMetadata,
    },
};

/// Search surface and direct-link extractor of the alternate platform.
///
/// The matcher and pipeline work against this trait; [`Youtube`] is the
/// production implementation.
#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    /// Searches for candidates, in the platform's own relevance order.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchCandidate>>;

    /// Extracts track metadata from a direct video link.
    async fn video_metadata(&self, video_id: &str) -> Result<TrackMetadata>;

    /// Lists the videos of a playlist in playlist order.
    async fn playlist_videos(&self, playlist_id: &str) -> Result<Vec<SearchCandidate>>;
}

pub struct Youtube {
    http_client: HttpClient,
}

#[async_trait::async_trait]
impl CandidateSource for Youtube {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchCandidate>> {
        Youtube::search(self, query, limit).await
    }

    async fn video_metadata(&self, video_id: &str) -> Result<TrackMetadata> {
        Youtube::video_metadata(self, video_id).await
    }

    async fn playlist_videos(&self, playlist_id: &str) -> Result<Vec<SearchCandidate>> {
        Youtube::playlist_videos(self, playlist_id).await
    }
}

impl Youtube {
    const RESULTS_URL: &'static str = "https://www.youtube.com/results";
    const WATCH_URL: &'static str = "https://www.youtube.com/watch";
    const PLAYLIST_URL: &'static str = "https://www.youtube.com/playlist";

    /// Retry attempts for one page fetch, including the first.
    const RETRY_ATTEMPTS: u32 = 3;
    const RETRY_MIN_DELAY: Duration = Duration::from_millis(250);
    const RETRY_MAX_DELAY: Duration = Duration::from_secs(2);

    /// Creates a new client from the shared configuration.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::new(config)?,
        })
    }

    /// Searches for candidates matching `query`, in YouTube's own
    /// relevance order, capped at `limit`.
    ///
    /// An empty list means the search genuinely found nothing; an `Err`
    /// means the page could not be fetched or carried no results blob.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchCandidate>> {
        let url = Url::parse_with_params(Self::RESULTS_URL, &[("search_query", query)])?;
        let html = self.get_page(url).await?;

        let data = youtube::embedded_json(&html, "ytInitialData").ok_or_else(|| {
            Error::invalid_argument(format!("no results data in search page for {query:?}"))
        })?;

        let candidates = youtube::search_candidates(&data, limit);
        debug!("search for {query:?} yielded {} candidates", candidates.len());

        Ok(candidates)
    }

    /// Extracts track metadata from a video's watch page.
    ///
    /// Used when the submitted URL was already a direct video link and
    /// there is no canonical source to resolve against.
    pub async fn video_metadata(&self, video_id: &str) -> Result<TrackMetadata> {
        let url = Url::parse_with_params(Self::WATCH_URL, &[("v", video_id)])?;
        let html = self.get_page(url).await?;

        youtube::embedded_json(&html, "ytInitialPlayerResponse")
            .as_ref()
            .and_then(youtube::video_metadata)
            .ok_or_else(|| {
                Error::invalid_argument(format!("no video details for video {video_id}"))
            })
    }

    /// Lists the videos of a playlist in playlist order.
    pub async fn playlist_videos(&self, playlist_id: &str) -> Result<Vec<SearchCandidate>> {
        let url = Url::parse_with_params(Self::PLAYLIST_URL, &[("list", playlist_id)])?;
        let html = self.get_page(url).await?;

        let data = youtube::embedded_json(&html, "ytInitialData").ok_or_else(|| {
            Error::invalid_argument(format!("no playlist data for playlist {playlist_id}"))
        })?;

        Ok(youtube::playlist_videos(&data))
    }

    /// Fetches a page body with bounded retry on transient failures.
    async fn get_page(&self, url: Url) -> Result<String> {
        let backoff = Backoff::new(
            Self::RETRY_ATTEMPTS,
            Self::RETRY_MIN_DELAY,
            Self::RETRY_MAX_DELAY,
        );

        for duration in &backoff {
            match self.get_page_once(url.clone()).await {
                Ok(html) => return Ok(html),
                Err(e) if e.is_transient() => match duration {
                    Some(duration) => {
                        warn!("retrying {url} in {:.1}s: {e}", duration.as_secs_f32());
                        tokio::time::sleep(duration).await;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }

        unreachable!("backoff iterator is never empty");
    }

    async fn get_page_once(&self, url: Url) -> Result<String> {
        let request = self.http_client.get(url);
        let response = self.http_client.execute(request).await?;

        // 429 and server errors are worth a retry; other status errors
        // are not going to change on a second attempt.
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::resource_exhausted(format!(
                "rate limited by {}",
                response.url()
            )));
        }
        if status.is_server_error() {
            return Err(Error::unavailable(format!(
                "{} returned {status}",
                response.url()
            )));
        }
        let response = response.error_for_status().map_err(Error::from)?;

        response.text().await.map_err(Into::into)
    }
}
