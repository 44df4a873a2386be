//! Canonical metadata resolution against the Spotify Web API.
//!
//! Given a track or playlist ID from the [`crate::locator`] module, this
//! client retrieves the canonical metadata the rest of the pipeline works
//! from. It does not manage authentication: the bearer token comes from
//! configuration and is attached as-is.

use std::{future::Future, time::Duration};

use exponential_backoff::Backoff;
use reqwest::{
    header::{HeaderValue, AUTHORIZATION},
    Url,
};
use serde::de::DeserializeOwned;

use crate::{
    config::Config,
    error::{Error, Result},
    http::Client as HttpClient,
    protocol::{
        spotify::{PlaylistPage, Track},
        TrackMetadata,
    },
};

/// Resolves locator IDs into canonical track metadata.
///
/// The pipeline works against this trait; [`Spotify`] is the production
/// implementation.
#[async_trait::async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Resolves a single track.
    async fn track(&self, id: &str) -> Result<TrackMetadata>;

    /// Resolves all tracks of a playlist, in playlist order.
    async fn playlist_tracks(&self, id: &str) -> Result<Vec<TrackMetadata>>;
}

pub struct Spotify {
    http_client: HttpClient,
    bearer: HeaderValue,
}

#[async_trait::async_trait]
impl MetadataResolver for Spotify {
    async fn track(&self, id: &str) -> Result<TrackMetadata> {
        Spotify::track(self, id).await
    }

    async fn playlist_tracks(&self, id: &str) -> Result<Vec<TrackMetadata>> {
        Spotify::playlist_tracks(self, id).await
    }
}

impl Spotify {
    /// Base URL of the Spotify Web API.
    const API_URL: &'static str = "https://api.spotify.com/v1";

    /// Page size requested for playlist pages; the server may return less.
    const PLAYLIST_PAGE_SIZE: usize = 100;

    /// Retry attempts for one API call, including the first.
    const RETRY_ATTEMPTS: u32 = 3;
    const RETRY_MIN_DELAY: Duration = Duration::from_millis(250);
    const RETRY_MAX_DELAY: Duration = Duration::from_secs(2);

    /// Creates a new resolver from the shared configuration.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the HTTP client cannot be built or the
    /// configured access token does not form a valid header value.
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = HttpClient::new(config)?;

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.access_token))?;
        bearer.set_sensitive(true);

        Ok(Self {
            http_client,
            bearer,
        })
    }

    /// Resolves a single track into canonical metadata.
    ///
    /// Missing optional fields degrade to `"Unknown"` placeholders; only
    /// a failed network call or an unrecognizable document is an error.
    pub async fn track(&self, id: &str) -> Result<TrackMetadata> {
        let url = format!("{}/tracks/{id}", Self::API_URL).parse::<Url>()?;
        let track: Track = self.get_json(url).await?;

        Ok(track.metadata())
    }

    /// Resolves all tracks of a playlist, in playlist order.
    ///
    /// Follows `next` page links until the server reports no further
    /// page. Entries with no underlying track are omitted. A page with
    /// zero parsable entries and no `next` marker simply terminates the
    /// sequence.
    pub async fn playlist_tracks(&self, id: &str) -> Result<Vec<TrackMetadata>> {
        let first = format!(
            "{}/playlists/{id}/tracks?limit={}",
            Self::API_URL,
            Self::PLAYLIST_PAGE_SIZE
        )
        .parse::<Url>()?;

        let tracks = follow_playlist_pages(first, |url| self.get_json(url)).await?;

        debug!("resolved playlist {id} to {} tracks", tracks.len());
        Ok(tracks)
    }

    /// Performs an authorized GET and decodes the JSON response, with
    /// bounded retry on transient failures.
    async fn get_json<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let backoff = Backoff::new(
            Self::RETRY_ATTEMPTS,
            Self::RETRY_MIN_DELAY,
            Self::RETRY_MAX_DELAY,
        );

        for duration in &backoff {
            match self.get_json_once(url.clone()).await {
                Ok(value) => return Ok(value),
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

    async fn get_json_once<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut request = self.http_client.get(url);
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.bearer.clone());

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

        response.json::<T>().await.map_err(Into::into)
    }
}

/// Collects tracks across playlist pages.
///
/// Follows each page's `next` link; a page reporting `next == null`
/// terminates the sequence, so the fetch runs exactly once per page.
/// Entries with no underlying track are omitted.
async fn follow_playlist_pages<F, Fut>(first: Url, mut fetch_page: F) -> Result<Vec<TrackMetadata>>
where
    F: FnMut(Url) -> Fut,
    Fut: Future<Output = Result<PlaylistPage>>,
{
    let mut tracks = Vec::new();
    let mut next = Some(first);

    while let Some(url) = next.take() {
        let page = fetch_page(url).await?;

        tracks.extend(
            page.items
                .into_iter()
                .filter_map(|item| item.track)
                .map(|track| track.metadata()),
        );

        next = match page.next {
            Some(href) => Some(href.parse::<Url>()?),
            None => None,
        };
    }

    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::protocol::{spotify::PlaylistItem, StringOrUnknown};

    fn first_page_url() -> Url {
        "https://api.spotify.com/v1/playlists/p/tracks?limit=100"
            .parse()
            .unwrap()
    }

    fn page_item(id: &str, name: &str) -> PlaylistItem {
        PlaylistItem {
            track: Some(Track {
                id: id.to_owned(),
                name: StringOrUnknown(name.to_owned()),
                ..Track::default()
            }),
        }
    }

    #[tokio::test]
    async fn pagination_follows_next_and_stops_at_null() {
        let fetches = Cell::new(0_u32);

        let tracks = follow_playlist_pages(first_page_url(), |url| {
            fetches.set(fetches.get() + 1);
            let page = if url.query().is_some_and(|query| query.contains("offset=100")) {
                PlaylistPage {
                    items: vec![page_item("b", "Two")],
                    next: None,
                }
            } else {
                PlaylistPage {
                    items: vec![page_item("a", "One"), PlaylistItem { track: None }],
                    next: Some(
                        "https://api.spotify.com/v1/playlists/p/tracks?offset=100&limit=100"
                            .to_owned(),
                    ),
                }
            };
            async move { Ok(page) }
        })
        .await
        .unwrap();

        // The null `next` on the second page ends the loop there: two
        // pages, two fetches, no third request.
        assert_eq!(fetches.get(), 2);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].title, "One");
        assert_eq!(tracks[1].title, "Two");
    }

    #[tokio::test]
    async fn single_page_fetches_exactly_once() {
        let fetches = Cell::new(0_u32);

        let tracks = follow_playlist_pages(first_page_url(), |_url| {
            fetches.set(fetches.get() + 1);
            async {
                Ok(PlaylistPage {
                    items: Vec::new(),
                    next: None,
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(fetches.get(), 1);
        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn page_fetch_failure_propagates() {
        let tracks = follow_playlist_pages(first_page_url(), |_url| async {
            Err(Error::unavailable("api.spotify.com returned 503"))
        })
        .await;

        assert!(tracks.is_err());
    }
}
