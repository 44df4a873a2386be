//! URL classification.
//!
//! Turns a raw, untrusted URL string into a typed [`Locator`]: which
//! platform it belongs to, whether it names a single track or a playlist,
//! and the platform-native resource ID. Malformed input never faults;
//! it degrades to [`Locator::Unknown`].

use std::sync::LazyLock;

use regex_lite::Regex;

/// YouTube video IDs are exactly 11 characters from this alphabet,
/// found either after `youtu.be/` or in a `v=` query parameter.
static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtu\.be/|[?&]v=)([A-Za-z0-9_-]{11})").expect("invalid video id regex")
});

/// Playlist IDs have no fixed length; take the whole `list=` value.
static PLAYLIST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]list=([A-Za-z0-9_-]+)").expect("invalid playlist id regex"));

/// Typed, platform-qualified identifier derived from a raw URL.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Locator {
    /// Single track on Spotify, by track ID.
    SpotifyTrack(String),

    /// Spotify playlist, by playlist ID.
    SpotifyPlaylist(String),

    /// Single YouTube video, by its 11-character ID.
    YoutubeVideo(String),

    /// YouTube playlist, by `list=` parameter value.
    YoutubePlaylist(String),

    /// Input matched neither platform, or matched a platform but no ID
    /// could be extracted.
    Unknown,
}

impl Locator {
    /// Classifies a raw URL string.
    ///
    /// Surrounding whitespace is trimmed first. Recognized forms:
    /// * `https://open.spotify.com/track/<id>` (optionally with query suffix)
    /// * `spotify:track:<id>` and the `playlist` equivalents
    /// * `https://www.youtube.com/watch?v=<id>` and `https://youtu.be/<id>`
    /// * YouTube URLs carrying a `list=` parameter are playlists
    #[must_use]
    pub fn classify(input: &str) -> Self {
        let url = input.trim();

        if url.contains("spotify.com") || url.starts_with("spotify:") {
            if url.contains("track") {
                return match extract_spotify_id(url, "track") {
                    Some(id) => Self::SpotifyTrack(id),
                    None => Self::Unknown,
                };
            }
            if url.contains("playlist") {
                return match extract_spotify_id(url, "playlist") {
                    Some(id) => Self::SpotifyPlaylist(id),
                    None => Self::Unknown,
                };
            }
            return Self::Unknown;
        }

        if url.contains("youtube.com") || url.contains("youtu.be") {
            if url.contains("list=") {
                return match PLAYLIST_ID
                    .captures(url)
                    .and_then(|captures| captures.get(1))
                {
                    Some(id) => Self::YoutubePlaylist(id.as_str().to_owned()),
                    None => Self::Unknown,
                };
            }
            return match VIDEO_ID.captures(url).and_then(|captures| captures.get(1)) {
                Some(id) => Self::YoutubeVideo(id.as_str().to_owned()),
                None => Self::Unknown,
            };
        }

        Self::Unknown
    }

    /// Whether this locator names a multi-track resource.
    #[must_use]
    pub fn is_playlist(&self) -> bool {
        matches!(self, Self::SpotifyPlaylist(_) | Self::YoutubePlaylist(_))
    }

    /// The extracted resource ID, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::SpotifyTrack(id)
            | Self::SpotifyPlaylist(id)
            | Self::YoutubeVideo(id)
            | Self::YoutubePlaylist(id) => Some(id),
            Self::Unknown => None,
        }
    }
}

/// Extracts a Spotify resource ID from a URL, URI or bare token.
///
/// * `spotify:<kind>:<id>` URIs yield the final segment
/// * `open.spotify.com` URLs yield the path segment following the
///   `<kind>` literal, with any query suffix stripped
/// * input with no platform markers at all is assumed to already be an ID
///
/// Returns `None` when the input looks like a platform URL but the
/// expected path literal is missing.
#[must_use]
pub fn extract_spotify_id(url: &str, kind: &str) -> Option<String> {
    if let Some(rest) = url.strip_prefix("spotify:") {
        return rest.split(':').next_back().map(ToOwned::to_owned);
    }

    if url.contains("spotify.com") {
        let mut segments = url.split('/');
        segments.find(|segment| *segment == kind)?;
        let id = segments.next()?;
        let id = id.split('?').next().unwrap_or(id);
        if id.is_empty() {
            return None;
        }
        return Some(id.to_owned());
    }

    // A bare token is already an ID.
    Some(url.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spotify_track_url_and_uri_agree() {
        let from_url =
            Locator::classify("https://open.spotify.com/track/6rqhFgbbKwnb9MLmUQDhG6?si=abc123");
        let from_uri = Locator::classify("spotify:track:6rqhFgbbKwnb9MLmUQDhG6");
        assert_eq!(
            from_url,
            Locator::SpotifyTrack("6rqhFgbbKwnb9MLmUQDhG6".to_owned())
        );
        assert_eq!(from_url, from_uri);
        assert_eq!(from_url.id(), Some("6rqhFgbbKwnb9MLmUQDhG6"));
        assert!(!from_url.is_playlist());
    }

    #[test]
    fn spotify_track_url_without_query() {
        assert_eq!(
            Locator::classify("https://open.spotify.com/track/6rqhFgbbKwnb9MLmUQDhG6"),
            Locator::SpotifyTrack("6rqhFgbbKwnb9MLmUQDhG6".to_owned())
        );
    }

    #[test]
    fn spotify_playlist_url() {
        assert_eq!(
            Locator::classify("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M"),
            Locator::SpotifyPlaylist("37i9dQZF1DXcBWIGoYBM5M".to_owned())
        );
    }

    #[test]
    fn youtube_long_and_short_forms_agree() {
        let long = Locator::classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        let short = Locator::classify("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(long, Locator::YoutubeVideo("dQw4w9WgXcQ".to_owned()));
        assert_eq!(long, short);
    }

    #[test]
    fn youtube_video_id_from_extra_params() {
        assert_eq!(
            Locator::classify("https://www.youtube.com/watch?feature=shared&v=dQw4w9WgXcQ"),
            Locator::YoutubeVideo("dQw4w9WgXcQ".to_owned())
        );
    }

    #[test]
    fn youtube_playlist_wins_over_video() {
        assert_eq!(
            Locator::classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLabc_123"),
            Locator::YoutubePlaylist("PLabc_123".to_owned())
        );
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(
            Locator::classify("  https://youtu.be/dQw4w9WgXcQ\n"),
            Locator::YoutubeVideo("dQw4w9WgXcQ".to_owned())
        );
    }

    #[test]
    fn unrecognized_input_is_unknown() {
        assert_eq!(Locator::classify("https://example.com/song"), Locator::Unknown);
        assert_eq!(Locator::classify(""), Locator::Unknown);
        assert_eq!(Locator::classify("not a url at all"), Locator::Unknown);
    }

    #[test]
    fn malformed_platform_url_degrades_to_unknown() {
        // Platform matched, but the ID is missing or too short.
        assert_eq!(
            Locator::classify("https://www.youtube.com/watch?v=short"),
            Locator::Unknown
        );
        assert_eq!(
            Locator::classify("https://open.spotify.com/track/"),
            Locator::Unknown
        );
    }

    #[test]
    fn bare_token_is_already_an_id() {
        assert_eq!(
            extract_spotify_id("6rqhFgbbKwnb9MLmUQDhG6", "track"),
            Some("6rqhFgbbKwnb9MLmUQDhG6".to_owned())
        );
    }
}
