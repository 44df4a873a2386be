//! Serde models for the Spotify Web API.
//!
//! Only the fields the pipeline consumes are modeled. Everything that is
//! optional on the wire carries `#[serde(default)]` so that a sparse
//! document still resolves, with placeholders standing in for the
//! missing values.

use serde::Deserialize;

use super::{StringOrUnknown, TrackMetadata};

/// A full track object, as returned by `/v1/tracks/{id}` or embedded in
/// a playlist page.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: StringOrUnknown,

    #[serde(default)]
    pub artists: Vec<Artist>,

    #[serde(default)]
    pub album: Album,

    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub name: StringOrUnknown,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub name: StringOrUnknown,

    /// Cover art variants; Spotify lists the widest first.
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Image {
    pub url: String,

    #[serde(default)]
    pub width: Option<u64>,
}

/// One page of `/v1/playlists/{id}/tracks`.
///
/// `next` is a complete URL for the following page, or `null` on the
/// last one.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlaylistPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,

    #[serde(default)]
    pub next: Option<String>,
}

/// A playlist entry. `track` is `null` for entries whose underlying
/// track is gone (removed from the catalog, region-blocked, ...).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub track: Option<Track>,
}

impl Track {
    /// Converts the wire document into the canonical value object.
    ///
    /// Multiple artists are joined with `", "` in listed order; no
    /// artists at all degrades to the placeholder. The cover is the
    /// highest-resolution image available.
    #[must_use]
    pub fn metadata(&self) -> TrackMetadata {
        let artist = if self.artists.is_empty() {
            StringOrUnknown::default().0
        } else {
            self.artists
                .iter()
                .map(|artist| artist.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let cover_url = self
            .album
            .images
            .iter()
            .max_by_key(|image| image.width.unwrap_or(0))
            .map(|image| image.url.clone());

        TrackMetadata {
            title: self.name.to_string(),
            artist,
            album: self.album.name.to_string(),
            duration_ms: self.duration_ms,
            cover_url,
            source_id: self.id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_track_document() {
        let json = r#"{
            "id": "6rqhFgbbKwnb9MLmUQDhG6",
            "name": "Breathe",
            "artists": [{"name": "Pink Floyd"}, {"name": "Roger Waters"}],
            "album": {
                "name": "The Dark Side of the Moon",
                "images": [
                    {"url": "https://i.scdn.co/image/large", "width": 640},
                    {"url": "https://i.scdn.co/image/small", "width": 64}
                ]
            },
            "duration_ms": 169534
        }"#;

        let track: Track = serde_json::from_str(json).unwrap();
        let metadata = track.metadata();

        assert_eq!(metadata.title, "Breathe");
        assert_eq!(metadata.artist, "Pink Floyd, Roger Waters");
        assert_eq!(metadata.album, "The Dark Side of the Moon");
        assert_eq!(metadata.duration_ms, 169_534);
        assert_eq!(
            metadata.cover_url.as_deref(),
            Some("https://i.scdn.co/image/large")
        );
        assert_eq!(metadata.source_id, "6rqhFgbbKwnb9MLmUQDhG6");
    }

    #[test]
    fn sparse_track_degrades_to_placeholders() {
        let track: Track = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        let metadata = track.metadata();

        assert_eq!(metadata.title, "Unknown");
        assert_eq!(metadata.artist, "Unknown");
        assert_eq!(metadata.album, "Unknown");
        assert_eq!(metadata.duration_ms, 0);
        assert_eq!(metadata.cover_url, None);
    }

    #[test]
    fn playlist_page_with_missing_tracks() {
        let json = r#"{
            "items": [
                {"track": {"id": "a", "name": "One"}},
                {"track": null},
                {"track": {"id": "b", "name": "Two"}}
            ],
            "next": null
        }"#;

        let page: PlaylistPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(page.next.is_none());

        let present: Vec<_> = page
            .items
            .iter()
            .filter_map(|item| item.track.as_ref())
            .collect();
        assert_eq!(present.len(), 2);
        assert_eq!(*present[0].name, "One");
    }

    #[test]
    fn playlist_page_with_next_url() {
        let json = r#"{"items": [], "next": "https://api.spotify.com/v1/playlists/p/tracks?offset=100"}"#;
        let page: PlaylistPage = serde_json::from_str(json).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next.is_some());
    }
}
