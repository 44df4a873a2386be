//! Wire models and shared value objects.
//!
//! * [`spotify`] — serde models for the Spotify Web API documents
//! * [`youtube`] — models and extractors for scraped YouTube pages
//!
//! Documents from either platform are allowed to be sloppy: optional
//! fields degrade to an explicit `"Unknown"` placeholder instead of
//! failing deserialization, so the pipeline only faults when a response
//! is not recognizable at all.

pub mod spotify;
pub mod youtube;

use std::{fmt, ops::Deref};

use serde::{Deserialize, Serialize};

/// String value that falls back to `"Unknown"` when absent.
///
/// Used for API fields the pipeline must tolerate missing, keeping the
/// placeholder policy in one place.
///
/// Derefs to `String` for convenient access to string methods.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, Debug, Hash)]
pub struct StringOrUnknown(pub String);

impl Default for StringOrUnknown {
    fn default() -> Self {
        Self(String::from("Unknown"))
    }
}

impl Deref for StringOrUnknown {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for StringOrUnknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical track attributes as reported by the originating platform.
///
/// Immutable value object produced by the metadata resolver, or by the
/// YouTube extractor when the input was already a direct video link.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,

    /// All contributing artists, joined with `", "` in listed order.
    pub artist: String,

    pub album: String,

    pub duration_ms: u64,

    /// Highest-resolution cover image available, if any.
    pub cover_url: Option<String>,

    /// Track ID on the originating platform.
    pub source_id: String,
}

impl fmt::Display for TrackMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{} - {}\"", self.artist, self.title)
    }
}
