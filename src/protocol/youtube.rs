//! Models and extractors for scraped YouTube pages.
//!
//! YouTube has no key-free search API, but its result, watch and
//! playlist pages all embed their data as JSON blobs in `<script>` tags
//! (`ytInitialData`, `ytInitialPlayerResponse`). The extractors here
//! navigate those blobs with `serde_json::Value` pointers and simply
//! skip anything that does not have the expected shape.

use serde::{Deserialize, Serialize};

use super::{StringOrUnknown, TrackMetadata};

/// A search result considered as a playable substitute for canonical
/// metadata. Ephemeral, produced per search, never persisted.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    /// 11-character video ID.
    pub id: String,

    pub title: String,

    /// Full watch URL, ready to hand to the fetch collaborator.
    pub url: String,

    pub duration_secs: u64,
}

impl SearchCandidate {
    /// Builds a candidate directly from a video ID, for inputs that were
    /// already a direct video link and skip the search step.
    #[must_use]
    pub fn from_video_id(id: &str, title: &str, duration_secs: u64) -> Self {
        Self {
            id: id.to_owned(),
            title: title.to_owned(),
            url: watch_url(id),
            duration_secs,
        }
    }
}

/// Canonical watch URL for a video ID.
#[must_use]
pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Extracts an embedded JSON blob from a page, given the variable name
/// that introduces it (`ytInitialData` or `ytInitialPlayerResponse`).
///
/// Returns `None` when the marker is missing or the blob does not parse;
/// the caller decides whether that is a retrieval fault.
#[must_use]
pub fn embedded_json(html: &str, variable: &str) -> Option<serde_json::Value> {
    let marker = format!("var {variable} = ");
    let start = html.find(&marker)? + marker.len();
    let end = start + html[start..].find(";</script>")?;

    serde_json::from_str(&html[start..end]).ok()
}

/// Pulls search result candidates out of a results-page `ytInitialData`
/// blob, preserving YouTube's own relevance order, capped at `limit`.
///
/// Entries that are not plain videos (shelves, ads, channels) are
/// skipped without complaint.
#[must_use]
pub fn search_candidates(data: &serde_json::Value, limit: usize) -> Vec<SearchCandidate> {
    let mut candidates = Vec::new();

    let sections = data
        .pointer("/contents/twoColumnSearchResultsRenderer/primaryContents/sectionListRenderer/contents")
        .and_then(|value| value.as_array());

    for section in sections.into_iter().flatten() {
        let items = section
            .pointer("/itemSectionRenderer/contents")
            .and_then(|value| value.as_array());

        for item in items.into_iter().flatten() {
            if candidates.len() >= limit {
                return candidates;
            }

            let Some(video) = item.get("videoRenderer") else {
                continue;
            };
            let Some(id) = video.get("videoId").and_then(|value| value.as_str()) else {
                continue;
            };

            let title = video
                .pointer("/title/runs/0/text")
                .and_then(|value| value.as_str())
                .map_or_else(|| StringOrUnknown::default().0, ToOwned::to_owned);

            let duration_secs = video
                .pointer("/lengthText/simpleText")
                .and_then(|value| value.as_str())
                .map_or(0, parse_duration_text);

            candidates.push(SearchCandidate::from_video_id(id, &title, duration_secs));
        }
    }

    candidates
}

/// Pulls the flat video list out of a playlist-page `ytInitialData` blob.
#[must_use]
pub fn playlist_videos(data: &serde_json::Value) -> Vec<SearchCandidate> {
    let mut videos = Vec::new();

    let entries = data
        .pointer(concat!(
            "/contents/twoColumnBrowseResultsRenderer/tabs/0/tabRenderer/content",
            "/sectionListRenderer/contents/0/itemSectionRenderer/contents/0",
            "/playlistVideoListRenderer/contents"
        ))
        .and_then(|value| value.as_array());

    for entry in entries.into_iter().flatten() {
        let Some(video) = entry.get("playlistVideoRenderer") else {
            continue;
        };
        let Some(id) = video.get("videoId").and_then(|value| value.as_str()) else {
            continue;
        };

        let title = video
            .pointer("/title/runs/0/text")
            .and_then(|value| value.as_str())
            .map_or_else(|| StringOrUnknown::default().0, ToOwned::to_owned);

        let duration_secs = video
            .get("lengthSeconds")
            .and_then(|value| value.as_str())
            .and_then(|text| text.parse().ok())
            .unwrap_or(0);

        videos.push(SearchCandidate::from_video_id(id, &title, duration_secs));
    }

    videos
}

/// Builds track metadata from a watch-page `ytInitialPlayerResponse`.
///
/// The video title is split into artist and song name on the common
/// `"Artist - Song"` delimiters; the uploader stands in for the album.
/// Returns `None` when the blob carries no video details at all.
#[must_use]
pub fn video_metadata(player_response: &serde_json::Value) -> Option<TrackMetadata> {
    let details = player_response.get("videoDetails")?;
    let id = details.get("videoId").and_then(|value| value.as_str())?;

    let raw_title = details
        .get("title")
        .and_then(|value| value.as_str())
        .unwrap_or_default();
    let (artist, title) = split_title(raw_title);

    let album = details
        .get("author")
        .and_then(|value| value.as_str())
        .map_or_else(|| String::from("YouTube"), ToOwned::to_owned);

    let duration_ms = details
        .get("lengthSeconds")
        .and_then(|value| value.as_str())
        .and_then(|text| text.parse::<u64>().ok())
        .unwrap_or(0)
        * 1000;

    // The thumbnail list is ordered smallest first.
    let cover_url = details
        .pointer("/thumbnail/thumbnails")
        .and_then(|value| value.as_array())
        .and_then(|thumbnails| thumbnails.last())
        .and_then(|thumbnail| thumbnail.get("url"))
        .and_then(|value| value.as_str())
        .map(ToOwned::to_owned);

    Some(TrackMetadata {
        title,
        artist,
        album,
        duration_ms,
        cover_url,
        source_id: id.to_owned(),
    })
}

/// Splits a video title into `(artist, song)` on common delimiters.
///
/// Falls back to `("Unknown Artist", whole title)` when none match.
#[must_use]
pub fn split_title(title: &str) -> (String, String) {
    for delimiter in [" - ", " \u{2013} ", ": ", " : "] {
        if let Some((artist, song)) = title.split_once(delimiter) {
            return (artist.trim().to_owned(), song.trim().to_owned());
        }
    }

    (String::from("Unknown Artist"), title.trim().to_owned())
}

/// Parses a `"H:MM:SS"` or `"M:SS"` duration label into seconds.
///
/// Unparsable labels yield 0, which downstream duration checks treat as
/// "no duration known".
#[must_use]
pub fn parse_duration_text(text: &str) -> u64 {
    text.split(':')
        .try_fold(0_u64, |total, part| {
            part.trim().parse::<u64>().ok().map(|n| total * 60 + n)
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn duration_labels() {
        assert_eq!(parse_duration_text("3:33"), 213);
        assert_eq!(parse_duration_text("1:02:03"), 3723);
        assert_eq!(parse_duration_text("45"), 45);
        assert_eq!(parse_duration_text("n/a"), 0);
    }

    #[test]
    fn title_splitting() {
        assert_eq!(
            split_title("Pink Floyd - Breathe"),
            ("Pink Floyd".to_owned(), "Breathe".to_owned())
        );
        assert_eq!(
            split_title("Breathe (Official Audio)"),
            ("Unknown Artist".to_owned(), "Breathe (Official Audio)".to_owned())
        );
    }

    #[test]
    fn embedded_blob_extraction() {
        let html = r#"<script>var ytInitialData = {"ok": true};</script>"#;
        let data = embedded_json(html, "ytInitialData").unwrap();
        assert_eq!(data["ok"], json!(true));

        assert!(embedded_json("<html></html>", "ytInitialData").is_none());
        assert!(embedded_json("var ytInitialData = {broken", "ytInitialData").is_none());
    }

    fn results_page(titles: &[&str]) -> serde_json::Value {
        let items: Vec<_> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                json!({
                    "videoRenderer": {
                        "videoId": format!("video{i:06}"),
                        "title": {"runs": [{"text": title}]},
                        "lengthText": {"simpleText": "3:00"}
                    }
                })
            })
            .collect();

        json!({
            "contents": {
                "twoColumnSearchResultsRenderer": {
                    "primaryContents": {
                        "sectionListRenderer": {
                            "contents": [{"itemSectionRenderer": {"contents": items}}]
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn search_results_in_page_order() {
        let data = results_page(&["First", "Second", "Third"]);
        let candidates = search_candidates(&data, 5);

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].title, "First");
        assert_eq!(candidates[0].id, "video000000");
        assert_eq!(candidates[0].url, "https://www.youtube.com/watch?v=video000000");
        assert_eq!(candidates[0].duration_secs, 180);
    }

    #[test]
    fn search_results_capped() {
        let data = results_page(&["a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(search_candidates(&data, 5).len(), 5);
    }

    #[test]
    fn non_video_items_are_skipped() {
        let data = json!({
            "contents": {
                "twoColumnSearchResultsRenderer": {
                    "primaryContents": {
                        "sectionListRenderer": {
                            "contents": [{
                                "itemSectionRenderer": {
                                    "contents": [
                                        {"adSlotRenderer": {}},
                                        {"videoRenderer": {
                                            "videoId": "dQw4w9WgXcQ",
                                            "title": {"runs": [{"text": "Song"}]}
                                        }}
                                    ]
                                }
                            }]
                        }
                    }
                }
            }
        });

        let candidates = search_candidates(&data, 5);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "dQw4w9WgXcQ");
        // No length label on this one.
        assert_eq!(candidates[0].duration_secs, 0);
    }

    #[test]
    fn watch_page_metadata() {
        let player = json!({
            "videoDetails": {
                "videoId": "dQw4w9WgXcQ",
                "title": "Rick Astley - Never Gonna Give You Up",
                "author": "Rick Astley",
                "lengthSeconds": "213",
                "thumbnail": {"thumbnails": [
                    {"url": "https://i.ytimg.com/small.jpg"},
                    {"url": "https://i.ytimg.com/large.jpg"}
                ]}
            }
        });

        let metadata = video_metadata(&player).unwrap();
        assert_eq!(metadata.artist, "Rick Astley");
        assert_eq!(metadata.title, "Never Gonna Give You Up");
        assert_eq!(metadata.album, "Rick Astley");
        assert_eq!(metadata.duration_ms, 213_000);
        assert_eq!(
            metadata.cover_url.as_deref(),
            Some("https://i.ytimg.com/large.jpg")
        );
        assert_eq!(metadata.source_id, "dQw4w9WgXcQ");
    }

    #[test]
    fn watch_page_without_details() {
        assert!(video_metadata(&json!({"playabilityStatus": {}})).is_none());
    }

    #[test]
    fn playlist_page_videos() {
        let data = json!({
            "contents": {
                "twoColumnBrowseResultsRenderer": {
                    "tabs": [{
                        "tabRenderer": {
                            "content": {
                                "sectionListRenderer": {
                                    "contents": [{
                                        "itemSectionRenderer": {
                                            "contents": [{
                                                "playlistVideoListRenderer": {
                                                    "contents": [
                                                        {"playlistVideoRenderer": {
                                                            "videoId": "aaaaaaaaaaa",
                                                            "title": {"runs": [{"text": "One"}]},
                                                            "lengthSeconds": "100"
                                                        }},
                                                        {"continuationItemRenderer": {}},
                                                        {"playlistVideoRenderer": {
                                                            "videoId": "bbbbbbbbbbb",
                                                            "title": {"runs": [{"text": "Two"}]},
                                                            "lengthSeconds": "200"
                                                        }}
                                                    ]
                                                }
                                            }]
                                        }
                                    }]
                                }
                            }
                        }
                    }]
                }
            }
        });

        let videos = playlist_videos(&data);
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].title, "One");
        assert_eq!(videos[1].duration_secs, 200);
    }
}
