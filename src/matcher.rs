//! Candidate selection against YouTube search results.
//!
//! The policy is deliberately simple: trust YouTube's native relevance
//! ranking, but filter out titles that advertise an alternate rendition
//! (live cuts, remixes, covers, ...). When the filter would throw away
//! every candidate, fall back to the unfiltered list — a questionable
//! result beats no result when the search did find something.
//!
//! [`similarity`] and [`duration_match`] are available for a stricter
//! selection policy but are not consulted by [`select_candidate`].

use crate::{
    error::Result,
    protocol::{youtube::SearchCandidate, TrackMetadata},
    youtube::CandidateSource,
};

/// How many search results to consider per track.
pub const SEARCH_LIMIT: usize = 5;

/// Titles containing any of these (case-insensitive) name a rendition
/// other than the studio recording.
const EXCLUDE_KEYWORDS: [&str; 6] = ["live", "remix", "cover", "instrumental", "karaoke", "lyrics"];

/// Default tolerance for [`duration_match`]: 10% of the expected length.
pub const DURATION_TOLERANCE: f64 = 0.10;

/// Finds the best-matching candidate for the given canonical metadata.
///
/// Builds the query as `"<artist> - <title>"`, fetches up to
/// [`SEARCH_LIMIT`] results and applies [`select_candidate`]. Returns
/// `Ok(None)` only when the search yields no results at all.
pub async fn best_match(
    source: &dyn CandidateSource,
    metadata: &TrackMetadata,
) -> Result<Option<SearchCandidate>> {
    let query = format!("{} - {}", metadata.artist, metadata.title);
    let candidates = source.search(&query, SEARCH_LIMIT).await?;

    let chosen = select_candidate(candidates);
    if let Some(ref candidate) = chosen {
        debug!("matched {metadata} to {} ({})", candidate.title, candidate.url);
    }

    Ok(chosen)
}

/// Selects a candidate from a relevance-ordered list.
///
/// Candidates whose title contains an exclusion keyword are dropped;
/// when that removes every candidate, the unfiltered list is used
/// instead. The first remaining candidate wins. `None` only for an
/// empty input.
#[must_use]
pub fn select_candidate(candidates: Vec<SearchCandidate>) -> Option<SearchCandidate> {
    let mut filtered: Vec<&SearchCandidate> = candidates
        .iter()
        .filter(|candidate| {
            let title = candidate.title.to_lowercase();
            !EXCLUDE_KEYWORDS.iter().any(|keyword| title.contains(keyword))
        })
        .collect();

    if filtered.is_empty() {
        filtered = candidates.iter().collect();
    }

    filtered.first().map(|candidate| (*candidate).clone())
}

/// Normalized similarity between two strings, in `[0, 1]`.
///
/// Case-insensitive ratio of the longest common subsequence to the
/// combined length: `2·lcs / (|a| + |b|)`. Equal strings score 1.0,
/// disjoint ones 0.0.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Two-row LCS table; inputs are short (titles), so O(n·m) is fine.
    let mut previous = vec![0_usize; b.len() + 1];
    let mut current = vec![0_usize; b.len() + 1];

    for &char_a in &a {
        for (j, &char_b) in b.iter().enumerate() {
            current[j + 1] = if char_a == char_b {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    let lcs = previous[b.len()];

    #[expect(clippy::cast_precision_loss)]
    let ratio = (2 * lcs) as f64 / (a.len() + b.len()) as f64;
    ratio
}

/// Whether a candidate's duration is close enough to the expected one.
///
/// Accepts when `|expected − candidate| ≤ tolerance × expected`, with
/// both durations compared in seconds.
#[must_use]
pub fn duration_match(expected_ms: u64, candidate_secs: u64, tolerance: f64) -> bool {
    #[expect(clippy::cast_precision_loss)]
    let expected_secs = expected_ms as f64 / 1000.0;
    #[expect(clippy::cast_precision_loss)]
    let difference = (expected_secs - candidate_secs as f64).abs();

    difference <= expected_secs * tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str) -> SearchCandidate {
        SearchCandidate::from_video_id("aaaaaaaaaaa", title, 180)
    }

    #[test]
    fn excluded_renditions_are_skipped() {
        let chosen = select_candidate(vec![
            candidate("Song (Live)"),
            candidate("Song (Remix)"),
            candidate("Song"),
        ]);
        assert_eq!(chosen.unwrap().title, "Song");
    }

    #[test]
    fn exclusion_is_case_insensitive() {
        let chosen = select_candidate(vec![
            candidate("Song LIVE at Wembley"),
            candidate("Song (Official Audio)"),
        ]);
        assert_eq!(chosen.unwrap().title, "Song (Official Audio)");
    }

    #[test]
    fn falls_back_to_unfiltered_list() {
        let chosen = select_candidate(vec![
            candidate("Song (Live)"),
            candidate("Song (Karaoke)"),
        ]);
        // All candidates excluded: the first of the original list wins,
        // never None.
        assert_eq!(chosen.unwrap().title, "Song (Live)");
    }

    #[test]
    fn empty_input_yields_none() {
        assert_eq!(select_candidate(Vec::new()), None);
    }

    #[test]
    fn first_remaining_candidate_wins() {
        let chosen = select_candidate(vec![
            candidate("Song (Official Video)"),
            candidate("Song (Audio)"),
        ]);
        assert_eq!(chosen.unwrap().title, "Song (Official Video)");
    }

    #[test]
    fn similarity_bounds() {
        assert!((similarity("hello", "hello") - 1.0).abs() < f64::EPSILON);
        assert!(similarity("hello", "world") < 0.5);

        let close = similarity("hello", "hallo");
        assert!(close > 0.5 && close < 1.0);
    }

    #[test]
    fn similarity_ignores_case() {
        assert!((similarity("Hello", "hELLO") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn similarity_empty_inputs() {
        assert!((similarity("", "") - 1.0).abs() < f64::EPSILON);
        assert!(similarity("a", "") < f64::EPSILON);
    }

    #[test]
    fn duration_tolerance_window() {
        assert!(duration_match(180_000, 180, 0.1));
        assert!(duration_match(180_000, 190, 0.1));
        assert!(duration_match(180_000, 198, 0.1));
        assert!(!duration_match(180_000, 200, 0.1));
        assert!(!duration_match(180_000, 160, 0.1));
    }
}
