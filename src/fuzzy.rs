//! Fuzzy playlist filtering.
//!
//! A lightweight subsequence scorer used to filter playlists by name as the
//! GM types. Scores are tiered so that match quality is strictly ordered:
//! exact equality beats a prefix match, which beats a substring match, which
//! beats a scattered subsequence match. A score of zero means "no match"
//! and is used as the filter threshold.

use std::cmp::Ordering;

use crate::session::Playlist;

const EXACT_SCORE: f64 = 500.0;
const PREFIX_BASE: f64 = 300.0;
const SUBSTRING_BASE: f64 = 200.0;
const SUBSEQUENCE_RATIO_WEIGHT: f64 = 100.0;
const SUBSEQUENCE_RUN_WEIGHT: f64 = 100.0;

/// Scores how well `query` matches `text`, case-insensitively.
///
/// Returns 0.0 when the query's characters cannot all be found as an
/// in-order subsequence of the text (or when either side is empty).
/// Non-zero scores satisfy: exact equality > prefix > substring >
/// subsequence; among subsequence matches, a higher matched-to-text-length
/// ratio and longer runs of consecutive matched characters score higher.
#[must_use]
pub fn score(text: &str, query: &str) -> f64 {
    let text = text.to_lowercase();
    let query = query.to_lowercase();
    if query.is_empty() || text.is_empty() {
        return 0.0;
    }

    if text == query {
        return EXACT_SCORE;
    }

    let text_len = text.chars().count();
    let query_len = query.chars().count();
    let ratio = (query_len as f64 / text_len as f64).min(1.0);

    if text.starts_with(&query) {
        return PREFIX_BASE + SUBSEQUENCE_RATIO_WEIGHT * ratio;
    }
    if text.contains(&query) {
        return SUBSTRING_BASE + SUBSEQUENCE_RATIO_WEIGHT * ratio;
    }

    // Greedy in-order subsequence walk, tracking the longest run of
    // consecutively matched text characters.
    let mut query_chars = query.chars().peekable();
    let mut matched = 0usize;
    let mut longest_run = 0usize;
    let mut current_run = 0usize;
    for ch in text.chars() {
        match query_chars.peek() {
            Some(&next) if next == ch => {
                query_chars.next();
                matched += 1;
                current_run += 1;
                longest_run = longest_run.max(current_run);
            }
            Some(_) => current_run = 0,
            None => break,
        }
    }
    if matched < query_len {
        return 0.0;
    }

    // A full consecutive run would have been caught by the substring case,
    // so this stays strictly below SUBSTRING_BASE.
    let run_ratio = longest_run as f64 / query_len as f64;
    SUBSEQUENCE_RATIO_WEIGHT * ratio + SUBSEQUENCE_RUN_WEIGHT * run_ratio.min(0.99)
}

/// Filters playlists by name against `query`.
///
/// Returns the playlists with a nonzero [`score`], sorted descending by
/// score; the sort is stable, so equal scores keep their original order.
/// A blank query returns the input unchanged.
#[must_use]
pub fn filter_playlists(playlists: &[Playlist], query: &str) -> Vec<Playlist> {
    if query.trim().is_empty() {
        return playlists.to_vec();
    }

    let mut scored: Vec<(f64, &Playlist)> = playlists
        .iter()
        .filter_map(|playlist| {
            let value = score(&playlist.name, query);
            (value > 0.0).then_some((value, playlist))
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.into_iter().map(|(_, playlist)| playlist.clone()).collect()
}
