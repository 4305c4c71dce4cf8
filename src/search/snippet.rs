//! Snippet extraction for search results.

use std::sync::OnceLock;

use regex::Regex;

/// Target snippet width in bytes, before the `"..."` affixes.
const SNIPPET_WINDOW: usize = 150;

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid link pattern"))
}

/// Strips common markdown decoration so snippets read as plain text:
/// heading markers, bold/italic markers, inline code ticks, and link syntax
/// (reduced to the link text).
pub(crate) fn strip_markdown(text: &str) -> String {
    let without_links = link_pattern().replace_all(text, "$1");

    let mut stripped = String::with_capacity(without_links.len());
    for line in without_links.lines() {
        let line = line.trim_start_matches('#').trim_start();
        for ch in line.chars() {
            if !matches!(ch, '*' | '_' | '`') {
                stripped.push(ch);
            }
        }
        stripped.push('\n');
    }
    stripped.trim_end().to_string()
}

/// Builds a ~150-character window centered on the first query word found in
/// `text` (case-insensitive, words tried in query order), with `"..."`
/// affixes when the window does not reach the text's edges.
pub(crate) fn build_snippet(text: &str, query_words: &[String]) -> String {
    let lower = text.to_lowercase();
    let center = query_words
        .iter()
        .filter(|word| !word.is_empty())
        .find_map(|word| lower.find(&word.to_lowercase()))
        .unwrap_or(0);

    let mut start = center.saturating_sub(SNIPPET_WINDOW / 2).min(text.len());
    let mut end = (start + SNIPPET_WINDOW).min(text.len());
    // Case mapping can shift byte offsets; clamp to character boundaries
    // of the original text.
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str("...");
    }
    snippet.push_str(&text[start..end]);
    if end < text.len() {
        snippet.push_str("...");
    }
    snippet
}

#[cfg(test)]
mod tests {
    use crate::search::snippet::{build_snippet, strip_markdown};

    #[test]
    fn test_strip_markdown_decoration() {
        let text = "## The **Iron** Keep\nSee [the map](maps/keep.png) and `notes`.";
        assert_eq!(
            strip_markdown(text),
            "The Iron Keep\nSee the map and notes."
        );
    }

    #[test]
    fn test_snippet_at_start_has_no_prefix() {
        let text = "Bandits ambush the caravan at dawn.";
        let snippet = build_snippet(text, &["bandits".to_string()]);
        assert_eq!(snippet, text);
    }

    #[test]
    fn test_snippet_in_the_middle_is_clipped_both_sides() {
        let filler = "word ".repeat(60);
        let text = format!("{filler}treasure{filler}");
        let snippet = build_snippet(&text, &["treasure".to_string()]);

        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("treasure"));
        assert!(snippet.len() <= 150 + 6);
    }

    #[test]
    fn test_snippet_without_match_starts_at_beginning() {
        let text = "short plan text";
        let snippet = build_snippet(text, &["missing".to_string()]);
        assert_eq!(snippet, text);
    }
}
