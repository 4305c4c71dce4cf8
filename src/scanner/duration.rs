//! Best-effort duration hints from plan text.
//!
//! GMs often note how long a part is expected to run somewhere in the plan
//! document. This extractor recovers that hint so the host can seed a
//! session timer. Matching is line-wise with a fixed priority: a labelled
//! explicit range beats a labelled single value, which beats any bare
//! minutes mention anywhere in the text. Non-matching text yields `None`.

use regex::Regex;

/// Configuration for duration-hint extraction.
///
/// The label words are a locale configuration point, not hardcoded
/// behavior; hosts targeting another language supply their own list.
#[derive(Debug, Clone)]
pub struct DurationHintConfig {
    /// Words that mark a line as talking about expected duration
    /// (lowercase).
    pub label_words: Vec<String>,
}

impl Default for DurationHintConfig {
    fn default() -> Self {
        Self {
            label_words: ["duration", "length", "time"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// An expected-duration hint in minutes.
///
/// A single mention yields `min_minutes == max_minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationHint {
    /// Lower bound in minutes.
    pub min_minutes: u32,
    /// Upper bound in minutes.
    pub max_minutes: u32,
}

/// Extracts an expected-duration hint from plan content.
///
/// Returns `None` when nothing in the text mentions minutes.
#[must_use]
pub fn extract_duration_hint(content: &str, config: &DurationHintConfig) -> Option<DurationHint> {
    let range_pattern = Regex::new(r"(?i)(\d+)\s*(?:-|–|to)\s*(\d+)\s*min").expect("valid pattern");
    let single_pattern = Regex::new(r"(?i)(\d+)\s*min").expect("valid pattern");

    let labelled_lines: Vec<&str> = content
        .lines()
        .filter(|line| {
            let lowered = line.to_lowercase();
            config.label_words.iter().any(|word| lowered.contains(word))
        })
        .collect();

    for line in &labelled_lines {
        if let Some(captures) = range_pattern.captures(line) {
            let low: u32 = captures[1].parse().ok()?;
            let high: u32 = captures[2].parse().ok()?;
            return Some(DurationHint {
                min_minutes: low.min(high),
                max_minutes: low.max(high),
            });
        }
    }

    for line in &labelled_lines {
        if let Some(captures) = single_pattern.captures(line) {
            let minutes: u32 = captures[1].parse().ok()?;
            return Some(DurationHint {
                min_minutes: minutes,
                max_minutes: minutes,
            });
        }
    }

    single_pattern.captures(content).and_then(|captures| {
        let minutes: u32 = captures[1].parse().ok()?;
        Some(DurationHint {
            min_minutes: minutes,
            max_minutes: minutes,
        })
    })
}

#[cfg(test)]
mod tests {
    use crate::scanner::duration::{DurationHint, DurationHintConfig, extract_duration_hint};

    fn hint(content: &str) -> Option<DurationHint> {
        extract_duration_hint(content, &DurationHintConfig::default())
    }

    #[test]
    fn test_labelled_range_wins() {
        let content = "Warm-up: 5 min\nExpected duration: 30-45 minutes\n";
        assert_eq!(
            hint(content),
            Some(DurationHint {
                min_minutes: 30,
                max_minutes: 45,
            })
        );
    }

    #[test]
    fn test_labelled_single_value_beats_bare_mention() {
        let content = "The chase lasts 10 minutes.\nLength: 90 min\n";
        assert_eq!(
            hint(content),
            Some(DurationHint {
                min_minutes: 90,
                max_minutes: 90,
            })
        );
    }

    #[test]
    fn test_bare_mention_is_the_last_resort() {
        let content = "# The Heist\nGive them about 20 minutes to plan.\n";
        assert_eq!(
            hint(content),
            Some(DurationHint {
                min_minutes: 20,
                max_minutes: 20,
            })
        );
    }

    #[test]
    fn test_non_matching_text_yields_none() {
        assert_eq!(hint("No numbers here at all."), None);
        assert_eq!(hint(""), None);
    }

    #[test]
    fn test_custom_label_words() {
        let config = DurationHintConfig {
            label_words: vec!["dauer".to_string()],
        };
        let content = "Dauer: 45-60 min\n";
        assert_eq!(
            extract_duration_hint(content, &config),
            Some(DurationHint {
                min_minutes: 45,
                max_minutes: 60,
            })
        );
    }
}
