//! Numeric stat extraction from player-character sheets.
//!
//! Character sheets are free-form markdown, so stats are recovered with an
//! ordered list of independent matchers tried in sequence; the first
//! matcher that yields a positive integer wins. The list stays open for
//! extension without restructuring callers.

use regex::Regex;

use crate::session::CharacterStats;

/// One fallback matcher: a pattern plus the capture group holding the
/// numeric value.
struct StatMatcher {
    pattern: Regex,
    group: usize,
}

impl StatMatcher {
    fn new(pattern: &str, group: usize) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("valid stat pattern"),
            group,
        }
    }

    /// Returns the first positive integer this pattern captures anywhere in
    /// the content; anything else is treated as a non-match so the chain
    /// continues.
    fn extract(&self, content: &str) -> Option<u32> {
        self.pattern.captures_iter(content).find_map(|captures| {
            let value: u32 = captures.get(self.group)?.as_str().parse().ok()?;
            (value > 0).then_some(value)
        })
    }
}

/// Extracts max HP and defense score from character sheet text.
pub struct StatExtractor {
    max_hp_chain: Vec<StatMatcher>,
    defense_chain: Vec<StatMatcher>,
}

impl StatExtractor {
    /// Creates an extractor with the built-in fallback chains.
    #[must_use]
    pub fn new() -> Self {
        let max_hp_chain = vec![
            StatMatcher::new(r"(?i)\bhp\s*[:=]?\s*(\d+)", 1),
            StatMatcher::new(r"(?i)\bhit\s*points?\s*[:=]?\s*(\d+)", 1),
            StatMatcher::new(r"(?i)\bmax(?:imum)?\s*hp\s*[:=]?\s*(\d+)", 1),
            // "30/45 HP" style; the max half counts.
            StatMatcher::new(r"(?i)\b\d+\s*/\s*(\d+)\s*hp\b", 1),
            StatMatcher::new(r"(?i)\bsp\s*[:=]?\s*(\d+)", 1),
            StatMatcher::new(r"(?i)\|\s*hp\s*\|\s*(\d+)\s*\|", 1),
            StatMatcher::new(r"(?i)\*\*\s*hp\s*\*\*\s*[:=]?\s*(\d+)", 1),
            StatMatcher::new(r"(?i)\bhealth\s*[:=]?\s*(\d+)", 1),
        ];
        let defense_chain = vec![
            StatMatcher::new(r"(?i)\bac\s*[:=]?\s*(\d+)", 1),
            StatMatcher::new(r"(?i)\barmou?r\s*class\s*[:=]?\s*(\d+)", 1),
            StatMatcher::new(r"(?i)\bdef(?:ense)?\s*[:=]?\s*(\d+)", 1),
            StatMatcher::new(r"(?i)\beac\s*[:=]?\s*(\d+)", 1),
            StatMatcher::new(r"(?i)\bkac\s*[:=]?\s*(\d+)", 1),
            StatMatcher::new(r"(?i)\|\s*ac\s*\|\s*(\d+)\s*\|", 1),
            StatMatcher::new(r"(?i)\*\*\s*ac\s*\*\*\s*[:=]?\s*(\d+)", 1),
            StatMatcher::new(r"(?i)\bdefence\s*[:=]?\s*(\d+)", 1),
        ];
        Self {
            max_hp_chain,
            defense_chain,
        }
    }

    /// Scans sheet content for both stats. Unmatched stats stay `None`.
    #[must_use]
    pub fn extract(&self, content: &str) -> CharacterStats {
        CharacterStats {
            max_hp: first_match(&self.max_hp_chain, content),
            defense_score: first_match(&self.defense_chain, content),
        }
    }
}

impl Default for StatExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn first_match(chain: &[StatMatcher], content: &str) -> Option<u32> {
    chain.iter().find_map(|matcher| matcher.extract(content))
}

#[cfg(test)]
mod tests {
    use crate::scanner::stats::StatExtractor;

    #[test]
    fn test_first_pattern_wins_over_later_ones() {
        let extractor = StatExtractor::new();
        let stats = extractor.extract("Hit Points: 45\nHP: 30\n");
        assert_eq!(stats.max_hp, Some(30));
    }

    #[test]
    fn test_separator_variants() {
        let extractor = StatExtractor::new();
        assert_eq!(extractor.extract("hp=22").max_hp, Some(22));
        assert_eq!(extractor.extract("HP 18").max_hp, Some(18));
        assert_eq!(extractor.extract("Hit Points = 40").max_hp, Some(40));
    }

    #[test]
    fn test_max_half_of_slash_notation() {
        let extractor = StatExtractor::new();
        let stats = extractor.extract("Currently at 12/45 HP after the ambush.");
        assert_eq!(stats.max_hp, Some(45));
    }

    #[test]
    fn test_table_row_and_bold_markers() {
        let extractor = StatExtractor::new();
        assert_eq!(extractor.extract("| HP | 27 |").max_hp, Some(27));
        assert_eq!(extractor.extract("**HP**: 33").max_hp, Some(33));
        assert_eq!(extractor.extract("| AC | 15 |").defense_score, Some(15));
        assert_eq!(extractor.extract("**AC** 17").defense_score, Some(17));
    }

    #[test]
    fn test_defense_fallbacks() {
        let extractor = StatExtractor::new();
        assert_eq!(extractor.extract("AC: 16").defense_score, Some(16));
        assert_eq!(extractor.extract("Armor Class 14").defense_score, Some(14));
        assert_eq!(extractor.extract("Defense: 19").defense_score, Some(19));
        assert_eq!(extractor.extract("EAC: 13").defense_score, Some(13));
        assert_eq!(extractor.extract("Defence = 12").defense_score, Some(12));
    }

    #[test]
    fn test_non_positive_and_missing_values_stay_none() {
        let extractor = StatExtractor::new();
        let stats = extractor.extract("A sheet with no numbers at all.");
        assert_eq!(stats.max_hp, None);
        assert_eq!(stats.defense_score, None);

        // A zero is not an acceptable stat; the chain moves on.
        assert_eq!(extractor.extract("HP: 0\nHealth: 25").max_hp, Some(25));
    }
}
