//! Keyword rule model for note classification
//!
//! A rule carries one or more keyword groups. A single-group rule matches
//! when any of its keywords appears in the note text; a multi-group rule
//! requires at least one keyword from every group. Matching is
//! case-insensitive substring search, which is what the handwritten operator
//! notes need (abbreviations, Danish/English mixes, missing word boundaries).

/// A single classification rule: keyword groups mapped to a protocol code
///
/// Rules are evaluated in the order they are declared in the table; a later
/// rule writing to the same (participant, instant) key overwrites the earlier
/// fact.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    /// Short rule name, used in logs
    pub category: &'static str,
    /// Keyword groups: all groups must be hit, any keyword hits a group
    pub groups: &'static [&'static [&'static str]],
    /// Protocol code a match produces
    pub code: i64,
}

impl KeywordRule {
    /// Case-insensitive match of this rule against a note text
    pub fn matches(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.groups.iter().all(|group| {
            group
                .iter()
                .any(|keyword| haystack.contains(&keyword.to_lowercase()))
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE: KeywordRule = KeywordRule {
        category: "sleeping",
        groups: &[&["sleep", "bed", "godnat"]],
        code: 1,
    };

    const MULTI: KeywordRule = KeywordRule {
        category: "eating",
        groups: &[&["start", "begin"], &["meal", "food", "breakfast"]],
        code: 2,
    };

    #[test]
    fn test_single_group_any_keyword() {
        assert!(SINGLE.matches("going to BED now"));
        assert!(SINGLE.matches("godnat"));
        assert!(!SINGLE.matches("lights out"));
    }

    #[test]
    fn test_multi_group_needs_every_group() {
        assert!(MULTI.matches("1 start eating breakfast"));
        assert!(!MULTI.matches("start stretching")); // second group missed
        assert!(!MULTI.matches("nice meal")); // first group missed
    }

    #[test]
    fn test_substring_not_word_boundary() {
        // Substring semantics: "bed" inside another word still matches
        assert!(SINGLE.matches("bedside lamp off"));
    }
}
