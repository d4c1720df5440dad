//! Ignore filtering by source path.

use backhaul_core::{ConfigError, Item};
use regex::Regex;

/// Marks every item whose source path matches a regular expression as ignored.
///
/// The pattern is unanchored: it matches anywhere in the path.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    pattern: Regex,
}

impl IgnoreFilter {
    /// Compile an ignore pattern.
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        Regex::new(pattern)
            .map(Self::from)
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// Check if the item should be ignored.
    pub fn is_match(&self, item: &Item) -> bool {
        self.pattern.is_match(item.source_path())
    }

    /// The pattern source text.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

impl From<Regex> for IgnoreFilter {
    fn from(pattern: Regex) -> Self {
        Self { pattern }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_anywhere_in_path() {
        let filter = IgnoreFilter::new("B").unwrap();
        assert!(filter.is_match(&Item::folder("/root/B")));
        assert!(filter.is_match(&Item::file("/root/B/y.txt")));
        assert!(!filter.is_match(&Item::file("/root/A/x.txt")));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = IgnoreFilter::new("(unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }
}
