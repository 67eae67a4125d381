//! Citation count extraction from rendered page text.

use crate::error::{CitationError, OptionExt, Result};
use regex::Regex;

/// Finds the first "Cited by N" style count in page text.
#[derive(Debug, Clone)]
pub struct CitationExtractor {
    pattern: Regex,
}

impl CitationExtractor {
    /// Build an extractor from a regex whose first capture group is the count.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| CitationError::Parse(e.to_string()))?;
        if pattern.captures_len() < 2 {
            return Err(CitationError::Config(format!(
                "citation pattern '{}' has no capture group",
                pattern.as_str()
            )));
        }
        Ok(Self { pattern })
    }

    /// Extract the citation count.
    ///
    /// Returns `Ok(None)` when the page has no citation line; that is the
    /// normal outcome for uncited or unindexed papers. Only a count that is
    /// not a representable integer is an error.
    pub fn extract(&self, page_text: &str) -> Result<Option<u64>> {
        let Some(caps) = self.pattern.captures(page_text) else {
            return Ok(None);
        };
        let digits = caps.get(1).ok_or_parse("citation pattern matched without a count")?;
        digits
            .as_str()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| CitationError::Parse(format!("invalid citation count '{}': {}", digits.as_str(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> CitationExtractor {
        CitationExtractor::new(r"Cited by (\d+)").expect("valid pattern")
    }

    #[test]
    fn test_extracts_first_count() -> Result<()> {
        let text = "Attention is all you need\nA Vaswani - 2017\nCited by 120345 Related articles\nCited by 7";
        assert_eq!(extractor().extract(text)?, Some(120345));
        Ok(())
    }

    #[test]
    fn test_absent_count_is_not_an_error() -> Result<()> {
        assert_eq!(extractor().extract("Related articles All 3 versions")?, None);
        assert_eq!(extractor().extract("")?, None);
        Ok(())
    }

    #[test]
    fn test_overflowing_count_is_parse_error() {
        let err = extractor()
            .extract("Cited by 99999999999999999999999")
            .expect_err("should overflow");
        assert!(matches!(err, CitationError::Parse(_)));
    }

    #[test]
    fn test_pattern_without_group_rejected() {
        assert!(CitationExtractor::new(r"Cited by \d+").is_err());
    }
}
