//! Finding links in chat text.

use regex::Regex;

const URL_PATTERN: &str = r"(?i)\b(?:(?:https?|ftp)://|www\.)[^\s<>]+";
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"', ')', ']'];

/// Extracts link-looking substrings from text.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    pattern: Regex,
}

impl LinkExtractor {
    /// Compiles the link grammar.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(URL_PATTERN)?,
        })
    }

    /// Every link in `text`, in order of appearance, with trailing
    /// punctuation removed.
    pub fn extract<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.pattern
            .find_iter(text)
            .map(|m| m.as_str().trim_end_matches(TRAILING_PUNCTUATION))
            .filter(|link| link.len() > "www.".len())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_schemes_and_www() {
        let extractor = LinkExtractor::new().unwrap();
        let links = extractor.extract(
            "see https://example.org/a?b=1, www.rust-lang.org. and ftp://files.example.net/x!",
        );
        assert_eq!(
            links,
            vec![
                "https://example.org/a?b=1",
                "www.rust-lang.org",
                "ftp://files.example.net/x",
            ]
        );
    }

    #[test]
    fn test_stops_at_brackets_and_ignores_plain_text() {
        let extractor = LinkExtractor::new().unwrap();
        assert_eq!(
            extractor.extract("(<http://example.org/path>)"),
            vec!["http://example.org/path"]
        );
        assert!(extractor.extract("no links here, just www. and http").is_empty());
        assert!(extractor.extract("mailto:me@example.org").is_empty());
    }
}
