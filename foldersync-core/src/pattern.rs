//! Shell-style glob matching against file base names.

use globset::{Glob, GlobMatcher};
use tracing::warn;

/// Test `base_name` against `pattern`. A malformed pattern never matches.
pub fn matches(base_name: &str, pattern: &str) -> bool {
    FilePattern::new(pattern).is_match(base_name)
}

/// A glob compiled once at registration time.
#[derive(Clone, Debug)]
pub struct FilePattern {
    raw: String,
    matcher: Option<GlobMatcher>,
}

impl FilePattern {
    pub fn new(pattern: &str) -> Self {
        let matcher = match Glob::new(pattern) {
            Ok(glob) => Some(glob.compile_matcher()),
            Err(err) => {
                warn!(
                    target: "foldersync::pattern",
                    pattern,
                    error = %err,
                    "malformed file pattern; it will never match"
                );
                None
            }
        };

        Self {
            raw: pattern.to_string(),
            matcher,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_valid(&self) -> bool {
        self.matcher.is_some()
    }

    pub fn is_match(&self, base_name: &str) -> bool {
        self.matcher
            .as_ref()
            .is_some_and(|matcher| matcher.is_match(base_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_and_question_mark() {
        assert!(matches("a.json", "*.json"));
        assert!(!matches("a.txt", "*.json"));
        assert!(matches("r1.csv", "r?.csv"));
        assert!(!matches("r10.csv", "r?.csv"));
    }

    #[test]
    fn character_classes() {
        assert!(matches("log-3.txt", "log-[0-9].txt"));
        assert!(!matches("log-x.txt", "log-[0-9].txt"));
        assert!(matches("log-x.txt", "log-[!0-9].txt"));
    }

    #[test]
    fn malformed_pattern_never_matches() {
        let pattern = FilePattern::new("[unterminated");
        assert!(!pattern.is_valid());
        assert!(!pattern.is_match("[unterminated"));
        assert!(!matches("anything", "[unterminated"));
    }

    #[test]
    fn keeps_raw_text() {
        assert_eq!(FilePattern::new("*.json").as_str(), "*.json");
    }
}
