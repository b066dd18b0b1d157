//! Subject noun-phrase extraction from question text.
//!
//! "What is the hair color?" -> "hair color", "What are the eyes like?" -> "eyes".

use std::sync::LazyLock;

use regex::Regex;

/// Question shapes that carry a subject, tried in order.
static SUBJECT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^\s*what\s+(?:is|are)\s+(?:the\s+)?(?P<subject>.+?)\s+like\s*\??\s*$",
        r"(?i)^\s*what\s+(?:is|are)\s+(?:the\s+)?(?P<subject>.+?)\s*\??\s*$",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Extract the subject of a "What is/are (the) X (like)?" question, lower-cased.
pub fn extract_subject(question: &str) -> Option<String> {
    SUBJECT_PATTERNS.iter().find_map(|re| {
        re.captures(question)
            .and_then(|caps| caps.name("subject"))
            .map(|m| m.as_str().trim().to_lowercase())
            .filter(|s| !s.is_empty())
    })
}
