//! Free-text sanitization for the generation grammar.

/// Makes arbitrary text safe to embed in `(text:value)` weight syntax.
///
/// Implementations must be pure: same input, same output.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, template: &str, tags: &[String]) -> String;
}

/// Characters with meaning in the weight grammar.
const RESERVED: &[char] = &['(', ')', '[', ']', '{', '}', '<', '>', ':', '|', '\\'];

/// Default sanitizer: drops reserved grammar characters, collapses whitespace,
/// and trims separators from both ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrammarSanitizer;

impl Sanitizer for GrammarSanitizer {
    fn sanitize(&self, template: &str, _tags: &[String]) -> String {
        let stripped: String = template
            .chars()
            .map(|c| if RESERVED.contains(&c) { ' ' } else { c })
            .collect();
        stripped
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .trim_matches(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_weight_syntax_when_sanitizing_then_strips_reserved_characters() {
        let s = GrammarSanitizer.sanitize("(glowing:1.2) [eyes]", &[]);
        assert_eq!(s, "glowing 1.2 eyes");
        assert!(!s.contains(['(', ')', ':']));
    }

    #[test]
    fn given_extra_whitespace_and_commas_when_sanitizing_then_collapses() {
        assert_eq!(
            GrammarSanitizer.sanitize(" , soft   loose waves ,", &[]),
            "soft loose waves"
        );
    }

    #[test]
    fn given_clean_text_when_sanitizing_then_unchanged() {
        assert_eq!(
            GrammarSanitizer.sanitize("cybernetic augmentations", &[]),
            "cybernetic augmentations"
        );
    }
}
