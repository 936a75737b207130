//! Small text helpers shared by the keyword-based search paths across the
//! record, long-term, short-term, and conversation stores.

/// Lowercase `text` and split on non-alphanumeric boundaries, keeping only
/// tokens longer than `min_len` characters.
#[must_use]
pub fn tokenize(text: &str, min_len: usize) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > min_len)
        .map(str::to_string)
        .collect()
}

/// Whether `haystack` contains any token from `tokens` as a substring.
#[must_use]
pub fn contains_any_token(haystack: &str, tokens: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    tokens.iter().any(|t| haystack.contains(t.as_str()))
}

/// Whether `a` and `b`'s tokenized forms (min length 2) share at least one
/// token.
#[must_use]
pub fn shares_token(a: &str, b: &str, min_len: usize) -> bool {
    let a_tokens = tokenize(a, min_len);
    let b_tokens = tokenize(b, min_len);
    a_tokens.iter().any(|t| b_tokens.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_short_tokens_and_lowercases() {
        let tokens = tokenize("I like Rust a lot!", 2);
        assert_eq!(tokens, vec!["like", "rust", "lot"]);
    }

    #[test]
    fn contains_any_token_matches_substring() {
        let tokens = vec!["coffee".to_string()];
        assert!(contains_any_token("I love cold-brew coffee", &tokens));
        assert!(!contains_any_token("I love cold-brew tea", &tokens));
    }

    #[test]
    fn shares_token_detects_overlap() {
        assert!(shares_token("likes pour-over coffee", "favorite coffee ritual", 2));
        assert!(!shares_token("likes pour-over coffee", "quarterly tax filing", 2));
    }
}
