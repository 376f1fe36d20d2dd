//! # Text similarity: tokenization + Jaccard over token sets.
//!
//! Used for working-tier edge creation and context filtering. Tokenization
//! must cope with CJK text, which carries no whitespace delimiters: runs of
//! non-CJK alphanumerics become lowercased word tokens, while each CJK
//! ideograph (or kana/hangul syllable) is a token of its own.
//!
//! ## Properties
//! - `similarity(a, b) == similarity(b, a)` (symmetric by construction)
//! - `similarity(a, a) == 1.0` for any `a` that yields at least one token
//! - empty or token-free input on either side yields `0.0`

use std::collections::HashSet;

/// True for characters that are tokenized one-by-one rather than in runs.
fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'   // CJK Unified Ideographs
        | '\u{3400}'..='\u{4DBF}' // CJK Extension A
        | '\u{F900}'..='\u{FAFF}' // CJK Compatibility Ideographs
        | '\u{3040}'..='\u{30FF}' // Hiragana + Katakana
        | '\u{AC00}'..='\u{D7AF}' // Hangul Syllables
    )
}

/// Splits text into a set of lowercased tokens.
///
/// Alphanumeric runs form one token each; CJK characters are individual
/// tokens; everything else is a separator.
pub fn tokenize(text: &str) -> HashSet<String> {
    let mut tokens = HashSet::new();
    let mut word = String::new();

    for c in text.chars() {
        if is_cjk(c) {
            if !word.is_empty() {
                tokens.insert(std::mem::take(&mut word));
            }
            tokens.insert(c.to_string());
        } else if c.is_alphanumeric() {
            word.extend(c.to_lowercase());
        } else if !word.is_empty() {
            tokens.insert(std::mem::take(&mut word));
        }
    }
    if !word.is_empty() {
        tokens.insert(word);
    }
    tokens
}

/// Jaccard similarity of the token sets of two strings, in [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("foo bar baz", "foo qux"),
            ("hello world", "world hello again"),
            ("你好世界", "世界真大"),
            ("", "anything"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn test_identity_is_one() {
        assert_eq!(similarity("hello world", "hello world"), 1.0);
        assert_eq!(similarity("你好", "你好"), 1.0);
    }

    #[test]
    fn test_empty_inputs_are_zero() {
        assert_eq!(similarity("", ""), 0.0);
        assert_eq!(similarity("", "hello"), 0.0);
        assert_eq!(similarity("!!!", "hello"), 0.0);
    }

    #[test]
    fn test_reference_quarter_overlap() {
        // {foo, bar, baz} vs {foo, qux}: 1 shared of 4 total.
        assert_eq!(similarity("foo bar baz", "foo qux"), 0.25);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(similarity("Hello World", "hello world"), 1.0);
    }

    #[test]
    fn test_cjk_splits_without_whitespace() {
        let tokens = tokenize("你好世界");
        assert_eq!(tokens.len(), 4);
        assert!(tokens.contains("好"));

        // Shared ideographs are detected despite no delimiters.
        assert!(similarity("你好世界", "世界和平") > 0.0);
    }

    #[test]
    fn test_mixed_scripts() {
        let tokens = tokenize("rust真好 ok");
        assert!(tokens.contains("rust"));
        assert!(tokens.contains("真"));
        assert!(tokens.contains("好"));
        assert!(tokens.contains("ok"));
    }
}
