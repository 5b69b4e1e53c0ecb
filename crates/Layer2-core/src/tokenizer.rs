//! Search string tokenizer
//!
//! ```text
//! query  := term (SP term)*
//! term   := ["-"] field ":" value
//! ```
//!
//! Splitting is purely on whitespace. Quoted values are not recognised:
//! `post_title:"two words"` yields the atom `post_title:"two` and the
//! colon-less atom `words"`, which is dropped.

use serde::Serialize;

/// One `field:value` or `-field:value` atom
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SearchTerm {
    pub field: String,
    pub negated: bool,
    pub value: String,
}

impl SearchTerm {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            negated: false,
            value: value.into(),
        }
    }

    pub fn negated(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            negated: true,
            ..Self::new(field, value)
        }
    }

    /// Parse one whitespace-free atom; `None` if it is not a usable term
    pub fn parse(atom: &str) -> Option<Self> {
        let (key, value) = atom.split_once(':')?;
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        let (field, negated) = match key.strip_prefix('-') {
            Some(field) => (field, true),
            None => (key, false),
        };

        Some(Self {
            field: field.to_string(),
            negated,
            value: value.to_string(),
        })
    }
}

/// Split a raw search string into terms, in input order
pub fn tokenize(raw: &str) -> Vec<SearchTerm> {
    raw.split_whitespace().filter_map(SearchTerm::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_terms() {
        let terms = tokenize("alert_code:2001  -actor_login:bob\tobject:post");
        assert_eq!(
            terms,
            vec![
                SearchTerm::new("alert_code", "2001"),
                SearchTerm::negated("actor_login", "bob"),
                SearchTerm::new("object", "post"),
            ]
        );
    }

    #[test]
    fn test_splits_on_first_colon_only() {
        let terms = tokenize("client_ip:::1 post_title:a:b");
        assert_eq!(terms[0], SearchTerm::new("client_ip", "::1"));
        assert_eq!(terms[1], SearchTerm::new("post_title", "a:b"));
    }

    #[test]
    fn test_discards_unusable_atoms() {
        assert!(tokenize("hello world").is_empty());
        assert!(tokenize("object: -object:").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_only_one_leading_dash_is_stripped() {
        let terms = tokenize("--object:post");
        assert_eq!(terms, vec![SearchTerm::negated("-object", "post")]);
    }

    #[test]
    fn test_quoted_values_fragment() {
        let terms = tokenize(r#"post_title:"two words""#);
        assert_eq!(terms, vec![SearchTerm::new("post_title", "\"two")]);
    }

    #[test]
    fn test_empty_field_name_is_kept() {
        // Unknown to the registry, so it is dropped later rather than here.
        let terms = tokenize(":value");
        assert_eq!(terms, vec![SearchTerm::new("", "value")]);
    }
}
