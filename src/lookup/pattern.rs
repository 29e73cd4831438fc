//! `*`-wildcard surface patterns.
//!
//! `"a*b"` matches exactly the strings matching `^a.*b$`; every other
//! character is literal. An empty pattern or a lone `*` matches anything.

use crate::error::{MorphError, Result};
use regex::Regex;

#[derive(Debug, Clone)]
pub enum Wildcard {
    Any,
    Exact(String),
    Pattern(Regex),
}

impl Wildcard {
    pub fn parse(pattern: &str) -> Result<Self> {
        let pattern = crate::regex!(r"\*+").replace_all(pattern, "*");
        if pattern.is_empty() || pattern == "*" {
            return Ok(Wildcard::Any);
        }
        if !pattern.contains('*') {
            return Ok(Wildcard::Exact(pattern.into_owned()));
        }

        let body: Vec<String> = pattern.split('*').map(regex::escape).collect();
        let source = format!("^{}$", body.join(".*"));
        let regex = Regex::new(&source)
            .map_err(|source| MorphError::InvalidPattern { pattern: pattern.to_string(), source })?;
        Ok(Wildcard::Pattern(regex))
    }

    pub fn is_wildcard(pattern: &str) -> bool {
        pattern.contains('*')
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Wildcard::Any => true,
            Wildcard::Exact(s) => s == text,
            Wildcard::Pattern(re) => re.is_match(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_is_anchored() {
        let w = Wildcard::parse("a*b").unwrap();
        assert!(w.is_match("ab"));
        assert!(w.is_match("axxb"));
        assert!(!w.is_match("xab"));
        assert!(!w.is_match("abx"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let w = Wildcard::parse("a.*").unwrap();
        assert!(w.is_match("a.bc"));
        assert!(!w.is_match("abc"));
    }

    #[test]
    fn empty_and_star_match_everything() {
        assert!(matches!(Wildcard::parse("").unwrap(), Wildcard::Any));
        assert!(matches!(Wildcard::parse("**").unwrap(), Wildcard::Any));
        assert!(matches!(Wildcard::parse("ena").unwrap(), Wildcard::Exact(_)));
    }
}
