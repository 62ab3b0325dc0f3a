use regex::{Regex, RegexBuilder};
use tracing::trace;

/// A name pattern as used for selecting facets and facet values
///
/// A pattern matches a name if both are equal ignoring case, or if the
/// pattern, read as a case-insensitive regular expression, matches
/// anywhere inside the name. Patterns that are not valid regular
/// expressions only match exactly.
#[derive(Debug, Clone)]
pub struct Pattern {
    exact: String,
    regex: Option<Regex>,
}

impl Pattern {
    pub fn new(pattern: &str) -> Self {
        let regex = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => Some(regex),
            Err(err) => {
                trace!("Using {} as literal pattern: {}", pattern, err);
                None
            }
        };
        Self {
            exact: pattern.to_lowercase(),
            regex,
        }
    }

    pub fn is_match(&self, name: &str) -> bool {
        if name.to_lowercase() == self.exact {
            return true;
        }
        self.regex
            .as_ref()
            .map(|regex| regex.is_match(name))
            .unwrap_or(false)
    }
}

/// A list of [`Pattern`]s that matches if any pattern matches
#[derive(Debug, Clone, Default)]
pub struct Patterns {
    inner: Vec<Pattern>,
}

impl Patterns {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            inner: patterns.iter().map(|p| Pattern::new(p.as_ref())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.inner.iter().any(|p| p.is_match(name))
    }
}
