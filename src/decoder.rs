//! Decoding of stored ancestor chains
//!
//! Ontology tables store every class together with all of its ancestors as
//! one delimited string, e.g. `PC00197|PC00000|PC00197`. The decoder turns
//! such a string into an [`AncestorChain`]: split on the delimiter, drop the
//! sentinel root and the row's own id, deduplicate (first occurrence wins).
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::DecoderConfig;

/// A raw row of a classification table as it comes from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRow {
    pub id: String,
    pub name: String,
    /// Delimited list of ancestor ids, may be empty
    pub parent_ids: String,
}

impl ClassRow {
    pub fn new<I: Into<String>, N: Into<String>, P: Into<String>>(
        id: I,
        name: N,
        parent_ids: P,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_ids: parent_ids.into(),
        }
    }
}

/// Ordered ids of the ancestors of a class
///
/// Each id occurs at most once, in the order of its first occurrence in the
/// stored chain. Neither the sentinel root nor the class itself are part of
/// the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AncestorChain {
    ids: Vec<String>,
}

impl AncestorChain {
    /// Returns the number of ancestor ids
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the class has no ancestors
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|x| x == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.ids.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    /// Adds the ids of `other` that are not yet part of the chain
    pub(crate) fn extend(&mut self, other: AncestorChain) {
        for id in other.ids {
            if !self.contains(&id) {
                self.ids.push(id);
            }
        }
    }
}

impl<'a> IntoIterator for &'a AncestorChain {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

impl IntoIterator for AncestorChain {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

/// A decoded class: its id, name and unresolved ancestor ids
///
/// This is also the element of the flat edge list view of a hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub id: String,
    pub name: String,
    pub parents: AncestorChain,
}

impl ClassRecord {
    /// Decodes a [`ClassRow`]
    pub fn from_row(row: ClassRow, config: &DecoderConfig) -> Self {
        let parents = decode(&row.id, &row.parent_ids, config);
        Self {
            id: row.id,
            name: row.name,
            parents,
        }
    }
}

/// Parses a stored ancestor chain
///
/// Parsing is tolerant: a chain that can't be parsed yields an empty
/// [`AncestorChain`] so that partially populated rows still render.
///
/// # Examples
///
/// ```
/// use tcrd::decoder::decode;
/// use tcrd::DecoderConfig;
///
/// let chain = decode("PC00042", "PC00197|PC00000|PC00042|PC00197|PC00031", &DecoderConfig::default());
/// assert_eq!(chain.as_slice(), &["PC00197", "PC00031"]);
/// ```
pub fn decode(id: &str, raw: &str, config: &DecoderConfig) -> AncestorChain {
    if raw.chars().any(|c| c.is_control() && !c.is_whitespace()) {
        trace!("Ignoring malformed ancestor chain of {}", id);
        return AncestorChain::default();
    }

    let mut chain = AncestorChain::default();
    for token in raw.split(config.delimiter) {
        let token = token.trim();
        if token.is_empty() || token == id || config.is_sentinel(token) {
            continue;
        }
        if !chain.contains(token) {
            chain.ids.push(token.to_string());
        }
    }
    chain
}

/// Decodes every row of a batch, keeping the row order
pub fn decode_rows<I: IntoIterator<Item = ClassRow>>(
    rows: I,
    config: &DecoderConfig,
) -> Vec<ClassRecord> {
    rows.into_iter()
        .map(|row| ClassRecord::from_row(row, config))
        .collect()
}
