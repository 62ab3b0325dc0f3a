//! Tunables of the query core
//!
//! All values have defaults matching the production TCRD schema. The host
//! service can deserialize a [`Config`] from its own configuration source,
//! missing fields fall back to the defaults.
use serde::Deserialize;

use crate::ontology::OntologyKind;
use crate::{DEFAULT_DELIMITER, DEFAULT_FACETS, DEFAULT_FACET_TOP, PANTHER_ROOT};

/// Controls how stored ancestor chains are split into ids
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Separator between ancestor ids, e.g. `|` in `PC00197|PC00000`
    pub delimiter: char,
    /// Tokens that mean "no further ancestor" and never become a parent
    pub sentinels: Vec<String>,
}

impl DecoderConfig {
    /// A decoder without any sentinel token
    pub fn without_sentinel() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            sentinels: Vec::new(),
        }
    }

    /// Returns `true` if `token` is one of the sentinel root tokens
    pub fn is_sentinel(&self, token: &str) -> bool {
        self.sentinels.iter().any(|s| s == token)
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            sentinels: vec![PANTHER_ROOT.to_string()],
        }
    }
}

/// Configuration of the [`crate::Tcrd`] service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decoder for PANTHER protein class rows
    pub panther: DecoderConfig,
    /// Decoder for the Disease Ontology
    pub disease: DecoderConfig,
    /// Decoder for the Drug Target Ontology
    pub dto: DecoderConfig,
    /// Global ontologies that are built during startup
    pub ontologies: Vec<OntologyKind>,
    /// Facets used when the caller does not request any
    pub default_facets: Vec<String>,
    /// Facet that partitions the full result set and defines its total count
    pub total_facet: String,
    /// Page size of facet values when the caller does not specify one
    pub facet_top: usize,
}

impl Config {
    /// Returns the decoder settings for the given ontology
    pub fn decoder(&self, kind: OntologyKind) -> &DecoderConfig {
        match kind {
            OntologyKind::Panther => &self.panther,
            OntologyKind::Disease => &self.disease,
            OntologyKind::Dto => &self.dto,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            panther: DecoderConfig::default(),
            disease: DecoderConfig::without_sentinel(),
            dto: DecoderConfig::without_sentinel(),
            ontologies: vec![OntologyKind::Disease, OntologyKind::Dto],
            default_facets: DEFAULT_FACETS.iter().map(|s| s.to_string()).collect(),
            total_facet: DEFAULT_FACETS[0].to_string(),
            facet_top: DEFAULT_FACET_TOP,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.panther.delimiter, '|');
        assert!(config.panther.is_sentinel("PC00000"));
        assert!(!config.disease.is_sentinel("PC00000"));
        assert_eq!(config.default_facets.len(), 7);
        assert_eq!(config.total_facet, "Target Development Level");
        assert_eq!(config.decoder(OntologyKind::Panther), &config.panther);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"facet_top": 25, "dto": {"sentinels": ["DTO:00000"]}}"#)
                .unwrap();
        assert_eq!(config.facet_top, 25);
        assert_eq!(config.dto.delimiter, '|');
        assert!(config.dto.is_sentinel("DTO:00000"));
        assert_eq!(config.ontologies, vec![OntologyKind::Disease, OntologyKind::Dto]);
    }
}
