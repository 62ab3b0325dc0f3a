//! Merging of ligand rows into canonical ligands
//!
//! A ligand can be recorded in two source tables: registered drugs and plain
//! compounds from activity databases. Both tables can contain several rows
//! for the same structure, one per source record. The [`EntityMerger`] folds
//! such rows into one [`CanonicalLigand`].
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Delimiter between PubMed ids of a single row
const PUBMED_DELIMITER: char = '|';

/// The source table of a [`LigandRow`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LigandSource {
    /// Registered drugs with approved or clinical status
    Drug,
    /// Compounds from activity databases
    #[default]
    Compound,
}

impl Display for LigandSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LigandSource::Drug => write!(f, "drug"),
            LigandSource::Compound => write!(f, "compound"),
        }
    }
}

/// The source tables that were queried for a ligand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LigandSources {
    pub drug: bool,
    pub compound: bool,
}

impl Default for LigandSources {
    fn default() -> Self {
        Self::all()
    }
}

impl LigandSources {
    /// Both source tables
    pub fn all() -> Self {
        Self {
            drug: true,
            compound: true,
        }
    }

    pub fn drugs() -> Self {
        Self {
            drug: true,
            compound: false,
        }
    }

    pub fn compounds() -> Self {
        Self {
            drug: false,
            compound: true,
        }
    }

    pub fn contains(&self, source: LigandSource) -> bool {
        match source {
            LigandSource::Drug => self.drug,
            LigandSource::Compound => self.compound,
        }
    }
}

/// A raw row of one of the ligand source tables
///
/// Empty strings are treated like missing values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LigandRow {
    pub source: LigandSource,
    /// Standardized structural hash (LyChI layer 4)
    pub lychi_h4: Option<String>,
    /// Name of the drug, only set in drug rows
    pub drug: Option<String>,
    /// Compound id in the source database
    pub cmpd_id_in_src: Option<String>,
    /// Compound name in the source database
    pub cmpd_name_in_src: Option<String>,
    /// Name of the source database, e.g. `ChEMBL`
    pub source_db: Option<String>,
    pub smiles: Option<String>,
    pub description: Option<String>,
    /// External cross-reference, e.g. a URL into the source database
    pub reference: Option<String>,
    /// `|` delimited PubMed ids
    pub pubmed_ids: Option<String>,
}

impl LigandRow {
    pub fn drug<S: Into<String>>(name: S) -> Self {
        Self {
            source: LigandSource::Drug,
            drug: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn compound<S: Into<String>>(cmpd_id_in_src: S) -> Self {
        Self {
            source: LigandSource::Compound,
            cmpd_id_in_src: Some(cmpd_id_in_src.into()),
            ..Default::default()
        }
    }

    /// Returns the identity this row contributes on its own, if any
    pub fn identity(&self) -> Option<LigandIdentity> {
        present(&self.lychi_h4)
            .map(|hash| LigandIdentity::Hash(hash.to_string()))
            .or_else(|| present(&self.drug).map(|name| LigandIdentity::Drug(name.to_string())))
            .or_else(|| {
                present(&self.cmpd_id_in_src).map(|id| LigandIdentity::Compound(id.to_string()))
            })
    }

    fn is_drug(&self) -> bool {
        self.source == LigandSource::Drug
    }

    /// Appends the synonyms of the row to `synonyms`
    fn synonyms_into(&self, synonyms: &mut Vec<Synonym>) {
        let source_db = present(&self.source_db).map_or_else(|| self.source.to_string(), str::to_string);
        if let Some(id) = present(&self.cmpd_id_in_src) {
            synonyms.push(Synonym::new(source_db.clone(), id));
        }
        if let Some(reference) = present(&self.reference) {
            synonyms.push(Synonym::new(format!("{source_db} reference"), reference));
        }
        if let Some(pubmed_ids) = present(&self.pubmed_ids) {
            synonyms.extend(
                pubmed_ids
                    .split(PUBMED_DELIMITER)
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(|id| Synonym::new("PubMed", id)),
            );
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// The primary identifier of a [`CanonicalLigand`]
///
/// In order of precedence: the structural hash, the drug name or the
/// compound id in the source database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum LigandIdentity {
    Hash(String),
    Drug(String),
    Compound(String),
}

impl LigandIdentity {
    pub fn as_str(&self) -> &str {
        match self {
            LigandIdentity::Hash(s) | LigandIdentity::Drug(s) | LigandIdentity::Compound(s) => s,
        }
    }
}

impl Display for LigandIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An alternative name or reference of a ligand, with the source it comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synonym {
    pub source: String,
    pub value: String,
}

impl Synonym {
    pub fn new<S: Into<String>, V: Into<String>>(source: S, value: V) -> Self {
        Self {
            source: source.into(),
            value: value.into(),
        }
    }
}

/// A ligand merged from all rows describing the same structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalLigand {
    pub identity: LigandIdentity,
    pub name: String,
    pub is_drug: bool,
    pub smiles: Option<String>,
    pub description: Option<String>,
    /// Synonyms of all rows in encounter order, duplicates included
    pub synonyms: Vec<Synonym>,
    /// Number of contributing rows of the queried source tables
    pub activity_count: u64,
}

/// Folds rows of the ligand source tables into [`CanonicalLigand`]s
///
/// Drug rows take precedence over compound rows for the name and the
/// `is_drug` flag, as well as for SMILES and description.
///
/// # Examples
///
/// ```
/// use tcrd::ligand::{EntityMerger, LigandRow, LigandSources};
///
/// let mut compound = LigandRow::compound("CHEMBL25");
/// compound.lychi_h4 = Some("BSYNRYMUTXBXSQ".to_string());
/// compound.source_db = Some("ChEMBL".to_string());
///
/// let mut drug = LigandRow::drug("aspirin");
/// drug.lychi_h4 = Some("BSYNRYMUTXBXSQ".to_string());
///
/// let ligand = EntityMerger::new(LigandSources::all())
///     .merge(&[compound, drug])
///     .unwrap();
/// assert_eq!(ligand.identity.as_str(), "BSYNRYMUTXBXSQ");
/// assert_eq!(ligand.name, "aspirin");
/// assert!(ligand.is_drug);
/// assert_eq!(ligand.activity_count, 2);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityMerger {
    sources: LigandSources,
}

impl EntityMerger {
    pub fn new(sources: LigandSources) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> LigandSources {
        self.sources
    }

    /// Merges all `rows` into one ligand
    ///
    /// Rows of source tables that were not queried are ignored. Returns
    /// `None` if no row carries an identifying field.
    pub fn merge<'a, I: IntoIterator<Item = &'a LigandRow>>(&self, rows: I) -> Option<CanonicalLigand> {
        let rows: Vec<&LigandRow> = rows
            .into_iter()
            .filter(|row| {
                let queried = self.sources.contains(row.source);
                if !queried {
                    trace!("Ignoring {} row of a table that was not queried", row.source);
                }
                queried
            })
            .collect();

        let identity = rows
            .iter()
            .find_map(|row| present(&row.lychi_h4).map(|h| LigandIdentity::Hash(h.to_string())))
            .or_else(|| {
                rows.iter()
                    .find_map(|row| present(&row.drug).map(|d| LigandIdentity::Drug(d.to_string())))
            })
            .or_else(|| {
                rows.iter().find_map(|row| {
                    present(&row.cmpd_id_in_src).map(|id| LigandIdentity::Compound(id.to_string()))
                })
            })?;

        let name = rows
            .iter()
            .filter(|row| row.is_drug())
            .find_map(|row| present(&row.drug))
            .or_else(|| rows.iter().find_map(|row| present(&row.cmpd_name_in_src)))
            .map_or_else(|| identity.to_string(), str::to_string);

        let mut synonyms = Vec::new();
        for row in &rows {
            row.synonyms_into(&mut synonyms);
        }

        let drug_rows = rows.iter().filter(|row| row.is_drug()).count() as u64;
        let compound_rows = rows.len() as u64 - drug_rows;
        let activity_count = match (self.sources.drug, self.sources.compound) {
            (true, true) => drug_rows + compound_rows,
            (true, false) => drug_rows,
            (false, true) => compound_rows,
            (false, false) => 0,
        };

        Some(CanonicalLigand {
            name,
            is_drug: drug_rows > 0,
            smiles: preferring_drugs(&rows, |row| present(&row.smiles)),
            description: preferring_drugs(&rows, |row| present(&row.description)),
            synonyms,
            activity_count,
            identity,
        })
    }

    /// Partitions `rows` by their identity and merges every group
    ///
    /// Groups are returned in the order in which their identity was first
    /// seen. Rows without an identifying field are skipped.
    pub fn merge_grouped(&self, rows: &[LigandRow]) -> Vec<CanonicalLigand> {
        let mut groups: Vec<(LigandIdentity, Vec<&LigandRow>)> = Vec::new();
        for row in rows {
            let Some(identity) = row.identity() else {
                trace!("Skipping ligand row without identity");
                continue;
            };
            match groups.iter_mut().find(|(id, _)| *id == identity) {
                Some((_, group)) => group.push(row),
                None => groups.push((identity, vec![row])),
            }
        }
        groups
            .into_iter()
            .filter_map(|(_, group)| self.merge(group))
            .collect()
    }
}

/// Returns the first value of a drug row, or else of any row
fn preferring_drugs<F>(rows: &[&LigandRow], value: F) -> Option<String>
where
    F: Fn(&LigandRow) -> Option<&str>,
{
    rows.iter()
        .filter(|row| row.is_drug())
        .find_map(|row| value(*row))
        .or_else(|| rows.iter().find_map(|row| value(*row)))
        .map(str::to_string)
}

/// Merges rows of both source tables into one ligand
///
/// See [`EntityMerger::merge`]
pub fn merge_ligand_rows(rows: &[LigandRow]) -> Option<CanonicalLigand> {
    EntityMerger::new(LigandSources::all()).merge(rows)
}
