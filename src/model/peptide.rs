//! Peptides, neo/self peptide pairs, and pair records with cohort provenance.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::err::FootprintError;

/// The 20 standard amino acid residues.
const AMINO_ACIDS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

/// A short amino-acid sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Peptide(String);

impl Peptide {
    /// Return the residue string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of residues.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for a successfully parsed peptide.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Peptide {
    type Err = FootprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| AMINO_ACIDS.contains(&b)) {
            return Err(FootprintError::InvalidValue {
                kind: "peptide",
                value: s.to_string(),
            });
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Peptide {
    type Error = FootprintError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Peptide> for String {
    fn from(value: Peptide) -> Self {
        value.0
    }
}

impl std::fmt::Display for Peptide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tumor-derived, mutated peptide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NeoPeptide(Peptide);

/// The wild-type counterpart of a neo-peptide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelfPeptide(Peptide);

impl NeoPeptide {
    pub fn new(peptide: Peptide) -> Self {
        Self(peptide)
    }

    pub fn peptide(&self) -> &Peptide {
        &self.0
    }
}

impl SelfPeptide {
    pub fn new(peptide: Peptide) -> Self {
        Self(peptide)
    }

    pub fn peptide(&self) -> &Peptide {
        &self.0
    }
}

/// Associates exactly one self-peptide with exactly one neo-peptide.
///
/// Ordered by self-peptide first, then neo-peptide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeptidePair {
    self_peptide: SelfPeptide,
    neo_peptide: NeoPeptide,
}

impl PeptidePair {
    pub fn new(self_peptide: SelfPeptide, neo_peptide: NeoPeptide) -> Self {
        Self {
            self_peptide,
            neo_peptide,
        }
    }

    /// The wild-type peptide.
    pub fn self_peptide(&self) -> &Peptide {
        self.self_peptide.peptide()
    }

    /// The mutated peptide.
    pub fn neo_peptide(&self) -> &Peptide {
        self.neo_peptide.peptide()
    }
}

/// Identifier of one tumor sample.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TumorBarcode(String);

impl TumorBarcode {
    pub fn new<S: Into<String>>(barcode: S) -> Self {
        Self(barcode.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TumorBarcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Column names of the peptide pair part of flat files.
pub const PAIR_RECORD_COLUMNS: &[&str] = &[
    "Tumor_Barcode",
    "Hugo_Symbol",
    "Peptide_Start",
    "Peptide_End",
    "Self_Peptide",
    "Neo_Peptide",
];

/// A peptide pair together with its cohort provenance.
///
/// The derived order is the provenance order used for output files: tumor
/// barcode, gene symbol, peptide range, then the pair itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeptidePairRecord {
    tumor_barcode: TumorBarcode,
    hugo_symbol: String,
    peptide_start: u32,
    peptide_end: u32,
    pair: PeptidePair,
}

impl PeptidePairRecord {
    pub fn new(
        tumor_barcode: TumorBarcode,
        hugo_symbol: String,
        peptide_range: std::ops::RangeInclusive<u32>,
        pair: PeptidePair,
    ) -> Result<Self, FootprintError> {
        if peptide_range.is_empty() {
            return Err(FootprintError::InvalidValue {
                kind: "peptide range",
                value: format!("{}-{}", peptide_range.start(), peptide_range.end()),
            });
        }
        Ok(Self {
            tumor_barcode,
            hugo_symbol,
            peptide_start: *peptide_range.start(),
            peptide_end: *peptide_range.end(),
            pair,
        })
    }

    pub fn tumor_barcode(&self) -> &TumorBarcode {
        &self.tumor_barcode
    }

    pub fn hugo_symbol(&self) -> &str {
        &self.hugo_symbol
    }

    /// The 1-based, inclusive position range of the peptide in the protein.
    pub fn peptide_range(&self) -> std::ops::RangeInclusive<u32> {
        self.peptide_start..=self.peptide_end
    }

    pub fn pair(&self) -> &PeptidePair {
        &self.pair
    }

    /// Header columns joined by `delim`.
    pub fn header(delim: char) -> String {
        PAIR_RECORD_COLUMNS.join(&delim.to_string())
    }

    /// Format the record fields joined by `delim`.
    pub fn format(&self, delim: char) -> String {
        [
            self.tumor_barcode.to_string(),
            self.hugo_symbol.clone(),
            self.peptide_start.to_string(),
            self.peptide_end.to_string(),
            self.pair.self_peptide().to_string(),
            self.pair.neo_peptide().to_string(),
        ]
        .join(&delim.to_string())
    }

    /// Parse the record from the first `PAIR_RECORD_COLUMNS.len()` entries of
    /// `fields`.
    pub fn parse_fields(fields: &[&str]) -> Result<Self, FootprintError> {
        if fields.len() < PAIR_RECORD_COLUMNS.len() {
            return Err(FootprintError::InvalidValue {
                kind: "peptide pair record",
                value: fields.join("\t"),
            });
        }
        input::Record {
            tumor_barcode: fields[0].to_string(),
            hugo_symbol: fields[1].to_string(),
            peptide_start: parse_position(fields[2])?,
            peptide_end: parse_position(fields[3])?,
            self_peptide: fields[4].parse()?,
            neo_peptide: fields[5].parse()?,
        }
        .try_into()
    }
}

fn parse_position(value: &str) -> Result<u32, FootprintError> {
    value.trim().parse().map_err(|_| FootprintError::InvalidValue {
        kind: "peptide position",
        value: value.to_string(),
    })
}

/// Input records as read from peptide pair files.
pub mod input {
    use serde::Deserialize;

    use super::{NeoPeptide, Peptide, PeptidePair, PeptidePairRecord, SelfPeptide, TumorBarcode};
    use crate::err::FootprintError;

    /// One line of a peptide pair file.
    #[derive(Debug, Deserialize, Clone)]
    pub struct Record {
        #[serde(rename = "Tumor_Barcode")]
        pub tumor_barcode: String,
        #[serde(rename = "Hugo_Symbol")]
        pub hugo_symbol: String,
        /// 1-based first residue position.
        #[serde(rename = "Peptide_Start")]
        pub peptide_start: u32,
        /// 1-based last residue position.
        #[serde(rename = "Peptide_End")]
        pub peptide_end: u32,
        #[serde(rename = "Self_Peptide")]
        pub self_peptide: Peptide,
        #[serde(rename = "Neo_Peptide")]
        pub neo_peptide: Peptide,
    }

    impl TryFrom<Record> for PeptidePairRecord {
        type Error = FootprintError;

        fn try_from(record: Record) -> Result<Self, Self::Error> {
            if record.tumor_barcode.is_empty() {
                return Err(FootprintError::InvalidValue {
                    kind: "tumor barcode",
                    value: record.tumor_barcode,
                });
            }
            PeptidePairRecord::new(
                TumorBarcode::new(record.tumor_barcode),
                record.hugo_symbol,
                record.peptide_start..=record.peptide_end,
                PeptidePair::new(
                    SelfPeptide::new(record.self_peptide),
                    NeoPeptide::new(record.neo_peptide),
                ),
            )
        }
    }
}
