//! HLA alleles and patient genotypes.

use std::{collections::BTreeSet, str::FromStr, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::err::FootprintError;

/// Pattern for allele names such as `A0101`, `A*01:01`, or `HLA-DRB1*01:01`.
fn allele_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:HLA-)?([A-Z]+[0-9]?)\*?([0-9]{2}):?([0-9]{2,3})$").expect("valid regex")
    })
}

/// One HLA allele, identified by its two-field short key (e.g., `A0101`).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Allele {
    short_key: String,
}

impl Allele {
    /// Return the short key, e.g., `A0101`.
    pub fn short_key(&self) -> &str {
        &self.short_key
    }
}

impl FromStr for Allele {
    type Err = FootprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let caps = allele_regex()
            .captures(&upper)
            .ok_or_else(|| FootprintError::InvalidValue {
                kind: "HLA allele",
                value: s.to_string(),
            })?;
        Ok(Self {
            short_key: format!("{}{}{}", &caps[1], &caps[2], &caps[3]),
        })
    }
}

impl TryFrom<String> for Allele {
    type Error = FootprintError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Allele> for String {
    fn from(value: Allele) -> Self {
        value.short_key
    }
}

impl std::fmt::Display for Allele {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.short_key)
    }
}

/// The HLA genotype of one patient; may contain homozygous duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Genotype {
    alleles: Vec<Allele>,
}

impl Genotype {
    /// Construct from the given alleles.
    pub fn new(alleles: Vec<Allele>) -> Self {
        Self { alleles }
    }

    /// All alleles, including duplicates.
    pub fn alleles(&self) -> &[Allele] {
        &self.alleles
    }

    /// The distinct alleles in their natural order.
    pub fn view_unique_alleles(&self) -> BTreeSet<Allele> {
        self.alleles.iter().cloned().collect()
    }
}

impl FromStr for Genotype {
    type Err = FootprintError;

    /// Parse a comma-separated allele list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let alleles = s
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(Allele::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        if alleles.is_empty() {
            return Err(FootprintError::InvalidValue {
                kind: "genotype",
                value: s.to_string(),
            });
        }
        Ok(Self::new(alleles))
    }
}
