//! Footprint index calculation types and the batched per-allele computation.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::record::FootprintRecord;
use crate::{
    bind::{BindRecord, BindingLookup, BindingMethod},
    err::FootprintError,
    model::{Allele, PeptidePairRecord},
};

/// Enumerates the calculation types for the single-allele footprint index.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FootprintType {
    /// `log2(a_self / a_neo)` where `a_self` and `a_neo` are IC50
    /// concentrations of the self- and neo-peptide.
    ///
    /// The self-peptide is in the numerator as lower IC50 means stronger
    /// binding, the inverse of the half-life relationship.
    LogAffinity,
    /// `log2(h_neo / h_self)` where `h_neo` and `h_self` are the half-lives
    /// of the neo- and self-peptide MHC complex.
    LogStability,
}

impl FootprintType {
    /// The predictor that supplies binding strengths for this type.
    pub fn binding_method(self) -> BindingMethod {
        match self {
            FootprintType::LogAffinity => BindingMethod::NetMhcPan,
            FootprintType::LogStability => BindingMethod::NetMhcStabPan,
        }
    }

    /// Combine the neo- and self-peptide binding records into the index.
    pub fn index(self, neo: &BindRecord, self_: &BindRecord) -> f64 {
        match self {
            FootprintType::LogAffinity => (self_.strength() / neo.strength()).log2(),
            FootprintType::LogStability => (neo.strength() / self_.strength()).log2(),
        }
    }

    /// Compute the footprint records of all `pairs` for one `allele`.
    ///
    /// All distinct peptides of `pairs` are passed to `lookup` in a single
    /// call.  A missing binding record fails the whole batch.  The result
    /// follows the order of `pairs`.
    pub fn compute<L>(
        self,
        lookup: &L,
        allele: &Allele,
        pairs: &[PeptidePairRecord],
    ) -> Result<Vec<FootprintRecord>, FootprintError>
    where
        L: BindingLookup + ?Sized,
    {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }

        let peptides = pairs
            .iter()
            .flat_map(|record| [record.pair().neo_peptide(), record.pair().self_peptide()])
            .unique()
            .cloned()
            .collect::<Vec<_>>();
        let bind_records = lookup.lookup(self.binding_method(), allele, &peptides)?;
        tracing::trace!(
            "{} binding records for {} pairs and allele {}",
            bind_records.len(),
            pairs.len(),
            allele
        );

        pairs
            .iter()
            .map(|record| {
                let neo = bind_records.require(record.pair().neo_peptide())?;
                let self_ = bind_records.require(record.pair().self_peptide())?;
                Ok(FootprintRecord::new(
                    record.clone(),
                    allele.clone(),
                    self,
                    neo,
                    self_,
                    self.index(neo, self_),
                ))
            })
            .collect()
    }

    /// Compute the footprint records of all `pairs` for each of `alleles`.
    pub fn compute_all<'a, L, I>(
        self,
        lookup: &L,
        alleles: I,
        pairs: &[PeptidePairRecord],
    ) -> Result<Vec<FootprintRecord>, FootprintError>
    where
        L: BindingLookup + ?Sized,
        I: IntoIterator<Item = &'a Allele>,
    {
        let mut result = Vec::new();
        for allele in alleles {
            result.append(&mut self.compute(lookup, allele, pairs)?);
        }
        Ok(result)
    }
}
