//! Binding predictions for (allele, peptide) combinations and the batched
//! lookup protocol used by the footprint computation.

pub mod predictions;

use std::collections::HashMap;

use crate::{
    err::FootprintError,
    model::{Allele, Peptide},
};

/// The external predictor that produced a binding record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BindingMethod {
    /// Binding affinity as IC50 concentration (nM).
    NetMhcPan,
    /// Binding stability as half-life of the peptide-MHC complex (hours).
    NetMhcStabPan,
}

/// The predicted binding strength of one peptide to one allele.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindRecord {
    /// Affinity (IC50) or stability (half-life), depending on the method.
    strength: f64,
    /// Percentile rank of the strength within a reference population.
    percentile: f64,
}

impl BindRecord {
    /// Create a new record; `strength` must be positive and `percentile`
    /// within `[0, 100]`.
    pub fn new(strength: f64, percentile: f64) -> Result<Self, FootprintError> {
        if !strength.is_finite() || strength <= 0.0 {
            return Err(FootprintError::InvalidValue {
                kind: "binding strength",
                value: strength.to_string(),
            });
        }
        if !(0.0..=100.0).contains(&percentile) {
            return Err(FootprintError::InvalidValue {
                kind: "binding percentile",
                value: percentile.to_string(),
            });
        }
        Ok(Self {
            strength,
            percentile,
        })
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn percentile(&self) -> f64 {
        self.percentile
    }
}

/// Binding records of a batch of peptides for one allele and method.
#[derive(Debug, Clone)]
pub struct BindRecordMap {
    method: BindingMethod,
    allele: Allele,
    records: HashMap<Peptide, BindRecord>,
}

impl BindRecordMap {
    pub fn new(
        method: BindingMethod,
        allele: Allele,
        records: HashMap<Peptide, BindRecord>,
    ) -> Self {
        Self {
            method,
            allele,
            records,
        }
    }

    pub fn method(&self) -> BindingMethod {
        self.method
    }

    pub fn allele(&self) -> &Allele {
        &self.allele
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The record for `peptide`, or `MissingBindingRecord`.
    pub fn require(&self, peptide: &Peptide) -> Result<&BindRecord, FootprintError> {
        self.records
            .get(peptide)
            .ok_or_else(|| missing_binding_record(self.method, &self.allele, peptide))
    }
}

pub(crate) fn missing_binding_record(
    method: BindingMethod,
    allele: &Allele,
    peptide: &Peptide,
) -> FootprintError {
    FootprintError::MissingBindingRecord {
        method: method.to_string(),
        allele: allele.to_string(),
        peptide: peptide.to_string(),
    }
}

/// Access to binding predictions.
///
/// Implementations are shared between worker threads and may be expensive
/// per call, so callers pass all peptides of interest at once.
pub trait BindingLookup: Sync {
    /// Return the binding records of `peptides` for `allele` as predicted by
    /// `method`; the result contains an entry for every requested peptide.
    fn lookup(
        &self,
        method: BindingMethod,
        allele: &Allele,
        peptides: &[Peptide],
    ) -> Result<BindRecordMap, FootprintError>;
}
