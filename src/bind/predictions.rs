//! Precomputed binding predictions loaded from flat files.

use std::{
    collections::{hash_map::Entry, HashMap},
    path::Path,
    time::Instant,
};

use thousands::Separable;

use super::{missing_binding_record, BindRecord, BindRecordMap, BindingLookup, BindingMethod};
use crate::{
    common::io::open_tsv_reader,
    err::FootprintError,
    model::{Allele, Peptide},
};

/// Input records as read from prediction files.
pub mod input {
    use serde::Deserialize;

    use crate::model::{Allele, Peptide};

    /// One line of a prediction file.
    #[derive(Debug, Deserialize, Clone)]
    pub struct Record {
        #[serde(rename = "Allele")]
        pub allele: Allele,
        #[serde(rename = "Peptide")]
        pub peptide: Peptide,
        /// IC50 (nM) for affinity files, half-life (h) for stability files.
        #[serde(rename = "Strength")]
        pub strength: f64,
        #[serde(rename = "Percentile")]
        pub percentile: f64,
    }
}

/// Binding predictions of one method, indexed by allele and peptide.
#[derive(Debug, Clone)]
pub struct PredictionTable {
    method: BindingMethod,
    records: HashMap<Allele, HashMap<Peptide, BindRecord>>,
}

impl PredictionTable {
    /// Create an empty table for `method`.
    pub fn new(method: BindingMethod) -> Self {
        Self {
            method,
            records: HashMap::new(),
        }
    }

    pub fn method(&self) -> BindingMethod {
        self.method
    }

    /// Total number of (allele, peptide) predictions.
    pub fn len(&self) -> usize {
        self.records.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register one prediction; fails on a duplicate (allele, peptide).
    pub fn insert(
        &mut self,
        allele: Allele,
        peptide: Peptide,
        record: BindRecord,
    ) -> Result<(), FootprintError> {
        match self.records.entry(allele).or_default().entry(peptide) {
            Entry::Occupied(entry) => Err(FootprintError::InvalidValue {
                kind: "duplicate prediction",
                value: entry.key().to_string(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(())
            }
        }
    }

    /// Load predictions of `method` from a tab-separated file.
    #[tracing::instrument]
    pub fn load(path: &Path, method: BindingMethod) -> Result<Self, FootprintError> {
        tracing::debug!("loading {} predictions from {:?}", method, path);
        let before_loading = Instant::now();

        let mut result = Self::new(method);
        let mut reader =
            open_tsv_reader(path).map_err(|e| FootprintError::table_load(path, e))?;
        for record in reader.deserialize::<input::Record>() {
            let record = record.map_err(|e| FootprintError::table_load(path, e))?;
            let bind_record = BindRecord::new(record.strength, record.percentile)
                .map_err(|e| FootprintError::table_load(path, e))?;
            result
                .insert(record.allele, record.peptide, bind_record)
                .map_err(|e| FootprintError::table_load(path, e))?;
        }

        tracing::debug!(
            "... done loading {} predictions for {} alleles in {:?}",
            result.len().separate_with_commas(),
            result.records.len(),
            before_loading.elapsed()
        );
        Ok(result)
    }
}

impl BindingLookup for PredictionTable {
    fn lookup(
        &self,
        method: BindingMethod,
        allele: &Allele,
        peptides: &[Peptide],
    ) -> Result<BindRecordMap, FootprintError> {
        if method != self.method {
            return Err(FootprintError::Configuration(format!(
                "no {} predictions configured (have {})",
                method, self.method
            )));
        }

        let allele_records = self.records.get(allele);
        let records = peptides
            .iter()
            .map(|peptide| {
                allele_records
                    .and_then(|records| records.get(peptide))
                    .map(|record| (peptide.clone(), *record))
                    .ok_or_else(|| missing_binding_record(method, allele, peptide))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(BindRecordMap::new(method, allele.clone(), records))
    }
}
