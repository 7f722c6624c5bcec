//! Cohort input tables: peptide pairs by tumor and genotypes by tumor.

use std::{
    collections::{hash_map::Entry, HashMap},
    path::Path,
    time::Instant,
};

use indexmap::IndexMap;
use thousands::Separable;

use super::{
    hla::Genotype,
    peptide::{input, PeptidePairRecord, TumorBarcode},
};
use crate::{common::io::open_tsv_reader, err::FootprintError};

/// Peptide pair records grouped by tumor barcode, in file order.
#[derive(Debug, Default, Clone)]
pub struct PeptidePairTable {
    records: IndexMap<TumorBarcode, Vec<PeptidePairRecord>>,
}

impl PeptidePairTable {
    /// Build table from records, keeping their order within each barcode.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = PeptidePairRecord>,
    {
        let mut result = Self::default();
        for record in records {
            result
                .records
                .entry(record.tumor_barcode().clone())
                .or_default()
                .push(record);
        }
        result
    }

    /// Load table from a tab-separated peptide pair file.
    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<Self, FootprintError> {
        tracing::debug!("loading peptide pairs from {:?}", path);
        let before_loading = Instant::now();

        let mut reader =
            open_tsv_reader(path).map_err(|e| FootprintError::table_load(path, e))?;
        let mut records = Vec::new();
        for record in reader.deserialize::<input::Record>() {
            let record = record.map_err(|e| FootprintError::table_load(path, e))?;
            records.push(
                PeptidePairRecord::try_from(record)
                    .map_err(|e| FootprintError::table_load(path, e))?,
            );
        }
        let count = records.len();
        let result = Self::from_records(records);

        tracing::debug!(
            "... done loading {} peptide pairs for {} tumors in {:?}",
            count.separate_with_commas(),
            result.records.len().separate_with_commas(),
            before_loading.elapsed()
        );
        Ok(result)
    }

    /// The distinct tumor barcodes, in file order.
    pub fn view_barcodes(&self) -> impl Iterator<Item = &TumorBarcode> + '_ {
        self.records.keys()
    }

    /// The peptide pairs of `barcode`, empty if the barcode is unknown.
    pub fn lookup(&self, barcode: &TumorBarcode) -> &[PeptidePairRecord] {
        self.records
            .get(barcode)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of peptide pair records.
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Input records as read from the tumor and genotype files.
pub mod input_genotypes {
    use serde::Deserialize;

    /// One line of the tumor-to-patient file.
    #[derive(Debug, Deserialize, Clone)]
    pub struct TumorPatient {
        #[serde(rename = "Tumor_Barcode")]
        pub tumor_barcode: String,
        #[serde(rename = "Patient_Barcode")]
        pub patient_barcode: String,
    }

    /// One line of the patient genotype file.
    #[derive(Debug, Deserialize, Clone)]
    pub struct PatientGenotype {
        #[serde(rename = "Patient_Barcode")]
        pub patient_barcode: String,
        /// Comma-separated allele list.
        #[serde(rename = "Genotype")]
        pub genotype: String,
    }
}

/// Genotypes of the cohort, reachable by tumor barcode.
#[derive(Debug, Default, Clone)]
pub struct TumorGenotypeTable {
    tumor_patients: HashMap<TumorBarcode, String>,
    patient_genotypes: HashMap<String, Genotype>,
}

impl TumorGenotypeTable {
    /// Build from in-memory mappings.
    pub fn new(
        tumor_patients: HashMap<TumorBarcode, String>,
        patient_genotypes: HashMap<String, Genotype>,
    ) -> Self {
        Self {
            tumor_patients,
            patient_genotypes,
        }
    }

    /// Load from the tumor-to-patient file and the patient genotype file.
    #[tracing::instrument]
    pub fn load(
        path_tumor_patient: &Path,
        path_patient_genotype: &Path,
    ) -> Result<Self, FootprintError> {
        tracing::debug!(
            "loading genotypes from {:?} and {:?}",
            path_tumor_patient,
            path_patient_genotype
        );
        let before_loading = Instant::now();

        let mut tumor_patients = HashMap::new();
        let mut reader = open_tsv_reader(path_tumor_patient)
            .map_err(|e| FootprintError::table_load(path_tumor_patient, e))?;
        for record in reader.deserialize::<input_genotypes::TumorPatient>() {
            let record = record.map_err(|e| FootprintError::table_load(path_tumor_patient, e))?;
            match tumor_patients.entry(TumorBarcode::new(record.tumor_barcode)) {
                Entry::Occupied(entry) if *entry.get() != record.patient_barcode => {
                    return Err(FootprintError::table_load(
                        path_tumor_patient,
                        format!("tumor {} mapped to more than one patient", entry.key()),
                    ));
                }
                Entry::Occupied(_) => (),
                Entry::Vacant(entry) => {
                    entry.insert(record.patient_barcode);
                }
            }
        }

        let mut patient_genotypes = HashMap::new();
        let mut reader = open_tsv_reader(path_patient_genotype)
            .map_err(|e| FootprintError::table_load(path_patient_genotype, e))?;
        for record in reader.deserialize::<input_genotypes::PatientGenotype>() {
            let record =
                record.map_err(|e| FootprintError::table_load(path_patient_genotype, e))?;
            let genotype: Genotype = record
                .genotype
                .parse()
                .map_err(|e| FootprintError::table_load(path_patient_genotype, e))?;
            match patient_genotypes.entry(record.patient_barcode) {
                Entry::Occupied(entry) => {
                    return Err(FootprintError::table_load(
                        path_patient_genotype,
                        format!("duplicate genotype for patient {}", entry.key()),
                    ));
                }
                Entry::Vacant(entry) => {
                    entry.insert(genotype);
                }
            }
        }

        tracing::debug!(
            "... done loading {} tumors and {} genotypes in {:?}",
            tumor_patients.len().separate_with_commas(),
            patient_genotypes.len().separate_with_commas(),
            before_loading.elapsed()
        );
        Ok(Self::new(tumor_patients, patient_genotypes))
    }

    /// The genotype of the patient that `barcode` belongs to.
    pub fn require(&self, barcode: &TumorBarcode) -> Result<&Genotype, FootprintError> {
        self.tumor_patients
            .get(barcode)
            .and_then(|patient| self.patient_genotypes.get(patient))
            .ok_or_else(|| FootprintError::MissingGenotype(barcode.to_string()))
    }
}
