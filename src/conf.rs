//! Run configuration, read from one or more TOML files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    bind::BindingMethod, common::expand_path, err::FootprintError, footprint::FootprintType,
};

/// The settings of a single configuration file; all keys are optional.
///
/// Keys not listed here are ignored so that files may be shared with other
/// tools.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct PartialConf {
    /// Path to the output footprint file.
    pub footprint_file: Option<String>,
    /// The footprint calculation type.
    pub footprint_type: Option<FootprintType>,
    /// Path to the input peptide pair file.
    pub peptide_pair_file: Option<String>,
    /// Path to the file mapping tumor barcodes to patients.
    pub tumor_patient_file: Option<String>,
    /// Path to the file with patient HLA genotypes.
    pub patient_genotype_file: Option<String>,
    /// Path to precomputed binding affinity predictions.
    pub affinity_file: Option<String>,
    /// Path to precomputed binding stability predictions.
    pub stability_file: Option<String>,
    /// Number of worker threads, defaults to the available parallelism.
    pub num_threads: Option<usize>,
}

impl PartialConf {
    /// Read one configuration file.
    pub fn from_path(path: &Path) -> Result<Self, FootprintError> {
        let toml_str = std::fs::read_to_string(path).map_err(|e| {
            FootprintError::Configuration(format!("could not read {:?}: {}", path, e))
        })?;
        toml::from_str(&toml_str).map_err(|e| {
            FootprintError::Configuration(format!("could not parse {:?}: {}", path, e))
        })
    }

    /// Overlay `other` on top of `self`; values set in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            footprint_file: other.footprint_file.or(self.footprint_file),
            footprint_type: other.footprint_type.or(self.footprint_type),
            peptide_pair_file: other.peptide_pair_file.or(self.peptide_pair_file),
            tumor_patient_file: other.tumor_patient_file.or(self.tumor_patient_file),
            patient_genotype_file: other.patient_genotype_file.or(self.patient_genotype_file),
            affinity_file: other.affinity_file.or(self.affinity_file),
            stability_file: other.stability_file.or(self.stability_file),
            num_threads: other.num_threads.or(self.num_threads),
        }
    }

    /// Check that all required values are present and build the final
    /// configuration.
    pub fn resolve(self) -> Result<FootprintConf, FootprintError> {
        fn required<T>(value: Option<T>, key: &str) -> Result<T, FootprintError> {
            value.ok_or_else(|| {
                FootprintError::Configuration(format!("missing required key `{}`", key))
            })
        }
        fn required_path(value: Option<String>, key: &str) -> Result<PathBuf, FootprintError> {
            let value = required(value, key)?;
            if value.trim().is_empty() {
                return Err(FootprintError::Configuration(format!(
                    "empty value for key `{}`",
                    key
                )));
            }
            Ok(expand_path(value.trim()))
        }

        let footprint_type = required(self.footprint_type, "footprint_type")?;
        let prediction_file = match footprint_type.binding_method() {
            BindingMethod::NetMhcPan => required_path(self.affinity_file, "affinity_file")?,
            BindingMethod::NetMhcStabPan => required_path(self.stability_file, "stability_file")?,
        };
        if self.num_threads == Some(0) {
            return Err(FootprintError::Configuration(
                "`num_threads` must be positive".to_string(),
            ));
        }

        Ok(FootprintConf {
            footprint_file: required_path(self.footprint_file, "footprint_file")?,
            footprint_type,
            peptide_pair_file: required_path(self.peptide_pair_file, "peptide_pair_file")?,
            tumor_patient_file: required_path(self.tumor_patient_file, "tumor_patient_file")?,
            patient_genotype_file: required_path(
                self.patient_genotype_file,
                "patient_genotype_file",
            )?,
            prediction_file,
            num_threads: self.num_threads,
        })
    }
}

/// The resolved configuration of one footprint run.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FootprintConf {
    pub footprint_file: PathBuf,
    pub footprint_type: FootprintType,
    pub peptide_pair_file: PathBuf,
    pub tumor_patient_file: PathBuf,
    pub patient_genotype_file: PathBuf,
    /// Predictions for the binding method of `footprint_type`.
    pub prediction_file: PathBuf,
    pub num_threads: Option<usize>,
}

/// Read and merge the configuration files in order, then resolve.
pub fn load_conf<P>(paths: &[P]) -> Result<FootprintConf, FootprintError>
where
    P: AsRef<Path>,
{
    if paths.is_empty() {
        return Err(FootprintError::Configuration(
            "no configuration file given".to_string(),
        ));
    }
    let mut conf = PartialConf::default();
    for path in paths {
        tracing::debug!("reading configuration from {:?}", path.as_ref());
        conf = conf.merge(PartialConf::from_path(path.as_ref())?);
    }
    conf.resolve()
}
