//! Error types for footprint computation.

use std::{
    path::PathBuf,
    process::{ExitCode, Termination},
};

/// Errors raised by the footprint model, tables, and record codec.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FootprintError {
    /// A required configuration value is absent or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// An input table is missing or malformed.
    #[error("could not load table {path:?}: {msg}")]
    TableLoad { path: PathBuf, msg: String },
    /// A tumor barcode has no genotype entry.
    #[error("no genotype for tumor barcode {0}")]
    MissingGenotype(String),
    /// A peptide has no binding prediction.
    #[error("no {method} binding record for peptide {peptide} and allele {allele}")]
    MissingBindingRecord {
        method: String,
        allele: String,
        peptide: String,
    },
    /// A persisted footprint line does not parse.
    #[error("malformed footprint record line ({reason}): {line:?}")]
    MalformedRecordLine { reason: String, line: String },
    /// Invalid value for one of the model types.
    #[error("invalid {kind}: {value:?}")]
    InvalidValue { kind: &'static str, value: String },
}

impl FootprintError {
    /// Shortcut for building a `TableLoad` error.
    pub fn table_load<P, M>(path: P, msg: M) -> Self
    where
        P: Into<PathBuf>,
        M: std::fmt::Display,
    {
        FootprintError::TableLoad {
            path: path.into(),
            msg: msg.to_string(),
        }
    }

    /// Shortcut for building a `MalformedRecordLine` error.
    pub fn malformed<R>(reason: R, line: &str) -> Self
    where
        R: std::fmt::Display,
    {
        FootprintError::MalformedRecordLine {
            reason: reason.to_string(),
            line: line.to_string(),
        }
    }
}

impl Termination for FootprintError {
    fn report(self) -> ExitCode {
        match self {
            FootprintError::Configuration(_) => ExitCode::from(2),
            _ => ExitCode::from(1),
        }
    }
}

#[cfg(test)]
mod test {
    use super::FootprintError;

    #[test]
    fn display_missing_binding_record() {
        let err = FootprintError::MissingBindingRecord {
            method: "NET_MHC_PAN".into(),
            allele: "A0101".into(),
            peptide: "FLASPMHAV".into(),
        };

        insta::assert_snapshot!(
            err.to_string(),
            @"no NET_MHC_PAN binding record for peptide FLASPMHAV and allele A0101"
        );
    }

    #[test]
    fn display_table_load() {
        let err = FootprintError::table_load("pairs.tsv", "no such file");

        insta::assert_snapshot!(
            err.to_string(),
            @r#"could not load table "pairs.tsv": no such file"#
        );
    }
}
