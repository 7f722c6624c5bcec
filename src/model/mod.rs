//! Domain model of the cohort: HLA alleles, genotypes, and peptide pairs.

pub mod hla;
pub mod peptide;
pub mod tables;

pub use hla::{Allele, Genotype};
pub use peptide::{NeoPeptide, Peptide, PeptidePair, PeptidePairRecord, SelfPeptide, TumorBarcode};
pub use tables::{PeptidePairTable, TumorGenotypeTable};
