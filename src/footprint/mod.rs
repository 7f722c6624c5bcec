//! Allele footprint index: calculation types, result records, and files.

pub mod index;
pub mod io;
pub mod record;

pub use index::FootprintType;
pub use record::FootprintRecord;
