//! The result of one footprint index calculation and its flat-file encoding.

use std::cmp::Ordering;

use super::index::FootprintType;
use crate::{
    bind::BindRecord,
    err::FootprintError,
    model::{peptide::PAIR_RECORD_COLUMNS, Allele, PeptidePairRecord},
};

/// Field delimiter of footprint files.
pub const DELIM: char = '\t';

/// Column names following the peptide pair columns.
pub const FOOTPRINT_COLUMNS: &[&str] = &[
    "Patient_Allele",
    "Footprint_Type",
    "Neo_Binding_Qty",
    "Neo_Binding_Pct",
    "Self_Binding_Qty",
    "Self_Binding_Pct",
    "Footprint_Index",
];

/// Number of fields in one footprint line.
pub const FIELD_COUNT: usize = PAIR_RECORD_COLUMNS.len() + FOOTPRINT_COLUMNS.len();

/// Footprint index of one peptide pair for one HLA allele.
///
/// Records are ordered by peptide pair provenance, then allele, then
/// footprint type; the numeric fields break any remaining ties.
#[derive(Debug, Clone)]
pub struct FootprintRecord {
    pair_record: PeptidePairRecord,
    patient_allele: Allele,
    footprint_type: FootprintType,
    neo_binding_qty: f64,
    neo_binding_pct: f64,
    self_binding_qty: f64,
    self_binding_pct: f64,
    footprint_index: f64,
}

impl FootprintRecord {
    /// Create a record from the binding records of the neo- and self-peptide.
    pub fn new(
        pair_record: PeptidePairRecord,
        patient_allele: Allele,
        footprint_type: FootprintType,
        neo_bind_record: &BindRecord,
        self_bind_record: &BindRecord,
        footprint_index: f64,
    ) -> Self {
        Self {
            pair_record,
            patient_allele,
            footprint_type,
            neo_binding_qty: neo_bind_record.strength(),
            neo_binding_pct: neo_bind_record.percentile(),
            self_binding_qty: self_bind_record.strength(),
            self_binding_pct: self_bind_record.percentile(),
            footprint_index,
        }
    }

    /// The header line of footprint files.
    pub fn header() -> String {
        let mut columns = vec![PeptidePairRecord::header(DELIM)];
        columns.extend(FOOTPRINT_COLUMNS.iter().map(|c| c.to_string()));
        columns.join(&DELIM.to_string())
    }

    /// Format for output to a footprint file.
    pub fn format(&self) -> String {
        format!(
            "{pair}{d}{allele}{d}{ftype}{d}{:.2}{d}{:.2}{d}{:.2}{d}{:.2}{d}{:.4}",
            self.neo_binding_qty,
            self.neo_binding_pct,
            self.self_binding_qty,
            self.self_binding_pct,
            self.footprint_index,
            pair = self.pair_record.format(DELIM),
            allele = self.patient_allele.short_key(),
            ftype = self.footprint_type,
            d = DELIM,
        )
    }

    /// Parse a line written by `format`.
    pub fn parse(line: &str) -> Result<Self, FootprintError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let fields = line.split(DELIM).collect::<Vec<_>>();
        if fields.len() != FIELD_COUNT {
            return Err(FootprintError::malformed(
                format!("expected {} fields, found {}", FIELD_COUNT, fields.len()),
                line,
            ));
        }

        let pair_record = PeptidePairRecord::parse_fields(&fields[..PAIR_RECORD_COLUMNS.len()])
            .map_err(|e| FootprintError::malformed(e, line))?;
        let patient_allele: Allele = fields[6]
            .parse()
            .map_err(|e| FootprintError::malformed(e, line))?;
        let footprint_type: FootprintType = fields[7].parse().map_err(|_| {
            FootprintError::malformed(format!("invalid footprint type {:?}", fields[7]), line)
        })?;
        let number = |idx: usize| -> Result<f64, FootprintError> {
            fields[idx].parse::<f64>().map_err(|_| {
                FootprintError::malformed(
                    format!("invalid number {:?} for {}", fields[idx], FOOTPRINT_COLUMNS[idx - 6]),
                    line,
                )
            })
        };

        Ok(Self {
            pair_record,
            patient_allele,
            footprint_type,
            neo_binding_qty: number(8)?,
            neo_binding_pct: number(9)?,
            self_binding_qty: number(10)?,
            self_binding_pct: number(11)?,
            footprint_index: number(12)?,
        })
    }

    pub fn peptide_pair_record(&self) -> &PeptidePairRecord {
        &self.pair_record
    }

    pub fn patient_allele(&self) -> &Allele {
        &self.patient_allele
    }

    pub fn footprint_type(&self) -> FootprintType {
        self.footprint_type
    }

    /// Neo-peptide binding strength (IC50 or half-life).
    pub fn neo_binding_qty(&self) -> f64 {
        self.neo_binding_qty
    }

    pub fn neo_binding_pct(&self) -> f64 {
        self.neo_binding_pct
    }

    /// Self-peptide binding strength (IC50 or half-life).
    pub fn self_binding_qty(&self) -> f64 {
        self.self_binding_qty
    }

    pub fn self_binding_pct(&self) -> f64 {
        self.self_binding_pct
    }

    pub fn footprint_index(&self) -> f64 {
        self.footprint_index
    }
}

impl Ord for FootprintRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pair_record
            .cmp(&other.pair_record)
            .then_with(|| self.patient_allele.cmp(&other.patient_allele))
            .then_with(|| self.footprint_type.cmp(&other.footprint_type))
            .then_with(|| self.neo_binding_qty.total_cmp(&other.neo_binding_qty))
            .then_with(|| self.neo_binding_pct.total_cmp(&other.neo_binding_pct))
            .then_with(|| self.self_binding_qty.total_cmp(&other.self_binding_qty))
            .then_with(|| self.self_binding_pct.total_cmp(&other.self_binding_pct))
            .then_with(|| self.footprint_index.total_cmp(&other.footprint_index))
    }
}

impl PartialOrd for FootprintRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FootprintRecord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FootprintRecord {}
