//! Reading and writing footprint files.

use std::{
    io::{BufRead, Write},
    path::Path,
};

use anyhow::Context;

use super::record::FootprintRecord;
use crate::{
    common::io::{open_read_maybe_gz, open_write_maybe_gz},
    err::FootprintError,
};

/// Writes footprint records line by line after the header.
pub struct FootprintWriter<W: Write> {
    inner: W,
    count: usize,
}

impl<W: Write> FootprintWriter<W> {
    /// Create a new writer and write the header line.
    pub fn new(mut inner: W) -> Result<Self, std::io::Error> {
        writeln!(inner, "{}", FootprintRecord::header())?;
        Ok(Self { inner, count: 0 })
    }

    pub fn write_record(&mut self, record: &FootprintRecord) -> Result<(), std::io::Error> {
        writeln!(self.inner, "{}", record.format())?;
        self.count += 1;
        Ok(())
    }

    /// Flush and return the number of records written.
    pub fn finish(mut self) -> Result<usize, std::io::Error> {
        self.inner.flush()?;
        Ok(self.count)
    }

    /// Return the number of records written and the underlying writer.
    pub fn into_inner(self) -> (usize, W) {
        (self.count, self.inner)
    }
}

/// Write `records` to `path`, replacing any existing file.
pub fn write_footprint_file<'a, P, I>(path: P, records: I) -> Result<usize, anyhow::Error>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a FootprintRecord>,
{
    let path = path.as_ref();
    let mut writer = FootprintWriter::new(
        open_write_maybe_gz(path)
            .map_err(|e| anyhow::anyhow!("cannot open {:?} for writing: {}", path, e))?,
    )?;
    for record in records {
        writer
            .write_record(record)
            .with_context(|| format!("writing to {:?} failed", path))?;
    }
    let (count, inner) = writer.into_inner();
    inner
        .finish()
        .with_context(|| format!("closing {:?} failed", path))?;
    Ok(count)
}

/// Read all records of a footprint file.
///
/// The header must match `FootprintRecord::header`; the first malformed line
/// fails the whole read.
pub fn read_footprint_file<P>(path: P) -> Result<Vec<FootprintRecord>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut lines = open_read_maybe_gz(path)
        .map_err(|e| anyhow::anyhow!("could not open file {:?} for reading: {}", path, e))?
        .lines();

    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| FootprintError::malformed("missing header", ""))?;
    if header.trim_end_matches('\r') != FootprintRecord::header() {
        return Err(FootprintError::malformed("unexpected header", &header))
            .with_context(|| format!("reading {:?} failed", path));
    }

    let mut result = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let line = line?;
        let record = FootprintRecord::parse(&line)
            .with_context(|| format!("line {} of {:?}", line_no + 2, path))?;
        result.push(record);
    }
    Ok(result)
}
