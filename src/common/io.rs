//! Common, IO-related code.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use flate2::{bufread::MultiGzDecoder, write::GzEncoder, Compression};

/// Transparently open a file with gzip decoder.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for reading", path.as_ref());
        let file = File::open(path)?;
        let bufreader = BufReader::new(file);
        let decoder = MultiGzDecoder::new(bufreader);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("Opening {:?} as plain text for reading", path.as_ref());
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// A plain or gzip-compressed output file.
///
/// Must be closed with `finish`, which writes the gzip trailer and reports
/// errors that dropping would swallow.
pub enum MaybeGzWriter {
    Plain(BufWriter<File>),
    Gz(GzEncoder<BufWriter<File>>),
}

impl MaybeGzWriter {
    /// Write any pending data, including the gzip trailer, to the file.
    pub fn finish(self) -> Result<(), std::io::Error> {
        match self {
            MaybeGzWriter::Plain(mut writer) => writer.flush(),
            MaybeGzWriter::Gz(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for MaybeGzWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            MaybeGzWriter::Plain(writer) => writer.write(buf),
            MaybeGzWriter::Gz(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            MaybeGzWriter::Plain(writer) => writer.flush(),
            MaybeGzWriter::Gz(encoder) => encoder.flush(),
        }
    }
}

/// Transparently open a file with gzip encoder.
///
/// An existing file at `path` is truncated.
pub fn open_write_maybe_gz<P>(path: P) -> Result<MaybeGzWriter, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for writing", path.as_ref());
        let file = File::create(path)?;
        let bufwriter = BufWriter::new(file);
        let encoder = GzEncoder::new(bufwriter, Compression::default());
        Ok(MaybeGzWriter::Gz(encoder))
    } else {
        tracing::trace!("Opening {:?} as plain text for writing", path.as_ref());
        let file = File::create(path)?;
        Ok(MaybeGzWriter::Plain(BufWriter::new(file)))
    }
}

/// Open a tab-separated file with header line for `serde` deserialization.
pub fn open_tsv_reader<P>(path: P) -> Result<csv::Reader<Box<dyn BufRead>>, anyhow::Error>
where
    P: AsRef<Path>,
{
    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(open_read_maybe_gz(path)?))
}

#[cfg(test)]
mod test {
    use std::io::{BufRead, Read, Write};

    #[rstest::rstest]
    #[case("lines.txt")]
    #[case("lines.txt.gz")]
    fn write_then_read_maybe_gz(#[case] filename: &str) -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();

        {
            let mut f = super::open_write_maybe_gz(tmp_dir.join(filename))?;
            writeln!(f, "first")?;
            writeln!(f, "second")?;
            f.finish()?;
        }

        let lines = super::open_read_maybe_gz(tmp_dir.join(filename))?
            .lines()
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);

        Ok(())
    }

    #[test]
    fn open_write_maybe_gz_compresses() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("out.tsv.gz");

        let mut f = super::open_write_maybe_gz(&path)?;
        f.write_all(b"payload\n")?;
        f.finish()?;

        let buf = std::fs::read(&path)?;
        assert_eq!(&buf[..2], &[0x1f, 0x8b]);
        // The single-member decoder fails on a missing or corrupt trailer.
        let mut decoded = String::new();
        flate2::read::GzDecoder::new(&buf[..]).read_to_string(&mut decoded)?;
        assert_eq!(decoded, "payload\n");

        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[rstest::rstest]
    #[case("full.tsv")]
    #[case("full.tsv.gz")]
    fn finish_reports_write_errors(#[case] filename: &str) -> Result<(), anyhow::Error> {
        if !std::path::Path::new("/dev/full").exists() {
            return Ok(());
        }
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join(filename);
        std::os::unix::fs::symlink("/dev/full", &path)?;

        let mut f = super::open_write_maybe_gz(&path)?;
        f.write_all(b"payload\n")?;

        assert!(f.finish().is_err());

        Ok(())
    }

    #[test]
    fn open_tsv_reader_skips_comment_lines() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("table.tsv");
        std::fs::write(&path, "Name\tValue\n# comment\nfirst\t1\n#second\t2\n third \t3\n")?;

        let rows = super::open_tsv_reader(&path)?
            .records()
            .map(|record| record.map(|record| record[0].to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(rows, vec!["first".to_string(), "third".to_string()]);

        Ok(())
    }

    #[test]
    fn open_read_maybe_gz_missing_file() {
        assert!(super::open_read_maybe_gz("tests/common/does-not-exist.tsv").is_err());
    }
}
