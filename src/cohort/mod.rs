//! Footprint computation over all tumors of a cohort.

use std::time::Instant;

use rayon::prelude::*;
use thousands::Separable;

use crate::{
    bind::{predictions::PredictionTable, BindingLookup},
    common::{self, trace_rss_now},
    conf::{load_conf, FootprintConf},
    err::FootprintError,
    footprint::{io::write_footprint_file, FootprintRecord, FootprintType},
    model::{PeptidePairTable, TumorBarcode, TumorGenotypeTable},
};

/// Command line arguments for the footprint computation.
#[derive(Debug, clap::Args)]
pub struct Args {
    /// Path(s) to TOML configuration file(s), later files override earlier ones.
    #[arg(required = true, num_args = 1..)]
    pub path_conf: Vec<String>,
    /// Set the number of threads to use, defaults to number of cores.
    #[arg(long)]
    pub num_threads: Option<usize>,
}

/// Result of processing a whole cohort.
#[derive(Debug, Default)]
pub struct CohortResult {
    /// All footprint records, in output order.
    pub records: Vec<FootprintRecord>,
    /// Number of tumor barcodes processed.
    pub num_barcodes: usize,
    /// Barcodes that failed and contributed no records.
    pub failed: Vec<TumorBarcode>,
    /// Number of barcodes that succeeded without producing records.
    pub num_empty: usize,
}

/// The outcome of one tumor barcode.
pub type BarcodeResult = (TumorBarcode, Result<Vec<FootprintRecord>, FootprintError>);

/// Computes the footprints of every tumor in a peptide pair table.
///
/// The tables are shared read-only between the worker threads.
pub struct CohortProcessor<'a, L: BindingLookup + ?Sized> {
    footprint_type: FootprintType,
    pair_table: &'a PeptidePairTable,
    genotype_table: &'a TumorGenotypeTable,
    lookup: &'a L,
}

impl<'a, L: BindingLookup + ?Sized> CohortProcessor<'a, L> {
    pub fn new(
        footprint_type: FootprintType,
        pair_table: &'a PeptidePairTable,
        genotype_table: &'a TumorGenotypeTable,
        lookup: &'a L,
    ) -> Self {
        Self {
            footprint_type,
            pair_table,
            genotype_table,
            lookup,
        }
    }

    /// Compute the records of a single tumor over all alleles of its patient.
    pub fn process_barcode(
        &self,
        barcode: &TumorBarcode,
    ) -> Result<Vec<FootprintRecord>, FootprintError> {
        tracing::info!("processing [{}]...", barcode);
        let alleles = self.genotype_table.require(barcode)?.view_unique_alleles();
        let pairs = self.pair_table.lookup(barcode);
        self.footprint_type
            .compute_all(self.lookup, &alleles, pairs)
    }

    /// Compute the records of all tumors in parallel on the current rayon
    /// thread pool, in sorted barcode order.
    pub fn compute_barcodes(&self) -> Vec<BarcodeResult> {
        let mut barcodes = self.pair_table.view_barcodes().collect::<Vec<_>>();
        barcodes.sort();

        barcodes
            .par_iter()
            .map(|barcode| ((*barcode).clone(), self.process_barcode(barcode)))
            .collect()
    }

    /// Process all tumors on the current rayon thread pool.
    pub fn process(&self) -> CohortResult {
        collect_results(self.compute_barcodes())
    }
}

/// Combine the per-tumor results of `compute_barcodes`.
///
/// A failing barcode is logged and contributes no records.  The records
/// are returned in their total order, independent of thread scheduling.
pub fn collect_results(per_barcode: Vec<BarcodeResult>) -> CohortResult {
    let mut result = CohortResult {
        num_barcodes: per_barcode.len(),
        ..Default::default()
    };
    for (barcode, records) in per_barcode {
        match records {
            Ok(records) if records.is_empty() => result.num_empty += 1,
            Ok(mut records) => result.records.append(&mut records),
            Err(e) => {
                tracing::warn!("skipping tumor {}: {}", barcode, e);
                result.failed.push(barcode);
            }
        }
    }
    result.records.sort();

    result
}

/// Run the computation described by `conf` and write the footprint file.
pub fn run_with_conf(conf: &FootprintConf) -> Result<CohortResult, anyhow::Error> {
    tracing::info!("Loading input tables...");
    let before_loading = Instant::now();
    let pair_table = PeptidePairTable::load(&conf.peptide_pair_file)?;
    let genotype_table =
        TumorGenotypeTable::load(&conf.tumor_patient_file, &conf.patient_genotype_file)?;
    let prediction_table = PredictionTable::load(
        &conf.prediction_file,
        conf.footprint_type.binding_method(),
    )?;
    tracing::info!(
        "... done loading {} peptide pairs and {} binding predictions in {:?}",
        pair_table.len().separate_with_commas(),
        prediction_table.len().separate_with_commas(),
        before_loading.elapsed()
    );
    trace_rss_now();

    let mut pool_builder = rayon::ThreadPoolBuilder::new();
    if let Some(num_threads) = conf.num_threads {
        pool_builder = pool_builder.num_threads(num_threads);
    }
    let pool = pool_builder
        .build()
        .map_err(|e| anyhow::anyhow!("building Rayon thread pool failed: {}", e))?;

    tracing::info!(
        "Computing {} footprints on {} threads...",
        conf.footprint_type,
        pool.current_num_threads()
    );
    let before_compute = Instant::now();
    let processor = CohortProcessor::new(
        conf.footprint_type,
        &pair_table,
        &genotype_table,
        &prediction_table,
    );
    // Logging of the per-tumor outcome happens on this thread.
    let result = collect_results(pool.install(|| processor.compute_barcodes()));
    tracing::info!(
        "... done computing {} records for {} tumors in {:?}",
        result.records.len().separate_with_commas(),
        result.num_barcodes.separate_with_commas(),
        before_compute.elapsed()
    );
    if !result.failed.is_empty() {
        tracing::warn!(
            "{} of {} tumors failed: {}",
            result.failed.len(),
            result.num_barcodes,
            result
                .failed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    if result.num_empty > 0 {
        tracing::info!("{} tumors produced no records", result.num_empty);
    }
    trace_rss_now();

    tracing::info!("Writing footprint file {:?}...", &conf.footprint_file);
    let before_writing = Instant::now();
    let count = write_footprint_file(&conf.footprint_file, &result.records)?;
    tracing::info!(
        "... done writing {} records in {:?}",
        count.separate_with_commas(),
        before_writing.elapsed()
    );

    Ok(result)
}

/// Main entry point for the footprint computation.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let mut conf = load_conf(&args.path_conf)?;
    if args.num_threads.is_some() {
        conf.num_threads = args.num_threads;
    }
    tracing::info!("conf = {:#?}", &conf);

    run_with_conf(&conf)?;

    tracing::info!("All of it took {:?}", before_anything.elapsed());
    tracing::info!("DONE!");
    Ok(())
}

#[cfg(test)]
mod test {
    use std::{
        path::{Path, PathBuf},
        sync::{Arc, Mutex},
    };

    use pretty_assertions::assert_eq;
    use temp_testdir::TempDir;

    use super::{run, run_with_conf, Args, CohortProcessor};
    use crate::{
        bind::{predictions::PredictionTable, BindingMethod},
        common,
        conf::FootprintConf,
        err::FootprintError,
        footprint::{io::read_footprint_file, FootprintType},
        model::{PeptidePairTable, TumorBarcode, TumorGenotypeTable},
    };

    #[rstest::fixture]
    fn tmp_dir() -> TempDir {
        TempDir::default()
    }

    fn conf(footprint_type: FootprintType, path_out: &Path) -> FootprintConf {
        let prediction_file = match footprint_type.binding_method() {
            BindingMethod::NetMhcPan => "tests/cohort/affinity.tsv",
            BindingMethod::NetMhcStabPan => "tests/cohort/stability.tsv",
        };
        FootprintConf {
            footprint_file: path_out.to_path_buf(),
            footprint_type,
            peptide_pair_file: PathBuf::from("tests/cohort/pairs.tsv"),
            tumor_patient_file: PathBuf::from("tests/cohort/tumor_patient.tsv"),
            patient_genotype_file: PathBuf::from("tests/cohort/patient_genotype.tsv"),
            prediction_file: PathBuf::from(prediction_file),
            num_threads: Some(2),
        }
    }

    #[rstest::rstest]
    #[case(FootprintType::LogStability, "tests/cohort/expected.stability.tsv")]
    #[case(FootprintType::LogAffinity, "tests/cohort/expected.affinity.tsv")]
    fn run_with_conf_writes_expected(
        tmp_dir: TempDir,
        #[case] footprint_type: FootprintType,
        #[case] path_expected: &str,
    ) -> Result<(), anyhow::Error> {
        let path_out = tmp_dir.join("footprint.tsv");

        let result = run_with_conf(&conf(footprint_type, &path_out))?;

        assert_eq!(result.num_barcodes, 4);
        assert_eq!(result.records.len(), 5);
        assert_eq!(
            std::fs::read_to_string(&path_out)?,
            std::fs::read_to_string(path_expected)?
        );

        Ok(())
    }

    #[rstest::rstest]
    fn run_is_deterministic(tmp_dir: TempDir) -> Result<(), anyhow::Error> {
        let path_first = tmp_dir.join("first.tsv");
        let path_second = tmp_dir.join("second.tsv");

        run_with_conf(&conf(FootprintType::LogStability, &path_first))?;
        let mut single_threaded = conf(FootprintType::LogStability, &path_second);
        single_threaded.num_threads = Some(1);
        run_with_conf(&single_threaded)?;

        assert!(file_diff::diff(
            path_first.to_str().expect("valid path"),
            path_second.to_str().expect("valid path")
        ));

        Ok(())
    }

    #[rstest::rstest]
    fn failing_tumors_are_isolated(tmp_dir: TempDir) -> Result<(), anyhow::Error> {
        let path_out = tmp_dir.join("footprint.tsv");

        let result = run_with_conf(&conf(FootprintType::LogStability, &path_out))?;

        // TumorC has no genotype, TumorD lacks a B0702 prediction.
        assert_eq!(
            result.failed,
            vec![TumorBarcode::new("TumorC"), TumorBarcode::new("TumorD")]
        );
        assert_eq!(result.num_empty, 0);
        let barcodes = read_footprint_file(&path_out)?
            .iter()
            .map(|record| record.peptide_pair_record().tumor_barcode().to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            barcodes,
            vec!["TumorA", "TumorA", "TumorA", "TumorA", "TumorB"]
        );

        Ok(())
    }

    #[test]
    #[tracing_test::traced_test]
    fn failures_are_logged() -> Result<(), anyhow::Error> {
        let pair_table = PeptidePairTable::load(Path::new("tests/cohort/pairs.tsv"))?;
        let genotype_table = TumorGenotypeTable::load(
            Path::new("tests/cohort/tumor_patient.tsv"),
            Path::new("tests/cohort/patient_genotype.tsv"),
        )?;
        let prediction_table = PredictionTable::load(
            Path::new("tests/cohort/stability.tsv"),
            BindingMethod::NetMhcStabPan,
        )?;
        let processor = CohortProcessor::new(
            FootprintType::LogStability,
            &pair_table,
            &genotype_table,
            &prediction_table,
        );

        let result = processor.process();

        assert_eq!(result.failed.len(), 2);
        assert!(logs_contain("skipping tumor TumorC: no genotype for tumor barcode TumorC"));
        assert!(logs_contain(
            "skipping tumor TumorD: no NET_MHC_STAB_PAN binding record"
        ));

        Ok(())
    }

    #[derive(Debug, clap::Parser)]
    struct TestCli {
        #[command(flatten)]
        args: Args,
    }

    #[test]
    fn parse_args() -> Result<(), anyhow::Error> {
        use clap::Parser;

        let cli =
            TestCli::try_parse_from(["neo-footprint", "--num-threads", "2", "a.toml", "b.toml"])?;

        assert_eq!(cli.args.path_conf, vec!["a.toml", "b.toml"]);
        assert_eq!(cli.args.num_threads, Some(2));
        assert!(TestCli::try_parse_from(["neo-footprint"]).is_err());

        Ok(())
    }

    /// Collects the output of a scoped log subscriber.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("not poisoned").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[rstest::rstest]
    fn failures_are_logged_with_thread_pool(tmp_dir: TempDir) -> Result<(), anyhow::Error> {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let buffer = buffer.clone();
                move || buffer.clone()
            })
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let mut conf = conf(FootprintType::LogStability, &tmp_dir.join("footprint.tsv"));
        conf.num_threads = Some(2);

        let result = tracing::subscriber::with_default(subscriber, || run_with_conf(&conf))?;

        assert_eq!(result.failed.len(), 2);
        let logs = String::from_utf8(buffer.0.lock().expect("not poisoned").clone())?;
        assert!(
            logs.contains("skipping tumor TumorC: no genotype for tumor barcode TumorC"),
            "{}",
            logs
        );
        assert!(
            logs.contains("skipping tumor TumorD: no NET_MHC_STAB_PAN binding record"),
            "{}",
            logs
        );

        Ok(())
    }

    #[test]
    fn process_barcode_missing_genotype() -> Result<(), anyhow::Error> {
        let pair_table = PeptidePairTable::load(Path::new("tests/cohort/pairs.tsv"))?;
        let genotype_table = TumorGenotypeTable::load(
            Path::new("tests/cohort/tumor_patient.tsv"),
            Path::new("tests/cohort/patient_genotype.tsv"),
        )?;
        let prediction_table = PredictionTable::new(BindingMethod::NetMhcStabPan);
        let processor = CohortProcessor::new(
            FootprintType::LogStability,
            &pair_table,
            &genotype_table,
            &prediction_table,
        );

        assert_eq!(
            processor
                .process_barcode(&TumorBarcode::new("TumorC"))
                .unwrap_err(),
            FootprintError::MissingGenotype("TumorC".into())
        );

        Ok(())
    }

    #[rstest::rstest]
    fn missing_input_table_is_fatal(tmp_dir: TempDir) {
        let path_out = tmp_dir.join("footprint.tsv");
        let mut conf = conf(FootprintType::LogStability, &path_out);
        conf.peptide_pair_file = PathBuf::from("tests/cohort/does-not-exist.tsv");

        let err = run_with_conf(&conf).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<FootprintError>(),
            Some(FootprintError::TableLoad { .. })
        ));
        assert!(!path_out.exists());
    }

    #[rstest::rstest]
    fn run_from_config_files(tmp_dir: TempDir) -> Result<(), anyhow::Error> {
        let base = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/cohort");
        let path_out = tmp_dir.join("footprint.tsv");
        let path_conf = tmp_dir.join("footprint.toml");
        std::fs::write(
            &path_conf,
            format!(
                "footprint_file = {:?}\n\
                 footprint_type = \"LOG_AFFINITY\"\n\
                 peptide_pair_file = {:?}\n\
                 tumor_patient_file = {:?}\n\
                 patient_genotype_file = {:?}\n\
                 affinity_file = {:?}\n",
                path_out.to_string_lossy(),
                base.join("pairs.tsv").to_string_lossy(),
                base.join("tumor_patient.tsv").to_string_lossy(),
                base.join("patient_genotype.tsv").to_string_lossy(),
                base.join("affinity.tsv").to_string_lossy(),
            ),
        )?;

        run(
            &common::Args::default(),
            &Args {
                path_conf: vec![path_conf.to_string_lossy().to_string()],
                num_threads: Some(1),
            },
        )?;

        assert!(file_diff::diff(
            path_out.to_str().expect("valid path"),
            "tests/cohort/expected.affinity.tsv"
        ));

        Ok(())
    }

    #[rstest::rstest]
    fn run_with_incomplete_config_fails(tmp_dir: TempDir) {
        let path_conf = tmp_dir.join("footprint.toml");
        std::fs::write(&path_conf, "footprint_type = \"LOG_STABILITY\"\n").expect("writable");

        let err = run(
            &common::Args::default(),
            &Args {
                path_conf: vec![path_conf.to_string_lossy().to_string()],
                num_threads: None,
            },
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<FootprintError>(),
            Some(FootprintError::Configuration(_))
        ));
    }
}
