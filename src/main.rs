//! Neo-antigen footprint main executable

pub mod bind;
pub mod cohort;
pub mod common;
pub mod conf;
pub mod err;
pub mod footprint;
pub mod model;

use std::process::{ExitCode, Termination};

use clap::Parser;
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Neo-antigen allele footprints",
    long_about = "This tool computes the allele footprint index of neo-antigen peptide pairs \
                  for all tumors of a cohort"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// Arguments of the footprint computation
    #[command(flatten)]
    args: cohort::Args,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector process-wide so rayon worker threads log as well.
    let term = Term::stderr();
    let result = tracing::subscriber::set_global_default(collector)
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber failed: {}", e))
        .and_then(|()| cohort::run(&cli.common, &cli.args));

    match result {
        Ok(()) => {
            let _ = term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")));
            ExitCode::SUCCESS
        }
        Err(e) => {
            let _ = term.write_line(&format!("Error: {:?}", e));
            match e.downcast_ref::<err::FootprintError>() {
                Some(footprint_err) => footprint_err.clone().report(),
                None => ExitCode::FAILURE,
            }
        }
    }
}
