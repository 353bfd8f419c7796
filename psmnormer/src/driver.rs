use std::io;
use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use psmnorm::{PipelineError, ProcessingParams, ResultsProcessor};

use crate::args::{non_negative_float, ArgEngineVariant, ArgTieBreak};

#[derive(Debug, Error)]
pub enum PsmNormalizerError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error(transparent)]
    PipelineError(#[from] PipelineError),
    #[error("Failed to load the configuration: {0}")]
    ConfigurationError(#[from] figment::Error),
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".")
}

/// Normalize, rank and filter peptide search engine results.
///
/// Read a tab-delimited result file, rewrite its peptides into a canonical notation with
/// modification symbols, recompute masses and precursor errors, and write synopsis and
/// first-hits files.
#[derive(Parser, Debug, Deserialize, Serialize)]
#[command(author, version)]
pub struct PsmNormalizer {
    /// The path to read search results from, optionally gzip compressed
    #[arg()]
    pub input_file: PathBuf,

    /// The directory to write output files to
    #[arg(short = 'o', long = "output-directory", default_value = ".")]
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `psmnormer.toml` in the working directory.
    /// Environment variables prefixed with `PSMNORMER_` will be read too.
    #[arg(long = "config-file")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,

    /// The search engine that produced the input, overriding the configuration
    #[arg(short = 'e', long = "engine")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<ArgEngineVariant>,

    /// The maximum spectrum level score for a match to enter the synopsis
    #[arg(short = 's', long = "primary-threshold", value_parser = non_negative_float)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_threshold: Option<f64>,

    /// The maximum database level score for a match to enter the synopsis
    #[arg(short = 'S', long = "secondary-threshold", value_parser = non_negative_float)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_threshold: Option<f64>,

    /// The precursor mass tolerance of the search in ppm, used to detect implausible errors
    #[arg(short = 'p', long = "precursor-tolerance", value_parser = non_negative_float)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precursor_tolerance: Option<f64>,

    /// How to resolve a mass matched equally well by a static and a dynamic modification
    #[arg(long = "tie-break")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tie_break: Option<ArgTieBreak>,

    /// Do not write the first-hits file
    #[arg(long = "no-first-hits")]
    #[serde(default)]
    pub no_first_hits: bool,

    #[arg(skip)]
    #[serde(default)]
    pub params: ProcessingParams,
}

impl PsmNormalizer {
    /// The configured parameters with command line overrides applied
    pub fn effective_params(&self) -> ProcessingParams {
        let mut params = self.params.clone();
        if let Some(engine) = self.engine {
            params.engine = engine.into();
        }
        if let Some(threshold) = self.primary_threshold {
            params.synopsis_primary_threshold = threshold;
        }
        if let Some(threshold) = self.secondary_threshold {
            params.synopsis_secondary_threshold = threshold;
        }
        if let Some(tolerance) = self.precursor_tolerance {
            params.precursor_tolerance_ppm = tolerance;
        }
        if let Some(tie_break) = self.tie_break {
            params.tie_break = tie_break.into();
        }
        if self.no_first_hits {
            params.create_first_hits = false;
        }
        params
    }

    pub fn main(&self) -> Result<(), PsmNormalizerError> {
        info!(
            "psmnormer v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        info!("Input: {}", self.input_file.display());
        info!("Output: {}", self.output_directory.display());

        let params = self.effective_params();
        info!("Engine: {}", params.engine);
        debug!(
            "Synopsis thresholds: {} / {}",
            params.synopsis_primary_threshold, params.synopsis_secondary_threshold
        );
        if params.modifications.is_empty() {
            warn!("No modifications are configured, mass annotations will be left as written");
        }

        let processor = ResultsProcessor::new(params)?;
        let summary = processor.process_file(&self.input_file, &self.output_directory)?;

        info!("Lines Read: {}", summary.lines_read);
        info!("Lines Skipped: {}", summary.lines_skipped);
        info!("Results Parsed: {}", summary.results_parsed);
        info!(
            "Unresolved Mass Shifts: {} | Precursor Errors Recomputed: {}",
            summary.unresolved_mass_shifts, summary.ppm_recomputed
        );
        info!("Scan Groups: {}", summary.scan_groups);
        info!("Synopsis Results: {}", summary.synopsis_results);
        info!("First Hits Results: {}", summary.first_hits_results);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_overrides() {
        let driver = PsmNormalizer::parse_from([
            "psmnormer",
            "input.tsv",
            "-e",
            "msgfdb",
            "-s",
            "1e-9",
            "--tie-break",
            "prefer-static",
            "--no-first-hits",
        ]);
        let params = driver.effective_params();
        assert_eq!(params.engine, psmnorm::EngineVariant::MsgfDb);
        assert_eq!(params.synopsis_primary_threshold, 1e-9);
        assert_eq!(params.synopsis_secondary_threshold, 0.75);
        assert_eq!(params.tie_break, psmnorm::StaticDynamicTieBreak::PreferStatic);
        assert!(!params.create_first_hits);
        assert_eq!(driver.output_directory, PathBuf::from("."));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let result = PsmNormalizer::try_parse_from(["psmnormer", "input.tsv", "-s", "-1"]);
        assert!(result.is_err());
    }
}
