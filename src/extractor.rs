//! Board × algorithm × iteration grid walk producing the tabular dataset.
use std::path::PathBuf;

use crate::config::{ExtractConfig, OutputFormat};
use crate::data::calibration::CalibrationTable;
use crate::data::filter::Decimator;
use crate::data::loader::{list_raw_files, load_calibration_table, read_raw_file};
use crate::data::model::{Record, SourceKey};
use crate::error::{BuildError, Result};
use crate::storage::RecordSink;

/// What an extraction run produced.
#[derive(Debug, Default, Clone)]
pub struct ExtractSummary {
    pub files_processed: usize,
    pub records_written: usize,
    pub outputs: Vec<PathBuf>,
}

pub struct Extractor {
    config: ExtractConfig,
    calibration: Option<CalibrationTable>,
}

impl Extractor {
    /// Validate `config` and, when normalization is on, load its calibration table.
    pub fn from_config(config: ExtractConfig) -> Result<Self> {
        config.validate()?;
        let calibration = match (&config.calibration_table, config.normalize) {
            (Some(path), true) => Some(load_calibration_table(path)?),
            _ => None,
        };
        Self::new(config, calibration)
    }

    pub fn new(config: ExtractConfig, calibration: Option<CalibrationTable>) -> Result<Self> {
        config.validate()?;
        if config.normalize && calibration.is_none() {
            return Err(BuildError::Config(
                "T-V normalization requested but no calibration table was loaded".to_string(),
            ));
        }
        let calibration = calibration.filter(|_| config.normalize);
        Ok(Self {
            config,
            calibration,
        })
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Walk the grid in board, algorithm, iteration order and hand the
    /// records to `sink`.
    ///
    /// In multiple-file mode each source file is flushed as soon as it is
    /// parsed, so a failure leaves the files of earlier sources in place.
    pub fn run(&self, sink: &mut dyn RecordSink) -> Result<ExtractSummary> {
        let config = &self.config;
        if !config.base_dir.is_dir() {
            return Err(BuildError::MissingInput(config.base_dir.clone()));
        }

        let mut decimator = Decimator::new(config.decimation);
        let mut unified: Vec<Record> = Vec::new();
        let mut summary = ExtractSummary::default();

        for board in 1..=config.boards {
            if config.excluded_boards.contains(&board) {
                log::debug!("Board {board} discarded");
                continue;
            }
            let calibration = match &self.calibration {
                Some(table) => Some(table.lookup(board)?),
                None => None,
            };

            for algorithm in 1..=config.algorithms {
                if config.excluded_algorithms.contains(&algorithm) {
                    log::debug!("Algorithm {algorithm} discarded for board {board}");
                    continue;
                }
                let folder = config.base_dir.join(format!("{board}_{algorithm}"));
                if !folder.is_dir() {
                    log::debug!("Folder {} not found, skipping", folder.display());
                    continue;
                }

                for (iteration, path) in list_raw_files(&folder)? {
                    if iteration > config.iterations {
                        log::debug!(
                            "Stopping {} at iteration {iteration} (ceiling {})",
                            folder.display(),
                            config.iterations
                        );
                        break;
                    }

                    let key = SourceKey::new(board, algorithm, iteration);
                    let output = read_raw_file(
                        &path,
                        key,
                        config.max_raw_lines_for(algorithm),
                        &mut decimator,
                        calibration,
                    )?;
                    log::info!(
                        "ID Board: {board}, Algorithm: {algorithm}, Iteration File: {}, Total Samples: {}",
                        path.file_name().and_then(|n| n.to_str()).unwrap_or_default(),
                        output.total_samples
                    );
                    summary.files_processed += 1;

                    match config.format {
                        OutputFormat::Multiple => {
                            let written =
                                sink.write_records(&key.tabular_file_name(), &output.records)?;
                            summary.records_written += output.records.len();
                            summary.outputs.push(written);
                        }
                        OutputFormat::Unified => unified.extend(output.records),
                    }
                }
            }
        }

        log::debug!("Decimation counter ends at {}", decimator.counter());
        if config.format == OutputFormat::Unified {
            let written = sink.write_records(&config.unified_file_name(), &unified)?;
            summary.records_written = unified.len();
            summary.outputs.push(written);
        }

        Ok(summary)
    }
}
