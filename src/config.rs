use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::filter::DecimationFactor;
use crate::error::{BuildError, Result};

/// Raw line bound per algorithm (index 0 is algorithm 1). Each pair takes
/// two lines, so the sequencer reads half as many pairs.
pub const DEFAULT_MAX_RAW_LINES: [usize; 5] = [159_200, 159_200, 200_000, 140_000, 24_000];

// ---------------------------------------------------------------------------
// Output format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One CSV holding every record of the run.
    #[default]
    Unified,
    /// One CSV per (board, algorithm, iteration).
    Multiple,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Unified => write!(f, "Unified"),
            OutputFormat::Multiple => write!(f, "Multiple Files"),
        }
    }
}

// ---------------------------------------------------------------------------
// Config file
// ---------------------------------------------------------------------------

/// Top-level JSON configuration. Both sections are optional; missing fields
/// fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub extract: ExtractConfig,
    pub sequence: SequenceConfig,
}

impl FileConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| BuildError::Config(format!("{}: {e}", path.display())))
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Everything the extractor needs for one run. Built once by the front end,
/// checked with [`ExtractConfig::validate`], then only read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    /// Directory holding the `{board}_{algorithm}` folders.
    pub base_dir: PathBuf,
    /// Where tabular output is written; created if absent.
    pub destination_dir: PathBuf,
    /// `;`-delimited boards table, required when `normalize` is set.
    pub calibration_table: Option<PathBuf>,
    pub boards: u32,
    pub algorithms: u32,
    /// Highest iteration number read from each folder.
    pub iterations: u32,
    pub max_raw_lines: Vec<usize>,
    pub format: OutputFormat,
    pub excluded_algorithms: BTreeSet<u32>,
    pub excluded_boards: BTreeSet<u32>,
    pub decimation: DecimationFactor,
    pub normalize: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("data"),
            destination_dir: PathBuf::from("dataset"),
            calibration_table: None,
            boards: 20,
            algorithms: 5,
            iterations: 20,
            max_raw_lines: DEFAULT_MAX_RAW_LINES.to_vec(),
            format: OutputFormat::default(),
            excluded_algorithms: BTreeSet::new(),
            excluded_boards: BTreeSet::new(),
            decimation: DecimationFactor::default(),
            normalize: false,
        }
    }
}

impl ExtractConfig {
    pub fn validate(&self) -> Result<()> {
        if self.boards == 0 || self.algorithms == 0 {
            return Err(BuildError::Config(
                "at least one board and one algorithm are required".to_string(),
            ));
        }
        if self.max_raw_lines.len() != self.algorithms as usize {
            return Err(BuildError::Config(format!(
                "max_raw_lines has {} entries but there are {} algorithms",
                self.max_raw_lines.len(),
                self.algorithms
            )));
        }
        if let Some(board) = self
            .excluded_boards
            .iter()
            .find(|b| !(1..=self.boards).contains(*b))
        {
            return Err(BuildError::Config(format!(
                "excluded board {board} is outside 1..={}",
                self.boards
            )));
        }
        if let Some(algorithm) = self
            .excluded_algorithms
            .iter()
            .find(|a| !(1..=self.algorithms).contains(*a))
        {
            return Err(BuildError::Config(format!(
                "excluded algorithm {algorithm} is outside 1..={}",
                self.algorithms
            )));
        }
        if self.normalize && self.calibration_table.is_none() {
            return Err(BuildError::Config(
                "T-V normalization needs a calibration table".to_string(),
            ));
        }
        Ok(())
    }

    /// Raw line bound of an algorithm (1-based).
    pub fn max_raw_lines_for(&self, algorithm: u32) -> usize {
        algorithm
            .checked_sub(1)
            .and_then(|i| self.max_raw_lines.get(i as usize))
            .copied()
            .unwrap_or(0)
    }

    pub fn unified_file_name(&self) -> String {
        format!(
            "raw_dataset_{}_{}_{}.csv",
            self.boards, self.algorithms, self.iterations
        )
    }

    /// Text shown before the operator confirms generation.
    pub fn preview(&self) -> String {
        fn join(set: &BTreeSet<u32>) -> String {
            set.iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
        format!(
            "Output format of the .csv file: {}\n\
             Discarded Algorithms: {}\n\
             Discarded Boards: {}\n\
             Decimation Factor: {}\n\
             T-V Normalization: {}",
            self.format,
            join(&self.excluded_algorithms),
            join(&self.excluded_boards),
            self.decimation.get(),
            if self.normalize { "Yes" } else { "No" },
        )
    }
}

// ---------------------------------------------------------------------------
// Sequencing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequenceConfig {
    /// Directory of `{board}_{algorithm}_{iteration}.csv` files.
    pub input_dir: PathBuf,
    /// Where `board_{board}_sequences.h5` files are written.
    pub output_dir: PathBuf,
    pub sequence_length: usize,
    /// Same per-algorithm raw bounds as the extractor.
    pub max_raw_lines: Vec<usize>,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("dataset"),
            output_dir: PathBuf::from("sequences"),
            sequence_length: 100,
            max_raw_lines: DEFAULT_MAX_RAW_LINES.to_vec(),
        }
    }
}

impl SequenceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sequence_length == 0 {
            return Err(BuildError::Config(
                "sequence length must be at least 1".to_string(),
            ));
        }
        if self.max_raw_lines.is_empty() {
            return Err(BuildError::Config(
                "max_raw_lines must list at least one algorithm".to_string(),
            ));
        }
        Ok(())
    }

    /// Pair cap per file of an algorithm (1-based).
    pub fn max_pairs_for(&self, algorithm: u32) -> Result<usize> {
        algorithm
            .checked_sub(1)
            .and_then(|i| self.max_raw_lines.get(i as usize))
            .map(|lines| lines / 2)
            .ok_or_else(|| {
                BuildError::Config(format!(
                    "algorithm {algorithm} has no configured sample bound (1..={})",
                    self.max_raw_lines.len()
                ))
            })
    }
}
