use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::{ExtractConfig, FileConfig, OutputFormat, SequenceConfig};
use crate::data::filter::DecimationFactor;
use crate::extractor::Extractor;
use crate::sequencer::Sequencer;
use crate::storage::{CsvRecordSink, Hdf5SequenceSink};

#[derive(Parser, Debug)]
#[command(
    name = "tv-dataset",
    version,
    about = "Build temperature/voltage datasets and training sequences from raw sensor dumps."
)]
pub struct Cli {
    /// JSON file with `extract` and/or `sequence` sections; flags override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse the raw board/algorithm/iteration grid into CSV records
    Extract(ExtractArgs),

    /// Cut multiple-file CSV output into normalized per-board sequences
    Sequence(SequenceArgs),
}

#[derive(Args, Debug, Default)]
pub struct ExtractArgs {
    /// Directory holding the `{board}_{algorithm}` folders
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Output directory for the CSV file(s)
    #[arg(long)]
    pub destination: Option<PathBuf>,

    /// `;`-delimited table with BOARD_NUM, T_CAL_1, T_CAL_2, VREFINT_CAL
    #[arg(long)]
    pub calibration_table: Option<PathBuf>,

    #[arg(long)]
    pub boards: Option<u32>,

    #[arg(long)]
    pub algorithms: Option<u32>,

    /// Highest iteration read from each folder
    #[arg(long)]
    pub iterations: Option<u32>,

    /// Raw line bound per algorithm, comma separated
    #[arg(long, value_delimiter = ',')]
    pub max_raw_lines: Option<Vec<usize>>,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Board to discard (repeatable)
    #[arg(long = "exclude-board")]
    pub exclude_boards: Vec<u32>,

    /// Algorithm to discard (repeatable)
    #[arg(long = "exclude-algorithm")]
    pub exclude_algorithms: Vec<u32>,

    /// Keep one temperature/voltage pair out of every N
    #[arg(long)]
    pub decimation: Option<u32>,

    /// Apply T-V calibration normalization
    #[arg(long)]
    pub normalize: bool,

    /// Generate without asking for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl ExtractArgs {
    fn apply(self, config: &mut ExtractConfig) -> Result<()> {
        if let Some(dir) = self.base_dir {
            config.base_dir = dir;
        }
        if let Some(dir) = self.destination {
            config.destination_dir = dir;
        }
        if let Some(table) = self.calibration_table {
            config.calibration_table = Some(table);
        }
        if let Some(boards) = self.boards {
            config.boards = boards;
        }
        if let Some(algorithms) = self.algorithms {
            config.algorithms = algorithms;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(bounds) = self.max_raw_lines {
            config.max_raw_lines = bounds;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        config.excluded_boards.extend(self.exclude_boards);
        config.excluded_algorithms.extend(self.exclude_algorithms);
        if let Some(factor) = self.decimation {
            config.decimation = DecimationFactor::try_from(factor)?;
        }
        if self.normalize {
            config.normalize = true;
        }
        Ok(())
    }
}

#[derive(Args, Debug, Default)]
pub struct SequenceArgs {
    /// Directory of `{board}_{algorithm}_{iteration}.csv` files
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Directory for `board_{board}_sequences.h5` files
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Pairs per sequence
    #[arg(long)]
    pub sequence_length: Option<usize>,

    /// Raw line bound per algorithm, comma separated (pairs are half of it)
    #[arg(long, value_delimiter = ',')]
    pub max_raw_lines: Option<Vec<usize>>,
}

impl SequenceArgs {
    fn apply(self, config: &mut SequenceConfig) {
        if let Some(dir) = self.input {
            config.input_dir = dir;
        }
        if let Some(dir) = self.output {
            config.output_dir = dir;
        }
        if let Some(length) = self.sequence_length {
            config.sequence_length = length;
        }
        if let Some(bounds) = self.max_raw_lines {
            config.max_raw_lines = bounds;
        }
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let file_config = match &self.config {
            Some(path) => FileConfig::from_json_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => FileConfig::default(),
        };

        match self.command {
            Commands::Extract(args) => run_extract(file_config.extract, args),
            Commands::Sequence(args) => run_sequence(file_config.sequence, args),
        }
    }
}

fn run_extract(mut config: ExtractConfig, args: ExtractArgs) -> Result<()> {
    let skip_prompt = args.yes;
    args.apply(&mut config)?;
    config.validate().context("invalid extraction settings")?;

    if !skip_prompt {
        let stdin = io::stdin();
        let accepted = confirm(&mut stdin.lock(), &mut io::stdout(), &config.preview())
            .context("reading confirmation")?;
        if !accepted {
            println!("Operation canceled.");
            return Ok(());
        }
    }

    println!("Generating File...");
    let extractor = Extractor::from_config(config)?;
    let mut sink = CsvRecordSink::new(&extractor.config().destination_dir);
    let summary = extractor.run(&mut sink).context("extraction failed")?;

    log::info!(
        "Processed {} files, wrote {} records into {} file(s)",
        summary.files_processed,
        summary.records_written,
        summary.outputs.len()
    );
    println!("\nProcess complete");
    Ok(())
}

fn run_sequence(mut config: SequenceConfig, args: SequenceArgs) -> Result<()> {
    args.apply(&mut config);
    let sequencer = Sequencer::new(config.clone()).context("invalid sequencing settings")?;
    let mut sink = Hdf5SequenceSink::new(&config.output_dir)?;
    let summary = sequencer.run(&mut sink).context("sequencing failed")?;

    for outcome in &summary.boards {
        match &outcome.output {
            Some(path) => log::info!(
                "Board {}: {} sequences -> {}",
                outcome.board,
                outcome.windows,
                path.display()
            ),
            None => log::warn!("Board {}: no sequences", outcome.board),
        }
    }
    log::info!(
        "Processed {} files for {} boards",
        summary.files_processed,
        summary.boards.len()
    );
    Ok(())
}

/// Show the configuration preview and ask for a `y`/`n` answer.
fn confirm(input: &mut impl BufRead, output: &mut impl Write, preview: &str) -> io::Result<bool> {
    writeln!(output, "Configuration Preview:\n\n{preview}\n")?;
    write!(output, "Do you want to generate the file? (y/n): ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
