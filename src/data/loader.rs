use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::calibration::{CalibrationRow, CalibrationTable};
use super::filter::Decimator;
use super::model::{Pair, RawSample, Reading, Record, SourceKey};
use crate::error::{BuildError, Result};

/// Ignorable header lines at the top of every raw dump.
pub const HEADER_LINES: usize = 4;

/// Header plus trailer lines that are not samples, used only for reporting.
const NON_SAMPLE_LINES: usize = 6;

const RAW_PREFIX: &str = "datos_";
const RAW_SUFFIX: &str = ".txt";

// ---------------------------------------------------------------------------
// Raw text dumps
// ---------------------------------------------------------------------------

/// Records extracted from one raw file.
#[derive(Debug, Clone)]
pub struct RawFileOutput {
    pub records: Vec<Record>,
    /// Line count minus header and trailer, as reported in the run log.
    pub total_samples: usize,
}

/// Read one `datos_{iteration}.txt` file and extract its kept records.
pub fn read_raw_file(
    path: &Path,
    key: SourceKey,
    max_raw_lines: usize,
    decimator: &mut Decimator,
    calibration: Option<&CalibrationRow>,
) -> Result<RawFileOutput> {
    let text = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
    let lines: Vec<&str> = text.lines().collect();
    let records = parse_raw_lines(path, &lines, key, max_raw_lines, decimator, calibration)?;
    Ok(RawFileOutput {
        records,
        total_samples: lines.len().saturating_sub(NON_SAMPLE_LINES),
    })
}

/// Turn the lines of a raw dump into records.
///
/// Lines `HEADER_LINES .. max_raw_lines + HEADER_LINES` are read (or up to the
/// end of the file if it is shorter). Even absolute indices hold temperature
/// codes, odd indices voltage codes; a pair is complete on its voltage line.
/// Every complete pair goes through `decimator`, which decides whether it is
/// kept; kept pairs are calibrated when `calibration` is given.
pub fn parse_raw_lines<S: AsRef<str>>(
    path: &Path,
    lines: &[S],
    key: SourceKey,
    max_raw_lines: usize,
    decimator: &mut Decimator,
    calibration: Option<&CalibrationRow>,
) -> Result<Vec<Record>> {
    let end = max_raw_lines.saturating_add(HEADER_LINES).min(lines.len());
    let mut records = Vec::with_capacity(end.saturating_sub(HEADER_LINES) / 2);
    let mut temperature: Option<i64> = None;

    for (index, line) in lines.iter().enumerate().take(end).skip(HEADER_LINES) {
        let value = parse_code(path, index, line.as_ref())?;
        if index % 2 == 0 {
            temperature = Some(value);
            continue;
        }
        let Some(temperature) = temperature.take() else {
            continue;
        };
        if !decimator.admit() {
            continue;
        }

        let sample = RawSample {
            temperature,
            voltage: value,
        };
        let record = match calibration {
            Some(cal) => {
                let (v, t) = cal.calibrate(sample).map_err(|e| {
                    BuildError::Numeric(format!("{e} ({key}, {} line {})", path.display(), index + 1))
                })?;
                Record::new(key, Reading::Calibrated(v), Reading::Calibrated(t))
            }
            None => Record::new(
                key,
                Reading::Raw(sample.voltage),
                Reading::Raw(sample.temperature),
            ),
        };
        records.push(record);
    }

    Ok(records)
}

fn parse_code(path: &Path, index: usize, line: &str) -> Result<i64> {
    line.trim().parse::<i64>().map_err(|_| {
        BuildError::parse(
            path,
            format!("line {}: '{}' is not an integer", index + 1, line.trim()),
        )
    })
}

/// Iteration number embedded in a `datos_{iteration}.txt` file name.
pub fn parse_iteration(path: &Path) -> Result<u32> {
    let name = file_name(path);
    name.strip_prefix(RAW_PREFIX)
        .and_then(|rest| rest.strip_suffix(RAW_SUFFIX))
        .and_then(|digits| digits.parse::<u32>().ok())
        .ok_or_else(|| {
            BuildError::parse(path, format!("'{name}' does not match datos_<iteration>.txt"))
        })
}

/// All `datos_*.txt` files of a `{board}_{algorithm}` folder, sorted by
/// ascending iteration.
pub fn list_raw_files(folder: &Path) -> Result<Vec<(u32, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder).map_err(|e| BuildError::io(folder, e))? {
        let path = entry.map_err(|e| BuildError::io(folder, e))?.path();
        let name = file_name(&path);
        if !(name.starts_with(RAW_PREFIX) && name.ends_with(RAW_SUFFIX)) {
            continue;
        }
        files.push((parse_iteration(&path)?, path));
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Calibration table
// ---------------------------------------------------------------------------

/// Load the `;`-delimited boards table. Columns other than `BOARD_NUM`,
/// `T_CAL_1`, `T_CAL_2` and `VREFINT_CAL` are ignored.
pub fn load_calibration_table(path: &Path) -> Result<CalibrationTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| BuildError::csv(path, e))?;

    let rows = reader
        .deserialize::<CalibrationRow>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| BuildError::csv(path, e))?;

    let table = CalibrationTable::from_rows(rows);
    log::info!("Loaded {} calibration rows from {}", table.len(), path.display());
    Ok(table)
}

// ---------------------------------------------------------------------------
// Tabular (extractor output) files
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TabularRow {
    #[serde(rename = "Voltage Value")]
    voltage: f64,
    #[serde(rename = "Temperature Value")]
    temperature: f64,
}

/// `(board, algorithm, iteration)` from a `{board}_{algorithm}_{iteration}.csv` name.
pub fn parse_tabular_file_name(path: &Path) -> Result<SourceKey> {
    let name = file_name(path);
    let parts: Option<Vec<u32>> = name
        .strip_suffix(".csv")
        .and_then(|stem| stem.split('_').map(|p| p.parse::<u32>().ok()).collect());

    match parts.as_deref() {
        Some(&[board, algorithm, iteration]) => Ok(SourceKey::new(board, algorithm, iteration)),
        _ => Err(BuildError::parse(
            path,
            format!("'{name}' does not match <board>_<algorithm>_<iteration>.csv"),
        )),
    }
}

/// Every `.csv` file of a directory, keyed and sorted by
/// `(board, algorithm, iteration)`. Other files are ignored.
pub fn list_tabular_files(dir: &Path) -> Result<Vec<(SourceKey, PathBuf)>> {
    if !dir.is_dir() {
        return Err(BuildError::MissingInput(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| BuildError::io(dir, e))? {
        let path = entry.map_err(|e| BuildError::io(dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            log::debug!("Ignoring non-CSV file {}", path.display());
            continue;
        }
        files.push((parse_tabular_file_name(&path)?, path));
    }
    files.sort();
    Ok(files)
}

/// Read at most `max_pairs` `(voltage, temperature)` pairs from a tabular file.
pub fn read_tabular_pairs(path: &Path, max_pairs: usize) -> Result<Vec<Pair>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .map_err(|e| BuildError::csv(path, e))?;

    reader
        .deserialize::<TabularRow>()
        .take(max_pairs)
        .map(|row| {
            row.map(|r| [r.voltage, r.temperature])
                .map_err(|e| BuildError::csv(path, e))
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}
