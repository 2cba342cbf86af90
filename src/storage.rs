//! Output writers: `;`-delimited CSV for records, HDF5 for board sequences.
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::model::{NormalizedBoard, Record, RECORD_HEADER};
use crate::error::{BuildError, Result};

/// Destination of extracted records.
pub trait RecordSink {
    /// Write `records` as one tabular file called `name`, replacing any
    /// previous file of that name. Returns where it was written.
    fn write_records(&mut self, name: &str, records: &[Record]) -> Result<PathBuf>;
}

/// Destination of normalized per-board sequences.
pub trait SequenceSink {
    fn write_board(&mut self, board: &NormalizedBoard) -> Result<PathBuf>;
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
        log::info!("Created output directory {}", dir.display());
    }
    Ok(())
}

// ============================================================================
// CSV records
// ============================================================================

/// Writes record files into a directory, creating it on first use.
pub struct CsvRecordSink {
    dir: PathBuf,
}

impl CsvRecordSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl RecordSink for CsvRecordSink {
    fn write_records(&mut self, name: &str, records: &[Record]) -> Result<PathBuf> {
        ensure_dir(&self.dir)?;
        let path = self.dir.join(name);

        // The header is written by hand so that empty files still carry it.
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| BuildError::csv(&path, e))?;
        writer
            .write_record(RECORD_HEADER)
            .map_err(|e| BuildError::csv(&path, e))?;
        for record in records {
            writer
                .serialize(record)
                .map_err(|e| BuildError::csv(&path, e))?;
        }
        writer.flush().map_err(|e| BuildError::io(&path, e))?;

        log::info!("The CSV file '{}' has been successfully created.", path.display());
        Ok(path)
    }
}

// ============================================================================
// HDF5 sequences
// ============================================================================

/// Writes one `board_{board}_sequences.h5` per board, holding the
/// `sequences` and `indexes` datasets.
pub struct Hdf5SequenceSink {
    dir: PathBuf,
}

#[cfg(feature = "storage_hdf5")]
impl Hdf5SequenceSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self { dir: dir.into() })
    }
}

#[cfg(feature = "storage_hdf5")]
impl SequenceSink for Hdf5SequenceSink {
    fn write_board(&mut self, board: &NormalizedBoard) -> Result<PathBuf> {
        ensure_dir(&self.dir)?;
        let path = self.dir.join(board.container_file_name());
        let storage = |e: hdf5::Error| BuildError::Storage(format!("{}: {e}", path.display()));

        let file = hdf5::File::create(&path).map_err(storage)?;

        let (windows, length, channels) = board.sequences.dim();
        let values: Vec<f64> = board.sequences.iter().copied().collect();
        file.new_dataset::<f64>()
            .shape([windows, length, channels])
            .create("sequences")
            .and_then(|ds| ds.write_raw(values.as_slice()))
            .map_err(storage)?;

        let indexes = board.indexes.to_vec();
        file.new_dataset::<i64>()
            .shape([indexes.len()])
            .create("indexes")
            .and_then(|ds| ds.write_raw(indexes.as_slice()))
            .map_err(storage)?;

        file.close().map_err(storage)?;
        log::info!("File {} has been created", path.display());
        Ok(path)
    }
}

#[cfg(not(feature = "storage_hdf5"))]
impl Hdf5SequenceSink {
    pub fn new(_dir: impl Into<PathBuf>) -> Result<Self> {
        Err(BuildError::FeatureNotEnabled("storage_hdf5".to_string()))
    }
}

#[cfg(not(feature = "storage_hdf5"))]
impl SequenceSink for Hdf5SequenceSink {
    fn write_board(&mut self, _board: &NormalizedBoard) -> Result<PathBuf> {
        Err(BuildError::FeatureNotEnabled("storage_hdf5".to_string()))
    }
}

// ============================================================================
// In-memory sinks for pipeline tests
// ============================================================================

#[cfg(test)]
pub mod memory {
    use super::*;

    #[derive(Default)]
    pub struct MemoryRecordSink {
        pub files: Vec<(String, Vec<Record>)>,
    }

    impl MemoryRecordSink {
        pub fn all_records(&self) -> Vec<Record> {
            self.files
                .iter()
                .flat_map(|(_, records)| records.iter().copied())
                .collect()
        }
    }

    impl RecordSink for MemoryRecordSink {
        fn write_records(&mut self, name: &str, records: &[Record]) -> Result<PathBuf> {
            self.files.push((name.to_string(), records.to_vec()));
            Ok(PathBuf::from(name))
        }
    }

    #[derive(Default)]
    pub struct MemorySequenceSink {
        pub boards: Vec<NormalizedBoard>,
    }

    impl SequenceSink for MemorySequenceSink {
        fn write_board(&mut self, board: &NormalizedBoard) -> Result<PathBuf> {
            self.boards.push(board.clone());
            Ok(PathBuf::from(board.container_file_name()))
        }
    }
}
