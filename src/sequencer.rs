//! Turns the multiple-file tabular output into normalized per-board sequences.
use std::path::PathBuf;

use crate::config::SequenceConfig;
use crate::data::loader::{list_tabular_files, read_tabular_pairs};
use crate::data::normalize::zscore;
use crate::data::window::SequenceBuilder;
use crate::error::Result;
use crate::storage::SequenceSink;

/// Result for one board. `output` is `None` when the board had no complete
/// window and nothing was written.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardOutcome {
    pub board: u32,
    pub windows: usize,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Default, Clone)]
pub struct SequenceSummary {
    pub files_processed: usize,
    pub boards: Vec<BoardOutcome>,
}

pub struct Sequencer {
    config: SequenceConfig,
}

impl Sequencer {
    pub fn new(config: SequenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Read every tabular file in `(board, algorithm, iteration)` order.
    ///
    /// Windows of a board keep filling across its files; when the board
    /// number changes (and after the last file) the finished board is
    /// normalized and written before anything of the next board is read.
    pub fn run(&self, sink: &mut dyn SequenceSink) -> Result<SequenceSummary> {
        let files = list_tabular_files(&self.config.input_dir)?;
        log::info!(
            "Sequencing {} files from {}",
            files.len(),
            self.config.input_dir.display()
        );

        let mut summary = SequenceSummary::default();
        let mut active: Option<SequenceBuilder> = None;

        for (key, path) in files {
            if active.as_ref().is_some_and(|b| b.board() != key.board) {
                if let Some(finished) = active.take() {
                    self.flush(finished, sink, &mut summary)?;
                }
            }

            let max_pairs = self.config.max_pairs_for(key.algorithm)?;
            let builder = active
                .get_or_insert_with(|| SequenceBuilder::new(key.board, self.config.sequence_length));

            log::info!("Filepath: {}", path.display());
            builder.extend(read_tabular_pairs(&path, max_pairs)?);
            log::debug!(
                "Board {}: {} windows, {} pairs pending",
                builder.board(),
                builder.windows(),
                builder.pending()
            );
            summary.files_processed += 1;
        }

        if let Some(finished) = active.take() {
            self.flush(finished, sink, &mut summary)?;
        }
        Ok(summary)
    }

    fn flush(
        &self,
        builder: SequenceBuilder,
        sink: &mut dyn SequenceSink,
        summary: &mut SequenceSummary,
    ) -> Result<()> {
        let set = builder.finish();
        if set.is_empty() {
            log::warn!(
                "Board {} has fewer than {} pairs, no sequences written",
                set.board,
                set.sequence_length
            );
            summary.boards.push(BoardOutcome {
                board: set.board,
                windows: 0,
                output: None,
            });
            return Ok(());
        }

        let normalized = zscore(&set)?;
        let output = sink.write_board(&normalized)?;
        summary.boards.push(BoardOutcome {
            board: set.board,
            windows: set.len(),
            output: Some(output),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use ndarray::Axis;

    use super::*;
    use crate::config::{ExtractConfig, OutputFormat};
    use crate::data::model::{Reading, Record, SourceKey};
    use crate::error::BuildError;
    use crate::extractor::tests::write_raw;
    use crate::extractor::Extractor;
    use crate::storage::memory::MemorySequenceSink;
    use crate::storage::{CsvRecordSink, RecordSink};

    fn write_tabular(dir: &Path, key: SourceKey, pairs: &[(i64, i64)]) {
        let records: Vec<Record> = pairs
            .iter()
            .map(|&(v, t)| Record::new(key, Reading::Raw(v), Reading::Raw(t)))
            .collect();
        CsvRecordSink::new(dir)
            .write_records(&key.tabular_file_name(), &records)
            .unwrap();
    }

    fn config(input: &Path, length: usize, max_raw_lines: Vec<usize>) -> SequenceConfig {
        SequenceConfig {
            input_dir: input.to_path_buf(),
            output_dir: input.join("h5"),
            sequence_length: length,
            max_raw_lines,
        }
    }

    fn ramp(start: i64, n: i64) -> Vec<(i64, i64)> {
        (start..start + n).map(|i| (i, i * i)).collect()
    }

    #[test]
    fn extract_then_sequence_two_boards() {
        let raw = tempfile::tempdir().unwrap();
        let tabular = tempfile::tempdir().unwrap();
        for board in 1..=2u32 {
            for iteration in 1..=2u32 {
                let offset = (board * 10 + iteration) as i64;
                let pairs: Vec<(i64, i64)> = (0..4).map(|i| (900 + offset + i, 1600 - i * offset)).collect();
                write_raw(raw.path(), board, 1, iteration, &pairs);
            }
        }

        let extract = ExtractConfig {
            base_dir: raw.path().to_path_buf(),
            destination_dir: tabular.path().to_path_buf(),
            boards: 2,
            algorithms: 1,
            iterations: 2,
            max_raw_lines: vec![8],
            format: OutputFormat::Multiple,
            ..ExtractConfig::default()
        };
        let mut records = CsvRecordSink::new(tabular.path());
        let extracted = Extractor::new(extract, None).unwrap().run(&mut records).unwrap();
        assert_eq!(extracted.records_written, 16);

        let mut sink = MemorySequenceSink::default();
        let summary = Sequencer::new(config(tabular.path(), 2, vec![8]))
            .unwrap()
            .run(&mut sink)
            .unwrap();

        assert_eq!(summary.files_processed, 4);
        assert_eq!(sink.boards.len(), 2);
        for (board, written) in (1..=2).zip(&sink.boards) {
            assert_eq!(written.board, board);
            assert_eq!(written.sequences.shape(), &[4, 2, 2]);
            assert_eq!(written.indexes.to_vec(), vec![i64::from(board); 4]);
            for channel in 0..2 {
                let lane = written.sequences.index_axis(Axis(2), channel);
                assert!(lane.mean().unwrap().abs() < 1e-9);
                assert!((lane.std(0.0) - 1.0).abs() < 1e-9);
            }
        }
        assert_eq!(
            summary.boards[1].output,
            Some(PathBuf::from("board_2_sequences.h5"))
        );
    }

    #[test]
    fn windows_span_files_of_the_same_board() {
        let dir = tempfile::tempdir().unwrap();
        write_tabular(dir.path(), SourceKey::new(1, 1, 1), &ramp(0, 3));
        write_tabular(dir.path(), SourceKey::new(1, 1, 2), &ramp(3, 3));

        let mut sink = MemorySequenceSink::default();
        let summary = Sequencer::new(config(dir.path(), 2, vec![100]))
            .unwrap()
            .run(&mut sink)
            .unwrap();
        assert_eq!(summary.boards[0].windows, 3);
    }

    #[test]
    fn partial_window_is_dropped_on_board_change() {
        let dir = tempfile::tempdir().unwrap();
        write_tabular(dir.path(), SourceKey::new(1, 1, 1), &ramp(0, 3));
        write_tabular(dir.path(), SourceKey::new(2, 1, 1), &ramp(10, 5));

        let mut sink = MemorySequenceSink::default();
        let summary = Sequencer::new(config(dir.path(), 2, vec![100]))
            .unwrap()
            .run(&mut sink)
            .unwrap();
        let windows: Vec<(u32, usize)> = summary.boards.iter().map(|b| (b.board, b.windows)).collect();
        assert_eq!(windows, vec![(1, 1), (2, 2)]);
    }

    #[test]
    fn pair_cap_follows_algorithm() {
        let dir = tempfile::tempdir().unwrap();
        write_tabular(dir.path(), SourceKey::new(1, 1, 1), &ramp(0, 6));
        write_tabular(dir.path(), SourceKey::new(1, 2, 1), &ramp(6, 6));

        let mut sink = MemorySequenceSink::default();
        let summary = Sequencer::new(config(dir.path(), 1, vec![4, 10]))
            .unwrap()
            .run(&mut sink)
            .unwrap();
        // 2 pairs from algorithm 1, 5 from algorithm 2.
        assert_eq!(summary.boards[0].windows, 7);
    }

    #[test]
    fn files_are_ordered_numerically() {
        let dir = tempfile::tempdir().unwrap();
        write_tabular(dir.path(), SourceKey::new(1, 1, 10), &[(100, 1), (200, 2)]);
        write_tabular(dir.path(), SourceKey::new(1, 1, 2), &[(1, 3), (2, 4)]);

        let mut sink = MemorySequenceSink::default();
        Sequencer::new(config(dir.path(), 2, vec![100]))
            .unwrap()
            .run(&mut sink)
            .unwrap();
        let sequences = &sink.boards[0].sequences;
        // Iteration 2 comes first and holds the two smallest voltages.
        assert!(sequences[[0, 0, 0]] < sequences[[1, 0, 0]]);
        assert!(sequences[[0, 1, 0]] < sequences[[1, 0, 0]]);
    }

    #[test]
    fn board_without_windows_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_tabular(dir.path(), SourceKey::new(1, 1, 1), &ramp(0, 1));
        write_tabular(dir.path(), SourceKey::new(2, 1, 1), &ramp(0, 4));

        let mut sink = MemorySequenceSink::default();
        let summary = Sequencer::new(config(dir.path(), 2, vec![100]))
            .unwrap()
            .run(&mut sink)
            .unwrap();
        assert_eq!(sink.boards.len(), 1);
        assert_eq!(sink.boards[0].board, 2);
        assert_eq!(summary.boards[0].output, None);
    }

    #[test]
    fn constant_channel_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        write_tabular(dir.path(), SourceKey::new(1, 1, 1), &[(5, 1), (5, 2), (5, 3), (5, 4)]);

        let mut sink = MemorySequenceSink::default();
        let err = Sequencer::new(config(dir.path(), 2, vec![100]))
            .unwrap()
            .run(&mut sink)
            .unwrap_err();
        assert!(matches!(err, BuildError::Numeric(_)));
        assert!(sink.boards.is_empty());
    }

    #[test]
    fn unexpected_csv_name_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_tabular(dir.path(), SourceKey::new(1, 1, 1), &ramp(0, 4));
        fs::write(dir.path().join("raw_dataset_20_5_20.csv"), "").unwrap();
        fs::write(dir.path().join("README.txt"), "").unwrap();

        let err = Sequencer::new(config(dir.path(), 2, vec![100]))
            .unwrap()
            .run(&mut MemorySequenceSink::default())
            .unwrap_err();
        assert!(matches!(err, BuildError::Parse { .. }));
    }

    #[test]
    fn unknown_algorithm_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        write_tabular(dir.path(), SourceKey::new(1, 3, 1), &ramp(0, 4));
        let err = Sequencer::new(config(dir.path(), 2, vec![100]))
            .unwrap()
            .run(&mut MemorySequenceSink::default())
            .unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }
}
