use ndarray::{Array1, Axis};

use super::model::{BoardSequenceSet, NormalizedBoard};
use crate::error::{BuildError, Result};

const CHANNELS: [&str; 2] = ["voltage", "temperature"];

/// Z-score each channel over every window of the board:
/// `(x - mean) / std`, with the population standard deviation.
///
/// A channel with zero (or non-finite) deviation cannot be scaled and fails
/// the whole board.
pub fn zscore(set: &BoardSequenceSet) -> Result<NormalizedBoard> {
    if set.is_empty() {
        return Err(BuildError::Numeric(format!(
            "board {}: no complete windows to normalize",
            set.board
        )));
    }

    let mut sequences = set.to_array();
    for (channel, name) in CHANNELS.iter().enumerate() {
        let mut lane = sequences.index_axis_mut(Axis(2), channel);
        let mean = lane.mean().ok_or_else(|| {
            BuildError::Numeric(format!("board {}: empty {name} channel", set.board))
        })?;
        let std = lane.std(0.0);
        if std == 0.0 || !std.is_finite() {
            return Err(BuildError::Numeric(format!(
                "board {}: {name} standard deviation is {std}, cannot normalize",
                set.board
            )));
        }
        lane.mapv_inplace(|x| (x - mean) / std);
    }

    Ok(NormalizedBoard {
        board: set.board,
        indexes: Array1::from_elem(set.len(), i64::from(set.board)),
        sequences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Window;

    fn set_from(board: u32, length: usize, pairs: Vec<[f64; 2]>) -> BoardSequenceSet {
        let mut set = BoardSequenceSet::new(board, length);
        for chunk in pairs.chunks(length) {
            set.windows.push(Window::from_pairs(chunk.to_vec()));
        }
        set
    }

    #[test]
    fn channels_have_zero_mean_and_unit_std() {
        let pairs: Vec<[f64; 2]> = (0..60)
            .map(|i| {
                let x = i as f64;
                [1600.0 + (x * 0.7).sin() * 40.0, 25.0 + x * 0.1]
            })
            .collect();
        let normalized = zscore(&set_from(5, 6, pairs)).unwrap();

        assert_eq!(normalized.sequences.shape(), &[10, 6, 2]);
        for channel in 0..2 {
            let lane = normalized.sequences.index_axis(Axis(2), channel);
            assert!(lane.mean().unwrap().abs() < 1e-9);
            assert!((lane.std(0.0) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn indexes_repeat_the_board_number() {
        let pairs = vec![[1.0, 2.0], [2.0, 3.0], [3.0, 5.0], [4.0, 7.0]];
        let normalized = zscore(&set_from(12, 2, pairs)).unwrap();
        assert_eq!(normalized.indexes.to_vec(), vec![12, 12]);
        assert_eq!(normalized.container_file_name(), "board_12_sequences.h5");
    }

    #[test]
    fn uses_population_deviation() {
        let pairs = vec![[1.0, 0.0], [3.0, 2.0]];
        let normalized = zscore(&set_from(1, 2, pairs)).unwrap();
        assert_eq!(normalized.sequences[[0, 0, 0]], -1.0);
        assert_eq!(normalized.sequences[[0, 1, 0]], 1.0);
        assert_eq!(normalized.sequences[[0, 1, 1]], 1.0);
    }

    #[test]
    fn constant_channel_is_numeric_error() {
        let pairs = vec![[1.0, 20.0], [2.0, 20.0], [3.0, 20.0], [4.0, 20.0]];
        let err = zscore(&set_from(3, 2, pairs)).unwrap_err();
        match err {
            BuildError::Numeric(msg) => assert!(msg.contains("temperature")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_set_is_numeric_error() {
        let set = BoardSequenceSet::new(1, 4);
        assert!(matches!(zscore(&set), Err(BuildError::Numeric(_))));
    }
}
