use std::fmt;

use ndarray::{Array1, Array3};
use serde::Serialize;

// ---------------------------------------------------------------------------
// RawSample – one temperature/voltage observation from a raw dump
// ---------------------------------------------------------------------------

/// One raw ADC observation. Both codes come from consecutive lines of a
/// `datos_{iteration}.txt` file (temperature on the even line, voltage on the
/// following odd line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub temperature: i64,
    pub voltage: i64,
}

// ---------------------------------------------------------------------------
// SourceKey – (board, algorithm, iteration) triple
// ---------------------------------------------------------------------------

/// Identifies one acquisition file. The derived ordering (board, then
/// algorithm, then iteration) is the processing order of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceKey {
    pub board: u32,
    pub algorithm: u32,
    pub iteration: u32,
}

impl SourceKey {
    pub fn new(board: u32, algorithm: u32, iteration: u32) -> Self {
        Self {
            board,
            algorithm,
            iteration,
        }
    }

    /// File name used for this triple in multiple-file output.
    pub fn tabular_file_name(&self) -> String {
        format!("{}_{}_{}.csv", self.board, self.algorithm, self.iteration)
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "board {}, algorithm {}, iteration {}",
            self.board, self.algorithm, self.iteration
        )
    }
}

// ---------------------------------------------------------------------------
// Reading / Record – one row of the tabular dataset
// ---------------------------------------------------------------------------

/// A voltage or temperature value as written to the tabular output.
/// Raw codes stay integers; calibrated values are floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    Raw(i64),
    Calibrated(f64),
}

/// Column labels of the tabular output, in field order.
pub const RECORD_HEADER: [&str; 5] = [
    "Voltage Value",
    "Temperature Value",
    "Board Number",
    "Algorithm",
    "Iteration",
];

/// One row of the extracted dataset. Field order is part of the output
/// format and must match [`RECORD_HEADER`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "Voltage Value")]
    pub voltage: Reading,
    #[serde(rename = "Temperature Value")]
    pub temperature: Reading,
    #[serde(rename = "Board Number")]
    pub board: u32,
    #[serde(rename = "Algorithm")]
    pub algorithm: u32,
    #[serde(rename = "Iteration")]
    pub iteration: u32,
}

impl Record {
    pub fn new(key: SourceKey, voltage: Reading, temperature: Reading) -> Self {
        Self {
            voltage,
            temperature,
            board: key.board,
            algorithm: key.algorithm,
            iteration: key.iteration,
        }
    }
}

// ---------------------------------------------------------------------------
// Window / BoardSequenceSet – sequencer units
// ---------------------------------------------------------------------------

/// `(voltage, temperature)`, the channel order of every sequence.
pub type Pair = [f64; 2];

/// Fixed-length run of consecutive pairs from one board.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pairs: Vec<Pair>,
}

impl Window {
    pub fn from_pairs(pairs: Vec<Pair>) -> Self {
        Self { pairs }
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }
}

/// Every complete window collected for one board, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSequenceSet {
    pub board: u32,
    pub sequence_length: usize,
    pub windows: Vec<Window>,
}

impl BoardSequenceSet {
    pub fn new(board: u32, sequence_length: usize) -> Self {
        Self {
            board,
            sequence_length,
            windows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Stack the windows into a `[windows, sequence_length, 2]` array.
    pub fn to_array(&self) -> Array3<f64> {
        let mut array = Array3::<f64>::zeros((self.windows.len(), self.sequence_length, 2));
        for (w, window) in self.windows.iter().enumerate() {
            for (s, pair) in window.pairs().iter().enumerate() {
                array[[w, s, 0]] = pair[0];
                array[[w, s, 1]] = pair[1];
            }
        }
        array
    }
}

/// Z-score normalized sequences of one board, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBoard {
    pub board: u32,
    /// Shape `[windows, sequence_length, 2]`.
    pub sequences: Array3<f64>,
    /// One label per window, each equal to the board number.
    pub indexes: Array1<i64>,
}

impl NormalizedBoard {
    pub fn container_file_name(&self) -> String {
        format!("board_{}_sequences.h5", self.board)
    }
}
