use serde::Deserialize;

use super::model::RawSample;
use crate::error::{BuildError, Result};

/// Factory calibration constants of one board, as stored in the boards table.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CalibrationRow {
    #[serde(rename = "BOARD_NUM")]
    pub board: u32,
    #[serde(rename = "T_CAL_1")]
    pub t_cal_1: f64,
    #[serde(rename = "T_CAL_2")]
    pub t_cal_2: f64,
    #[serde(rename = "VREFINT_CAL")]
    pub vrefint_cal: f64,
}

impl CalibrationRow {
    /// Convert raw ADC codes into `(volts, degrees)`.
    ///
    /// The temperature sensor is calibrated at 30 and 110 degrees, hence the
    /// 80 degree span; voltage is scaled against the internal 3 V reference.
    pub fn calibrate(&self, sample: RawSample) -> Result<(f64, f64)> {
        if sample.voltage == 0 {
            return Err(BuildError::Numeric(format!(
                "board {}: voltage code is zero, cannot scale against VREFINT_CAL",
                self.board
            )));
        }
        let span = self.t_cal_2 - self.t_cal_1;
        if span == 0.0 {
            return Err(BuildError::Numeric(format!(
                "board {}: T_CAL_1 equals T_CAL_2 ({})",
                self.board, self.t_cal_1
            )));
        }

        let voltage = 3.0 * (self.vrefint_cal / sample.voltage as f64);
        let temperature = (80.0 / span) * (sample.temperature as f64 - self.t_cal_1) + 30.0;
        Ok((voltage, temperature))
    }
}

/// All calibration rows loaded from the boards table.
#[derive(Debug, Clone, Default)]
pub struct CalibrationTable {
    rows: Vec<CalibrationRow>,
}

impl CalibrationTable {
    pub fn from_rows(rows: Vec<CalibrationRow>) -> Self {
        Self { rows }
    }

    /// Exactly one row must match the board.
    pub fn lookup(&self, board: u32) -> Result<&CalibrationRow> {
        let mut matches = self.rows.iter().filter(|row| row.board == board);
        let row = matches.next().ok_or_else(|| BuildError::Lookup {
            board,
            reason: "board not present in calibration table".to_string(),
        })?;
        if matches.next().is_some() {
            return Err(BuildError::Lookup {
                board,
                reason: "board appears more than once in calibration table".to_string(),
            });
        }
        Ok(row)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
