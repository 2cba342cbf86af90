use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

// ---------------------------------------------------------------------------
// Decimation factor: keep one pair out of every N
// ---------------------------------------------------------------------------

/// Keep-1-in-N subsampling rate. A factor of zero is rejected at
/// construction, so every `DecimationFactor` is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DecimationFactor(NonZeroU32);

impl DecimationFactor {
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for DecimationFactor {
    fn default() -> Self {
        Self(NonZeroU32::MIN)
    }
}

impl TryFrom<u32> for DecimationFactor {
    type Error = BuildError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        NonZeroU32::new(value).map(Self).ok_or_else(|| {
            BuildError::Config(format!(
                "decimation factor must be greater than or equal to 1, got {value}"
            ))
        })
    }
}

impl From<DecimationFactor> for u32 {
    fn from(factor: DecimationFactor) -> Self {
        factor.get()
    }
}

// ---------------------------------------------------------------------------
// Decimator: the run-wide pair counter
// ---------------------------------------------------------------------------

/// Shared keep/drop counter for a whole extraction run.
///
/// One instance lives for the entire run and is handed by `&mut` to every
/// parse call, so the keep phase continues across files, algorithms and
/// boards. Only pairs that are actually parsed advance it.
#[derive(Debug, Clone)]
pub struct Decimator {
    factor: u32,
    counter: u32,
}

impl Decimator {
    pub fn new(factor: DecimationFactor) -> Self {
        Self {
            factor: factor.get(),
            counter: 0,
        }
    }

    /// Decide whether the next finalized pair is kept, then advance.
    pub fn admit(&mut self) -> bool {
        let keep = self.counter % self.factor == 0;
        self.counter += 1;
        if self.counter == self.factor {
            self.counter = 0;
        }
        keep
    }

    /// Current counter value, always below the factor.
    pub fn counter(&self) -> u32 {
        self.counter
    }
}
