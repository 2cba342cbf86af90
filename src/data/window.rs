use super::model::{BoardSequenceSet, Pair, Window};

/// Cuts one board's pair stream into fixed-length windows.
///
/// Pairs pushed from successive files of the same board continue the same
/// buffer, so a window may span a file boundary. Whatever is still buffered
/// when [`SequenceBuilder::finish`] is called is dropped.
#[derive(Debug)]
pub struct SequenceBuilder {
    buffer: Vec<Pair>,
    set: BoardSequenceSet,
}

impl SequenceBuilder {
    /// `sequence_length` must be non-zero; the configuration layer rejects zero.
    pub fn new(board: u32, sequence_length: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(sequence_length),
            set: BoardSequenceSet::new(board, sequence_length),
        }
    }

    pub fn board(&self) -> u32 {
        self.set.board
    }

    pub fn push(&mut self, pair: Pair) {
        self.buffer.push(pair);
        if self.buffer.len() == self.set.sequence_length {
            let full = std::mem::replace(
                &mut self.buffer,
                Vec::with_capacity(self.set.sequence_length),
            );
            self.set.windows.push(Window::from_pairs(full));
        }
    }

    pub fn extend(&mut self, pairs: impl IntoIterator<Item = Pair>) {
        for pair in pairs {
            self.push(pair);
        }
    }

    /// Pairs waiting for the current window to fill up.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn windows(&self) -> usize {
        self.set.len()
    }

    pub fn finish(self) -> BoardSequenceSet {
        if !self.buffer.is_empty() {
            log::debug!(
                "Board {}: dropping {} trailing pairs short of a full window",
                self.set.board,
                self.buffer.len()
            );
        }
        self.set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<Pair> {
        (0..n).map(|i| [i as f64, -(i as f64)]).collect()
    }

    #[test]
    fn produces_floor_l_over_length_windows() {
        for length in 1..6 {
            for l in 0..30 {
                let mut builder = SequenceBuilder::new(1, length);
                builder.extend(ramp(l));
                assert_eq!(builder.pending(), l % length);
                let set = builder.finish();
                assert_eq!(set.len(), l / length, "length={length} l={l}");
                assert!(set.windows.iter().all(|w| w.pairs().len() == length));
            }
        }
    }

    #[test]
    fn windows_continue_across_pushes_from_different_files() {
        let mut builder = SequenceBuilder::new(7, 3);
        builder.extend(ramp(2));
        builder.extend(ramp(4));
        let set = builder.finish();

        assert_eq!(set.board, 7);
        assert_eq!(set.len(), 2);
        assert_eq!(set.windows[0].pairs(), &[[0.0, 0.0], [1.0, -1.0], [0.0, 0.0]]);
        assert_eq!(set.windows[1].pairs(), &[[1.0, -1.0], [2.0, -2.0], [3.0, -3.0]]);
    }

    #[test]
    fn trailing_partial_window_is_dropped() {
        let mut builder = SequenceBuilder::new(1, 4);
        builder.extend(ramp(7));
        assert_eq!(builder.windows(), 1);
        let set = builder.finish();
        assert_eq!(set.len(), 1);
        assert_eq!(set.windows[0].pairs()[3], [3.0, -3.0]);
    }
}
