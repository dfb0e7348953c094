//! In-memory hardware for running the controller without a board.

use crate::averager::SampleSource;
use crate::lines::{Line, LineDriver};
use crate::protocol::{Channel, CHANNELS};

/// Physical line levels, with a log of every write
#[derive(Clone, Debug, Default)]
pub struct SimLines {
    levels: [bool; 3],
    history: Vec<(Line, bool)>,
}

fn slot(line: Line) -> usize {
    match line {
        Line::Charge => 0,
        Line::Discharge => 1,
        Line::Indicator => 2,
    }
}

impl SimLines {
    pub fn level_of(&self, line: Line) -> bool {
        self.levels[slot(line)]
    }

    /// Every `(line, level)` written so far
    pub fn history(&self) -> &[(Line, bool)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl<E> LineDriver<E> for SimLines {
    fn set_level(&mut self, line: Line, high: bool) -> Result<(), E> {
        self.levels[slot(line)] = high;
        self.history.push((line, high));
        Ok(())
    }

    fn level(&mut self, line: Line) -> Result<bool, E> {
        Ok(self.level_of(line))
    }
}

/// Constant raw sample per channel
#[derive(Clone, Debug, Default)]
pub struct SimSource {
    raw: [u16; CHANNELS],
    reads: usize,
}

impl SimSource {
    pub fn new(raw: [u16; CHANNELS]) -> Self {
        Self { raw, reads: 0 }
    }

    pub fn set(&mut self, channel: Channel, raw: u16) {
        self.raw[channel.index()] = raw;
    }

    /// Total samples taken across all channels
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl<E> SampleSource<E> for SimSource {
    fn sample(&mut self, channel: Channel) -> Result<u16, E> {
        self.reads += 1;
        Ok(self.raw[channel.index()])
    }
}
