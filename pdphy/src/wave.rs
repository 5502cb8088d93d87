//! Reference waveform source.
//!
//! [`Modulator`] renders frames into per-tick line samples with the same
//! conventions as the transmit driver: the encoder level starts at the high
//! rail so the opening transition of the first preamble bit lands on the
//! idle line invisibly, every unit interval opens with a transition, a
//! logic 1 adds one mid-interval, and a trailing edge closes the last bit.
//! Tests feed the samples straight into a receiver to exercise it without
//! a transmitter, including at bit rates the transmitter would never
//! produce.

use pdcode::{
    sets,
    symbol::Symbol,
};

/// Builds a sampled line waveform tick by tick.
#[derive(Debug, Clone)]
pub struct Modulator {
    half_ticks: u32,
    level: bool,
    samples: Vec<bool>,
}

impl Modulator {
    /// A modulator producing `ticks_per_ui` samples per unit interval.
    ///
    /// # Panics
    ///
    /// Panics unless `ticks_per_ui` is even and at least 2; half intervals
    /// must land on whole ticks.
    #[must_use]
    pub fn new(ticks_per_ui: u32) -> Self {
        assert!(ticks_per_ui >= 2 && ticks_per_ui % 2 == 0);
        Self {
            half_ticks: ticks_per_ui / 2,
            level: true,
            samples: Vec::new(),
        }
    }

    /// Appends `ticks` samples of the quiescent low line.
    pub fn idle(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.samples.push(false);
        }
    }

    /// Appends `ticks` samples at a forced level and adopts that level as
    /// the encoder state, for hand-built waveforms.
    pub fn raw(&mut self, level: bool, ticks: u32) {
        self.level = level;
        for _ in 0..ticks {
            self.samples.push(level);
        }
    }

    fn run_half(&mut self) {
        for _ in 0..self.half_ticks {
            self.samples.push(self.level);
        }
    }

    /// Appends one biphase-mark bit: a transition, then a second transition
    /// mid-interval only for a logic 1.
    pub fn bit(&mut self, bit: bool) {
        self.level = !self.level;
        self.run_half();
        if bit {
            self.level = !self.level;
        }
        self.run_half();
    }

    /// Appends the 64-bit training sequence.
    pub fn preamble(&mut self) {
        for index in 0..sets::PREAMBLE_BITS {
            self.bit(sets::preamble_bit(index));
        }
    }

    /// Appends five wire bits, least significant first.
    pub fn pattern(&mut self, bits: u8) {
        for shift in 0..5 {
            self.bit((bits >> shift) & 1 == 1);
        }
    }

    pub fn symbol(&mut self, symbol: Symbol) {
        self.pattern(symbol.pattern());
    }

    /// Appends the trailing edge that closes the final bit, settling the
    /// line low half an interval later if the edge left it high. The caller
    /// appends [`idle`](Self::idle) ticks to model the hold time.
    pub fn finish(&mut self) {
        self.level = !self.level;
        if self.level {
            self.run_half();
            self.level = false;
        }
    }

    /// Appends one whole frame: preamble, symbols, closing edge, and four
    /// unit intervals of idle tail so a receiver can return to idle.
    pub fn frame(&mut self, symbols: &[Symbol]) {
        self.level = true;
        self.preamble();
        for &symbol in symbols {
            self.symbol(symbol);
        }
        self.finish();
        self.idle(8 * self.half_ticks);
    }

    /// The encoder level, for hand-built waveforms.
    #[must_use]
    pub const fn level(&self) -> bool {
        self.level
    }

    /// Hands over the samples accumulated so far.
    pub fn take(&mut self) -> Vec<bool> {
        std::mem::take(&mut self.samples)
    }
}

#[cfg(test)]
mod tests {
    use pdcode::symbol::KCode;

    use super::*;

    fn edges(samples: &[bool]) -> usize {
        let mut last = false;
        let mut count = 0;
        for &s in samples {
            if s != last {
                count += 1;
            }
            last = s;
        }
        count
    }

    #[test]
    fn test_preamble_edge_count() {
        let mut m = Modulator::new(8);
        m.preamble();
        let samples = m.take();
        assert_eq!(samples.len(), 64 * 8);
        // 96 encoder transitions, minus the opening one that lands on the
        // idle-low line
        assert_eq!(edges(&samples), 95);
    }

    #[test]
    fn test_bit_shapes() {
        let mut m = Modulator::new(4);
        m.bit(false);
        assert_eq!(m.take(), vec![false, false, false, false]);
        let mut m = Modulator::new(4);
        m.bit(true);
        assert_eq!(m.take(), vec![false, false, true, true]);
    }

    #[test]
    fn test_frame_ends_low() {
        let mut m = Modulator::new(8);
        m.frame(&[Symbol::K(KCode::Eop)]);
        let samples = m.take();
        assert_eq!(samples.last(), Some(&false));
        // preamble + one symbol + idle tail; closing edge adds at most a
        // half interval
        let body = (64 + 5) * 8 + 8 * 4;
        assert!(samples.len() >= body && samples.len() <= body + 4);
    }
}
