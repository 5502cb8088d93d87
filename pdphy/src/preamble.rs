//! Training-sequence generator for the transmit path.

use pdcode::sets;

/// One bit of the training sequence, with a marker on the final bit so the
/// shifter knows when to switch over to payload symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreambleBit {
    pub bit: bool,
    pub last: bool,
}

/// Steps through the 64-bit alternating preamble, starting at logic 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreambleGen {
    index: u8,
}

impl PreambleGen {
    #[must_use]
    pub const fn new() -> Self {
        Self { index: 0 }
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Produces the next bit. After the last bit the generator wraps and is
    /// ready for the next frame.
    pub fn step(&mut self) -> PreambleBit {
        let index = usize::from(self.index);
        let last = index == sets::PREAMBLE_BITS - 1;
        self.index = if last { 0 } else { self.index + 1 };
        PreambleBit {
            bit: sets::preamble_bit(index),
            last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_alternates_and_terminates() {
        let mut gen = PreambleGen::new();
        for i in 0..sets::PREAMBLE_BITS {
            let pb = gen.step();
            assert_eq!(pb.bit, i % 2 == 1, "bit {i}");
            assert_eq!(pb.last, i == sets::PREAMBLE_BITS - 1, "bit {i}");
        }
        // wrapped, ready to run again
        let pb = gen.step();
        assert!(!pb.bit);
        assert!(!pb.last);
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut gen = PreambleGen::new();
        for _ in 0..10 {
            gen.step();
        }
        gen.reset();
        assert!(!gen.step().bit);
    }
}
