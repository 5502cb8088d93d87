//! Pulse-rate recovery for the self-clocking line.
//!
//! The receiver owns no bit clock of its own. It runs a free [`PulseDivider`]
//! whose period is a quarter of the estimated unit interval, feeds the pulses
//! into a [`TapLine`], and reads the elapsed line time off three fixed taps.
//! During the preamble a [`BinarySearcher`] walks the divider period one bit
//! at a time until the full-interval tap fires exactly on full intervals, at
//! which point the divider is locked for the rest of the frame.

/// Pulses fired since the last line transition before the half-interval tap
/// asserts.
pub const HALF_TAP: u8 = 2;
/// Pulses before the full-interval tap asserts.
pub const FULL_TAP: u8 = 4;
/// Pulses before the overlong tap asserts, flagging a dead or malformed line.
pub const OVERLONG_TAP: u8 = 6;

/// Classified width of the interval between two line transitions.
///
/// The decode bands sit midway between the taps, so a single pulse of skew
/// cannot flip a half interval into a full one or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseWidth {
    /// No pulse at all fit inside the interval.
    Runt,
    /// Roughly half a unit interval: one bit cell of a logic 1.
    Half,
    /// Roughly a whole unit interval: a logic 0.
    Full,
    /// Longer than any legal bit shape.
    Overlong,
}

/// Free-running programmable divider, one output pulse every `period` ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulseDivider {
    count: u8,
}

impl PulseDivider {
    #[must_use]
    pub const fn new() -> Self {
        Self { count: 0 }
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Advances one tick of the reference clock. Returns true on the ticks
    /// where the divider rolls over. A period of zero behaves as one, so a
    /// searcher that has cleared every bit still produces pulses.
    pub fn tick(&mut self, period: u8) -> bool {
        self.count = self.count.saturating_add(1);
        if self.count >= period.max(1) {
            self.count = 0;
            return true;
        }
        false
    }
}

/// Saturating pulse counter with named taps.
///
/// Shifted once per divider pulse and cleared on every line transition, its
/// count is the width of the current interval measured in quarter unit
/// intervals.
#[derive(Debug, Clone, Copy, Default)]
pub struct TapLine {
    count: u8,
}

impl TapLine {
    #[must_use]
    pub const fn new() -> Self {
        Self { count: 0 }
    }

    /// Advances the line by one pulse. Saturates just past the overlong tap;
    /// anything longer carries no more information.
    pub fn shift(&mut self) {
        self.count = (self.count + 1).min(OVERLONG_TAP + 1);
    }

    pub fn clear(&mut self) {
        self.count = 0;
    }

    #[must_use]
    pub const fn count(&self) -> u8 {
        self.count
    }

    #[must_use]
    pub const fn half(&self) -> bool {
        self.count >= HALF_TAP
    }

    #[must_use]
    pub const fn full(&self) -> bool {
        self.count >= FULL_TAP
    }

    #[must_use]
    pub const fn overlong(&self) -> bool {
        self.count >= OVERLONG_TAP
    }

    #[must_use]
    pub const fn classify(&self) -> PulseWidth {
        match self.count {
            0 => PulseWidth::Runt,
            1..=2 => PulseWidth::Half,
            3..=5 => PulseWidth::Full,
            _ => PulseWidth::Overlong,
        }
    }
}

/// Verdict fed back into the binary search after probing one divider value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// The probed period was short enough for the full tap to fire inside a
    /// full interval; the estimate may stay this large.
    GreaterOrEqual,
    /// The full tap missed: the probed period is too long.
    Less,
}

/// Successive-approximation register over the seven-bit divider period.
///
/// Starting from the top bit, every [`step`](Self::step) either keeps or
/// clears the bit under probe and moves on to the next. After seven steps
/// the register holds the largest period that still times a full interval
/// correctly, which is the best quarter-unit-interval estimate the divider
/// granularity allows.
#[derive(Debug, Clone, Copy)]
pub struct BinarySearcher {
    value: u8,
    probe: u8,
}

const PROBE_TOP: u8 = 0b100_0000;

impl Default for BinarySearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl BinarySearcher {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: PROBE_TOP,
            probe: PROBE_TOP,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Resolves the bit currently under probe and arms the next one. Steps
    /// after the search has converged are ignored.
    pub fn step(&mut self, cmp: Comparison) {
        if self.probe == 0 {
            return;
        }
        if cmp == Comparison::Less {
            self.value &= !self.probe;
        }
        self.probe >>= 1;
        self.value |= self.probe;
    }

    /// True once all seven bits have been resolved.
    #[must_use]
    pub const fn ready(&self) -> bool {
        self.probe == 0
    }

    /// The current period estimate, including the bit still under probe.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    /// Runs the search to completion against a fixed target, answering each
    /// probe the way the tap comparison would for an ideal line.
    fn converge(target: u8) -> u8 {
        let mut sar = BinarySearcher::new();
        while !sar.ready() {
            let cmp = if sar.value() <= target {
                Comparison::GreaterOrEqual
            } else {
                Comparison::Less
            };
            sar.step(cmp);
        }
        sar.value()
    }

    #[test]
    fn test_divider_period_and_rollover() {
        let mut div = PulseDivider::new();
        let fired: Vec<bool> = (0..12).map(|_| div.tick(4)).collect();
        assert_eq!(
            fired,
            [
                false, false, false, true, false, false, false, true, false, false, false, true
            ]
        );
    }

    #[test]
    fn test_divider_zero_period_acts_as_one() {
        let mut div = PulseDivider::new();
        assert!(div.tick(0));
        assert!(div.tick(0));
    }

    #[test]
    fn test_tap_thresholds() {
        let mut taps = TapLine::new();
        assert_eq!(taps.classify(), PulseWidth::Runt);
        taps.shift();
        assert!(!taps.half());
        assert_eq!(taps.classify(), PulseWidth::Half);
        taps.shift();
        assert!(taps.half() && !taps.full());
        taps.shift();
        assert_eq!(taps.classify(), PulseWidth::Full);
        taps.shift();
        assert!(taps.full() && !taps.overlong());
        taps.shift();
        assert_eq!(taps.classify(), PulseWidth::Full);
        taps.shift();
        assert!(taps.overlong());
        assert_eq!(taps.classify(), PulseWidth::Overlong);
    }

    #[test]
    fn test_tap_saturates() {
        let mut taps = TapLine::new();
        for _ in 0..50 {
            taps.shift();
        }
        assert_eq!(taps.count(), OVERLONG_TAP + 1);
        taps.clear();
        assert_eq!(taps.count(), 0);
    }

    #[test]
    fn test_search_finds_exact_targets() {
        assert_eq!(converge(40), 40);
        assert_eq!(converge(36), 36);
        assert_eq!(converge(44), 44);
        assert_eq!(converge(29), 29);
        assert_eq!(converge(0), 0);
        assert_eq!(converge(127), 127);
    }

    #[test]
    fn test_search_takes_seven_steps() {
        let mut sar = BinarySearcher::new();
        for _ in 0..7 {
            assert!(!sar.ready());
            sar.step(Comparison::GreaterOrEqual);
        }
        assert!(sar.ready());
        assert_eq!(sar.value(), 0x7F);
        // extra steps are inert once converged
        sar.step(Comparison::Less);
        assert_eq!(sar.value(), 0x7F);
    }

    proptest! {
        #[test]
        fn test_search_converges_to_any_target(target in 0u8..=127) {
            prop_assert_eq!(converge(target), target);
        }
    }
}
