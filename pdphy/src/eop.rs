//! Frame-end detection.
//!
//! A frame normally ends with an explicit EOP symbol, but the two reset
//! ordered sets end a frame by themselves, without EOP or CRC. The detector
//! watches the first four symbols of every frame and compares them against
//! both reset sets, tolerating one corrupted position in either, so a single
//! line hit cannot turn a Hard Reset into ordinary traffic.

use pdcode::{
    sets,
    symbol::{
        KCode,
        Symbol,
    },
};
use tracing::debug;

/// How the current frame ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEnd {
    /// An EOP K-code, from any position in the frame.
    Eop,
    /// The first four symbols matched the Hard Reset set.
    HardReset,
    /// The first four symbols matched the Cable Reset set.
    CableReset,
}

/// Scores the opening symbols of a frame against both reset ordered sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct EopDetector {
    seen: u8,
    hard_miss: u8,
    cable_miss: u8,
    done: bool,
}

impl EopDetector {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            seen: 0,
            hard_miss: 0,
            cable_miss: 0,
            done: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feeds one decoded symbol. Returns the frame-end verdict the moment it
    /// is known: immediately for EOP, after the fourth symbol for the reset
    /// sets. A genuine EOP short-circuits even inside the scoring window.
    pub fn observe(&mut self, symbol: Symbol) -> Option<FrameEnd> {
        if symbol == Symbol::K(KCode::Eop) {
            return Some(FrameEnd::Eop);
        }
        if self.done {
            return None;
        }
        let position = usize::from(self.seen);
        if symbol != Symbol::K(sets::HARD_RESET[position]) {
            self.hard_miss += 1;
        }
        if symbol != Symbol::K(sets::CABLE_RESET[position]) {
            self.cable_miss += 1;
        }
        self.seen += 1;
        if usize::from(self.seen) < sets::ORDERED_SET_LEN {
            return None;
        }
        self.done = true;
        // A symbol corrupted toward the other set can leave one mismatch on
        // both scores; Hard Reset takes precedence as the safer outcome.
        if self.hard_miss <= 1 {
            debug!(misses = self.hard_miss, "hard reset set");
            Some(FrameEnd::HardReset)
        } else if self.cable_miss <= 1 {
            debug!(misses = self.cable_miss, "cable reset set");
            Some(FrameEnd::CableReset)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use paste::paste;

    use super::*;

    fn observe_all(detector: &mut EopDetector, symbols: &[Symbol]) -> Option<FrameEnd> {
        let mut verdict = None;
        for &symbol in symbols {
            if let Some(end) = detector.observe(symbol) {
                verdict = Some(end);
            }
        }
        verdict
    }

    fn k_frame(codes: [KCode; 4]) -> Vec<Symbol> {
        codes.iter().map(|&k| Symbol::K(k)).collect()
    }

    macro_rules! test_one_corruption {
        ($name:ident, $set:expr, $verdict:expr) => {
            paste! {
                #[test]
                fn [<test_ $name _tolerates_one_corruption>]() {
                    for position in 0..sets::ORDERED_SET_LEN {
                        for wrong in [KCode::Sync1, KCode::Sync2, KCode::Sync3, KCode::Rst1, KCode::Rst2] {
                            if wrong == $set[position] {
                                continue;
                            }
                            let mut codes = $set;
                            codes[position] = wrong;
                            let mut detector = EopDetector::new();
                            assert_eq!(
                                observe_all(&mut detector, &k_frame(codes)),
                                Some($verdict),
                                "position {position}, replaced with {wrong}"
                            );
                        }
                    }
                }
            }
        };
    }

    test_one_corruption!(hard_reset, sets::HARD_RESET, FrameEnd::HardReset);

    #[test]
    fn test_exact_sets_detected() {
        let mut detector = EopDetector::new();
        assert_eq!(
            observe_all(&mut detector, &k_frame(sets::HARD_RESET)),
            Some(FrameEnd::HardReset)
        );
        detector.reset();
        assert_eq!(
            observe_all(&mut detector, &k_frame(sets::CABLE_RESET)),
            Some(FrameEnd::CableReset)
        );
    }

    #[test]
    fn test_cable_reset_corruption_away_from_hard() {
        // Corrupting a Cable Reset position that Hard Reset shares drops the
        // cable score to one miss while hard keeps two or more.
        let mut codes = sets::CABLE_RESET;
        codes[0] = KCode::Sync2;
        let mut detector = EopDetector::new();
        assert_eq!(
            observe_all(&mut detector, &k_frame(codes)),
            Some(FrameEnd::CableReset)
        );
    }

    #[test]
    fn test_hard_priority_on_ambiguous_corruption() {
        // The two sets differ only at positions 1 and 3. Corrupting a Hard
        // Reset toward Cable Reset at one of them leaves one miss on both.
        let mut codes = sets::HARD_RESET;
        codes[3] = KCode::Sync3;
        let mut detector = EopDetector::new();
        assert_eq!(
            observe_all(&mut detector, &k_frame(codes)),
            Some(FrameEnd::HardReset)
        );
    }

    #[test]
    fn test_data_symbol_counts_as_corruption() {
        let mut codes_syms = k_frame(sets::HARD_RESET);
        codes_syms[2] = Symbol::Data(0x5);
        let mut detector = EopDetector::new();
        assert_eq!(
            observe_all(&mut detector, &codes_syms),
            Some(FrameEnd::HardReset)
        );
    }

    #[test]
    fn test_two_corruptions_rejected() {
        let mut codes = sets::HARD_RESET;
        codes[0] = KCode::Sync1;
        codes[1] = KCode::Sync2;
        let mut detector = EopDetector::new();
        assert_eq!(observe_all(&mut detector, &k_frame(codes)), None);
    }

    #[test]
    fn test_sop_is_not_a_reset() {
        let mut detector = EopDetector::new();
        assert_eq!(observe_all(&mut detector, &k_frame(sets::SOP)), None);
        // later payload symbols are outside the scoring window
        assert_eq!(detector.observe(Symbol::Data(0xA)), None);
    }

    #[test]
    fn test_eop_short_circuits_anywhere() {
        let mut detector = EopDetector::new();
        assert_eq!(detector.observe(Symbol::K(KCode::Rst1)), None);
        assert_eq!(
            detector.observe(Symbol::K(KCode::Eop)),
            Some(FrameEnd::Eop)
        );

        let mut detector = EopDetector::new();
        for _ in 0..6 {
            detector.observe(Symbol::Data(0x3));
        }
        assert_eq!(
            detector.observe(Symbol::K(KCode::Eop)),
            Some(FrameEnd::Eop)
        );
    }
}
