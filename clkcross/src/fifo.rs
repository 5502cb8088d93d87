//! Dual-clock FIFO with Gray-coded pointers.
//!
//! The classic two-counter arrangement: each domain owns one pointer, sees
//! the other domain's pointer only through a [`TwoFlop`], and both pointers
//! carry one wrap bit more than the address width. Full is judged on the
//! write side against the synchronized read pointer, empty on the read side
//! against the synchronized write pointer. Staleness only ever makes those
//! verdicts conservative. A slot the reader can see was written at least two
//! read ticks earlier, so the storage itself needs no further ordering.
//!
//! There is no `len`: occupancy has no single truthful value across two
//! clock domains, only the per-side views (`full`, `filling`, `empty`).

use crate::{
    gray,
    gray::GrayCounter,
    sync::TwoFlop,
};

/// Wire-level outcome of one write-domain tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteView {
    /// The offered word was stored this tick.
    pub accepted: bool,
    /// A word was offered while full and dropped. One-tick pulse.
    pub write_err: bool,
    /// No free slot, as far as the write side can tell.
    pub full: bool,
    /// At least half the slots look occupied from the write side.
    pub filling: bool,
    /// Write-side emptiness: the synchronized read-domain flag, held false
    /// from the moment a local write is accepted until the read domain has
    /// observably caught up.
    pub empty: bool,
}

/// Wire-level outcome of one read-domain tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadView<W> {
    /// The word popped this tick, if one was requested and available.
    pub word: Option<W>,
    /// A pop was requested while empty. One-tick pulse.
    pub read_err: bool,
    /// Nothing visible to read after this tick.
    pub empty: bool,
    /// Head word as it stands after this tick, left in place.
    pub peek: Option<W>,
}

/// A `CAP`-deep dual-clock FIFO carrying words of type `W`.
///
/// The two domains are modeled as the two methods: every call to
/// [`write_tick`](Self::write_tick) is one write-clock cycle and every call
/// to [`read_tick`](Self::read_tick) one read-clock cycle, in whatever
/// interleaving the caller's clock ratio produces. Each call advances that
/// domain's synchronizers exactly once.
#[derive(Debug, Clone)]
pub struct AsyncFifo<W: Copy + Default, const CAP: usize> {
    mem: [W; CAP],
    // Write-domain registers.
    wptr: GrayCounter,
    rptr_in_w: TwoFlop<u32>,
    rempty_in_w: TwoFlop<bool>,
    not_empty_hold: bool,
    // Read-domain registers.
    rptr: GrayCounter,
    wptr_in_r: TwoFlop<u32>,
    rempty: bool,
}

impl<W: Copy + Default, const CAP: usize> AsyncFifo<W, CAP> {
    const PTR_BITS: u32 = (CAP as u32).trailing_zeros() + 1;
    const PTR_MASK: u32 = (1 << Self::PTR_BITS) - 1;
    const ADDR_MASK: u32 = (CAP as u32) - 1;
    // Pointers exactly half a lap apart: top two Gray bits differ, rest equal.
    const FULL_XOR: u32 = 0b11 << (Self::PTR_BITS - 2);

    /// An empty FIFO with both domains at their power-on state.
    ///
    /// # Panics
    /// If `CAP` is not a power of two of at least 2.
    #[must_use]
    pub fn new() -> Self {
        assert!(CAP.is_power_of_two() && CAP >= 2);
        Self {
            mem: [W::default(); CAP],
            wptr: GrayCounter::new(Self::PTR_BITS),
            rptr_in_w: TwoFlop::new(),
            rempty_in_w: TwoFlop::preloaded(true),
            not_empty_hold: false,
            rptr: GrayCounter::new(Self::PTR_BITS),
            wptr_in_r: TwoFlop::new(),
            rempty: true,
        }
    }

    /// One write-clock cycle. Offers `word` for storage if `Some`; a word
    /// offered while full is dropped and flagged in the view.
    pub fn write_tick(&mut self, word: Option<W>) -> WriteView {
        self.rptr_in_w.sample(self.rptr.gray());
        self.rempty_in_w.sample(self.rempty);

        let rgray = self.rptr_in_w.output();
        let rempty_synced = self.rempty_in_w.output();

        // Release the hold once the read side has visibly woken up, or once
        // the synchronized read pointer shows everything written so far was
        // already consumed (an empty pulse too short to synchronize).
        if self.not_empty_hold && (!rempty_synced || rgray == self.wptr.gray()) {
            self.not_empty_hold = false;
        }

        let full_before = (self.wptr.gray() ^ rgray) == Self::FULL_XOR;
        let mut accepted = false;
        let mut write_err = false;
        if let Some(w) = word {
            if full_before {
                write_err = true;
            } else {
                self.mem[(self.wptr.binary() & Self::ADDR_MASK) as usize] = w;
                self.wptr.advance();
                accepted = true;
                self.not_empty_hold = true;
            }
        }

        let occupancy = self.wptr.binary().wrapping_sub(gray::decode(rgray)) & Self::PTR_MASK;
        WriteView {
            accepted,
            write_err,
            full: (self.wptr.gray() ^ rgray) == Self::FULL_XOR,
            filling: occupancy >= (CAP as u32) / 2,
            empty: !self.not_empty_hold && rempty_synced,
        }
    }

    /// One read-clock cycle. Pops the head word if `pop` is set and a word
    /// is visible; a pop requested while empty is flagged in the view.
    pub fn read_tick(&mut self, pop: bool) -> ReadView<W> {
        self.wptr_in_r.sample(self.wptr.gray());
        let wgray = self.wptr_in_r.output();

        let empty_before = wgray == self.rptr.gray();
        let mut word = None;
        let mut read_err = false;
        if pop {
            if empty_before {
                read_err = true;
            } else {
                word = Some(self.mem[(self.rptr.binary() & Self::ADDR_MASK) as usize]);
                self.rptr.advance();
            }
        }

        let empty = wgray == self.rptr.gray();
        self.rempty = empty;
        ReadView {
            word,
            read_err,
            empty,
            peek: if empty {
                None
            } else {
                Some(self.mem[(self.rptr.binary() & Self::ADDR_MASK) as usize])
            },
        }
    }

    /// Back to the power-on state: storage cleared, pointers and
    /// synchronizers collapsed.
    pub fn reset(&mut self) {
        self.mem = [W::default(); CAP];
        self.wptr.reset();
        self.rptr_in_w.reset_to(0);
        self.rempty_in_w.reset_to(true);
        self.not_empty_hold = false;
        self.rptr.reset();
        self.wptr_in_r.reset_to(0);
        self.rempty = true;
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        CAP
    }
}

impl<W: Copy + Default, const CAP: usize> Default for AsyncFifo<W, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_starts_empty_on_both_sides() {
        let mut fifo = AsyncFifo::<u8, 16>::new();
        assert!(fifo.write_tick(None).empty);
        let r = fifo.read_tick(false);
        assert!(r.empty);
        assert_eq!(r.peek, None);
    }

    #[test]
    fn test_word_visible_after_two_read_ticks() {
        let mut fifo = AsyncFifo::<u16, 16>::new();
        let v = fifo.write_tick(Some(0x1AB));
        assert!(v.accepted);
        assert!(!v.empty);
        let r = fifo.read_tick(false);
        assert!(r.empty);
        let r = fifo.read_tick(true);
        assert_eq!(r.word, Some(0x1AB));
        assert!(r.empty);
    }

    #[test]
    fn test_peek_matches_next_pop() {
        let mut fifo = AsyncFifo::<u8, 16>::new();
        fifo.write_tick(Some(3));
        fifo.write_tick(Some(4));
        fifo.read_tick(false);
        let r = fifo.read_tick(false);
        assert_eq!(r.peek, Some(3));
        let r = fifo.read_tick(true);
        assert_eq!(r.word, Some(3));
        assert_eq!(r.peek, Some(4));
    }

    #[test]
    fn test_rejects_when_full_and_recovers() {
        let mut fifo = AsyncFifo::<u8, 16>::new();
        for n in 0..16 {
            let v = fifo.write_tick(Some(n));
            assert!(v.accepted);
            assert!(!v.write_err);
            assert_eq!(v.filling, n >= 7);
        }
        let v = fifo.write_tick(Some(0xFF));
        assert!(v.write_err);
        assert!(!v.accepted);
        assert!(v.full);
        // The error strobes for that tick only.
        let v = fifo.write_tick(None);
        assert!(!v.write_err);
        assert!(v.full);
        // Free one slot.
        fifo.read_tick(false);
        fifo.read_tick(false);
        let r = fifo.read_tick(true);
        assert_eq!(r.word, Some(0));
        // The freed slot reaches the writer two write ticks after the pop.
        let v = fifo.write_tick(Some(0xAA));
        assert!(v.write_err);
        let v = fifo.write_tick(Some(0xAA));
        assert!(v.accepted);
    }

    #[test]
    fn test_pop_on_empty_pulses_error() {
        let mut fifo = AsyncFifo::<u8, 16>::new();
        let r = fifo.read_tick(true);
        assert!(r.read_err);
        assert_eq!(r.word, None);
        assert!(r.empty);
        let r = fifo.read_tick(false);
        assert!(!r.read_err);
    }

    #[test]
    fn test_write_side_empty_tracks_consumption() {
        let mut fifo = AsyncFifo::<u8, 16>::new();
        assert!(fifo.write_tick(None).empty);
        let v = fifo.write_tick(Some(7));
        assert!(!v.empty);
        // Reader wakes up and sits on the word for a while.
        fifo.read_tick(false);
        fifo.read_tick(false);
        assert!(!fifo.write_tick(None).empty);
        assert!(!fifo.write_tick(None).empty);
        // Now the word is consumed.
        let r = fifo.read_tick(true);
        assert_eq!(r.word, Some(7));
        assert!(!fifo.write_tick(None).empty);
        assert!(fifo.write_tick(None).empty);
    }

    #[test]
    fn test_empty_view_recovers_when_wakeup_pulse_is_missed() {
        let mut fifo = AsyncFifo::<u8, 16>::new();
        fifo.write_tick(Some(1));
        // The reader pops on the very tick the word becomes visible, so the
        // read-domain empty flag never registers a false value.
        fifo.read_tick(false);
        let r = fifo.read_tick(true);
        assert_eq!(r.word, Some(1));
        // The synchronized read pointer, not the empty flag, releases the
        // hold on the write-side view.
        assert!(!fifo.write_tick(None).empty);
        assert!(fifo.write_tick(None).empty);
    }

    #[test]
    fn test_reset_restores_power_on_state() {
        let mut fifo = AsyncFifo::<u8, 16>::new();
        for n in 0..5 {
            fifo.write_tick(Some(n));
        }
        fifo.read_tick(false);
        fifo.reset();
        assert!(fifo.write_tick(None).empty);
        let r = fifo.read_tick(true);
        assert!(r.read_err);
        assert!(r.empty);
        let v = fifo.write_tick(Some(9));
        assert!(v.accepted);
    }

    #[test]
    fn test_slow_reader_sees_every_accepted_word_in_order() {
        let mut fifo = AsyncFifo::<u8, 16>::new();
        let mut sent = Vec::new();
        let mut got = Vec::new();
        let mut next = 0u8;
        for step in 0..400 {
            let view = fifo.write_tick(if next < 100 { Some(next) } else { None });
            if view.accepted {
                sent.push(next);
                next += 1;
            }
            if step % 3 == 0 {
                if let Some(w) = fifo.read_tick(true).word {
                    got.push(w);
                }
            }
        }
        for _ in 0..64 {
            if let Some(w) = fifo.read_tick(true).word {
                got.push(w);
            }
        }
        assert_eq!(sent, (0u8..100).collect::<Vec<u8>>());
        assert_eq!(got, sent);
    }

    proptest! {
        #[test]
        fn test_behaves_like_a_bounded_queue(
            ops in proptest::collection::vec(
                (proptest::option::of(any::<u8>()), any::<bool>()),
                0..300,
            )
        ) {
            let mut fifo = AsyncFifo::<u8, 16>::new();
            let mut model = VecDeque::new();
            let mut accepted = 0usize;
            let mut popped = 0usize;
            for (offer, pop) in ops {
                let v = fifo.write_tick(offer);
                if v.accepted {
                    model.push_back(offer.unwrap());
                    accepted += 1;
                }
                prop_assert!(accepted - popped <= 16);
                let r = fifo.read_tick(pop);
                if let Some(word) = r.word {
                    prop_assert_eq!(Some(word), model.pop_front());
                    popped += 1;
                }
            }
            // Whatever was accepted must still drain out, in order.
            for _ in 0..64 {
                if let Some(word) = fifo.read_tick(true).word {
                    prop_assert_eq!(Some(word), model.pop_front());
                }
            }
            prop_assert!(model.is_empty());
        }
    }
}
