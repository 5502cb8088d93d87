//! The biphase-mark transmit engine.
//!
//! One call to [`Transmitter::line_tick`] is one cycle of the line-domain
//! clock. The engine pops queue words through the two-phase FIFO read
//! interface, expands them into 4b5b symbols, and drives the line one
//! half-interval at a time: a transition opens every unit interval and a
//! logic 1 adds one more mid-interval. The encoder level starts from the
//! high rail, so the opening transition of the first preamble bit lands on
//! the idle-low line invisibly.
//!
//! Words are fetched two bit times before the running symbol ends, hiding
//! the FIFO's pop latency. When the fetch comes back empty the frame closes:
//! one trailing edge delimits the final bit, the line settles low, holds for
//! the configured time, and only then does the driver let go.

use clkcross::fifo::ReadView;
use pdcode::symbol::{
    KCode,
    Symbol,
};
use tracing::{
    debug,
    trace,
    warn,
};

use crate::{
    preamble::PreambleGen,
    PhyConfig,
    QueueWord,
};

/// Driver outputs for one line tick. While `enable` is low the driver is
/// off the wire and `data` is meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineOut {
    pub data: bool,
    pub enable: bool,
}

impl LineOut {
    /// The wire level a receiver sees, with the undriven line resting low.
    #[must_use]
    pub const fn level(&self) -> bool {
        self.enable && self.data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    /// Driver off the wire, watching for a first word to appear.
    Idle,
    /// Clocking out the 64-bit training sequence.
    Preamble,
    /// Clocking out symbol bits; `bit` counts 1 through 5 within a symbol.
    ShiftOut { bit: u8 },
    /// Frame closed; settling the line low and running out the hold time.
    FinishWait,
}

/// The transmit engine and its line driver.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct Transmitter {
    half_ticks: u32,
    hold_ticks: u32,
    state: TxState,
    // line driver registers
    level: bool,
    enable: bool,
    close_high_left: u32,
    hold_left: u32,
    // bit pacing
    tick_in_half: u32,
    second_half: bool,
    cur_bit: bool,
    // data path
    preamble: PreambleGen,
    shifter: u8,
    current: QueueWord,
    half_high: bool,
    next_word: Option<QueueWord>,
    pop_pending: bool,
    seen_empty: bool,
    underrun: bool,
}

impl Transmitter {
    /// # Panics
    ///
    /// Panics unless `config.ticks_per_ui` is even and at least 4; bit
    /// halves must land on whole line ticks.
    #[must_use]
    pub fn new(config: PhyConfig) -> Self {
        assert!(config.ticks_per_ui >= 4 && config.ticks_per_ui % 2 == 0);
        Self {
            half_ticks: config.ticks_per_ui / 2,
            hold_ticks: config.hold_ticks,
            state: TxState::Idle,
            level: false,
            enable: false,
            close_high_left: 0,
            hold_left: 0,
            tick_in_half: 0,
            second_half: false,
            cur_bit: false,
            preamble: PreambleGen::new(),
            shifter: 0,
            current: QueueWord::default(),
            half_high: false,
            next_word: None,
            pop_pending: false,
            seen_empty: true,
            underrun: false,
        }
    }

    pub fn reset(&mut self) {
        self.state = TxState::Idle;
        self.level = false;
        self.enable = false;
        self.close_high_left = 0;
        self.hold_left = 0;
        self.tick_in_half = 0;
        self.second_half = false;
        self.cur_bit = false;
        self.preamble.reset();
        self.shifter = 0;
        self.current = QueueWord::default();
        self.half_high = false;
        self.next_word = None;
        self.pop_pending = false;
        self.seen_empty = true;
        self.underrun = false;
    }

    /// A pop request for this cycle's FIFO read, raised one tick ahead of
    /// when the engine wants the word. Consumed by the caller that owns the
    /// queue.
    pub fn take_pop_request(&mut self) -> bool {
        std::mem::take(&mut self.pop_pending)
    }

    /// True while the engine is between frames with the driver released.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, TxState::Idle)
    }

    /// True if the last frame was cut short because the queue ran dry on a
    /// symbol other than EOP. Clears when the next frame starts.
    #[must_use]
    pub const fn underrun(&self) -> bool {
        self.underrun
    }

    /// Advances one line-clock cycle against this cycle's FIFO read view.
    pub fn line_tick(&mut self, view: &ReadView<QueueWord>) -> LineOut {
        self.seen_empty = view.empty;
        match self.state {
            TxState::Idle => {
                if let Some(word) = view.word {
                    self.begin(word);
                } else if !view.empty {
                    self.pop_pending = true;
                }
            }
            TxState::Preamble | TxState::ShiftOut { .. } => {
                if let Some(word) = view.word {
                    self.next_word = Some(word);
                }
                self.advance_bit_clock();
            }
            TxState::FinishWait => self.advance_close(),
        }
        LineOut {
            data: self.level,
            enable: self.enable,
        }
    }

    /// Seizes the wire and starts the preamble, with the first word's low
    /// symbol preloaded so it is ready the moment the preamble ends.
    fn begin(&mut self, word: QueueWord) {
        debug!(kcode = word.is_kcode(), data = word.byte(), "frame start");
        self.state = TxState::Preamble;
        self.enable = true;
        self.level = true;
        self.preamble.reset();
        self.current = word;
        self.half_high = false;
        self.next_word = None;
        self.underrun = false;
        self.shifter = Self::symbol_for(word, false).pattern();
        self.tick_in_half = 0;
        self.second_half = false;
        self.on_bit_boundary();
    }

    fn advance_bit_clock(&mut self) {
        self.tick_in_half += 1;
        if self.tick_in_half < self.half_ticks {
            return;
        }
        self.tick_in_half = 0;
        self.second_half = !self.second_half;
        if self.second_half {
            if self.cur_bit {
                self.level = !self.level;
            }
        } else {
            self.on_bit_boundary();
        }
    }

    /// A unit interval begins: drive the opening transition and decide the
    /// bit that shapes it.
    fn on_bit_boundary(&mut self) {
        self.level = !self.level;
        match self.state {
            TxState::Preamble => {
                let pb = self.preamble.step();
                self.cur_bit = pb.bit;
                if pb.last {
                    self.state = TxState::ShiftOut { bit: 0 };
                }
            }
            TxState::ShiftOut { bit } => {
                let bit = if bit == 5 {
                    match self.advance_symbol() {
                        Some(symbol) => {
                            self.shifter = symbol.pattern();
                            1
                        }
                        None => {
                            self.begin_close();
                            return;
                        }
                    }
                } else {
                    bit + 1
                };
                self.cur_bit = self.shifter & 1 == 1;
                self.shifter >>= 1;
                if bit == 2 {
                    self.prefetch();
                }
                self.state = TxState::ShiftOut { bit };
            }
            TxState::Idle | TxState::FinishWait => {}
        }
    }

    /// Two bit times before the running symbol ends, line up what follows:
    /// the high nibble of the current word needs no fetch, anything else
    /// needs a pop unless the queue has gone dry.
    fn prefetch(&mut self) {
        let last_of_word = self.current.is_kcode() || self.half_high;
        if last_of_word && !self.seen_empty {
            self.pop_pending = true;
        }
    }

    /// The running symbol just finished; returns the next one, or `None`
    /// when the frame is over.
    fn advance_symbol(&mut self) -> Option<Symbol> {
        if !(self.current.is_kcode() || self.half_high) {
            self.half_high = true;
            return Some(Self::symbol_for(self.current, true));
        }
        let word = self.next_word.take()?;
        trace!(kcode = word.is_kcode(), data = word.byte(), "next word");
        self.current = word;
        self.half_high = false;
        Some(Self::symbol_for(word, false))
    }

    /// The trailing edge has been driven; settle the line low, run out the
    /// hold time, then release the wire.
    fn begin_close(&mut self) {
        if self.current.as_kcode() == Some(KCode::Eop) {
            debug!("frame closed");
        } else {
            warn!("queue ran dry before EOP");
            self.underrun = true;
        }
        self.cur_bit = false;
        self.state = TxState::FinishWait;
        self.close_high_left = if self.level { self.half_ticks } else { 0 };
        self.hold_left = self.hold_ticks;
    }

    fn advance_close(&mut self) {
        if self.close_high_left > 0 {
            self.close_high_left -= 1;
            if self.close_high_left == 0 {
                self.level = false;
            }
        } else if self.hold_left > 0 {
            self.hold_left -= 1;
            if self.hold_left == 0 {
                debug!("driver released");
                self.enable = false;
                self.state = TxState::Idle;
            }
        }
    }

    fn symbol_for(word: QueueWord, high: bool) -> Symbol {
        match word.as_kcode() {
            Some(k) => Symbol::K(k),
            None => Symbol::Data(if high {
                word.byte() >> 4
            } else {
                word.byte() & 0xF
            }),
        }
    }
}
