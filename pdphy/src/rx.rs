//! The biphase-mark receive engine.
//!
//! One call to [`Receiver::line_tick`] is one cycle of the line-domain
//! clock. The engine resynchronizes the raw line through a two-flop,
//! measures the spacing of its transitions with the quarter-interval
//! divider, locks the divider onto the far end's bit rate during the
//! preamble, and then shifts symbol bits out of the transition pattern:
//! two half intervals are a 1, one full interval is a 0. Completed symbols
//! are decoded, CRC-checked, and handed back one queue word at a time.
//!
//! The line idles low and the far driver's encoder starts from the high
//! rail, so the opening transition of a frame may land on the idle level
//! and never show. The polarity of the first visible edge says which case
//! holds, and with it both the number of edges left in the preamble and
//! where the full intervals sit in the repeating half-half-full cadence.

use clkcross::TwoFlop;
use pdcode::{
    crc::Crc32,
    symbol::Symbol,
};
use tracing::{
    debug,
    trace,
    warn,
};

use crate::{
    eop::{
        EopDetector,
        FrameEnd,
    },
    error::RxLatches,
    rate::{
        BinarySearcher,
        Comparison,
        PulseDivider,
        PulseWidth,
        TapLine,
        OVERLONG_TAP,
    },
    PhyConfig,
    QueueWord,
};

/// Progress through one received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Input synchronizer still settling after reset; edges are not trusted.
    Startup { settle_left: u8 },
    /// Line idle, waiting for the opening edge of a preamble.
    Idle,
    /// Preamble running, binary search refining the divider period.
    PreambleSync {
        pos: u8,
        full_at: u8,
        edges_left: u8,
        steps_left: u8,
    },
    /// Divider locked; riding out the rest of the preamble cadence.
    PreambleWait { pos: u8, full_at: u8, edges_left: u8 },
    /// Shifting symbol bits, five per symbol.
    SymbolRead { bits: u8, nbits: u8, half_pending: bool },
    /// Frame over or abandoned; waiting for the line to go quiet.
    Quiet,
}

/// The receive engine. Lives entirely in the line clock domain; its sticky
/// fault flags are exported for synchronization into the bus domain.
#[derive(Debug, Clone)]
pub struct Receiver {
    settle_ticks: u8,
    refine_steps: u8,
    state: RxState,
    input: TwoFlop<bool>,
    last_level: bool,
    divider: PulseDivider,
    searcher: BinarySearcher,
    taps: TapLine,
    crc: Crc32,
    detector: EopDetector,
    low_nibble: Option<u8>,
    data_symbols: u16,
    latches: RxLatches,
}

impl Receiver {
    #[must_use]
    pub fn new(config: PhyConfig) -> Self {
        let settle_ticks = config.settle_ticks;
        Self {
            settle_ticks,
            refine_steps: (config.refine_bit_cap / 2).max(1),
            state: Self::entry_state(settle_ticks),
            input: TwoFlop::new(),
            last_level: false,
            divider: PulseDivider::new(),
            searcher: BinarySearcher::new(),
            taps: TapLine::new(),
            crc: Crc32::new(),
            detector: EopDetector::new(),
            low_nibble: None,
            data_symbols: 0,
            latches: RxLatches::default(),
        }
    }

    const fn entry_state(settle_ticks: u8) -> RxState {
        if settle_ticks == 0 {
            RxState::Idle
        } else {
            RxState::Startup {
                settle_left: settle_ticks,
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = Self::entry_state(self.settle_ticks);
        self.input.reset_to(false);
        self.last_level = false;
        self.divider.reset();
        self.searcher.reset();
        self.taps.clear();
        self.crc.reset();
        self.detector.reset();
        self.low_nibble = None;
        self.data_symbols = 0;
        self.latches = RxLatches::default();
    }

    /// The sticky fault flags, to be synchronized into the bus domain.
    #[must_use]
    pub const fn latches(&self) -> RxLatches {
        self.latches
    }

    /// Records that a decoded word was dropped at a full queue. Unlike the
    /// frame-scoped flags this one holds until reset; the word is gone.
    pub fn note_write_rejected(&mut self) {
        warn!("receive queue full, word dropped");
        self.latches.overflow = true;
    }

    /// Advances one line-clock cycle with the raw line level as input.
    /// Returns a decoded queue word on the cycles where one completes.
    pub fn line_tick(&mut self, line: bool) -> Option<QueueWord> {
        self.input.sample(line);
        let level = self.input.output();
        let edge = level != self.last_level;
        self.last_level = level;

        let pulse = self.divider.tick(self.searcher.value());
        if pulse {
            self.taps.shift();
        }

        if let RxState::Startup { settle_left } = self.state {
            self.state = if settle_left <= 1 {
                RxState::Idle
            } else {
                RxState::Startup {
                    settle_left: settle_left - 1,
                }
            };
            return None;
        }

        if edge {
            let word = self.on_edge(level);
            self.taps.clear();
            return word;
        }
        if pulse && self.taps.count() == OVERLONG_TAP {
            self.on_silence();
        }
        None
    }

    /// Handles one line transition. The tap line still holds the width of
    /// the interval the transition closed.
    fn on_edge(&mut self, level: bool) -> Option<QueueWord> {
        let width = self.taps.classify();
        let full_tap = self.taps.full();
        trace!(level, ?width, "edge");
        match self.state {
            RxState::Startup { .. } => None,
            RxState::Quiet => None,
            RxState::Idle => {
                self.begin_frame(level);
                None
            }
            RxState::PreambleSync {
                pos,
                full_at,
                edges_left,
                mut steps_left,
            } => {
                let edges_left = edges_left - 1;
                if pos == full_at {
                    self.searcher.step(if full_tap {
                        Comparison::GreaterOrEqual
                    } else {
                        Comparison::Less
                    });
                    steps_left -= 1;
                }
                let pos = (pos + 1) % 3;
                self.state = if edges_left == 0 {
                    RxState::SymbolRead {
                        bits: 0,
                        nbits: 0,
                        half_pending: false,
                    }
                } else if self.searcher.ready() || steps_left == 0 {
                    debug!(divider = self.searcher.value(), "bit rate locked");
                    RxState::PreambleWait {
                        pos,
                        full_at,
                        edges_left,
                    }
                } else {
                    RxState::PreambleSync {
                        pos,
                        full_at,
                        edges_left,
                        steps_left,
                    }
                };
                None
            }
            RxState::PreambleWait {
                pos,
                full_at,
                edges_left,
            } => {
                let edges_left = edges_left - 1;
                let want_full = pos == full_at;
                let ok = matches!(
                    (width, want_full),
                    (PulseWidth::Full, true) | (PulseWidth::Half, false)
                );
                if !ok {
                    warn!(?width, want_full, "preamble cadence broken");
                    self.latches.bad_preamble = true;
                    self.state = RxState::Quiet;
                } else if edges_left == 0 {
                    trace!("preamble complete");
                    self.state = RxState::SymbolRead {
                        bits: 0,
                        nbits: 0,
                        half_pending: false,
                    };
                } else {
                    self.state = RxState::PreambleWait {
                        pos: (pos + 1) % 3,
                        full_at,
                        edges_left,
                    };
                }
                None
            }
            RxState::SymbolRead {
                bits,
                nbits,
                half_pending,
            } => match (width, half_pending) {
                (PulseWidth::Half, false) => {
                    self.state = RxState::SymbolRead {
                        bits,
                        nbits,
                        half_pending: true,
                    };
                    None
                }
                (PulseWidth::Half, true) => self.shift_bit(bits, nbits, true),
                (PulseWidth::Full, false) => self.shift_bit(bits, nbits, false),
                _ => {
                    // A full interval on an odd half boundary, a runt, or an
                    // overlong interval: the transition pattern no longer
                    // lines up with any legal bit shape.
                    warn!(?width, half_pending, "malformed pulse train");
                    self.latches.invalid_symbol = true;
                    self.state = RxState::Quiet;
                    None
                }
            },
        }
    }

    /// An edge out of idle: the frame hunt begins. A rising first edge
    /// means the opening transition landed on the idle level unseen, which
    /// fixes both the edge budget and the cadence offset.
    fn begin_frame(&mut self, rising: bool) {
        let (edges_left, full_at) = if rising { (95, 2) } else { (96, 0) };
        debug!(rising, "preamble hunt");
        self.searcher.reset();
        self.crc.reset();
        self.detector.reset();
        self.low_nibble = None;
        self.data_symbols = 0;
        self.state = RxState::PreambleSync {
            pos: 0,
            full_at,
            edges_left,
            steps_left: self.refine_steps,
        };
    }

    fn shift_bit(&mut self, bits: u8, nbits: u8, bit: bool) -> Option<QueueWord> {
        let bits = bits | (u8::from(bit) << nbits);
        if nbits == 4 {
            self.state = RxState::SymbolRead {
                bits: 0,
                nbits: 0,
                half_pending: false,
            };
            self.complete_symbol(bits)
        } else {
            self.state = RxState::SymbolRead {
                bits,
                nbits: nbits + 1,
                half_pending: false,
            };
            None
        }
    }

    fn complete_symbol(&mut self, pattern: u8) -> Option<QueueWord> {
        let symbol = match Symbol::from_pattern(pattern) {
            Ok(symbol) => symbol,
            Err(err) => {
                warn!(%err, "undecodable symbol");
                self.latches.invalid_symbol = true;
                self.state = RxState::Quiet;
                return None;
            }
        };
        trace!(%symbol, "symbol");
        let end = self.detector.observe(symbol);
        let word = match symbol {
            Symbol::K(k) => Some(QueueWord::control(k)),
            Symbol::Data(nibble) => {
                for shift in 0..4 {
                    self.crc.push((nibble >> shift) & 1 == 1);
                }
                self.data_symbols += 1;
                match self.low_nibble.take() {
                    None => {
                        self.low_nibble = Some(nibble);
                        None
                    }
                    Some(low) => Some(QueueWord::data(low | (nibble << 4))),
                }
            }
        };
        if let Some(end) = end {
            self.finish_frame(end);
        }
        word
    }

    fn finish_frame(&mut self, end: FrameEnd) {
        debug!(?end, symbols = self.data_symbols, "frame end");
        if self.low_nibble.take().is_some() {
            debug!("dangling nibble dropped at frame end");
        }
        let crc_ok = self.data_symbols == 0 || self.crc.residual_ok();
        if end == FrameEnd::Eop && !crc_ok {
            warn!(residual = self.crc.residual(), "frame check failed");
            self.latches.crc_failure = true;
        } else {
            // Traffic is flowing again; the frame-scoped flags release. An
            // overflow holds until reset, its word cannot be recovered.
            self.latches.invalid_symbol = false;
            self.latches.bad_preamble = false;
            self.latches.timeout = false;
            self.latches.crc_failure = false;
        }
        self.state = RxState::Quiet;
    }

    /// The overlong tap fired with no edge in sight: the line has been
    /// still for longer than any legal bit shape.
    fn on_silence(&mut self) {
        match self.state {
            RxState::PreambleSync { .. } | RxState::PreambleWait { .. } => {
                warn!("preamble died early");
                self.latches.bad_preamble = true;
                self.taps.clear();
                self.state = RxState::Quiet;
            }
            RxState::SymbolRead { .. } => {
                warn!("line went quiet mid-symbol");
                self.latches.timeout = true;
                self.taps.clear();
                self.state = RxState::Quiet;
            }
            RxState::Quiet => {
                debug!("line idle");
                self.state = RxState::Idle;
            }
            RxState::Startup { .. } | RxState::Idle => {}
        }
    }
}
