//! Software model of a USB Power Delivery biphase-mark PHY.
//!
//! The wire is a single self-clocking line: every unit interval opens with
//! a transition and a logic 1 adds one more mid-interval. On top of that
//! line code sit 4b5b symbols, a 64-bit training preamble, ordered sets,
//! and a CRC-32 closing every data frame. This crate models the transceiver
//! around that wire at clock-cycle resolution: a transmit engine that
//! serializes queue words, a receive engine that locks onto the far end's
//! bit rate and decodes back to queue words, and a register-mapped bus
//! front-end on each queue.
//!
//! Clock domains are explicit. `line_tick` methods advance the line domain,
//! `bus_tick` methods the bus domain, and the caller interleaves the two in
//! any ratio; all traffic between them crosses through [`clkcross`]
//! primitives exactly as the equivalent netlist would.
//!
//! ```
//! use pdphy::{
//!     bus::{BusRequest, BusResponse, TX_KWRITE},
//!     PhyConfig, Transceiver,
//! };
//!
//! let mut xcvr = Transceiver::new(PhyConfig::default());
//! // queue an EOP for transmission, then run both halves in lockstep
//! let req = BusRequest { addr: TX_KWRITE, write: true, data: 5 };
//! assert_eq!(xcvr.transmitter.bus_tick(Some(req)), Some(BusResponse::Ack(0)));
//! for _ in 0..40_000 {
//!     xcvr.loopback_tick();
//! }
//! ```
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bus;
pub mod eop;
pub mod error;
pub mod phy;
pub mod preamble;
pub mod rate;
pub mod rx;
pub mod tx;
pub mod wave;

use pdcode::symbol::KCode;

pub use error::ErrorCode;
pub use phy::{
    PhyReceiver,
    PhyTransmitter,
    Transceiver,
};

/// Words each queue can hold.
pub const QUEUE_DEPTH: usize = 16;

/// The dual-clock queue carrying words between the bus and line domains.
pub type Queue = clkcross::AsyncFifo<QueueWord, QUEUE_DEPTH>;

/// One queue word: a data byte or a K-code, as the nine-bit hardware word
/// would carry it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueWord {
    kcode: bool,
    data: u8,
}

impl QueueWord {
    /// A data byte, transmitted low nibble first.
    #[must_use]
    pub const fn data(byte: u8) -> Self {
        Self {
            kcode: false,
            data: byte,
        }
    }

    /// A control word carrying one K-code.
    #[must_use]
    pub const fn control(k: KCode) -> Self {
        Self {
            kcode: true,
            data: k as u8,
        }
    }

    #[must_use]
    pub const fn is_kcode(&self) -> bool {
        self.kcode
    }

    /// The raw byte: payload for data words, the register code for K-codes.
    #[must_use]
    pub const fn byte(&self) -> u8 {
        self.data
    }

    /// The K-code of a control word, `None` for data words.
    #[must_use]
    pub fn as_kcode(&self) -> Option<KCode> {
        use num_traits::FromPrimitive;
        if self.kcode {
            KCode::from_u8(self.data & 0x7)
        } else {
            None
        }
    }
}

/// Static knobs of both engines. The defaults describe the nominal
/// operating point: a 48 MHz line clock against the 300 kHz bit rate,
/// giving 160 ticks per unit interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhyConfig {
    /// Line-clock ticks per unit interval at the transmitter. Must be even.
    /// The receiver never reads this; it recovers the rate from the wire,
    /// and its seven-bit divider reaches rates up to 508 ticks per
    /// interval.
    pub ticks_per_ui: u32,
    /// Line ticks the receiver distrusts its input synchronizer after
    /// reset.
    pub settle_ticks: u8,
    /// Preamble bits the receiver may spend refining its rate estimate
    /// before it must lock.
    pub refine_bit_cap: u8,
    /// Line ticks the transmit driver parks the line low before releasing
    /// it.
    pub hold_ticks: u32,
}

impl Default for PhyConfig {
    fn default() -> Self {
        Self {
            ticks_per_ui: 160,
            settle_ticks: 4,
            refine_bit_cap: 48,
            hold_ticks: 160,
        }
    }
}
