//! Register-mapped front-ends for the two queue endpoints.
//!
//! Each direction exposes a four-register window on an acknowledge/error
//! handshake bus: the master presents at most one request per bus tick and
//! gets back either an acknowledge with read data or an error strobe, with
//! the detail code left in that direction's ERRNO register. The front-ends
//! live entirely in the bus clock domain; everything they learn from the
//! line domain arrives through the FIFO's synchronized views and the
//! synchronized status bits passed into [`transact`](RxFrontEnd::transact).

use num_traits::FromPrimitive;
use packed_struct::prelude::*;
use pdcode::symbol::KCode;
use tracing::debug;

use crate::{
    error::{
        ErrorCode,
        RxLatches,
    },
    Queue,
    QueueWord,
};

/// Receive window: pop the next queue word.
pub const RX_QUEUE: u8 = 0x0;
/// Receive window: availability and word type of the queue head.
pub const RX_TYPE: u8 = 0x1;
/// Receive window: last error code.
pub const RX_ERRNO: u8 = 0x2;

/// Transmit window: enqueue a K-code by its register code.
pub const TX_KWRITE: u8 = 0x0;
/// Transmit window: enqueue a data byte.
pub const TX_DWRITE: u8 = 0x1;
/// Transmit window: queue fill and engine idle flags.
pub const TX_STATUS: u8 = 0x2;
/// Transmit window: last error code.
pub const TX_ERRNO: u8 = 0x3;

/// One bus-master request. Addresses are two bits wide on the wire; wider
/// values are a protocol violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusRequest {
    pub addr: u8,
    pub write: bool,
    pub data: u8,
}

/// The handshake result of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusResponse {
    /// Acknowledged; carries the read data, zero for writes.
    Ack(u8),
    /// Refused; the detail code is in ERRNO.
    Err,
}

/// Image of the receive TYPE register.
#[derive(PackedStruct, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "1")]
pub struct RxTypeReg {
    /// A word is waiting and no fault is latched.
    #[packed_field(bits = "0")]
    pub available: bool,
    /// The waiting word is a K-code rather than a data byte.
    #[packed_field(bits = "1")]
    pub kcode: bool,
}

/// Image of the transmit STATUS register.
#[derive(PackedStruct, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "1")]
pub struct TxStatusReg {
    /// The queue cannot take another word.
    #[packed_field(bits = "0")]
    pub full: bool,
    /// At least half the queue is occupied.
    #[packed_field(bits = "1")]
    pub filling: bool,
    /// The queue is empty and the engine has released the wire.
    #[packed_field(bits = "2")]
    pub idle: bool,
}

fn pack_reg<R>(reg: &R, errno: &mut ErrorCode) -> BusResponse
where
    R: PackedStruct<ByteArray = [u8; 1]>,
{
    match reg.pack() {
        Ok([byte]) => BusResponse::Ack(byte),
        Err(_) => {
            *errno = ErrorCode::BusProtocol;
            BusResponse::Err
        }
    }
}

/// Bus-domain face of the receive queue.
#[derive(Debug, Clone)]
pub struct RxFrontEnd {
    errno: ErrorCode,
    seen: RxLatches,
}

impl Default for RxFrontEnd {
    fn default() -> Self {
        Self::new()
    }
}

impl RxFrontEnd {
    #[must_use]
    pub fn new() -> Self {
        Self {
            errno: ErrorCode::BusProtocol,
            seen: RxLatches::default(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// The code a master would read from ERRNO.
    #[must_use]
    pub const fn errno(&self) -> ErrorCode {
        self.errno
    }

    /// Runs one bus tick. `latches` is this tick's synchronized view of the
    /// engine's fault flags; the queue's read side is advanced exactly once
    /// whether or not a request is present, so the pointer synchronizers
    /// keep moving on an idle bus.
    pub fn transact(
        &mut self,
        request: Option<BusRequest>,
        latches: RxLatches,
        queue: &mut Queue,
    ) -> Option<BusResponse> {
        self.note_latches(latches);
        let pop = !latches.any()
            && matches!(&request, Some(r) if !r.write && r.addr == RX_QUEUE);
        let view = queue.read_tick(pop);
        let request = request?;
        let response = match (request.addr, request.write) {
            (RX_QUEUE, false) => {
                if latches.any() {
                    // errno already carries the latched fault
                    BusResponse::Err
                } else if let Some(word) = view.word {
                    BusResponse::Ack(word.byte())
                } else {
                    self.errno = ErrorCode::Unsupported;
                    BusResponse::Err
                }
            }
            (RX_TYPE, false) => {
                let reg = RxTypeReg {
                    available: !latches.any() && view.peek.is_some(),
                    kcode: view.peek.is_some_and(|w| w.is_kcode()),
                };
                pack_reg(&reg, &mut self.errno)
            }
            (RX_ERRNO, false) => BusResponse::Ack(self.errno as u8),
            (RX_QUEUE | RX_TYPE | RX_ERRNO, true) => {
                self.errno = ErrorCode::Unsupported;
                BusResponse::Err
            }
            (0x3, _) => {
                self.errno = ErrorCode::InvalidRegister;
                BusResponse::Err
            }
            _ => {
                self.errno = ErrorCode::BusProtocol;
                BusResponse::Err
            }
        };
        Some(response)
    }

    /// Latches ERRNO on the rising edge of each fault flag. Concurrent new
    /// flags resolve to the last one listed.
    fn note_latches(&mut self, latches: RxLatches) {
        for (now, before, code) in [
            (
                latches.invalid_symbol,
                self.seen.invalid_symbol,
                ErrorCode::InvalidSymbol,
            ),
            (latches.overflow, self.seen.overflow, ErrorCode::BufferOverflow),
            (
                latches.bad_preamble,
                self.seen.bad_preamble,
                ErrorCode::InvalidPreamble,
            ),
            (latches.timeout, self.seen.timeout, ErrorCode::ReceiveTimeout),
            (
                latches.crc_failure,
                self.seen.crc_failure,
                ErrorCode::CrcFailure,
            ),
        ] {
            if now && !before {
                debug!(%code, "fault latched");
                self.errno = code;
            }
        }
        self.seen = latches;
    }
}

/// Bus-domain face of the transmit queue.
#[derive(Debug, Clone)]
pub struct TxFrontEnd {
    errno: ErrorCode,
    seen_underrun: bool,
}

impl Default for TxFrontEnd {
    fn default() -> Self {
        Self::new()
    }
}

impl TxFrontEnd {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            errno: ErrorCode::BusProtocol,
            seen_underrun: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub const fn errno(&self) -> ErrorCode {
        self.errno
    }

    /// Runs one bus tick. `engine_idle` and `underrun` are this tick's
    /// synchronized engine status bits; the queue's write side is advanced
    /// exactly once per call.
    pub fn transact(
        &mut self,
        request: Option<BusRequest>,
        engine_idle: bool,
        underrun: bool,
        queue: &mut Queue,
    ) -> Option<BusResponse> {
        if underrun && !self.seen_underrun {
            debug!("underrun latched");
            self.errno = ErrorCode::TxUnderrun;
        }
        self.seen_underrun = underrun;

        let word = match &request {
            Some(r) if r.write && r.addr == TX_KWRITE => {
                KCode::from_u8(r.data).map(QueueWord::control)
            }
            Some(r) if r.write && r.addr == TX_DWRITE => Some(QueueWord::data(r.data)),
            _ => None,
        };
        let view = queue.write_tick(word);
        let request = request?;
        let response = match (request.addr, request.write) {
            (TX_KWRITE, true) => {
                if word.is_none() {
                    // no K-code has a register code past EOP
                    self.errno = ErrorCode::Unsupported;
                    BusResponse::Err
                } else if view.accepted {
                    BusResponse::Ack(0)
                } else {
                    self.errno = ErrorCode::Unsupported;
                    BusResponse::Err
                }
            }
            (TX_DWRITE, true) => {
                if view.accepted {
                    BusResponse::Ack(0)
                } else {
                    self.errno = ErrorCode::Unsupported;
                    BusResponse::Err
                }
            }
            (TX_STATUS, false) => {
                let reg = TxStatusReg {
                    full: view.full,
                    filling: view.filling,
                    idle: view.empty && engine_idle,
                };
                pack_reg(&reg, &mut self.errno)
            }
            (TX_ERRNO, false) => BusResponse::Ack(self.errno as u8),
            (TX_KWRITE | TX_DWRITE, false) | (TX_STATUS | TX_ERRNO, true) => {
                self.errno = ErrorCode::Unsupported;
                BusResponse::Err
            }
            _ => {
                self.errno = ErrorCode::BusProtocol;
                BusResponse::Err
            }
        };
        Some(response)
    }
}
