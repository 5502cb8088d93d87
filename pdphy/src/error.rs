//! Error codes surfaced through the ERRNO registers and the receiver's
//! sticky fault flags.

use num_derive::{
    FromPrimitive,
    ToPrimitive,
};

/// Error codes a bus master can read back from an ERRNO register.
///
/// Codes below `0x80` describe faults of the bus transaction itself and can
/// be raised by either front-end. Codes at `0x80` and above report line
/// conditions observed by the engines. `BusProtocol` doubles as the reset
/// value of ERRNO, so a register that reads `0x00` has recorded nothing
/// since the last reset.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum ErrorCode {
    /// Request outside the register window, or an unreadable register image.
    #[error("bus protocol violation")]
    BusProtocol = 0x00,
    /// No register is mapped at the requested address.
    #[error("no register at this address")]
    InvalidRegister = 0x01,
    /// The register exists but cannot serve the request in this state.
    #[error("operation not supported on this register")]
    Unsupported = 0x02,
    /// A received five-bit symbol decoded to no data nibble or K-code.
    #[error("undecodable line symbol")]
    InvalidSymbol = 0x80,
    /// The receive queue was full when a decoded word arrived.
    #[error("receive queue overflowed")]
    BufferOverflow = 0x81,
    /// The preamble cadence broke before the frame body started.
    #[error("malformed preamble")]
    InvalidPreamble = 0x82,
    /// The line went quiet in the middle of a frame.
    #[error("receive timeout")]
    ReceiveTimeout = 0x83,
    /// The frame check sequence did not leave the expected residual.
    #[error("frame check sequence mismatch")]
    CrcFailure = 0x84,
    /// The transmit queue ran dry before an EOP was sent.
    #[error("transmit queue underrun")]
    TxUnderrun = 0x85,
}

/// Sticky fault flags of the receive engine.
///
/// Each flag is set by the line-domain decoder; the whole set crosses into
/// the bus domain through one synchronizer so a reader sees a coherent
/// snapshot. `overflow` holds until the engine is reset, because the dropped
/// word cannot be recovered; the other four release as soon as a later frame
/// completes cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RxLatches {
    pub invalid_symbol: bool,
    pub overflow: bool,
    pub bad_preamble: bool,
    pub timeout: bool,
    pub crc_failure: bool,
}

impl RxLatches {
    /// True if any fault is latched. While this holds, the receive queue
    /// refuses reads so the master cannot mistake a torn frame for a good
    /// one.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.invalid_symbol
            || self.overflow
            || self.bad_preamble
            || self.timeout
            || self.crc_failure
    }
}
