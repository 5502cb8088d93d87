//! Frame CRC-32, computed the way the receive shift register does it.
//!
//! The polynomial is the IEEE 802.3 one (0x04C11DB7) but the register runs
//! in the bit-reflected domain so that wire bits, which arrive LSB first
//! within each byte, clock straight in with no reordering. Transmit value
//! and receive residual are two views of the same register: the transmitter
//! appends the complemented register (least significant byte first), and a
//! receiver that clocks an intact frame including those four bytes ends with
//! the register at a fixed constant, [`RESIDUAL`].

/// Bit-reversed register value after a frame whose trailing CRC matches.
pub const RESIDUAL: u32 = 0xC704_DD7B;

/// Reflected form of 0x04C11DB7.
const POLY: u32 = 0xEDB8_8320;

/// Bit-serial CRC-32 register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    reg: u32,
}

impl Crc32 {
    #[must_use]
    pub const fn new() -> Self {
        Self { reg: 0xFFFF_FFFF }
    }

    /// Back to the all-ones preset.
    pub fn reset(&mut self) {
        self.reg = 0xFFFF_FFFF;
    }

    /// Clock in one wire bit.
    pub fn push(&mut self, bit: bool) {
        let feedback = (self.reg ^ u32::from(bit)) & 1 == 1;
        self.reg >>= 1;
        if feedback {
            self.reg ^= POLY;
        }
    }

    /// Clock in one byte, LSB first.
    pub fn push_byte(&mut self, byte: u8) {
        for i in 0..8 {
            self.push((byte >> i) & 1 == 1);
        }
    }

    /// The value a transmitter appends after the payload.
    #[must_use]
    pub const fn value(&self) -> u32 {
        !self.reg
    }

    /// Wire bytes of [`value`](Self::value) in transmit order.
    #[must_use]
    pub const fn value_bytes(&self) -> [u8; 4] {
        self.value().to_le_bytes()
    }

    /// The bit-reversed register, for comparison against [`RESIDUAL`] once a
    /// complete frame including its CRC has been clocked in.
    #[must_use]
    pub const fn residual(&self) -> u32 {
        self.reg.reverse_bits()
    }

    #[must_use]
    pub const fn residual_ok(&self) -> bool {
        self.residual() == RESIDUAL
    }

    /// One-shot CRC of a complete byte message.
    #[must_use]
    pub fn of(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        for &b in data {
            crc.push_byte(b);
        }
        crc.value()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(Crc32::of(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_empty_message() {
        assert_eq!(Crc32::of(&[]), 0);
    }

    #[test]
    fn test_goodcrc_header() {
        // A GoodCRC message header, the shortest frame worth protecting.
        let mut crc = Crc32::new();
        crc.push_byte(0x01);
        crc.push_byte(0x01);
        assert_eq!(crc.value(), 0x2FC5_1328);
        assert_eq!(crc.value_bytes(), [0x28, 0x13, 0xC5, 0x2F]);
    }

    #[test]
    fn test_residual_after_intact_frame() {
        let mut crc = Crc32::new();
        for b in [0x01, 0x01, 0x28, 0x13, 0xC5, 0x2F] {
            crc.push_byte(b);
        }
        assert!(crc.residual_ok());
        assert_eq!(crc.residual(), RESIDUAL);
    }

    #[test]
    fn test_residual_rejects_corrupt_crc_byte() {
        let mut crc = Crc32::new();
        for b in [0x01, 0x01, 0x28, 0x13, 0xC5, 0x2E] {
            crc.push_byte(b);
        }
        assert!(!crc.residual_ok());
    }

    proptest! {
        #[test]
        fn test_residual_holds_for_any_message(msg in proptest::collection::vec(any::<u8>(), 1..64)) {
            let mut crc = Crc32::new();
            for &b in &msg {
                crc.push_byte(b);
            }
            let trailer = crc.value_bytes();
            for b in trailer {
                crc.push_byte(b);
            }
            prop_assert!(crc.residual_ok());
        }

        #[test]
        fn test_any_single_bit_flip_is_caught(
            msg in proptest::collection::vec(any::<u8>(), 1..32),
            flip in any::<u16>(),
        ) {
            let mut wire = msg.clone();
            let mut crc = Crc32::new();
            for &b in &msg {
                crc.push_byte(b);
            }
            wire.extend_from_slice(&crc.value_bytes());

            let bit = (flip as usize) % (wire.len() * 8);
            wire[bit / 8] ^= 1 << (bit % 8);

            let mut rx = Crc32::new();
            for &b in &wire {
                rx.push_byte(b);
            }
            prop_assert!(!rx.residual_ok());
        }
    }
}
