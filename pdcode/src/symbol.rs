//! The 4b5b symbol alphabet.
//!
//! Each transmitted nibble becomes a five-bit line pattern chosen for edge
//! density, and six further patterns are reserved as K-codes for framing.
//! That leaves ten five-bit patterns with no meaning; seeing one on the wire
//! is a decode error. Patterns are written here bit 4 down to bit 0, and
//! bit 0 is always the first on the wire.

use std::fmt::Display;

use num_derive::{
    FromPrimitive,
    ToPrimitive,
};

/// Line patterns for the sixteen data nibbles, indexed by nibble value.
const DATA_PATTERNS: [u8; 16] = [
    0b11110, 0b01001, 0b10100, 0b10101, 0b01010, 0b01011, 0b01110, 0b01111,
    0b10010, 0b10011, 0b10110, 0b10111, 0b11010, 0b11011, 0b11100, 0b11101,
];

/// The six control symbols, with their bus encoding as the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum KCode {
    Sync1 = 0,
    Sync2 = 1,
    Sync3 = 2,
    Rst1 = 3,
    Rst2 = 4,
    Eop = 5,
}

impl KCode {
    pub const ALL: [KCode; 6] = [
        KCode::Sync1,
        KCode::Sync2,
        KCode::Sync3,
        KCode::Rst1,
        KCode::Rst2,
        KCode::Eop,
    ];

    /// Five-bit line pattern, bit 4 down to bit 0.
    #[must_use]
    pub const fn pattern(self) -> u8 {
        match self {
            KCode::Sync1 => 0b11000,
            KCode::Sync2 => 0b10001,
            KCode::Sync3 => 0b00110,
            KCode::Rst1 => 0b00111,
            KCode::Rst2 => 0b11001,
            KCode::Eop => 0b01101,
        }
    }
}

impl Display for KCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                KCode::Sync1 => "Sync-1",
                KCode::Sync2 => "Sync-2",
                KCode::Sync3 => "Sync-3",
                KCode::Rst1 => "RST-1",
                KCode::Rst2 => "RST-2",
                KCode::Eop => "EOP",
            }
        )
    }
}

/// A five-bit pattern outside the twenty-two valid code points.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid 4b5b pattern {0:#07b}")]
pub struct InvalidPattern(pub u8);

/// One decoded line symbol: a data nibble or a control code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// A data nibble, value 0 to 15.
    Data(u8),
    /// One of the six K-codes.
    K(KCode),
}

impl Symbol {
    /// Five-bit line pattern, bit 4 down to bit 0.
    #[must_use]
    pub const fn pattern(self) -> u8 {
        match self {
            Symbol::Data(n) => DATA_PATTERNS[(n & 0xF) as usize],
            Symbol::K(k) => k.pattern(),
        }
    }

    /// Decode a received pattern. Only the low five bits are considered.
    ///
    /// # Errors
    /// [`InvalidPattern`] for the ten patterns with no assigned meaning.
    pub fn from_pattern(bits: u8) -> Result<Self, InvalidPattern> {
        let bits = bits & 0x1F;
        for (nibble, &pat) in DATA_PATTERNS.iter().enumerate() {
            if pat == bits {
                return Ok(Symbol::Data(nibble as u8));
            }
        }
        for k in KCode::ALL {
            if k.pattern() == bits {
                return Ok(Symbol::K(k));
            }
        }
        Err(InvalidPattern(bits))
    }

    /// The nibble value for a data symbol, `None` for a K-code.
    #[must_use]
    pub const fn nibble(self) -> Option<u8> {
        match self {
            Symbol::Data(n) => Some(n),
            Symbol::K(_) => None,
        }
    }

    /// The symbol's line bits in wire order, bit 0 first.
    #[must_use]
    pub fn bits(self) -> SymbolBits {
        SymbolBits {
            pattern: self.pattern(),
            remaining: 5,
        }
    }

    /// The two data symbols of one byte, low nibble first as transmitted.
    #[must_use]
    pub const fn byte_symbols(byte: u8) -> [Symbol; 2] {
        [Symbol::Data(byte & 0xF), Symbol::Data(byte >> 4)]
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Data(n) => write!(f, "{n:X}"),
            Symbol::K(k) => write!(f, "{k}"),
        }
    }
}

/// Iterator over one symbol's five line bits in transmission order.
#[derive(Debug, Clone)]
pub struct SymbolBits {
    pattern: u8,
    remaining: u8,
}

impl Iterator for SymbolBits {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        if self.remaining == 0 {
            return None;
        }
        let bit = self.pattern & 1 == 1;
        self.pattern >>= 1;
        self.remaining -= 1;
        Some(bit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for SymbolBits {}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use num_traits::{
        FromPrimitive,
        ToPrimitive,
    };

    use super::*;

    #[test]
    fn test_data_patterns_bijective() {
        let mut seen = HashSet::new();
        for n in 0..16 {
            let sym = Symbol::Data(n);
            assert!(seen.insert(sym.pattern()));
            assert_eq!(Symbol::from_pattern(sym.pattern()), Ok(sym));
        }
    }

    macro_rules! kcode_round_trip {
        ($($code:ident),*) => {
            $(
                paste::paste! {
                    #[test]
                    fn [<test_kcode_ $code:lower _round_trip>]() {
                        let sym = Symbol::K(KCode::$code);
                        assert_eq!(Symbol::from_pattern(sym.pattern()), Ok(sym));
                    }
                }
            )*
        };
    }

    kcode_round_trip!(Sync1, Sync2, Sync3, Rst1, Rst2, Eop);

    #[test]
    fn test_exactly_ten_patterns_invalid() {
        let invalid: Vec<u8> = (0..32)
            .filter(|&p| Symbol::from_pattern(p).is_err())
            .collect();
        assert_eq!(
            invalid,
            vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x08, 0x0C, 0x10, 0x1F]
        );
    }

    #[test]
    fn test_invalid_pattern_reports_bits() {
        assert_eq!(Symbol::from_pattern(0b00100), Err(InvalidPattern(0b00100)));
    }

    #[test]
    fn test_high_bits_ignored() {
        assert_eq!(
            Symbol::from_pattern(0b101_11000),
            Ok(Symbol::K(KCode::Sync1))
        );
    }

    #[test]
    fn test_bits_come_out_lsb_first() {
        // Nibble 0 encodes as 11110, so the wire sees 0 then four 1s.
        let bits: Vec<bool> = Symbol::Data(0).bits().collect();
        assert_eq!(bits, vec![false, true, true, true, true]);
        assert_eq!(Symbol::Data(0).bits().len(), 5);
    }

    #[test]
    fn test_byte_symbols_low_nibble_first() {
        assert_eq!(
            Symbol::byte_symbols(0xA5),
            [Symbol::Data(0x5), Symbol::Data(0xA)]
        );
    }

    #[test]
    fn test_kcode_bus_encoding() {
        assert_eq!(KCode::from_u8(0), Some(KCode::Sync1));
        assert_eq!(KCode::from_u8(5), Some(KCode::Eop));
        assert_eq!(KCode::from_u8(6), None);
        assert_eq!(KCode::Eop.to_u8(), Some(5));
    }
}
