//! Ordered sets and the preamble.
//!
//! Every frame opens with an alternating preamble and four K-codes. Which
//! four decides what the frame is: a start-of-packet set introduces a data
//! message, while the two reset sets are complete frames by themselves,
//! ending without payload, CRC, or EOP. Set matching tolerates one wrong
//! symbol in four, so three of the four positions carry the identity.

use crate::symbol::KCode;

/// Preamble length in bits. The pattern alternates, starting 0, ending 1.
pub const PREAMBLE_BITS: usize = 64;

/// K-codes in every ordered set.
pub const ORDERED_SET_LEN: usize = 4;

/// Start of a message between port partners.
pub const SOP: [KCode; ORDERED_SET_LEN] =
    [KCode::Sync1, KCode::Sync1, KCode::Sync1, KCode::Sync2];

/// Start of a message to the cable plug nearer the transmitter.
pub const SOP_PRIME: [KCode; ORDERED_SET_LEN] =
    [KCode::Sync1, KCode::Sync1, KCode::Sync3, KCode::Sync3];

/// Start of a message to the far cable plug.
pub const SOP_DOUBLE_PRIME: [KCode; ORDERED_SET_LEN] =
    [KCode::Sync1, KCode::Sync3, KCode::Sync1, KCode::Sync3];

/// Frame-by-itself: forces a full protocol reset of the partner.
pub const HARD_RESET: [KCode; ORDERED_SET_LEN] =
    [KCode::Rst1, KCode::Rst1, KCode::Rst1, KCode::Rst2];

/// Frame-by-itself: resets the cable marker without touching the partner.
pub const CABLE_RESET: [KCode; ORDERED_SET_LEN] =
    [KCode::Rst1, KCode::Sync1, KCode::Rst1, KCode::Sync3];

/// The preamble bit at `index`, counted from the first transmitted.
#[must_use]
pub const fn preamble_bit(index: usize) -> bool {
    index % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_ends_high() {
        assert!(!preamble_bit(0));
        assert!(preamble_bit(PREAMBLE_BITS - 1));
    }

    #[test]
    fn test_reset_sets_share_no_full_overlap() {
        // One corrupted symbol must never turn one reset set into the other.
        let differing = HARD_RESET
            .iter()
            .zip(CABLE_RESET.iter())
            .filter(|(a, b)| a != b)
            .count();
        assert!(differing >= 2);
    }

    #[test]
    fn test_sop_variants_distinct() {
        assert_ne!(SOP, SOP_PRIME);
        assert_ne!(SOP, SOP_DOUBLE_PRIME);
        assert_ne!(SOP_PRIME, SOP_DOUBLE_PRIME);
    }
}
