//! Gray-code arithmetic and counters.
//!
//! Gray sequencing is what makes dual-clock FIFO pointers safe to sample from
//! the far domain: successive values differ in exactly one bit, so a
//! synchronizer catching a transition mid-flight resolves to either the old
//! or the new value, never a phantom third one.

/// Binary to Gray. Adjacent inputs yield outputs one bit apart.
#[must_use]
pub const fn encode(n: u32) -> u32 {
    n ^ (n >> 1)
}

/// Gray back to binary, the inverse of [`encode`].
#[must_use]
pub const fn decode(g: u32) -> u32 {
    let mut n = g;
    n ^= n >> 16;
    n ^= n >> 8;
    n ^= n >> 4;
    n ^= n >> 2;
    n ^= n >> 1;
    n
}

/// A free-running wrapping counter exposing both binary and Gray views of its
/// value.
///
/// When used as a FIFO pointer the width is one bit more than the address the
/// pointer covers; the extra wrap bit is what lets full and empty be told
/// apart once the pointers meet again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrayCounter {
    count: u32,
    mask: u32,
}

impl GrayCounter {
    /// A counter that wraps modulo `2^bits`.
    ///
    /// # Panics
    /// If `bits` is zero or greater than 32.
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        assert!(bits >= 1 && bits <= 32);
        let mask = if bits == 32 {
            u32::MAX
        } else {
            (1 << bits) - 1
        };
        Self { count: 0, mask }
    }

    /// Step by one, wrapping at the configured width.
    pub fn advance(&mut self) {
        self.count = self.count.wrapping_add(1) & self.mask;
    }

    /// Current value, Gray-coded.
    #[must_use]
    pub const fn gray(&self) -> u32 {
        encode(self.count)
    }

    /// Current value, plain binary.
    #[must_use]
    pub const fn binary(&self) -> u32 {
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}
