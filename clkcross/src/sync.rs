//! Two-flop synchronizers for moving signals between clock domains.

/// A two-stage register synchronizer, clocked by the *destination* domain.
///
/// `sample` is called once per destination-domain tick with whatever value the
/// source domain currently drives; `output` returns the value as it stood two
/// destination ticks ago. The two ticks of settle latency stand in for
/// metastability resolution; consumers must not trust a changed value earlier
/// than that.
///
/// A multi-bit payload is only safe here if the source guarantees single-bit
/// changes between destination samples (Gray-coded counters, or independent
/// bits the consumer treats independently). An arbitrarily-toggling bus
/// through one of these is a correctness bug, not a performance one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TwoFlop<T: Copy + Default> {
    stage1: T,
    stage2: T,
}

impl<T: Copy + Default> TwoFlop<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct with both stages preloaded, for inputs whose idle level is
    /// not the type's default (e.g. an active-low line).
    #[must_use]
    pub fn preloaded(value: T) -> Self {
        Self {
            stage1: value,
            stage2: value,
        }
    }

    /// Clock the synchronizer: shift the pipeline and capture `input`.
    pub fn sample(&mut self, input: T) {
        self.stage2 = self.stage1;
        self.stage1 = input;
    }

    /// The synchronized value, two destination ticks stale.
    #[must_use]
    pub fn output(&self) -> T {
        self.stage2
    }

    /// Collapse both stages back to `value`.
    pub fn reset_to(&mut self, value: T) {
        self.stage1 = value;
        self.stage2 = value;
    }
}
