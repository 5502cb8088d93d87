//! Cycle-accurate clock-domain-crossing primitives.
//!
//! Everything here advances by explicit *ticks*: one method call is one
//! clock cycle in one domain, in whatever interleaving the caller's clock
//! ratio produces. There are no threads and nothing blocks; what is modeled
//! is the hardware's own discipline, including the two-tick settle latency
//! of flop synchronizers and the staleness of cross-domain pointer views.
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod fifo;
pub mod gray;
pub mod sync;

pub use fifo::AsyncFifo;
pub use gray::GrayCounter;
pub use sync::TwoFlop;
