//! USB Power Delivery line coding.
//!
//! The 4b5b symbol alphabet with its six K-code control symbols, the ordered
//! sets built from them, and the CRC-32 that closes every data frame.
//! Everything in this crate is pure data transformation; the bit timing
//! engines that drive and sample the wire live elsewhere.
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod crc;
pub mod sets;
pub mod symbol;

pub use crc::Crc32;
pub use symbol::{
    KCode,
    Symbol,
};
