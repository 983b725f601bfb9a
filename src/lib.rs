#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod heapless_string;
mod peripherals;

pub use heapless_string::*;
pub use peripherals::*;
