//! Cycle-accurate model of an SPI mode 0 controller that reads a 10-bit, 8-channel ADC.
//!
//! [`modules::SpiController`] is the design itself. [`modules::AdcModel`] stands in for the
//! peripheral and [`harness`] wires the two together for verification.

pub mod config;
pub mod error;
pub mod harness;
pub mod modules;
pub mod simulator;

pub use config::BenchConfig;
pub use error::{BenchError, InvalidChannel};
