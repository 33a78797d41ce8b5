//! # SWD Target Simulator
//!
//! This crate simulates an ARM SW-DP target at the wire level, so that SWD hosts can be
//! exercised without a probe or a board.
//!
//! ## Overview
//!
//! The simulator sits behind the [`Transport`](swd_protocol::transport::Transport) trait. Every bit queued
//! by the host is clocked through a model of the target's serial engine, which parses request headers,
//! drives acknowledgments, read data and parity, and samples write data.
//!
//! ## Architecture
//!
//! The crate is built around two main components:
//!
//! - **[`Target`] Trait**: Defines the register behavior behind the serial engine
//! - **[`sim::SimTransport`]**: The transport that owns the bit buffer and the serial engine, and forwards
//!   decoded register accesses to a [`Target`]
//!
//! [`RegisterFile`] is a ready-made [`Target`] modelling the DP registers of ADIv5 and a set of AP registers.
//!
//! ## How It Works
//!
//! 1. The host queues bits on the [`sim::SimTransport`]
//! 2. On the first capture that needs them, all pending bits are clocked
//! 3. A valid header makes the simulator ask the [`Target`] for an acknowledgment
//! 4. On `OK`, read data is requested from the [`Target`] or write data is handed to it
//! 5. A malformed header locks the serial engine out until the host sends a line reset
//!
//! ## Basic Usage
//!
//! ```
//! use swd_protocol::{Port, Request};
//! use swd_sim::{RegisterFile, SimTransport};
//!
//! let mut target = SimTransport::new(RegisterFile::new(0x2BA0_1477));
//! let response = Request::read(Port::Debug, 0)
//!     .send(&mut target)
//!     .expect("The simulator buffer shouldn't fail");
//! assert!(response.is_ack());
//! assert_eq!(response.data(), Some(0x2BA0_1477));
//! ```
//!
//! ## Fault Injection
//!
//! [`sim::SimTransport::inject_ack`] replaces the acknowledgment of upcoming requests and
//! [`sim::SimTransport::corrupt_read_parity`] flips the parity bit of upcoming read data.
//!
//! ## Configuration
//!
//! Simulator behavior can be customized via [`sim::Config`]:
//!
//! - **pull_up**: Level of cycles nobody drives (default: high)
//! - **line_reset_cycles**: High cycles that make up a line reset (default: 50)
//! - **require_line_reset**: Whether the engine starts locked out (default: false)
//!
//! ## Logging
//!
//! This crate uses the `log` crate. Decoded requests are logged at `trace`,
//! protocol errors and line resets at `debug`.
use swd_protocol::{Direction, Port, Status};

pub mod register_file;
pub mod sim;

pub use register_file::RegisterFile;
pub use sim::{Builder, Config, SimTransport};

/// Trait that simulated targets must implement to provide register behavior.
///
/// The serial engine calls [Target::status] once a request header has been received. If it answers
/// [Status::Ack], either [Target::read] or [Target::write] follows for the same register.
pub trait Target {
    /// Decide how to acknowledge a request.
    ///
    /// Returning [Status::Invalid] leaves the acknowledgment undriven.
    fn status(&mut self, port: Port, direction: Direction, index: u8) -> Status;

    /// Provide the data word for an acknowledged read.
    fn read(&mut self, port: Port, index: u8) -> u32;

    /// Accept the data word of an acknowledged write.
    fn write(&mut self, port: Port, index: u8, value: u32);

    /// Called instead of [Target::write] when the write data failed its parity check.
    fn write_parity_error(&mut self) {}

    /// Called when the host sent a line reset.
    fn line_reset(&mut self) {}
}
