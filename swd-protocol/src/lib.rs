//! # SWD Protocol Library
//!
//! This crate implements the wire level of the ARM [Serial Wire Debug (SWD)](https://developer.arm.com/documentation/ihi0031/latest/)
//! protocol: encoding register access requests and driving the bit-serial exchange with a target.
//!
//! ## Overview
//!
//! Every SWD transaction consists of the following phases:
//!
//! - **Header**: 8 bits driven by the host, selecting DP or AP, read or write and the register index
//! - **Acknowledgment**: 3 bits driven by the target (`OK`, `WAIT` or `FAULT`)
//! - **Data**: 32 data bits followed by one parity bit, driven by the target for reads and by the host for writes
//!
//! This crate provides:
//!
//! - [`Request`]: an immutable register access with its precomputed header
//! - [`Response`]: the classified outcome ([`Status::Ack`], [`Status::Wait`], [`Status::Fault`] or [`Status::Invalid`])
//! - [`transport::Transport`]: the seam to a probe driver that shifts the bits
//!
//! ## Basic Usage
//!
//! ### Encoding a Request
//!
//! ```
//! use swd_protocol::{Port, Request};
//!
//! // Read DPIDR
//! let request = Request::read(Port::Debug, 0);
//! assert_eq!(request.header(), 0xA5);
//! ```
//!
//! ### Sending a Request
//!
//! ```
//! use swd_protocol::{Port, Request, transport::{Loopback, Transport}};
//!
//! // Without a target nobody drives the acknowledgment and the response is invalid.
//! let mut wire = Loopback::new();
//! let transaction = Request::write(Port::Debug, 2, 0x0100_0000)
//!     .enqueue(&mut wire)
//!     .expect("Queueing on a loopback shouldn't fail");
//! let response = transaction.finish(&mut wire).expect("Capturing shouldn't fail");
//! assert!(response.is_invalid());
//! assert_eq!(wire.capture(transaction.data_offset(), 32), Ok(0x0100_0000));
//! ```
//!
//! ## Packed Probes
//!
//! With the `bytes` feature, `packed::PackedTransport` adapts probes that shift whole byte buffers
//! of direction and data bits, instead of single words, to the [`transport::Transport`] trait.
//!
//! ## Wire Format
//!
//! All fields are shifted LSB first:
//!
//! - **Header**: `start(1) APnDP RnW A2 A3 parity stop(0) park(1)`
//! - **Read**: `header`, 3 ack bits, 32 data bits, parity, turnaround, 6 idle cycles
//! - **Write**: `header`, 3 ack bits, 2 turnaround bits, 32 data bits, parity, 7 idle cycles
//!
//! ## Error Handling
//!
//! `WAIT`, `FAULT` and `INVALID` are regular responses and not errors.
//! Errors are only returned if the transport fails, or as [`error::RequestError`] when building or decoding headers.
//!
//! ## Retries
//!
//! [`Request::send`] never retries. Repeating a request after `WAIT` is left to the caller.
//!
//! ## Thread Safety
//!
//! Requests and responses are plain values. A transport must not be shared between two
//! transactions that are in flight at the same time.

pub mod protocol;
pub use protocol::*;
pub mod codec;
pub use codec::{Transaction, decode_header, encode_header, parity};
pub mod error;
#[cfg(feature = "bytes")]
pub mod packed;
pub mod registers;
pub mod transport;
