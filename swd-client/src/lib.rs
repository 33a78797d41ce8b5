//! # SWD Client
//!
//! Register level access to ARM Serial Wire Debug (SWD) targets on top of any
//! [`Transport`](swd_protocol::transport::Transport).
//!
//! ## Overview
//!
//! [`swd_protocol`] encodes single transactions and reports `WAIT`, `FAULT` and `INVALID` as plain values.
//! This crate adds what callers usually need on top of that:
//!
//! - **Retries**: repeating a request while the target answers `WAIT`, bounded by a [`RetryPolicy`]
//! - **Register helpers**: DP and AP reads and writes, including the `RDBUFF` read that completes a posted AP read
//! - **Link management**: line reset, the JTAG-to-SWD switch sequence, clearing sticky errors and powering up the debug domain
//!
//! ## Basic Usage
//!
//! ### Connecting to a Target
//!
//! ```ignore
//! use swd_client::SwdClient;
//!
//! let mut client = SwdClient::new(transport);
//! let idcode = client.connect()?;
//! println!("DPIDR: 0x{:08x}", idcode);
//! client.clear_sticky_errors()?;
//! client.power_up()?;
//! ```
//!
//! ### Accessing AP Registers
//!
//! ```ignore
//! // Bank 0 of AP 0, register CSW
//! client.select(0, 0)?;
//! let csw = client.read_ap(0)?;
//! client.write_ap(1, 0x2000_0000)?;
//! ```
//!
//! ## Error Handling
//!
//! Every access returns an [`AccessError`]. After [`AccessError::Fault`] the target refuses all further
//! AP accesses until [`SwdClient::clear_sticky_errors`] is called. After [`AccessError::Invalid`]
//! the link may be out of sync and a [`SwdClient::connect`] is the safest way to recover.
//!
//! ## Logging
//!
//! This crate uses the `log` crate. Retries are logged at `debug`, every transaction at `trace`.
use swd_protocol::{
    Port, Request, Status,
    registers::{abort, ctrl_stat, dp, select},
    transport::Transport,
};

pub mod error;
pub mod retry;

pub use error::AccessError;
pub use retry::{Builder, RetryPolicy};

// At least 50 cycles with SWDIO high
const LINE_RESET_HIGH_CYCLES: [u8; 2] = [32, 24];
// At least 2 idle cycles with SWDIO low
const IDLE_CYCLES: u8 = 8;
// 0x79E7 sent MSB first
const JTAG_TO_SWD_SEQUENCE: u16 = 0xE79E;

/// SWD client for register level target access.
///
/// Owns the transport for the duration of the session. Requests are issued one at a time.
#[derive(Debug)]
pub struct SwdClient<T: Transport> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: Transport> SwdClient<T> {
    /// Creates a client with the default [RetryPolicy].
    pub fn new(transport: T) -> SwdClient<T> {
        SwdClient::with_retry_policy(transport, RetryPolicy::default())
    }

    pub fn with_retry_policy(transport: T, policy: RetryPolicy) -> SwdClient<T> {
        SwdClient { transport, policy }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Sends `request` until it is acknowledged or the retry budget is used up.
    ///
    /// # Returns
    ///
    /// The data word for reads, `None` for writes.
    pub fn transact(&mut self, request: Request) -> Result<Option<u32>, AccessError<T::Error>> {
        let attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=attempts {
            let response = request
                .send(&mut self.transport)
                .map_err(AccessError::Transport)?;
            log::trace!(
                "{} {:?} register {}: {} (attempt {})",
                request.port(),
                request.operation(),
                request.register_index(),
                response.status(),
                attempt
            );
            match response.status() {
                Status::Ack => return Ok(response.data()),
                Status::Wait if attempt < attempts => {
                    let delay = self.policy.delay_for(attempt);
                    log::debug!(
                        "Target answered WAIT, retrying in {:?} ({}/{})",
                        delay,
                        attempt,
                        attempts
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                Status::Wait => {}
                Status::Fault => {
                    log::warn!(
                        "Target answered FAULT for {} register {}",
                        request.port(),
                        request.register_index()
                    );
                    return Err(AccessError::Fault);
                }
                Status::Invalid => {
                    log::warn!(
                        "Invalid response for {} register {}",
                        request.port(),
                        request.register_index()
                    );
                    return Err(AccessError::Invalid {
                        data: response.data(),
                    });
                }
            }
        }
        log::warn!("Target still answered WAIT after {} attempts", attempts);
        Err(AccessError::Wait { attempts })
    }

    fn read(&mut self, port: Port, index: u8) -> Result<u32, AccessError<T::Error>> {
        Ok(self
            .transact(Request::read(port, index))?
            .unwrap_or_default())
    }

    fn write(&mut self, port: Port, index: u8, value: u32) -> Result<(), AccessError<T::Error>> {
        self.transact(Request::write(port, index, value))?;
        Ok(())
    }

    pub fn read_dp(&mut self, index: u8) -> Result<u32, AccessError<T::Error>> {
        self.read(Port::Debug, index)
    }

    pub fn write_dp(&mut self, index: u8, value: u32) -> Result<(), AccessError<T::Error>> {
        self.write(Port::Debug, index, value)
    }

    /// Reads an AP register of the currently selected AP and bank.
    ///
    /// AP reads are posted: the AP read only starts the access and `RDBUFF` delivers the result.
    pub fn read_ap(&mut self, index: u8) -> Result<u32, AccessError<T::Error>> {
        self.read(Port::Access, index)?;
        self.read_dp(dp::RDBUFF)
    }

    /// Writes an AP register of the currently selected AP and bank.
    pub fn write_ap(&mut self, index: u8, value: u32) -> Result<(), AccessError<T::Error>> {
        self.write(Port::Access, index, value)
    }

    /// Reads the identification code from `DPIDR`
    pub fn idcode(&mut self) -> Result<u32, AccessError<T::Error>> {
        self.read_dp(dp::DPIDR)
    }

    /// Selects bank `bank` of access port `apsel` for subsequent AP accesses.
    pub fn select(&mut self, apsel: u8, bank: u8) -> Result<(), AccessError<T::Error>> {
        log::debug!("Selecting AP {} bank {}", apsel, bank);
        self.write_dp(dp::SELECT, select::value(apsel, bank))
    }

    /// Clears all sticky error flags through `ABORT`.
    pub fn clear_sticky_errors(&mut self) -> Result<(), AccessError<T::Error>> {
        log::debug!("Clearing sticky errors");
        self.write_dp(dp::ABORT, abort::CLEAR_STICKY)
    }

    /// Requests debug and system power and waits until both are acknowledged.
    ///
    /// Polls `CTRL/STAT` at most [RetryPolicy::max_attempts] times.
    ///
    /// # Returns
    ///
    /// The final value of `CTRL/STAT`
    pub fn power_up(&mut self) -> Result<u32, AccessError<T::Error>> {
        self.write_dp(dp::CTRL_STAT, ctrl_stat::POWER_UP_REQ)?;
        let attempts = self.policy.max_attempts.max(1);
        let mut status = 0;
        for attempt in 1..=attempts {
            status = self.read_dp(dp::CTRL_STAT)?;
            if status & ctrl_stat::POWER_UP_ACK == ctrl_stat::POWER_UP_ACK {
                log::info!("Debug and system power up acknowledged");
                return Ok(status);
            }
            let delay = self.policy.delay_for(attempt);
            if attempt < attempts && !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
        log::warn!("Power up not acknowledged, CTRL/STAT=0x{:08x}", status);
        Err(AccessError::PowerUpTimeout { ctrl_stat: status })
    }

    /// Queues a line reset followed by idle cycles.
    ///
    /// The bits are only clocked together with the next transaction.
    pub fn line_reset(&mut self) -> Result<(), AccessError<T::Error>> {
        log::debug!("Line reset");
        for width in LINE_RESET_HIGH_CYCLES {
            self.transport
                .queue(u32::MAX, u32::MAX, width)
                .map_err(AccessError::Transport)?;
        }
        self.transport
            .queue(u32::MAX, 0, IDLE_CYCLES)
            .map_err(AccessError::Transport)?;
        Ok(())
    }

    /// Switches the target to SWD and reads `DPIDR`, which is required after every line reset.
    ///
    /// # Returns
    ///
    /// The identification code of the debug port
    pub fn connect(&mut self) -> Result<u32, AccessError<T::Error>> {
        self.line_reset()?;
        self.transport
            .queue(u32::MAX, u32::from(JTAG_TO_SWD_SEQUENCE), 16)
            .map_err(AccessError::Transport)?;
        self.line_reset()?;
        let idcode = self.idcode()?;
        log::info!("Connected to debug port with DPIDR 0x{:08x}", idcode);
        Ok(idcode)
    }
}
