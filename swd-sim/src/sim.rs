use std::collections::VecDeque;

use swd_protocol::{
    Direction, Port, Status, decode_header,
    error::BufferError,
    parity,
    transport::{Bit, BitBuffer, Transport},
};

use crate::Target;

#[derive(Debug, Clone)]
pub struct Config {
    pub pull_up: bool,
    pub line_reset_cycles: u32,
    pub require_line_reset: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pull_up: true,
            line_reset_cycles: 50,
            require_line_reset: false,
        }
    }
}

/// Builder to create a [SimTransport] instance and modify configuration options
///
/// # Example
///
/// ```
/// use swd_sim::{Builder, RegisterFile};
///
/// let sim = Builder::new()
///     .pull_up(false)
///     .require_line_reset(true)
///     .build(RegisterFile::new(0x0BB1_1477));
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the level of cycles that neither host nor target drive.
    pub fn pull_up(mut self, pull_up: bool) -> Self {
        self.config.pull_up = pull_up;
        self
    }

    /// Set the number of consecutive high cycles that are recognized as line reset.
    /// Values below 50 are raised to 50.
    pub fn line_reset_cycles(mut self, cycles: u32) -> Self {
        self.config.line_reset_cycles = cycles;
        self
    }

    /// Start locked out, as a target does after power-on.
    pub fn require_line_reset(mut self, required: bool) -> Self {
        self.config.require_line_reset = required;
        self
    }

    /// Build and return the simulator
    pub fn build<T: Target>(self, target: T) -> SimTransport<T> {
        SimTransport::with_config(target, self.config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    port: Port,
    direction: Direction,
    index: u8,
    status: Status,
    ack: Option<u32>,
}

/// State of the target's serial engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Line reset received, waiting for the first idle cycle
    Reset,
    Idle,
    /// Ignoring everything but a line reset
    Lockout,
    Header { value: u8, count: u8 },
    Ack { frame: Frame, count: u8 },
    ReadData { value: u64, count: u8 },
    WriteData { frame: Frame, value: u64, count: u8 },
}

// A line reset is at least 50 cycles with SWDIO high
const MIN_LINE_RESET_CYCLES: u32 = 50;

// 32 data bits and the parity bit
const DATA_PHASE_BITS: u8 = 33;

/// A [Transport] with a simulated target attached to the other end of the wire.
#[derive(Debug)]
pub struct SimTransport<T: Target> {
    target: T,
    config: Config,
    buffer: BitBuffer,
    phase: Phase,
    high_cycles: u32,
    injected_acks: VecDeque<u32>,
    corrupt_parity: u32,
}

impl<T: Target> SimTransport<T> {
    pub fn new(target: T) -> SimTransport<T> {
        SimTransport::with_config(target, Config::default())
    }

    pub fn with_config(target: T, mut config: Config) -> SimTransport<T> {
        config.line_reset_cycles = config.line_reset_cycles.max(MIN_LINE_RESET_CYCLES);
        let phase = if config.require_line_reset {
            Phase::Lockout
        } else {
            Phase::Idle
        };
        SimTransport {
            target,
            config,
            buffer: BitBuffer::new(),
            phase,
            high_cycles: 0,
            injected_acks: VecDeque::new(),
            corrupt_parity: 0,
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn buffer(&self) -> &BitBuffer {
        &self.buffer
    }

    /// Whether the serial engine waits for a line reset after a protocol error
    pub fn is_locked_out(&self) -> bool {
        self.phase == Phase::Lockout
    }

    /// Drive `ack` instead of the target's answer for the next request.
    /// Calls queue up, one per request.
    pub fn inject_ack(&mut self, ack: u32) {
        self.injected_acks.push_back(ack & 0b111);
    }

    /// Flip the parity bit of the next `count` read data phases.
    pub fn corrupt_read_parity(&mut self, count: u32) {
        self.corrupt_parity += count;
    }

    /// Drops every queued and captured bit. Offsets start at zero again.
    pub fn clear(&mut self) {
        self.buffer.clear()
    }

    fn clock(&mut self) {
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.clock(|bit| self.cycle(bit));
        self.buffer = buffer;
    }

    /// Advance the serial engine by one clock cycle and return the level on SWDIO.
    fn cycle(&mut self, bit: Bit) -> bool {
        if bit.drive {
            if bit.level {
                self.high_cycles += 1;
                if self.high_cycles == self.config.line_reset_cycles {
                    log::debug!("Line reset detected");
                    self.target.line_reset();
                }
                if self.high_cycles >= self.config.line_reset_cycles {
                    self.phase = Phase::Reset;
                    return true;
                }
            } else {
                self.high_cycles = 0;
            }
        }

        let driven = self.advance(bit);
        if bit.drive {
            bit.level
        } else {
            driven.unwrap_or(self.config.pull_up)
        }
    }

    /// Returns the level the target drives, if any.
    fn advance(&mut self, bit: Bit) -> Option<bool> {
        match self.phase {
            Phase::Reset => {
                if bit.drive && !bit.level {
                    self.phase = Phase::Idle;
                }
                None
            }
            Phase::Lockout => None,
            Phase::Idle => {
                if bit.drive && bit.level {
                    self.phase = Phase::Header { value: 1, count: 1 };
                }
                None
            }
            Phase::Header { mut value, count } => {
                if !bit.drive {
                    return None;
                }
                value |= u8::from(bit.level) << count;
                if count + 1 < 8 {
                    self.phase = Phase::Header {
                        value,
                        count: count + 1,
                    };
                } else {
                    self.phase = self.request(value);
                }
                None
            }
            Phase::Ack { frame, count } => {
                if bit.drive {
                    return None;
                }
                let level = frame.ack.map(|ack| (ack >> count) & 1 != 0);
                self.phase = if count + 1 < 3 {
                    Phase::Ack {
                        frame,
                        count: count + 1,
                    }
                } else {
                    self.data_phase(frame)
                };
                level
            }
            Phase::ReadData { value, count } => {
                if bit.drive {
                    return None;
                }
                let level = (value >> count) & 1 != 0;
                self.phase = if count + 1 < DATA_PHASE_BITS {
                    Phase::ReadData {
                        value,
                        count: count + 1,
                    }
                } else {
                    Phase::Idle
                };
                Some(level)
            }
            Phase::WriteData {
                frame,
                mut value,
                count,
            } => {
                if !bit.drive {
                    return None;
                }
                value |= u64::from(bit.level) << count;
                if count + 1 < DATA_PHASE_BITS {
                    self.phase = Phase::WriteData {
                        frame,
                        value,
                        count: count + 1,
                    };
                } else {
                    self.complete_write(frame, value);
                    self.phase = Phase::Idle;
                }
                None
            }
        }
    }

    /// Decode a complete header and decide on the acknowledgment.
    fn request(&mut self, header: u8) -> Phase {
        let (port, direction, index) = match decode_header(header) {
            Ok(fields) => fields,
            Err(e) => {
                log::debug!("{}, locking out until line reset", e);
                return Phase::Lockout;
            }
        };
        let (status, ack) = match self.injected_acks.pop_front() {
            Some(ack) => (Status::from_ack(ack), Some(ack)),
            None => {
                let status = self.target.status(port, direction, index);
                (status, status.ack_bits())
            }
        };
        log::trace!("{} {:?} register {}: {}", port, direction, index, status);
        Phase::Ack {
            frame: Frame {
                port,
                direction,
                index,
                status,
                ack,
            },
            count: 0,
        }
    }

    fn data_phase(&mut self, frame: Frame) -> Phase {
        match (frame.direction, frame.status) {
            (Direction::Read, Status::Ack) => {
                let data = self.target.read(frame.port, frame.index);
                let mut parity_bit = parity(data);
                if self.corrupt_parity > 0 {
                    self.corrupt_parity -= 1;
                    parity_bit ^= 1;
                }
                Phase::ReadData {
                    value: u64::from(data) | (u64::from(parity_bit) << 32),
                    count: 0,
                }
            }
            (Direction::Read, _) => Phase::Idle,
            // The host clocks the data phase of a write regardless of the acknowledgment
            (Direction::Write, _) => Phase::WriteData {
                frame,
                value: 0,
                count: 0,
            },
        }
    }

    fn complete_write(&mut self, frame: Frame, value: u64) {
        if frame.status != Status::Ack {
            return;
        }
        let data = value as u32;
        if (value >> 32) as u32 & 1 != parity(data) {
            log::debug!("Parity error in write data 0x{:08x}", data);
            self.target.write_parity_error();
        } else {
            self.target.write(frame.port, frame.index, data);
        }
    }
}

impl<T: Target> Transport for SimTransport<T> {
    type Error = BufferError;

    fn queue(&mut self, drive: u32, value: u32, width: u8) -> Result<usize, BufferError> {
        self.buffer.push(drive, value, width)
    }

    fn capture(&mut self, offset: usize, width: u8) -> Result<u32, BufferError> {
        if self.buffer.pending() > 0 {
            self.clock();
        }
        self.buffer.get(offset, width)
    }

    fn release(&mut self, offset: usize) {
        self.buffer.release(offset)
    }
}

#[cfg(test)]
mod test {
    use super::{Builder, SimTransport};
    use crate::Target;
    use swd_protocol::{Direction, Port, Request, Status, parity, transport::Transport};

    /// Echoes the last write and records every callback.
    #[derive(Default)]
    struct Echo {
        value: u32,
        status: Option<Status>,
        parity_errors: u32,
        line_resets: u32,
    }

    impl Target for Echo {
        fn status(&mut self, _port: Port, _direction: Direction, _index: u8) -> Status {
            self.status.unwrap_or(Status::Ack)
        }

        fn read(&mut self, _port: Port, _index: u8) -> u32 {
            self.value
        }

        fn write(&mut self, _port: Port, _index: u8, value: u32) {
            self.value = value;
        }

        fn write_parity_error(&mut self) {
            self.parity_errors += 1;
        }

        fn line_reset(&mut self) {
            self.line_resets += 1;
        }
    }

    fn line_reset(sim: &mut SimTransport<Echo>) {
        sim.queue(u32::MAX, u32::MAX, 32).unwrap();
        sim.queue(u32::MAX, u32::MAX, 24).unwrap();
        sim.queue(u32::MAX, 0, 8).unwrap();
    }

    #[test]
    fn write_then_read_back() {
        let mut sim = SimTransport::new(Echo::default());
        for value in [0, 1, 3, 0x8000_0000, 0xCAFE_F00D, u32::MAX] {
            let write = Request::write(Port::Access, 1, value).send(&mut sim).unwrap();
            assert!(write.is_ack());
            let read = Request::read(Port::Access, 1).send(&mut sim).unwrap();
            assert!(read.is_ack());
            assert_eq!(read.data(), Some(value));
        }
    }

    #[test]
    fn target_status_is_driven() {
        let mut sim = SimTransport::new(Echo::default());
        for status in [Status::Wait, Status::Fault, Status::Invalid] {
            sim.target_mut().status = Some(status);
            let response = Request::read(Port::Debug, 0).send(&mut sim).unwrap();
            assert_eq!(response.status(), status);
            let response = Request::write(Port::Debug, 2, 5).send(&mut sim).unwrap();
            assert_eq!(response.status(), status);
        }
        // Writes answered with anything but OK are dropped
        assert_eq!(sim.target().value, 0);
    }

    #[test]
    fn injected_acks_take_precedence() {
        let mut sim = SimTransport::new(Echo::default());
        sim.inject_ack(0b011);
        sim.inject_ack(0b010);
        let first = Request::read(Port::Debug, 0).send(&mut sim).unwrap();
        let second = Request::read(Port::Debug, 0).send(&mut sim).unwrap();
        let third = Request::read(Port::Debug, 0).send(&mut sim).unwrap();
        assert!(first.is_invalid());
        assert!(second.is_wait());
        assert!(third.is_ack());
    }

    #[test]
    fn corrupted_read_parity() {
        let mut sim = SimTransport::new(Echo {
            value: 3,
            ..Echo::default()
        });
        sim.corrupt_read_parity(1);
        let response = Request::read(Port::Access, 0).send(&mut sim).unwrap();
        assert!(response.is_invalid());
        assert_eq!(response.data(), Some(3));
        assert!(Request::read(Port::Access, 0).send(&mut sim).unwrap().is_ack());
    }

    #[test]
    fn bad_write_parity_is_reported() {
        let mut sim = SimTransport::new(Echo::default());
        let header = Request::write(Port::Debug, 1, 0).header();
        sim.queue(u32::MAX, u32::from(header), 8).unwrap();
        let ack = sim.queue(0, 0, 3).unwrap();
        sim.queue(0, 0, 2).unwrap();
        sim.queue(u32::MAX, 7, 32).unwrap();
        // Wrong parity for 7
        sim.queue(u32::MAX, parity(7) ^ 1, 8).unwrap();
        assert_eq!(sim.capture(ack, 3), Ok(0b001));
        assert_eq!(sim.target().parity_errors, 1);
        assert_eq!(sim.target().value, 0);
    }

    #[test]
    fn malformed_header_locks_out_until_line_reset() {
        let mut sim = SimTransport::new(Echo::default());
        // Start bit followed by a wrong parity bit
        sim.queue(u32::MAX, 0b1010_0001, 8).unwrap();
        let ack = sim.queue(0, 0, 3).unwrap();
        assert_eq!(sim.capture(ack, 3), Ok(0b111));
        assert!(sim.is_locked_out());

        let response = Request::read(Port::Debug, 0).send(&mut sim).unwrap();
        assert!(response.is_invalid());

        line_reset(&mut sim);
        let response = Request::read(Port::Debug, 0).send(&mut sim).unwrap();
        assert!(response.is_ack());
        assert_eq!(sim.target().line_resets, 1);
    }

    #[test]
    fn starts_locked_out_if_configured() {
        let mut sim = Builder::new()
            .require_line_reset(true)
            .build(Echo::default());
        assert!(sim.is_locked_out());
        assert!(Request::read(Port::Debug, 0).send(&mut sim).unwrap().is_invalid());
        line_reset(&mut sim);
        assert!(Request::read(Port::Debug, 0).send(&mut sim).unwrap().is_ack());
    }

    #[test]
    fn short_line_reset_settings_are_raised() {
        let mut sim = Builder::new().line_reset_cycles(0).build(Echo::default());
        assert_eq!(sim.config().line_reset_cycles, 50);

        // 32 driven high data bits must not look like a line reset
        let write = Request::write(Port::Access, 0, u32::MAX).send(&mut sim).unwrap();
        assert!(write.is_ack());
        let read = Request::read(Port::Access, 0).send(&mut sim).unwrap();
        assert!(read.is_ack());
        assert_eq!(read.data(), Some(u32::MAX));
        assert_eq!(sim.target().line_resets, 0);

        line_reset(&mut sim);
        assert!(Request::read(Port::Debug, 0).send(&mut sim).unwrap().is_ack());
        assert_eq!(sim.target().line_resets, 1);
    }

    #[test]
    fn long_sessions_retain_one_frame() {
        let mut sim = SimTransport::new(Echo::default());
        for value in 0..1000 {
            Request::write(Port::Access, 1, value).send(&mut sim).unwrap();
            assert_eq!(
                Request::read(Port::Access, 1).send(&mut sim).unwrap().data(),
                Some(value)
            );
        }
        assert_eq!(sim.buffer().len(), 51);
    }

    #[test]
    fn pull_down_reads_zero_ack() {
        let mut sim = Builder::new().pull_up(false).build(Echo {
            status: Some(Status::Invalid),
            ..Echo::default()
        });
        let request = Request::read(Port::Debug, 0);
        let transaction = request.enqueue(&mut sim).unwrap();
        assert_eq!(sim.capture(transaction.ack_offset(), 3), Ok(0));
        assert!(transaction.finish(&mut sim).unwrap().is_invalid());
    }

    #[test]
    fn pipelined_requests_are_clocked_together() {
        let mut sim = SimTransport::new(Echo::default());
        let write = Request::write(Port::Access, 0, 0x1234).enqueue(&mut sim).unwrap();
        let read = Request::read(Port::Access, 0).enqueue(&mut sim).unwrap();
        assert!(write.finish(&mut sim).unwrap().is_ack());
        let response = read.finish(&mut sim).unwrap();
        assert_eq!(response.data(), Some(0x1234));
    }
}
