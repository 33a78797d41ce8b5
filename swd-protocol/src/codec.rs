//! Request header encoding and the bit-serial transaction engine
use crate::{
    error::RequestError,
    protocol::{Direction, Operation, Port, Request, Response, Status},
    transport::Transport,
};

const HEADER_BITS: u8 = 8;
const ACK_BITS: u8 = 3;
const TURNAROUND_BITS: u8 = 2;
const DATA_BITS: u8 = 32;
// Parity bit followed by turnaround and idle cycles
const TRAILER_BITS: u8 = 8;

const DRIVE_ALL: u32 = u32::MAX;
const DRIVE_NONE: u32 = 0;
// Parity and turnaround belong to the target, the remaining six idle cycles are driven low
const READ_TRAILER_DRIVE: u32 = 0xFC;

const START: u8 = 1 << 0;
const AP_N_DP: u8 = 1 << 1;
const R_N_W: u8 = 1 << 2;
const A2: u8 = 1 << 3;
const A3: u8 = 1 << 4;
const PARITY: u8 = 1 << 5;
const STOP: u8 = 1 << 6;
const PARK: u8 = 1 << 7;

/// The even parity bit of `value`: `1` if it has an odd number of ones, `0` otherwise.
pub fn parity(value: u32) -> u32 {
    value.count_ones() & 1
}

/// Encode the 8 bit request header.
/// Only the low two bits of `register_index` are used.
pub fn encode_header(port: Port, direction: Direction, register_index: u8) -> u8 {
    let mut header = START | PARK;
    if port == Port::Access {
        header |= AP_N_DP;
    }
    if direction == Direction::Read {
        header |= R_N_W;
    }
    if register_index & 0b01 != 0 {
        header |= A2;
    }
    if register_index & 0b10 != 0 {
        header |= A3;
    }
    let covered = header & (AP_N_DP | R_N_W | A2 | A3);
    if parity(u32::from(covered)) == 1 {
        header |= PARITY;
    }
    header
}

/// Decode a request header as seen by a target.
///
/// Fails if the start, stop, park or parity bit is wrong.
pub fn decode_header(header: u8) -> Result<(Port, Direction, u8), RequestError> {
    let covered = header & (AP_N_DP | R_N_W | A2 | A3);
    let parity_ok = parity(u32::from(covered)) == u32::from((header & PARITY) >> 5);
    if header & START == 0 || header & STOP != 0 || header & PARK == 0 || !parity_ok {
        return Err(RequestError::MalformedHeader(header));
    }
    let port = if header & AP_N_DP != 0 {
        Port::Access
    } else {
        Port::Debug
    };
    let direction = if header & R_N_W != 0 {
        Direction::Read
    } else {
        Direction::Write
    };
    Ok((port, direction, (header >> 3) & 0b11))
}

impl Status {
    /// Decode the 3 bit acknowledgment, as captured LSB first.
    pub fn from_ack(ack: u32) -> Status {
        match ack & 0b111 {
            0b001 => Status::Ack,
            0b010 => Status::Wait,
            0b100 => Status::Fault,
            _ => Status::Invalid,
        }
    }

    /// The acknowledgment a target drives for this status.
    /// `None` for [Status::Invalid], where the target leaves the line alone.
    pub fn ack_bits(&self) -> Option<u32> {
        match self {
            Status::Ack => Some(0b001),
            Status::Wait => Some(0b010),
            Status::Fault => Some(0b100),
            Status::Invalid => None,
        }
    }
}

impl Request {
    /// Builds a request for the given operation.
    ///
    /// `register_index` is reduced modulo 4. Use [Request::from_address] to reject
    /// out-of-range registers instead.
    pub fn new(port: Port, register_index: u8, operation: Operation) -> Request {
        let register_index = register_index & 0b11;
        Request {
            register_index,
            port,
            operation,
            header: encode_header(port, operation.direction(), register_index),
        }
    }

    pub fn read(port: Port, register_index: u8) -> Request {
        Request::new(port, register_index, Operation::Read)
    }

    pub fn write(port: Port, register_index: u8, payload: u32) -> Request {
        Request::new(port, register_index, Operation::Write(payload))
    }

    /// Builds a request from a register byte address (`0x0`, `0x4`, `0x8` or `0xC`).
    pub fn from_address(
        port: Port,
        address: u8,
        operation: Operation,
    ) -> Result<Request, RequestError> {
        if address & !0b1100 != 0 {
            return Err(RequestError::InvalidAddress(address));
        }
        Ok(Request::new(port, address >> 2, operation))
    }

    /// Queues all phases of this request without clocking the bus.
    ///
    /// The returned [Transaction] must be finished on the same transport. Several transactions
    /// may be queued before the first one is finished. They have to be finished in order.
    pub fn enqueue<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
    ) -> Result<Transaction, T::Error> {
        let start = transport.queue(DRIVE_ALL, u32::from(self.header), HEADER_BITS)?;
        let ack_offset = transport.queue(DRIVE_NONE, 0, ACK_BITS)?;
        match self.operation {
            Operation::Read => {
                transport.queue(DRIVE_NONE, 0, DATA_BITS)?;
                transport.queue(READ_TRAILER_DRIVE, 0, TRAILER_BITS)?;
            }
            Operation::Write(payload) => {
                transport.queue(DRIVE_NONE, 0, TURNAROUND_BITS)?;
                transport.queue(DRIVE_ALL, payload, DATA_BITS)?;
                transport.queue(DRIVE_ALL, parity(payload), TRAILER_BITS)?;
            }
        }
        Ok(Transaction {
            request: *self,
            start,
            ack_offset,
        })
    }

    /// Runs the complete transaction and classifies the result.
    ///
    /// This never retries: a [Status::Wait] is handed back to the caller as is.
    /// An error is only returned if the transport itself fails.
    pub fn send<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<Response, T::Error> {
        self.enqueue(transport)?.finish(transport)
    }
}

/// A request whose phases have been queued on a transport.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    request: Request,
    start: usize,
    ack_offset: usize,
}

impl Transaction {
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Offset of the first header bit
    pub fn start_offset(&self) -> usize {
        self.start
    }

    /// Offset of the 3 bit acknowledgment
    pub fn ack_offset(&self) -> usize {
        self.ack_offset
    }

    /// Offset of the 32 bit data word
    pub fn data_offset(&self) -> usize {
        match self.request.direction() {
            Direction::Read => self.ack_offset + ACK_BITS as usize,
            Direction::Write => self.ack_offset + (ACK_BITS + TURNAROUND_BITS) as usize,
        }
    }

    /// Offset of the parity bit protecting the data word
    pub fn parity_offset(&self) -> usize {
        self.data_offset() + DATA_BITS as usize
    }

    /// Captures the acknowledgment and, for reads, the data word and checks its parity.
    ///
    /// A read whose parity does not match is reported as [Status::Invalid]
    /// even if the target acknowledged it. The data is still returned.
    ///
    /// Afterwards the transport may forget every cycle queued before this transaction's header.
    pub fn finish<T: Transport + ?Sized>(self, transport: &mut T) -> Result<Response, T::Error> {
        let response = self.classify(transport)?;
        // Transactions finish in order, so nothing before this frame is needed anymore
        transport.release(self.start);
        Ok(response)
    }

    fn classify<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<Response, T::Error> {
        let status = Status::from_ack(transport.capture(self.ack_offset, ACK_BITS)?);
        if self.request.direction() == Direction::Write {
            return Ok(Response::new(status, None));
        }

        let data = transport.capture(self.data_offset(), DATA_BITS)?;
        if status == Status::Ack && transport.capture(self.parity_offset(), 1)? != parity(data) {
            return Ok(Response::new(Status::Invalid, Some(data)));
        }
        Ok(Response::new(status, Some(data)))
    }
}

#[test]
fn parity_of_small_values() {
    assert_eq!(parity(0), 0);
    assert_eq!(parity(1), 1);
    assert_eq!(parity(2), 1);
    assert_eq!(parity(3), 0);
    assert_eq!(parity(u32::MAX), 0);
    assert_eq!(parity(0x8000_0001), 0);
    assert_eq!(parity(0x8000_0000), 1);
}

#[test]
fn decode_acknowledgment() {
    assert_eq!(Status::from_ack(0b001), Status::Ack);
    assert_eq!(Status::from_ack(0b010), Status::Wait);
    assert_eq!(Status::from_ack(0b100), Status::Fault);
    for invalid in [0b000, 0b011, 0b101, 0b110, 0b111] {
        assert_eq!(Status::from_ack(invalid), Status::Invalid);
    }
}
