use std::fmt::Display;

/// Selects one of the two register spaces that can be addressed over SWD.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Port {
    /// The Debug Port (`APnDP = 0`)
    Debug,
    /// The Access Port selected through the DP `SELECT` register (`APnDP = 1`)
    Access,
}

impl Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Port::Debug => write!(f, "DP"),
            Port::Access => write!(f, "AP"),
        }
    }
}

/// Whether a request reads from or writes to the target.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    Read,
    Write,
}

/// The operation carried by a [Request].
/// Only a write carries a payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Operation {
    Read,
    Write(u32),
}

impl Operation {
    pub fn direction(&self) -> Direction {
        match self {
            Operation::Read => Direction::Read,
            Operation::Write(_) => Direction::Write,
        }
    }
}

/// A single SWD register access.
///
/// The 8 bit request header is computed once when the request is built and never changes afterwards.
/// Use [Request::send] to run the full transaction against a [crate::transport::Transport].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Request {
    pub(crate) register_index: u8,
    pub(crate) port: Port,
    pub(crate) operation: Operation,
    pub(crate) header: u8,
}

impl Request {
    /// The register index `A[3:2]`, always in `0..=3`
    pub fn register_index(&self) -> u8 {
        self.register_index
    }

    /// The register space this request addresses
    pub fn port(&self) -> Port {
        self.port
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn direction(&self) -> Direction {
        self.operation.direction()
    }

    /// The value to write, `None` for reads
    pub fn payload(&self) -> Option<u32> {
        match self.operation {
            Operation::Read => None,
            Operation::Write(payload) => Some(payload),
        }
    }

    /// The encoded request header as it is shifted out, LSB first.
    pub fn header(&self) -> u8 {
        self.header
    }
}

/// Classification of a finished transaction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Status {
    /// The target accepted the request. For reads, the data passed the parity check.
    Ack,
    /// The target is busy. The request may be repeated.
    Wait,
    /// The target reported a sticky error that must be cleared through `ABORT` before continuing.
    Fault,
    /// The acknowledgment could not be decoded or the read data failed its parity check.
    Invalid,
}

impl Status {
    pub fn is_ack(&self) -> bool {
        *self == Status::Ack
    }

    pub fn is_wait(&self) -> bool {
        *self == Status::Wait
    }

    pub fn is_fault(&self) -> bool {
        *self == Status::Fault
    }

    pub fn is_invalid(&self) -> bool {
        *self == Status::Invalid
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ack => write!(f, "ACK"),
            Status::Wait => write!(f, "WAIT"),
            Status::Fault => write!(f, "FAULT"),
            Status::Invalid => write!(f, "INVALID"),
        }
    }
}

/// The result of sending a [Request].
///
/// `data` is whatever was captured during the data phase of a read and `None` for writes.
/// It can only be trusted if the status is [Status::Ack].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Response {
    status: Status,
    data: Option<u32>,
}

impl Response {
    pub fn new(status: Status, data: Option<u32>) -> Response {
        Response { status, data }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn data(&self) -> Option<u32> {
        self.data
    }

    pub fn is_ack(&self) -> bool {
        self.status.is_ack()
    }

    pub fn is_wait(&self) -> bool {
        self.status.is_wait()
    }

    pub fn is_fault(&self) -> bool {
        self.status.is_fault()
    }

    pub fn is_invalid(&self) -> bool {
        self.status.is_invalid()
    }
}

#[test]
fn response_predicates_are_exclusive() {
    for status in [Status::Ack, Status::Wait, Status::Fault, Status::Invalid] {
        let response = Response::new(status, None);
        let flags = [
            response.is_ack(),
            response.is_wait(),
            response.is_fault(),
            response.is_invalid(),
        ];
        assert_eq!(flags.iter().filter(|f| **f).count(), 1, "{}", status);
    }
}

#[test]
fn display_names() {
    assert_eq!(Status::Wait.to_string(), "WAIT");
    assert_eq!(Port::Access.to_string(), "AP");
}
