use std::{error::Error, fmt::Display};

/// Errors that may occur when building or decoding a request header.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RequestError {
    /// The byte address is not one of `0x0`, `0x4`, `0x8` or `0xC`
    InvalidAddress(u8),
    /// The header has a wrong start, stop, park or parity bit
    MalformedHeader(u8),
}

impl Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::InvalidAddress(address) => {
                write!(f, "Invalid register address 0x{:02x}", address)
            }
            RequestError::MalformedHeader(header) => {
                write!(f, "Malformed request header 0x{:02x}", header)
            }
        }
    }
}

impl Error for RequestError {}

/// Errors reported by the in-memory [crate::transport::BitBuffer] and the transports built on it.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BufferError {
    /// A single queue or capture call may only handle between 1 and 32 bits
    WidthOutOfRange(u8),
    /// The requested bits have not been clocked yet
    NotCaptured {
        offset: usize,
        width: u8,
        captured: usize,
    },
    /// The requested bits were released and are no longer kept
    Released { offset: usize, base: usize },
}

impl Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::WidthOutOfRange(width) => {
                write!(f, "Width must be between 1 and 32 bits, got {}", width)
            }
            BufferError::NotCaptured {
                offset,
                width,
                captured,
            } => write!(
                f,
                "Cannot capture {} bits at offset {}, only {} bits were clocked",
                width, offset, captured
            ),
            BufferError::Released { offset, base } => write!(
                f,
                "Cannot capture at offset {}, cycles below {} were released",
                offset, base
            ),
        }
    }
}

impl Error for BufferError {}

/// Errors of a [crate::packed::PackedTransport].
#[cfg(feature = "bytes")]
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PackedError<E> {
    Buffer(BufferError),
    /// The probe failed to shift the sequence
    Probe(E),
    /// The probe returned fewer bytes than the sequence needs
    ShortResponse { expected: usize, got: usize },
}

#[cfg(feature = "bytes")]
impl<E> From<BufferError> for PackedError<E> {
    fn from(value: BufferError) -> Self {
        PackedError::Buffer(value)
    }
}

#[cfg(feature = "bytes")]
impl<E: Display> Display for PackedError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackedError::Buffer(error) => write!(f, "{}", error),
            PackedError::Probe(error) => write!(f, "Probe error: {}", error),
            PackedError::ShortResponse { expected, got } => write!(
                f,
                "Probe returned {} bytes, expected at least {}",
                got, expected
            ),
        }
    }
}

#[cfg(feature = "bytes")]
impl<E: Error + 'static> Error for PackedError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PackedError::Buffer(error) => Some(error),
            PackedError::Probe(error) => Some(error),
            PackedError::ShortResponse { .. } => None,
        }
    }
}
