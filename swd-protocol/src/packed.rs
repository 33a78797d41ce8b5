//! Byte packed cycle sequences for probes that shift whole buffers at once,
//! such as J-Link (`SWD_StoreRaw`) or CMSIS-DAP (`DAP_SWD_Sequence`).
use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    error::PackedError,
    transport::{Bit, BitBuffer, Transport},
};

/// A run of clock cycles, packed LSB first.
///
/// Cycle `i` is bit `i % 8` of byte `i / 8`. Unused bits of the last byte are zero.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sequence {
    direction: Bytes,
    data: Bytes,
    bits: usize,
}

impl Sequence {
    pub fn pack(bits: &[Bit]) -> Sequence {
        let len = bits.len().div_ceil(8);
        let mut direction = BytesMut::with_capacity(len);
        let mut data = BytesMut::with_capacity(len);
        for chunk in bits.chunks(8) {
            let (mut drive, mut level) = (0u8, 0u8);
            for (i, bit) in chunk.iter().enumerate() {
                drive |= u8::from(bit.drive) << i;
                level |= u8::from(bit.drive && bit.level) << i;
            }
            direction.put_u8(drive);
            data.put_u8(level);
        }
        Sequence {
            direction: direction.freeze(),
            data: data.freeze(),
            bits: bits.len(),
        }
    }

    /// Number of clock cycles
    pub fn bits(&self) -> usize {
        self.bits
    }

    pub fn byte_len(&self) -> usize {
        self.bits.div_ceil(8)
    }

    /// One bit per cycle, set if the host drives SWDIO
    pub fn direction(&self) -> &Bytes {
        &self.direction
    }

    /// The levels driven by the host. Cycles the host does not drive are zero.
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// The level of cycle `index` in a packed buffer.
///
/// # Panics
///
/// If `bytes` is shorter than `index / 8 + 1`.
pub fn bit(bytes: &[u8], index: usize) -> bool {
    (bytes[index / 8] >> (index % 8)) & 1 != 0
}

/// A probe that clocks packed sequences.
pub trait Probe {
    type Error;

    /// Shift `sequence` and return the levels sampled on SWDIO, packed the same way.
    fn shift(&mut self, sequence: &Sequence) -> Result<Bytes, Self::Error>;
}

/// A [Transport] that collects queued cycles and hands them to a [Probe] as one
/// sequence on the first capture that needs them.
#[derive(Debug)]
pub struct PackedTransport<P: Probe> {
    probe: P,
    buffer: BitBuffer,
}

impl<P: Probe> PackedTransport<P> {
    pub fn new(probe: P) -> PackedTransport<P> {
        PackedTransport {
            probe,
            buffer: BitBuffer::new(),
        }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }

    pub fn into_inner(self) -> P {
        self.probe
    }

    /// Drops every queued and captured bit. Offsets start at zero again.
    pub fn clear(&mut self) {
        self.buffer.clear()
    }

    /// Shift all pending cycles, even if nobody captures them.
    ///
    /// If the probe fails, the pending cycles are dropped instead of being shifted again
    /// with the next capture, since the probe may already have clocked part of them.
    /// Transactions that were waiting for them then fail with [BufferError::Released](crate::error::BufferError::Released).
    pub fn flush(&mut self) -> Result<(), PackedError<P::Error>> {
        let sequence = Sequence::pack(self.buffer.pending_bits());
        if sequence.bits() == 0 {
            return Ok(());
        }
        let response = match self.probe.shift(&sequence) {
            Ok(response) => response,
            Err(e) => {
                self.buffer.discard();
                return Err(PackedError::Probe(e));
            }
        };
        if response.len() < sequence.byte_len() {
            self.buffer.discard();
            return Err(PackedError::ShortResponse {
                expected: sequence.byte_len(),
                got: response.len(),
            });
        }
        let mut index = 0;
        self.buffer.clock(|_| {
            let level = bit(&response, index);
            index += 1;
            level
        });
        Ok(())
    }
}

impl<P: Probe> Transport for PackedTransport<P> {
    type Error = PackedError<P::Error>;

    fn queue(&mut self, drive: u32, value: u32, width: u8) -> Result<usize, Self::Error> {
        Ok(self.buffer.push(drive, value, width)?)
    }

    fn capture(&mut self, offset: usize, width: u8) -> Result<u32, Self::Error> {
        if self.buffer.pending() > 0 {
            self.flush()?;
        }
        Ok(self.buffer.get(offset, width)?)
    }

    fn release(&mut self, offset: usize) {
        self.buffer.release(offset)
    }
}
