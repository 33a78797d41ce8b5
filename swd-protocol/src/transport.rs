//! The seam between the transaction engine and a probe driver.
use crate::error::BufferError;

/// A bit-serial SWD transport.
///
/// Bits are queued LSB first into one sequential buffer. Every queued bit gets an ever-increasing offset.
/// The transport is free to defer clocking the bus until a [Transport::capture] needs the result,
/// so that several transactions can share one round-trip to the probe.
pub trait Transport {
    type Error;

    /// Append the low `width` bits of `value` to the pending buffer.
    ///
    /// Bit `i` of `drive` is set when the host drives cycle `i` and cleared when the cycle
    /// belongs to the target (acknowledgment, read data or turnaround).
    ///
    /// Returns the offset of the first appended bit.
    fn queue(&mut self, drive: u32, value: u32, width: u8) -> Result<usize, Self::Error>;

    /// Read back `width` bits that were present on SWDIO starting at `offset`.
    fn capture(&mut self, offset: usize, width: u8) -> Result<u32, Self::Error>;

    /// Allow the transport to forget clocked cycles below `offset`.
    /// Later captures below `offset` may fail. Offsets of new cycles keep increasing.
    fn release(&mut self, offset: usize) {
        let _ = offset;
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn queue(&mut self, drive: u32, value: u32, width: u8) -> Result<usize, Self::Error> {
        (**self).queue(drive, value, width)
    }

    fn capture(&mut self, offset: usize, width: u8) -> Result<u32, Self::Error> {
        (**self).capture(offset, width)
    }

    fn release(&mut self, offset: usize) {
        (**self).release(offset)
    }
}

/// One clock cycle as queued by the host.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Bit {
    /// Whether the host drives SWDIO during this cycle
    pub drive: bool,
    /// The level driven by the host. Meaningless if `drive` is false.
    pub level: bool,
}

/// Pending output and captured input of a bit-serial transport.
///
/// Transports queue into this buffer and call [BitBuffer::clock] once the bits are
/// physically shifted. Offsets are never reused until [BitBuffer::clear] is called.
/// Cycles below [BitBuffer::base] were dropped by [BitBuffer::release].
#[derive(Clone, Debug, Default)]
pub struct BitBuffer {
    base: usize,
    queued: Vec<Bit>,
    captured: Vec<bool>,
}

fn check_width(width: u8) -> Result<(), BufferError> {
    if width == 0 || width > 32 {
        Err(BufferError::WidthOutOfRange(width))
    } else {
        Ok(())
    }
}

impl BitBuffer {
    pub fn new() -> BitBuffer {
        BitBuffer::default()
    }

    /// Append `width` cycles and return the offset of the first one.
    pub fn push(&mut self, drive: u32, value: u32, width: u8) -> Result<usize, BufferError> {
        check_width(width)?;
        let offset = self.base + self.queued.len();
        self.queued.extend((0..width).map(|i| Bit {
            drive: (drive >> i) & 1 != 0,
            level: (value >> i) & 1 != 0,
        }));
        Ok(offset)
    }

    /// Offset of the oldest retained cycle
    pub fn base(&self) -> usize {
        self.base
    }

    /// Number of retained cycles, clocked or not
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Number of cycles that were queued but not yet clocked
    pub fn pending(&self) -> usize {
        self.queued.len() - self.captured.len()
    }

    /// The cycles that were queued but not yet clocked, in order
    pub fn pending_bits(&self) -> &[Bit] {
        &self.queued[self.captured.len()..]
    }

    /// Clock every pending cycle through `line`, which returns the level sampled on SWDIO.
    pub fn clock(&mut self, mut line: impl FnMut(Bit) -> bool) {
        let start = self.captured.len();
        for bit in &self.queued[start..] {
            self.captured.push(line(*bit));
        }
    }

    /// The sampled levels of `width` cycles starting at `offset`, LSB first.
    pub fn get(&self, offset: usize, width: u8) -> Result<u32, BufferError> {
        check_width(width)?;
        if offset < self.base {
            return Err(BufferError::Released {
                offset,
                base: self.base,
            });
        }
        let captured = self.base + self.captured.len();
        let start = offset - self.base;
        let end = match offset.checked_add(width as usize) {
            Some(end) if end <= captured => end - self.base,
            _ => {
                return Err(BufferError::NotCaptured {
                    offset,
                    width,
                    captured,
                });
            }
        };
        Ok(self.captured[start..end]
            .iter()
            .rev()
            .fold(0, |acc, bit| (acc << 1) | u32::from(*bit)))
    }

    /// Drop clocked cycles below `offset`. Pending cycles are always kept.
    pub fn release(&mut self, offset: usize) {
        let end = offset.min(self.base + self.captured.len());
        if end <= self.base {
            return;
        }
        let count = end - self.base;
        self.queued.drain(..count);
        self.captured.drain(..count);
        self.base = end;
    }

    /// Drop every cycle, clocked or pending. Their offsets are not handed out again.
    pub fn discard(&mut self) {
        self.base += self.queued.len();
        self.queued.clear();
        self.captured.clear();
    }

    /// Drop every queued and captured cycle. Offsets start at zero again.
    pub fn clear(&mut self) {
        self.base = 0;
        self.queued.clear();
        self.captured.clear();
    }
}

/// A transport without a target attached.
///
/// Host-driven cycles read back what the host drove, all other cycles read the pull level.
/// Useful to inspect what a request puts on the wire.
#[derive(Clone, Debug)]
pub struct Loopback {
    buffer: BitBuffer,
    pull_up: bool,
}

impl Default for Loopback {
    fn default() -> Self {
        Loopback {
            buffer: BitBuffer::new(),
            pull_up: true,
        }
    }
}

impl Loopback {
    pub fn new() -> Loopback {
        Loopback::default()
    }

    /// Sets the level that cycles not driven by the host read as.
    pub fn with_pull_up(mut self, pull_up: bool) -> Loopback {
        self.pull_up = pull_up;
        self
    }

    pub fn buffer(&self) -> &BitBuffer {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear()
    }
}

impl Transport for Loopback {
    type Error = BufferError;

    fn queue(&mut self, drive: u32, value: u32, width: u8) -> Result<usize, BufferError> {
        self.buffer.push(drive, value, width)
    }

    fn capture(&mut self, offset: usize, width: u8) -> Result<u32, BufferError> {
        let pull_up = self.pull_up;
        self.buffer
            .clock(|bit| if bit.drive { bit.level } else { pull_up });
        self.buffer.get(offset, width)
    }

    fn release(&mut self, offset: usize) {
        self.buffer.release(offset)
    }
}

#[cfg(test)]
mod test {
    use super::{BitBuffer, Loopback, Transport};
    use crate::error::BufferError;

    #[test]
    fn offsets_increase() {
        let mut buffer = BitBuffer::new();
        assert_eq!(buffer.push(0xFF, 0xA5, 8), Ok(0));
        assert_eq!(buffer.push(0, 0, 3), Ok(8));
        assert_eq!(buffer.push(0, 0, 32), Ok(11));
        assert_eq!(buffer.len(), 43);
        assert_eq!(buffer.pending(), 43);
    }

    #[test]
    fn rejects_bad_widths() {
        let mut buffer = BitBuffer::new();
        assert_eq!(buffer.push(0, 0, 0), Err(BufferError::WidthOutOfRange(0)));
        assert_eq!(buffer.push(0, 0, 33), Err(BufferError::WidthOutOfRange(33)));
        assert!(buffer.is_empty());
    }

    #[test]
    fn capture_before_clock_fails() {
        let mut buffer = BitBuffer::new();
        buffer.push(u32::MAX, 0x3, 2).unwrap();
        assert_eq!(
            buffer.get(0, 2),
            Err(BufferError::NotCaptured {
                offset: 0,
                width: 2,
                captured: 0
            })
        );
    }

    #[test]
    fn capture_near_the_end_of_the_offset_space() {
        let mut loopback = Loopback::new();
        loopback.queue(u32::MAX, 1, 1).unwrap();
        assert_eq!(
            loopback.capture(usize::MAX, 1),
            Err(BufferError::NotCaptured {
                offset: usize::MAX,
                width: 1,
                captured: 1
            })
        );
        assert_eq!(
            loopback.capture(usize::MAX - 3, 32),
            Err(BufferError::NotCaptured {
                offset: usize::MAX - 3,
                width: 32,
                captured: 1
            })
        );
    }

    #[test]
    fn release_keeps_offsets_increasing() {
        let mut buffer = BitBuffer::new();
        buffer.push(u32::MAX, 0xA5, 8).unwrap();
        buffer.push(u32::MAX, 0x3C, 8).unwrap();
        buffer.clock(|bit| bit.level);
        buffer.push(u32::MAX, 0x1, 4).unwrap();

        buffer.release(8);
        assert_eq!(buffer.base(), 8);
        assert_eq!(buffer.len(), 12);
        assert_eq!(buffer.get(8, 8), Ok(0x3C));
        assert_eq!(
            buffer.get(4, 8),
            Err(BufferError::Released { offset: 4, base: 8 })
        );
        assert_eq!(buffer.push(u32::MAX, 0, 1), Ok(20));

        // Pending cycles survive a release past them
        buffer.release(usize::MAX);
        assert_eq!(buffer.base(), 16);
        assert_eq!(buffer.pending(), 5);
        buffer.clock(|bit| bit.level);
        assert_eq!(buffer.get(16, 4), Ok(0x1));

        // Releasing backwards does nothing
        buffer.release(0);
        assert_eq!(buffer.base(), 16);

        buffer.clear();
        assert_eq!(buffer.push(0, 0, 1), Ok(0));
    }

    #[test]
    fn discard_drops_pending_cycles() {
        let mut buffer = BitBuffer::new();
        buffer.push(u32::MAX, 0xFF, 8).unwrap();
        buffer.clock(|bit| bit.level);
        buffer.push(u32::MAX, 0x0F, 8).unwrap();
        buffer.discard();
        assert!(buffer.is_empty());
        assert_eq!(buffer.pending(), 0);
        assert_eq!(buffer.push(0, 0, 1), Ok(16));
        assert_eq!(
            buffer.get(8, 8),
            Err(BufferError::Released { offset: 8, base: 16 })
        );
    }

    #[test]
    fn clock_only_visits_pending_bits() {
        let mut buffer = BitBuffer::new();
        buffer.push(u32::MAX, 0b01, 2).unwrap();
        let mut visited = 0;
        buffer.clock(|bit| {
            visited += 1;
            bit.level
        });
        buffer.push(u32::MAX, 0b1, 1).unwrap();
        buffer.clock(|bit| {
            visited += 1;
            bit.level
        });
        assert_eq!(visited, 3);
        assert_eq!(buffer.get(0, 3), Ok(0b101));
    }

    #[test]
    fn full_word_capture() {
        let mut loopback = Loopback::new();
        let offset = loopback.queue(u32::MAX, 0xDEAD_BEEF, 32).unwrap();
        assert_eq!(loopback.capture(offset, 32), Ok(0xDEAD_BEEF));
    }

    #[test]
    fn undriven_bits_read_pull_level() {
        let mut high = Loopback::new();
        let offset = high.queue(0b0101, 0b0000, 4).unwrap();
        assert_eq!(high.capture(offset, 4), Ok(0b1010));

        let mut low = Loopback::new().with_pull_up(false);
        let offset = low.queue(0b0101, 0b1111, 4).unwrap();
        assert_eq!(low.capture(offset, 4), Ok(0b0101));
    }
}
