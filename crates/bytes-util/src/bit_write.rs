use std::io;

/// Writes values of arbitrary bit width, most significant bit first.
///
/// Bits are collected in a one-byte accumulator and forwarded to the
/// underlying writer as soon as a byte is complete.
#[derive(Debug)]
#[must_use]
pub struct BitWriter<W> {
    writer: W,
    acc: u8,
    filled: u8,
}

impl<W: Default> Default for BitWriter<W> {
    fn default() -> Self {
        Self::new(W::default())
    }
}

impl<W> BitWriter<W> {
    /// Wraps a writer
    pub const fn new(writer: W) -> Self {
        Self { writer, acc: 0, filled: 0 }
    }

    /// Number of bits pending in the current partial byte (0-7)
    #[inline(always)]
    #[must_use]
    pub const fn bit_pos(&self) -> u8 {
        self.filled
    }

    /// True when no partial byte is pending
    #[inline(always)]
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.filled == 0
    }

    /// Returns a reference to the underlying writer
    #[inline(always)]
    #[must_use]
    pub const fn get_ref(&self) -> &W {
        &self.writer
    }
}

impl<W: io::Write> BitWriter<W> {
    /// Writes a single bit
    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        self.push(bit as u8, 1)
    }

    /// Writes the low `count` bits of `value`, most significant first.
    ///
    /// Fails with [`io::ErrorKind::InvalidData`] when `value` has bits set
    /// above `count`.
    pub fn write_bits(&mut self, value: u64, count: u8) -> io::Result<()> {
        let count = count.min(64);
        if count < 64 && value >> count != 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "value does not fit in bit width"));
        }

        let mut remaining = count;
        while remaining > 0 {
            let room = 8 - self.filled;
            let take = room.min(remaining);
            let shift = remaining - take;
            let chunk = ((value >> shift) & ((1u64 << take) - 1)) as u8;
            self.push(chunk, take)?;
            remaining = shift;
        }

        Ok(())
    }

    /// Pads the pending byte with zero bits and flushes it
    pub fn align(&mut self) -> io::Result<()> {
        if !self.is_aligned() {
            let pad = 8 - self.filled;
            self.push(0, pad)?;
        }
        Ok(())
    }

    /// Aligns to a byte boundary and returns the underlying writer
    pub fn finish(mut self) -> io::Result<W> {
        self.align()?;
        Ok(self.writer)
    }

    // `chunk` holds `width` bits and `width` never exceeds the free room.
    fn push(&mut self, chunk: u8, width: u8) -> io::Result<()> {
        debug_assert!(width > 0 && width <= 8 - self.filled);
        self.acc = if width == 8 { chunk } else { (self.acc << width) | chunk };
        self.filled += width;

        if self.filled == 8 {
            self.writer.write_all(&[self.acc])?;
            self.acc = 0;
            self.filled = 0;
        }

        Ok(())
    }
}

impl<W: io::Write> io::Write for BitWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.is_aligned() {
            return self.writer.write(buf);
        }

        for byte in buf {
            self.write_bits(u64::from(*byte), 8)?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
