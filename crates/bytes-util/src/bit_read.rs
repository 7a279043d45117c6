use std::io;

/// Reads values of arbitrary bit width, most significant bit first.
#[derive(Debug)]
#[must_use]
pub struct BitReader<R> {
    reader: R,
    acc: u8,
    remaining: u8,
}

impl<R> BitReader<R> {
    /// Wraps a reader
    pub const fn new(reader: R) -> Self {
        Self { reader, acc: 0, remaining: 0 }
    }

    /// Returns the underlying reader
    #[inline(always)]
    #[must_use]
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Returns a reference to the underlying reader
    #[inline(always)]
    #[must_use]
    pub const fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Bits already consumed from the current byte (0-7)
    #[inline(always)]
    #[must_use]
    pub const fn bit_pos(&self) -> u8 {
        (8 - self.remaining) % 8
    }

    /// True when the next read starts on a byte boundary
    #[inline(always)]
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.remaining == 0
    }

    /// Drops the unread bits of the current byte
    #[inline(always)]
    pub fn align(&mut self) {
        self.remaining = 0;
    }
}

impl<B: AsRef<[u8]>> BitReader<io::Cursor<B>> {
    /// Reads from an in-memory buffer
    pub const fn new_from_slice(data: B) -> Self {
        Self::new(io::Cursor::new(data))
    }
}

impl<R: io::Read> BitReader<R> {
    /// Reads a single bit
    pub fn read_bit(&mut self) -> io::Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Reads `count` bits (at most 64) into the low bits of the result
    pub fn read_bits(&mut self, count: u8) -> io::Result<u64> {
        let mut remaining = count.min(64);
        let mut value = 0u64;

        while remaining > 0 {
            if self.remaining == 0 {
                let mut byte = [0u8];
                self.reader.read_exact(&mut byte)?;
                self.acc = byte[0];
                self.remaining = 8;
            }

            let take = self.remaining.min(remaining);
            let shift = self.remaining - take;
            let chunk = (self.acc >> shift) & (((1u16 << take) - 1) as u8);

            value = (value << take) | u64::from(chunk);
            self.remaining = shift;
            remaining -= take;
        }

        Ok(value)
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_reads_across_bytes() {
        let mut reader = BitReader::new_from_slice([0xFF, 0xF1, 0x50]);

        assert_eq!(reader.read_bits(12).unwrap(), 0xFFF);
        assert_eq!(reader.bit_pos(), 4);
        assert!(!reader.read_bit().unwrap());
        assert_eq!(reader.read_bits(2).unwrap(), 0);
        assert!(reader.read_bit().unwrap());
        assert!(reader.is_aligned());
        assert_eq!(reader.read_bits(2).unwrap(), 0b01);
        assert_eq!(reader.read_bits(4).unwrap(), 0b0100);
    }

    #[test]
    fn test_align_skips_rest_of_byte() {
        let mut reader = BitReader::new_from_slice([0b1010_1010, 0b1100_0000]);

        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        reader.align();
        assert!(reader.is_aligned());
        assert_eq!(reader.read_bits(2).unwrap(), 0b11);
    }

    #[test]
    fn test_full_width_read() {
        let mut reader = BitReader::new_from_slice([0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF]);
        assert_eq!(reader.read_bits(64).unwrap(), 0x0123_4567_89AB_CDEF);
    }

    #[test]
    fn test_eof() {
        let mut reader = BitReader::new_from_slice([0xFF]);

        assert_eq!(reader.read_bits(8).unwrap(), 0xFF);
        let err = reader.read_bit().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
