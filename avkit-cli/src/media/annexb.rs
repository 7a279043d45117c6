//! Length-prefixed (AVCC) to start-code-prefixed (Annex-B) H.264 conversion.

use std::io::{self, Write};

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use thiserror::Error;

/// Annex-B start code (4 bytes)
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

#[derive(Debug, Error)]
pub enum NalError {
    #[error("Invalid NAL length field size: {0}")]
    InvalidLengthSize(usize),

    #[error("Truncated NAL unit at offset {offset}: declared {declared} bytes, {available} available")]
    Truncated {
        offset: usize,
        declared: usize,
        available: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// SPS and PPS NAL units taken from an `avcC` record
#[derive(Debug, Clone, Default)]
pub struct ParameterSets {
    pub sps: Vec<Bytes>,
    pub pps: Vec<Bytes>,
}

impl ParameterSets {
    /// Writes every SPS, then every PPS, each behind a start code
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<usize> {
        let mut written = 0;
        for nal in self.sps.iter().chain(self.pps.iter()) {
            writer.write_all(&START_CODE)?;
            writer.write_all(nal)?;
            written += START_CODE.len() + nal.len();
        }
        Ok(written)
    }

    pub fn is_empty(&self) -> bool {
        self.sps.is_empty() && self.pps.is_empty()
    }
}

/// Rewrites one length-prefixed sample as Annex-B.
///
/// `length_size` is the NAL length field width from the `avcC` record.
/// Returns the number of bytes written.
pub fn write_sample<W: Write>(data: &[u8], length_size: usize, mut writer: W) -> Result<usize, NalError> {
    if !matches!(length_size, 1 | 2 | 4) {
        return Err(NalError::InvalidLengthSize(length_size));
    }

    let mut offset = 0;
    let mut written = 0;

    while offset < data.len() {
        let available = data.len() - offset;
        if available < length_size {
            return Err(NalError::Truncated {
                offset,
                declared: length_size,
                available,
            });
        }

        let declared = BigEndian::read_uint(&data[offset..offset + length_size], length_size) as usize;
        let start = offset + length_size;
        let available = data.len() - start;
        if declared > available {
            return Err(NalError::Truncated {
                offset,
                declared,
                available,
            });
        }

        // zero-length units carry nothing
        if declared > 0 {
            writer.write_all(&START_CODE)?;
            writer.write_all(&data[start..start + declared])?;
            written += START_CODE.len() + declared;
        }

        offset = start + declared;
    }

    Ok(written)
}
