use std::io;

use thiserror::Error;

/// Errors produced while building or parsing ADTS headers
#[derive(Error, Debug)]
pub enum AdtsError {
    /// The sampling rate has no entry in the ADTS rate table
    #[error("Unsupported sample rate: {0} Hz")]
    UnsupportedSampleRate(u32),

    /// Payload plus header does not fit the 13-bit frame length field
    #[error("Payload of {0} bytes does not fit an ADTS frame")]
    FrameTooLong(usize),

    /// The 12-bit sync word is not 0xFFF
    #[error("Invalid ADTS sync word: 0x{0:03x}")]
    InvalidSyncWord(u16),

    /// The layer field must be zero
    #[error("Invalid ADTS layer: {0}")]
    InvalidLayer(u8),

    /// Index outside the 12-entry rate table
    #[error("Invalid sampling frequency index: {0}")]
    InvalidSamplingFrequencyIndex(u8),

    /// Frame length shorter than the header itself
    #[error("Invalid ADTS frame length: {0}")]
    InvalidFrameLength(u16),

    /// Fewer bytes than a header needs
    #[error("Insufficient data: expected at least {expected} bytes, got {actual}")]
    InsufficientData {
        /// Bytes required
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Bit-level I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
