//! ADTS (Audio Data Transport Stream) framing.
//!
//! ISO/IEC 13818-7:2006(E) - 6.2 (Table 5, Table 6)
//!
//! Every header produced here is 7 bytes long: MPEG-4 identifier, layer 0,
//! no CRC, a single raw data block and a VBR buffer fullness of `0x7FF`.

use std::io;

use bytes_util::{BitReader, BitWriter};

use crate::{AdtsError, AudioObjectType, SampleFrequencyIndex};

/// Length of a header without CRC
pub const ADTS_HEADER_LEN: usize = 7;

/// Largest payload whose frame length still fits 13 bits
pub const MAX_ADTS_PAYLOAD_LEN: usize = 0x1FFF - ADTS_HEADER_LEN;

/// Sampling rates that may appear in an ADTS header, in index order
pub const ADTS_SAMPLE_RATES: [u32; 12] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000,
];

const SYNC_WORD: u16 = 0xFFF;
const BUFFER_FULLNESS_VBR: u16 = 0x7FF;
const CRC_LEN: usize = 2;

/// A decoded or freshly built ADTS header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct AdtsHeader {
    /// Object type, stored in the header as a 2-bit profile
    pub audio_object_type: AudioObjectType,
    /// Sampling frequency index
    pub sampling_frequency_index: SampleFrequencyIndex,
    /// Channel configuration (3 bits)
    pub channel_configuration: u8,
    /// Header plus payload length in bytes (13 bits)
    pub frame_length: u16,
    /// Whether a 16-bit CRC follows the fixed header
    pub crc_present: bool,
}

impl AdtsHeader {
    /// Builds the header for a payload of `payload_len` bytes.
    ///
    /// Fails with [`AdtsError::UnsupportedSampleRate`] when `sample_rate` is
    /// not in [`ADTS_SAMPLE_RATES`]. The channel count is truncated to 3 bits.
    pub fn new(
        payload_len: usize,
        audio_object_type: AudioObjectType,
        sample_rate: u32,
        channels: u8,
    ) -> Result<Self, AdtsError> {
        let sampling_frequency_index =
            SampleFrequencyIndex::from_adts_rate(sample_rate).ok_or(AdtsError::UnsupportedSampleRate(sample_rate))?;

        if payload_len > MAX_ADTS_PAYLOAD_LEN {
            return Err(AdtsError::FrameTooLong(payload_len));
        }

        Ok(Self {
            audio_object_type,
            sampling_frequency_index,
            channel_configuration: channels & 0x07,
            frame_length: (payload_len + ADTS_HEADER_LEN) as u16,
            crc_present: false,
        })
    }

    /// Header size on the wire, CRC included
    #[must_use]
    pub const fn header_len(&self) -> usize {
        if self.crc_present {
            ADTS_HEADER_LEN + CRC_LEN
        } else {
            ADTS_HEADER_LEN
        }
    }

    /// Length of the raw payload that follows the header
    #[must_use]
    pub const fn payload_len(&self) -> usize {
        (self.frame_length as usize).saturating_sub(self.header_len())
    }

    /// Sampling rate in Hz
    #[must_use]
    pub fn sample_rate(&self) -> Option<u32> {
        self.sampling_frequency_index.to_freq()
    }

    /// Packs the 7 fixed and variable header bytes.
    ///
    /// The CRC of a parsed header is not reproduced.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; ADTS_HEADER_LEN] {
        let profile = self.audio_object_type.adts_profile();
        let sfi = self.sampling_frequency_index.as_u8();
        let channels = self.channel_configuration;
        let len = self.frame_length;

        [
            0xFF,
            0xF0 | (!self.crc_present as u8),
            (profile << 6) | (sfi << 2) | ((channels & 0x04) >> 2),
            ((channels & 0x03) << 6) | ((len >> 11) & 0x03) as u8,
            ((len & 0x07F8) >> 3) as u8,
            (((len & 0x07) << 5) as u8) | 0x1F,
            0xFC,
        ]
    }

    /// Writes the header field by field through a [`BitWriter`]
    pub fn write_to<W: io::Write>(&self, writer: W) -> io::Result<()> {
        let mut bits = BitWriter::new(writer);

        bits.write_bits(u64::from(SYNC_WORD), 12)?;
        bits.write_bit(false)?; // id: MPEG-4
        bits.write_bits(0, 2)?; // layer
        bits.write_bit(!self.crc_present)?;
        bits.write_bits(u64::from(self.audio_object_type.adts_profile()), 2)?;
        bits.write_bits(u64::from(self.sampling_frequency_index.as_u8()), 4)?;
        bits.write_bit(false)?; // private bit
        bits.write_bits(u64::from(self.channel_configuration & 0x07), 3)?;
        // original/copy, home, copyright id bit, copyright id start
        bits.write_bits(0, 4)?;
        bits.write_bits(u64::from(self.frame_length & 0x1FFF), 13)?;
        bits.write_bits(u64::from(BUFFER_FULLNESS_VBR), 11)?;
        bits.write_bits(0, 2)?; // raw data blocks - 1

        bits.finish()?;
        Ok(())
    }

    /// Parses a header from the start of `data`.
    ///
    /// Both MPEG-2 and MPEG-4 identifiers are accepted.
    pub fn parse(data: &[u8]) -> Result<Self, AdtsError> {
        if data.len() < ADTS_HEADER_LEN {
            return Err(AdtsError::InsufficientData {
                expected: ADTS_HEADER_LEN,
                actual: data.len(),
            });
        }

        let mut bits = BitReader::new_from_slice(&data[..ADTS_HEADER_LEN]);

        let sync = bits.read_bits(12)? as u16;
        if sync != SYNC_WORD {
            return Err(AdtsError::InvalidSyncWord(sync));
        }

        let _id = bits.read_bit()?;
        let layer = bits.read_bits(2)? as u8;
        if layer != 0 {
            return Err(AdtsError::InvalidLayer(layer));
        }
        let protection_absent = bits.read_bit()?;

        let profile = bits.read_bits(2)? as u8;
        let sfi = bits.read_bits(4)? as u8;
        let sampling_frequency_index = ADTS_SAMPLE_RATES
            .get(sfi as usize)
            .and_then(|rate| SampleFrequencyIndex::from_adts_rate(*rate))
            .ok_or(AdtsError::InvalidSamplingFrequencyIndex(sfi))?;

        let _private = bits.read_bit()?;
        let channel_configuration = bits.read_bits(3)? as u8;
        let _flags = bits.read_bits(4)?;
        let frame_length = bits.read_bits(13)? as u16;

        let header = Self {
            audio_object_type: AudioObjectType::from_adts_profile(profile),
            sampling_frequency_index,
            channel_configuration,
            frame_length,
            crc_present: !protection_absent,
        };

        if (frame_length as usize) < header.header_len() {
            return Err(AdtsError::InvalidFrameLength(frame_length));
        }

        Ok(header)
    }
}

/// Builds the 7-byte ADTS header preceding a payload of `payload_len` bytes.
///
/// `object_type` is the MPEG-4 audio object type (2 for AAC LC).
pub fn build_adts_header(
    payload_len: usize,
    object_type: u16,
    sample_rate: u32,
    channels: u8,
) -> Result<[u8; ADTS_HEADER_LEN], AdtsError> {
    AdtsHeader::new(payload_len, object_type.into(), sample_rate, channels).map(|header| header.to_bytes())
}
