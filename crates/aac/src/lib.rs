//! AAC header handling: AudioSpecificConfig parsing and ADTS framing.
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or
//! [Apache-2.0](./LICENSE.Apache-2.0) license. You can choose between one of
//! them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

use std::io;

use bytes_util::BitReader;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

mod adts;
mod error;

pub use adts::{ADTS_HEADER_LEN, ADTS_SAMPLE_RATES, AdtsHeader, MAX_ADTS_PAYLOAD_LEN, build_adts_header};
pub use error::AdtsError;

/// A Partial Audio Specific Config
/// ISO/IEC 14496-3:2019(E) - 1.6
///
/// Only the leading fields are decoded; they are all an ADTS header needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct PartialAudioSpecificConfig {
    /// Audio Object Type
    pub audio_object_type: AudioObjectType,
    /// Sampling Frequency
    pub sampling_frequency: u32,
    /// Channel Configuration
    pub channel_configuration: u8,
}

/// Audio Object Type
/// ISO/IEC 14496-3:2019(E) - 1.5.1.1 (Table 1.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum AudioObjectType {
    /// AAC main
    AacMain,
    /// AAC LC
    AacLowComplexity,
    /// AAC SSR
    AacScalableSampleRate,
    /// AAC LTP
    AacLongTermPrediction,
    /// SBR (HE-AAC)
    SpectralBandReplication,
    /// PS (HE-AAC v2)
    ParametricStereo,
    /// Any other object type
    Unknown(u16),
}

impl AudioObjectType {
    /// Converts an AudioObjectType to a u16
    pub const fn as_u16(&self) -> u16 {
        match self {
            AudioObjectType::AacMain => 1,
            AudioObjectType::AacLowComplexity => 2,
            AudioObjectType::AacScalableSampleRate => 3,
            AudioObjectType::AacLongTermPrediction => 4,
            AudioObjectType::SpectralBandReplication => 5,
            AudioObjectType::ParametricStereo => 29,
            AudioObjectType::Unknown(value) => *value,
        }
    }

    /// Converts a u16 to an AudioObjectType
    pub const fn from_u16(value: u16) -> Self {
        match value {
            1 => AudioObjectType::AacMain,
            2 => AudioObjectType::AacLowComplexity,
            3 => AudioObjectType::AacScalableSampleRate,
            4 => AudioObjectType::AacLongTermPrediction,
            5 => AudioObjectType::SpectralBandReplication,
            29 => AudioObjectType::ParametricStereo,
            _ => AudioObjectType::Unknown(value),
        }
    }

    /// The 2-bit `profile` field of an ADTS header.
    ///
    /// ADTS stores the object type minus one. SBR and PS streams are carried
    /// as AAC LC with implicit signalling.
    pub const fn adts_profile(&self) -> u8 {
        match self {
            AudioObjectType::SpectralBandReplication | AudioObjectType::ParametricStereo => 1,
            other => (other.as_u16().wrapping_sub(1) & 0x03) as u8,
        }
    }

    /// The object type signalled by a 2-bit ADTS profile
    pub const fn from_adts_profile(profile: u8) -> Self {
        Self::from_u16((profile & 0x03) as u16 + 1)
    }
}

impl From<u16> for AudioObjectType {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

impl From<AudioObjectType> for u16 {
    fn from(value: AudioObjectType) -> Self {
        value.as_u16()
    }
}

/// Sampling Frequency Index
///
/// The purpose of the FrequencyIndex is to encode commonly used frequencies in
/// 4 bits to save space. These are the set of commonly used frequencies defined
/// in the specification.
///
/// ISO/IEC 14496-3:2019(E) - 1.6.2.4 (Table 1.22)
#[derive(FromPrimitive, Debug, Clone, PartialEq, Copy, Eq, PartialOrd, Ord)]
#[repr(u8)]
#[must_use]
pub enum SampleFrequencyIndex {
    /// 96000 Hz
    Freq96000 = 0x0,
    /// 88200 Hz
    Freq88200 = 0x1,
    /// 64000 Hz
    Freq64000 = 0x2,
    /// 48000 Hz
    Freq48000 = 0x3,
    /// 44100 Hz
    Freq44100 = 0x4,
    /// 32000 Hz
    Freq32000 = 0x5,
    /// 24000 Hz
    Freq24000 = 0x6,
    /// 22050 Hz
    Freq22050 = 0x7,
    /// 16000 Hz
    Freq16000 = 0x8,
    /// 12000 Hz
    Freq12000 = 0x9,
    /// 11025 Hz
    Freq11025 = 0xA,
    /// 8000 Hz
    Freq8000 = 0xB,
    /// 7350 Hz
    Freq7350 = 0xC,
    /// Reserved
    FreqReserved = 0xD,
    /// Reserved
    FreqReserved2 = 0xE,
    /// Escape (Meaning the frequency is not in the table, and we need to read
    /// an additional 24 bits to get the frequency)
    FreqEscape = 0xF,
}

impl SampleFrequencyIndex {
    /// The frequency in Hz, `None` for the reserved and escape values
    pub fn to_freq(&self) -> Option<u32> {
        match self {
            SampleFrequencyIndex::Freq7350 => Some(7350),
            other => ADTS_SAMPLE_RATES.get(other.as_u8() as usize).copied(),
        }
    }

    /// Looks up `rate` in the 12-entry ADTS rate table.
    ///
    /// Returns `None` for any rate outside [`ADTS_SAMPLE_RATES`], 7350 Hz
    /// included.
    pub fn from_adts_rate(rate: u32) -> Option<Self> {
        ADTS_SAMPLE_RATES
            .iter()
            .position(|&candidate| candidate == rate)
            .and_then(|index| Self::from_u8(index as u8))
    }

    /// The raw 4-bit value
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl PartialAudioSpecificConfig {
    /// Parse the Audio Specific Config from given bytes
    /// The implementation is based on ISO/IEC 14496-3:2019(E) - 1.6.2.1 (Table
    /// 1.19) This does not parse the entire AAC Data, it only parses the
    /// top few fields.
    /// - Audio Object Type
    /// - Sampling Frequency
    /// - Channel Configuration
    pub fn parse(data: &[u8]) -> io::Result<Self> {
        let mut bitreader = BitReader::new_from_slice(data);

        // GetAudioObjectType() # ISO/IEC 14496-3:2019(E) - 1.6.2.1 (Table 1.20)
        let mut audio_object_type = bitreader.read_bits(5)? as u16;
        if audio_object_type == 31 {
            audio_object_type = 32 + bitreader.read_bits(6)? as u16;
        }

        let sampling_frequency_index = SampleFrequencyIndex::from_u8(bitreader.read_bits(4)? as u8)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Invalid sampling frequency index"))?;

        let sampling_frequency = match sampling_frequency_index {
            // explicit 24-bit frequency
            SampleFrequencyIndex::FreqEscape => bitreader.read_bits(24)? as u32,
            _ => sampling_frequency_index
                .to_freq()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Invalid sampling frequency index"))?,
        };

        let channel_configuration = bitreader.read_bits(4)? as u8;

        Ok(Self {
            audio_object_type: audio_object_type.into(),
            sampling_frequency,
            channel_configuration,
        })
    }

    /// Builds the ADTS header for a payload described by this config
    pub fn adts_header(&self, payload_len: usize) -> Result<AdtsHeader, AdtsError> {
        AdtsHeader::new(
            payload_len,
            self.audio_object_type,
            self.sampling_frequency,
            self.channel_configuration,
        )
    }
}
