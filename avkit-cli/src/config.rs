use std::fmt;

use clap::ValueEnum;

use crate::media::pcm::PcmFormat;

/// Handling of payloads whose stream sample rate has no ADTS index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum UnsupportedRatePolicy {
    /// Drop the payload, header and data alike, and keep going
    #[default]
    Skip,
    /// Stop the extraction with an error
    Abort,
}

/// Configuration for AAC elementary stream extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioExtractConfig {
    /// Prefix every payload with an ADTS header
    pub write_adts_header: bool,

    /// Applies only while headers are enabled
    pub on_unsupported_rate: UnsupportedRatePolicy,
}

impl Default for AudioExtractConfig {
    fn default() -> Self {
        Self {
            write_adts_header: true,
            on_unsupported_rate: UnsupportedRatePolicy::Skip,
        }
    }
}

impl fmt::Display for AudioExtractConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Audio extraction: adts_header={}, on_unsupported_rate={:?}",
            self.write_adts_header, self.on_unsupported_rate
        )
    }
}

/// Configuration for raw PCM playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: PcmFormat,

    /// Frames per chunk handed from the reader thread to the device
    pub chunk_frames: usize,

    /// Chunks buffered between the reader thread and the device
    pub buffered_chunks: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            format: PcmFormat::S16le,
            chunk_frames: 4096,
            buffered_chunks: 16,
        }
    }
}

impl PlaybackConfig {
    /// Bytes of file data per chunk
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_frames * self.channels as usize * self.format.bytes_per_sample()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be greater than zero".to_string());
        }
        if self.channels == 0 {
            return Err("channel count must be greater than zero".to_string());
        }
        if self.chunk_frames == 0 || self.buffered_chunks == 0 {
            return Err("chunk sizes must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for PlaybackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Playback: {} Hz, {} channel(s), {}",
            self.sample_rate, self.channels, self.format
        )
    }
}
