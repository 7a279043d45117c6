//! Interleaved raw PCM sample encoding.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use clap::ValueEnum;
use symphonia::core::conv::FromSample;

/// Sample layout of a raw PCM file
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PcmFormat {
    /// Signed 16-bit little endian
    S16le,
    /// 32-bit float little endian
    F32le,
}

impl PcmFormat {
    pub const fn bytes_per_sample(&self) -> usize {
        match self {
            PcmFormat::S16le => 2,
            PcmFormat::F32le => 4,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            PcmFormat::S16le => "s16le",
            PcmFormat::F32le => "f32le",
        }
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Appends `samples` to `out` in `format`.
///
/// 16-bit output uses the same scale Symphonia decodes 16-bit sources with,
/// so those samples are written back unchanged. Out-of-range floats saturate.
pub fn encode_samples(samples: &[f32], format: PcmFormat, out: &mut Vec<u8>) {
    let start = out.len();
    out.resize(start + samples.len() * format.bytes_per_sample(), 0);
    let dst = &mut out[start..];

    match format {
        PcmFormat::F32le => LittleEndian::write_f32_into(samples, dst),
        PcmFormat::S16le => {
            let converted: Vec<i16> = samples.iter().map(|s| i16::from_sample(*s)).collect();
            LittleEndian::write_i16_into(&converted, dst);
        }
    }
}

/// Appends the samples encoded in `bytes` to `out` as `f32`.
///
/// A trailing partial sample is ignored; the number of bytes consumed is
/// returned.
pub fn decode_samples(bytes: &[u8], format: PcmFormat, out: &mut Vec<f32>) -> usize {
    let width = format.bytes_per_sample();
    let count = bytes.len() / width;

    out.reserve(count);
    for sample in bytes[..count * width].chunks_exact(width) {
        let value = match format {
            PcmFormat::S16le => f32::from_sample(LittleEndian::read_i16(sample)),
            PcmFormat::F32le => LittleEndian::read_f32(sample),
        };
        out.push(value);
    }

    count * width
}
