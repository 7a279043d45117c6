//! Audio decoding to interleaved raw PCM.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use tracing::{info, warn};

use crate::error::AppError;
use crate::media::pcm::{self, PcmFormat};
use crate::media::source;
use crate::utils::progress::ProgressReporter;
use crate::utils::{format_bytes, format_duration};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel
    pub frames: u64,
    pub packets_skipped: u64,
    pub bytes_written: u64,
}

/// Decodes the first audio track of `input` into `output`
pub fn decode_audio(input: &Path, output: &Path, format: PcmFormat, show_progress: bool) -> Result<DecodeStats, AppError> {
    let mut reader = source::open_format(input)?;
    let track = source::first_audio_track(reader.as_ref())?;

    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;
    info!(
        track_id = track.id,
        codec = %source::codec_name(track.codec_params.codec),
        format = %format,
        "Decoding audio stream"
    );

    let mut writer = BufWriter::new(File::create(output)?);
    let progress = ProgressReporter::new(show_progress, None, format!("Decoding {}", input.display()));

    let mut stats = DecodeStats::default();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut encoded = Vec::new();

    while let Some(packet) = source::next_packet(reader.as_mut())? {
        if packet.track_id() != track.id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!(error = %msg, "Skipping corrupted audio packet");
                stats.packets_skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        if frames == 0 {
            continue;
        }

        if stats.sample_rate == 0 {
            stats.sample_rate = spec.rate;
            stats.channels = spec.channels.count() as u16;
            info!(
                sample_rate = spec.rate,
                channels = stats.channels,
                format = %format,
                "Output sample format"
            );
        }

        let needed = decoded.capacity() * spec.channels.count();
        if sample_buf.as_ref().is_some_and(|buf| buf.capacity() < needed) {
            sample_buf = None;
        }
        let buf = sample_buf.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
        buf.copy_interleaved_ref(decoded);

        encoded.clear();
        pcm::encode_samples(buf.samples(), format, &mut encoded);
        writer.write_all(&encoded)?;

        stats.frames += frames as u64;
        stats.bytes_written += encoded.len() as u64;
        progress.inc(1);
    }

    writer.flush()?;
    progress.finish(format!("Finished {}", output.display()));

    let duration = if stats.sample_rate > 0 {
        std::time::Duration::from_secs_f64(stats.frames as f64 / f64::from(stats.sample_rate))
    } else {
        std::time::Duration::ZERO
    };
    info!(
        frames = stats.frames,
        duration = %format_duration(duration),
        skipped = stats.packets_skipped,
        size = %format_bytes(stats.bytes_written),
        output = %output.display(),
        "Audio decoding complete"
    );

    Ok(stats)
}
