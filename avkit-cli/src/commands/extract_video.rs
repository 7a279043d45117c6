//! H.264 elementary stream extraction from MP4.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use bytes::Bytes;
use mp4::{MediaType, Mp4Reader, Mp4Track, TrackType};
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::media::annexb::{self, ParameterSets};
use crate::utils::format_bytes;
use crate::utils::progress::ProgressReporter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoExtractStats {
    pub samples: u64,
    pub sync_samples: u64,
    pub bytes_written: u64,
}

/// `avcC` values needed to rewrite samples
#[derive(Debug, Clone)]
struct AvcConfig {
    length_size: usize,
    parameter_sets: ParameterSets,
}

impl AvcConfig {
    fn from_track(track: &Mp4Track) -> Result<Self, AppError> {
        let avc1 = track
            .trak
            .mdia
            .minf
            .stbl
            .stsd
            .avc1
            .as_ref()
            .ok_or_else(|| AppError::InvalidInput("H.264 track has no avc1 sample entry".to_string()))?;
        let avcc = &avc1.avcc;

        Ok(Self {
            length_size: usize::from(avcc.length_size_minus_one & 0x03) + 1,
            parameter_sets: ParameterSets {
                sps: avcc
                    .sequence_parameter_sets
                    .iter()
                    .map(|nal| Bytes::from(nal.bytes.clone()))
                    .collect(),
                pps: avcc
                    .picture_parameter_sets
                    .iter()
                    .map(|nal| Bytes::from(nal.bytes.clone()))
                    .collect(),
            },
        })
    }
}

/// Lowest-numbered video track
fn find_video_track<R: Read + Seek>(mp4: &Mp4Reader<R>) -> Result<&Mp4Track, AppError> {
    mp4.tracks()
        .values()
        .filter(|track| matches!(track.track_type(), Ok(TrackType::Video)))
        .min_by_key(|track| track.track_id())
        .ok_or(AppError::StreamNotFound("video"))
}

/// Extracts the first H.264 track of `input` into `output` as Annex-B
pub fn extract_video(input: &Path, output: &Path, show_progress: bool) -> Result<VideoExtractStats, AppError> {
    let file = File::open(input)?;
    let size = file.metadata()?.len();
    let mut mp4 = Mp4Reader::read_header(BufReader::new(file), size)?;

    let (track_id, sample_count, config) = {
        let track = find_video_track(&mp4)?;
        let media_type = track.media_type()?;
        if !matches!(media_type, MediaType::H264) {
            return Err(AppError::UnsupportedCodec(format!("video codec {media_type:?} is not H.264")));
        }

        info!(
            track_id = track.track_id(),
            width = track.width(),
            height = track.height(),
            samples = track.sample_count(),
            "Extracting H.264 stream"
        );
        (track.track_id(), track.sample_count(), AvcConfig::from_track(track)?)
    };
    if config.parameter_sets.is_empty() {
        warn!("avcC carries no SPS/PPS, output may not be decodable on its own");
    }

    let mut writer = BufWriter::new(File::create(output)?);
    let progress = ProgressReporter::new(
        show_progress,
        Some(u64::from(sample_count)),
        format!("Extracting {}", input.display()),
    );

    let stats = write_annexb(&mut mp4, track_id, sample_count, &config, &mut writer, &progress)?;
    writer.flush()?;
    progress.finish(format!("Finished {}", output.display()));

    info!(
        samples = stats.samples,
        sync_samples = stats.sync_samples,
        size = %format_bytes(stats.bytes_written),
        output = %output.display(),
        "H.264 extraction complete"
    );

    Ok(stats)
}

fn write_annexb<R: Read + Seek, W: Write>(
    mp4: &mut Mp4Reader<R>,
    track_id: u32,
    sample_count: u32,
    config: &AvcConfig,
    mut writer: W,
    progress: &ProgressReporter,
) -> Result<VideoExtractStats, AppError> {
    let mut stats = VideoExtractStats::default();
    let mut wrote_parameter_sets = false;

    // sample ids are 1-based
    for sample_id in 1..=sample_count {
        let Some(sample) = mp4.read_sample(track_id, sample_id)? else {
            debug!(sample_id, "Missing sample");
            continue;
        };

        // SPS/PPS precede every keyframe
        if sample.is_sync || !wrote_parameter_sets {
            stats.bytes_written += config.parameter_sets.write_to(&mut writer)? as u64;
            wrote_parameter_sets = true;
        }

        stats.bytes_written += annexb::write_sample(&sample.bytes, config.length_size, &mut writer)? as u64;
        stats.samples += 1;
        if sample.is_sync {
            stats.sync_samples += 1;
        }
        progress.inc(1);
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{self, aac_conf, avc_conf, build_mp4};

    #[test]
    fn test_extract_h264_to_annexb() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        let output = dir.path().join("out.h264");

        let keyframe: &[u8] = &[0x00, 0x00, 0x00, 0x02, 0x65, 0x88, 0x00, 0x00, 0x00, 0x01, 0x06];
        let next: &[u8] = &[0x00, 0x00, 0x00, 0x02, 0x65, 0x99];
        std::fs::write(&input, build_mp4(TrackType::Video, avc_conf(), &[(keyframe, true), (next, true)])).unwrap();

        let stats = extract_video(&input, &output, false).unwrap();
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.sync_samples, 2);

        let mut expected = Vec::new();
        // the keyframe's second length prefix becomes a start code in place
        for sample in [&[0x65, 0x88, 0x00, 0x00, 0x00, 0x01, 0x06][..], &[0x65, 0x99][..]] {
            expected.extend_from_slice(&annexb::START_CODE);
            expected.extend_from_slice(&testing::SPS);
            expected.extend_from_slice(&annexb::START_CODE);
            expected.extend_from_slice(&testing::PPS);
            expected.extend_from_slice(&annexb::START_CODE);
            expected.extend_from_slice(sample);
        }

        let written = std::fs::read(&output).unwrap();
        assert_eq!(written.len() as u64, stats.bytes_written);
        assert_eq!(written, expected);
    }

    #[test]
    fn test_extract_without_video_track() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("audio.mp4");
        std::fs::write(&input, build_mp4(TrackType::Audio, aac_conf(), &[(&[0x21, 0x00], true)])).unwrap();

        let err = extract_video(&input, &dir.path().join("out.h264"), false).unwrap_err();
        assert!(matches!(err, AppError::StreamNotFound("video")));
    }
}
