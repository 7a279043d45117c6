//! Container and stream metadata.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

use mp4::{Mp4Reader, Mp4Track, TrackType};
use serde::Serialize;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::Track;
use tracing::debug;

use crate::cli::InfoFormat;
use crate::error::AppError;
use crate::media::source;
use crate::utils::format_duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaSummary {
    pub path: String,
    /// Major brand for MP4 inputs, file extension otherwise
    pub container: String,
    pub duration_ms: Option<u64>,
    pub streams: Vec<StreamSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StreamSummary {
    Video {
        track_id: u32,
        codec: String,
        width: u16,
        height: u16,
        /// Bits per second
        bitrate: u32,
        frame_rate: f64,
    },
    Audio {
        track_id: u32,
        codec: String,
        channels: Option<u16>,
        sample_rate: Option<u32>,
        bitrate: Option<u32>,
    },
    Other {
        track_id: u32,
        codec: String,
    },
}

/// `ftyp` as the first box marks the ISO base media family
fn is_mp4(path: &Path) -> Result<bool, AppError> {
    let mut head = Vec::with_capacity(8);
    File::open(path)?.take(8).read_to_end(&mut head)?;
    Ok(head.len() == 8 && &head[4..8] == b"ftyp")
}

/// Reads the metadata of `path`
pub fn probe(path: &Path) -> Result<MediaSummary, AppError> {
    if is_mp4(path)? {
        debug!(path = %path.display(), "Reading MP4 header");
        probe_mp4(path)
    } else {
        probe_symphonia(path)
    }
}

fn probe_mp4(path: &Path) -> Result<MediaSummary, AppError> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let mp4 = Mp4Reader::read_header(BufReader::new(file), size)?;

    let mut tracks: Vec<&Mp4Track> = mp4.tracks().values().collect();
    tracks.sort_by_key(|track| track.track_id());

    let streams = tracks.into_iter().map(mp4_stream).collect();

    Ok(MediaSummary {
        path: path.display().to_string(),
        container: mp4.major_brand().to_string(),
        duration_ms: Some(mp4.duration().as_millis() as u64),
        streams,
    })
}

fn mp4_stream(track: &Mp4Track) -> StreamSummary {
    let track_id = track.track_id();
    let codec = match track.media_type() {
        Ok(media_type) => media_type.to_string(),
        Err(_) => track.box_type().map(|b| b.to_string()).unwrap_or_else(|_| "unknown".to_string()),
    };

    match track.track_type() {
        Ok(TrackType::Video) => StreamSummary::Video {
            track_id,
            codec,
            width: track.width(),
            height: track.height(),
            bitrate: track.bitrate(),
            frame_rate: track.frame_rate(),
        },
        Ok(TrackType::Audio) => StreamSummary::Audio {
            track_id,
            codec,
            channels: track.channel_config().ok().map(|c| c as u16),
            sample_rate: track.sample_freq_index().ok().map(|f| f.freq()),
            bitrate: Some(track.bitrate()),
        },
        _ => StreamSummary::Other { track_id, codec },
    }
}

fn probe_symphonia(path: &Path) -> Result<MediaSummary, AppError> {
    let reader = source::open_format(path)?;

    let duration_ms = reader
        .tracks()
        .iter()
        .filter_map(|track| match (track.codec_params.n_frames, track.codec_params.sample_rate) {
            (Some(frames), Some(rate @ 1..)) => Some(frames * 1000 / u64::from(rate)),
            _ => None,
        })
        .max();
    let streams = reader.tracks().iter().map(symphonia_stream).collect();

    let container = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "unknown".to_string());

    Ok(MediaSummary {
        path: path.display().to_string(),
        container,
        duration_ms,
        streams,
    })
}

/// Symphonia only exposes codec parameters for audio; tracks it has no
/// decoder mapping for are listed without details.
fn symphonia_stream(track: &Track) -> StreamSummary {
    let params = &track.codec_params;
    if params.codec == CODEC_TYPE_NULL {
        return StreamSummary::Other {
            track_id: track.id,
            codec: "unknown".to_string(),
        };
    }

    StreamSummary::Audio {
        track_id: track.id,
        codec: source::codec_name(params.codec),
        channels: params.channels.map(|c| c.count() as u16),
        sample_rate: params.sample_rate,
        bitrate: None,
    }
}

/// Renders a summary for stdout
pub fn format_summary(summary: &MediaSummary, format: InfoFormat) -> Result<String, AppError> {
    match format {
        InfoFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
        InfoFormat::Pretty => Ok(format_pretty(summary)),
    }
}

fn format_pretty(summary: &MediaSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("Input: {}\n", summary.path));
    output.push_str(&format!("  Container: {}\n", summary.container));
    if let Some(ms) = summary.duration_ms {
        output.push_str(&format!("  Duration: {}\n", format_duration(Duration::from_millis(ms))));
    }

    for stream in &summary.streams {
        match stream {
            StreamSummary::Video {
                track_id,
                codec,
                width,
                height,
                bitrate,
                frame_rate,
            } => {
                output.push_str(&format!("Stream #{track_id} (video)\n"));
                output.push_str(&format!("  Video Codec: {codec}\n"));
                output.push_str(&format!("  Resolution: {width}x{height}\n"));
                output.push_str(&format!("  Bitrate: {} kb/s\n", bitrate / 1000));
                if *frame_rate > 0.0 {
                    output.push_str(&format!("  Frame Rate: {frame_rate:.2} fps\n"));
                }
            }
            StreamSummary::Audio {
                track_id,
                codec,
                channels,
                sample_rate,
                bitrate,
            } => {
                output.push_str(&format!("Stream #{track_id} (audio)\n"));
                output.push_str(&format!("  Audio Codec: {codec}\n"));
                if let Some(channels) = channels {
                    output.push_str(&format!("  Channels: {channels}\n"));
                }
                if let Some(rate) = sample_rate {
                    output.push_str(&format!("  Sample Rate: {rate} Hz\n"));
                }
                if let Some(bitrate) = bitrate {
                    output.push_str(&format!("  Bitrate: {} kb/s\n", bitrate / 1000));
                }
            }
            StreamSummary::Other { track_id, codec } => {
                output.push_str(&format!("Stream #{track_id} ({codec})\n"));
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{aac_conf, avc_conf, build_mp4, write_wav};
    use symphonia::core::codecs::{CODEC_TYPE_PCM_S16LE, CodecParameters};

    #[test]
    fn test_probe_wav() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tone.wav");
        write_wav(&input, 8000, 2, &vec![0i16; 2000]);

        let summary = probe(&input).unwrap();
        assert_eq!(summary.container, "wav");
        assert_eq!(summary.duration_ms, Some(125));
        assert_eq!(summary.streams.len(), 1);

        match &summary.streams[0] {
            StreamSummary::Audio {
                codec,
                channels,
                sample_rate,
                ..
            } => {
                assert_eq!(codec, "pcm_s16le");
                assert_eq!(*channels, Some(2));
                assert_eq!(*sample_rate, Some(8000));
            }
            other => panic!("expected an audio stream, got {other:?}"),
        }

        let text = format_summary(&summary, InfoFormat::Pretty).unwrap();
        assert!(text.contains("Audio Codec: pcm_s16le"));
        assert!(text.contains("Channels: 2"));
        assert!(text.contains("Sample Rate: 8000 Hz"));
    }

    #[test]
    fn test_probe_mp4_video() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, build_mp4(TrackType::Video, avc_conf(), &[(&[0, 0, 0, 1, 0x65], true)])).unwrap();

        let summary = probe(&input).unwrap();
        assert_eq!(summary.container, "isom");
        assert_eq!(summary.streams.len(), 1);
        assert!(matches!(
            &summary.streams[0],
            StreamSummary::Video { track_id: 1, width: 320, height: 240, .. }
        ));

        let text = format_summary(&summary, InfoFormat::Pretty).unwrap();
        assert!(text.contains("Resolution: 320x240"));
        assert!(text.contains("Video Codec: "));
    }

    #[test]
    fn test_probe_mp4_audio_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sound.m4a");
        std::fs::write(&input, build_mp4(TrackType::Audio, aac_conf(), &[(&[0x21, 0x00], true)])).unwrap();

        let summary = probe(&input).unwrap();
        let json: serde_json::Value = serde_json::from_str(&format_summary(&summary, InfoFormat::Json).unwrap()).unwrap();

        let stream = &json["streams"][0];
        assert_eq!(stream["kind"], "audio");
        assert_eq!(stream["channels"], 2);
        assert_eq!(stream["sample_rate"], 44100);
    }

    #[test]
    fn test_probe_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("noise.bin");
        std::fs::write(&input, [0x42u8; 256]).unwrap();

        assert!(matches!(probe(&input), Err(AppError::Media(_))));
    }

    #[test]
    fn test_probe_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(probe(&dir.path().join("gone.mp4")), Err(AppError::Io(_))));
    }

    #[test]
    fn test_symphonia_track_without_codec() {
        let summary = symphonia_stream(&Track::new(3, CodecParameters::new()));
        assert_eq!(
            summary,
            StreamSummary::Other {
                track_id: 3,
                codec: "unknown".to_string(),
            }
        );

        let mut params = CodecParameters::new();
        params.for_codec(CODEC_TYPE_PCM_S16LE).with_sample_rate(48000);
        assert!(matches!(
            symphonia_stream(&Track::new(1, params)),
            StreamSummary::Audio {
                track_id: 1,
                sample_rate: Some(48000),
                ..
            }
        ));
    }

    #[test]
    fn test_short_file_is_not_mp4() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("short.mp4");
        std::fs::write(&input, b"\0\0\0\x18ftu").unwrap();
        assert!(!is_mp4(&input).unwrap());

        std::fs::write(&input, b"\0\0\0\x18ftypisom").unwrap();
        assert!(is_mp4(&input).unwrap());
    }
}
