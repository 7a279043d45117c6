//! AAC elementary stream extraction with ADTS framing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use aac::{ADTS_HEADER_LEN, AdtsError, AdtsHeader, AudioObjectType, PartialAudioSpecificConfig};
use symphonia::core::codecs::{CODEC_TYPE_AAC, CodecParameters};
use tracing::{debug, info, warn};

use crate::config::{AudioExtractConfig, UnsupportedRatePolicy};
use crate::error::AppError;
use crate::media::source;
use crate::utils::format_bytes;
use crate::utils::progress::ProgressReporter;

/// Stream-level values every ADTS header of a track shares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdtsParams {
    pub object_type: AudioObjectType,
    pub sample_rate: u32,
    pub channels: u8,
}

impl AdtsParams {
    /// Reads the AudioSpecificConfig from the codec private data, falling back
    /// to the track's rate and channel count with AAC LC.
    pub fn from_codec_params(params: &CodecParameters) -> Result<Self, AppError> {
        if let Some(extra) = params.extra_data.as_deref() {
            match PartialAudioSpecificConfig::parse(extra) {
                Ok(config) => {
                    return Ok(Self {
                        object_type: config.audio_object_type,
                        sample_rate: config.sampling_frequency,
                        channels: config.channel_configuration,
                    });
                }
                Err(e) => warn!(error = %e, "Unreadable AudioSpecificConfig, using track parameters"),
            }
        }

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| AppError::InvalidInput("audio track has no sample rate".to_string()))?;
        let channels = params
            .channels
            .map(|c| c.count() as u8)
            .ok_or_else(|| AppError::InvalidInput("audio track has no channel layout".to_string()))?;

        Ok(Self {
            object_type: AudioObjectType::AacLowComplexity,
            sample_rate,
            channels,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub packets_written: u64,
    pub packets_skipped: u64,
    pub bytes_written: u64,
}

/// Writes AAC payloads, each behind a freshly built ADTS header
pub struct AdtsStreamWriter<W> {
    writer: W,
    config: AudioExtractConfig,
    params: AdtsParams,
    stats: ExtractStats,
}

impl<W: Write> AdtsStreamWriter<W> {
    pub fn new(writer: W, config: AudioExtractConfig, params: AdtsParams) -> Self {
        Self {
            writer,
            config,
            params,
            stats: ExtractStats::default(),
        }
    }

    /// Emits one payload. Returns `false` when the payload was skipped.
    pub fn write_payload(&mut self, payload: &[u8]) -> Result<bool, AppError> {
        if !self.config.write_adts_header {
            self.writer.write_all(payload)?;
            self.record_written(payload.len());
            return Ok(true);
        }

        let header = match AdtsHeader::new(
            payload.len(),
            self.params.object_type,
            self.params.sample_rate,
            self.params.channels,
        ) {
            Ok(header) => header,
            Err(e @ (AdtsError::UnsupportedSampleRate(_) | AdtsError::FrameTooLong(_))) => {
                return self.reject(e);
            }
            Err(e) => return Err(e.into()),
        };

        header.write_to(&mut self.writer)?;
        self.writer.write_all(payload)?;
        self.record_written(ADTS_HEADER_LEN + payload.len());
        Ok(true)
    }

    pub fn stats(&self) -> ExtractStats {
        self.stats
    }

    /// Flushes and returns the writer with the final counters
    pub fn finish(mut self) -> Result<(W, ExtractStats), AppError> {
        self.writer.flush()?;
        Ok((self.writer, self.stats))
    }

    fn reject(&mut self, error: AdtsError) -> Result<bool, AppError> {
        match self.config.on_unsupported_rate {
            UnsupportedRatePolicy::Abort => Err(error.into()),
            UnsupportedRatePolicy::Skip => {
                if self.stats.packets_skipped == 0 {
                    warn!(error = %error, "Skipping payloads that cannot be ADTS framed");
                } else {
                    debug!(error = %error, "Skipped payload");
                }
                self.stats.packets_skipped += 1;
                Ok(false)
            }
        }
    }

    fn record_written(&mut self, len: usize) {
        self.stats.packets_written += 1;
        self.stats.bytes_written += len as u64;
    }
}

/// Extracts the first audio track of `input` into `output`
pub fn extract_audio(
    input: &Path,
    output: &Path,
    config: AudioExtractConfig,
    show_progress: bool,
) -> Result<ExtractStats, AppError> {
    let mut reader = source::open_format(input)?;
    let track = source::first_audio_track(reader.as_ref())?;

    if track.codec_params.codec != CODEC_TYPE_AAC {
        return Err(AppError::UnsupportedCodec(format!(
            "audio codec {} is not AAC",
            source::codec_name(track.codec_params.codec)
        )));
    }

    let params = AdtsParams::from_codec_params(&track.codec_params)?;
    info!(
        track_id = track.id,
        object_type = params.object_type.as_u16(),
        sample_rate = params.sample_rate,
        channels = params.channels,
        "Extracting AAC stream"
    );
    info!("{config}");

    let file = BufWriter::new(File::create(output)?);
    let mut writer = AdtsStreamWriter::new(file, config, params);
    let progress = ProgressReporter::new(show_progress, None, format!("Extracting {}", input.display()));

    while let Some(packet) = source::next_packet(reader.as_mut())? {
        if packet.track_id() != track.id {
            continue;
        }
        writer.write_payload(packet.buf())?;
        progress.inc(1);
    }

    let (_, stats) = writer.finish()?;
    progress.finish(format!("Finished {}", output.display()));

    info!(
        packets = stats.packets_written,
        skipped = stats.packets_skipped,
        size = %format_bytes(stats.bytes_written),
        output = %output.display(),
        "AAC extraction complete"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::audio::Channels;

    fn lc_stereo(sample_rate: u32) -> AdtsParams {
        AdtsParams {
            object_type: AudioObjectType::AacLowComplexity,
            sample_rate,
            channels: 2,
        }
    }

    #[test]
    fn test_writes_header_before_each_payload() {
        let mut writer = AdtsStreamWriter::new(Vec::new(), AudioExtractConfig::default(), lc_stereo(44100));

        assert!(writer.write_payload(&[0xAA; 100]).unwrap());
        assert!(writer.write_payload(&[0xBB; 3]).unwrap());

        let (out, stats) = writer.finish().unwrap();
        assert_eq!(&out[..7], &[0xFF, 0xF1, 0x50, 0x80, 0x0D, 0x7F, 0xFC]);
        assert_eq!(&out[7..107], &[0xAA; 100]);
        assert_eq!(AdtsHeader::parse(&out[107..]).unwrap().payload_len(), 3);
        assert_eq!(&out[114..], &[0xBB; 3]);
        assert_eq!(
            stats,
            ExtractStats {
                packets_written: 2,
                packets_skipped: 0,
                bytes_written: 117,
            }
        );
    }

    #[test]
    fn test_skip_emits_nothing_for_unsupported_rate() {
        let mut writer = AdtsStreamWriter::new(Vec::new(), AudioExtractConfig::default(), lc_stereo(50000));

        assert!(!writer.write_payload(&[0xAA; 10]).unwrap());
        assert!(!writer.write_payload(&[0xAA; 10]).unwrap());

        let (out, stats) = writer.finish().unwrap();
        assert!(out.is_empty(), "neither header nor payload may be written");
        assert_eq!(stats.packets_skipped, 2);
        assert_eq!(stats.packets_written, 0);
    }

    #[test]
    fn test_abort_on_unsupported_rate() {
        let config = AudioExtractConfig {
            on_unsupported_rate: UnsupportedRatePolicy::Abort,
            ..Default::default()
        };
        let mut writer = AdtsStreamWriter::new(Vec::new(), config, lc_stereo(50000));

        let err = writer.write_payload(&[0xAA; 10]).unwrap_err();
        assert!(matches!(err, AppError::Adts(AdtsError::UnsupportedSampleRate(50000))));
        assert_eq!(writer.stats(), ExtractStats::default());
    }

    #[test]
    fn test_oversized_payload_follows_policy() {
        let mut writer = AdtsStreamWriter::new(Vec::new(), AudioExtractConfig::default(), lc_stereo(48000));

        assert!(!writer.write_payload(&vec![0; 9000]).unwrap());
        assert_eq!(writer.stats().packets_skipped, 1);
    }

    #[test]
    fn test_raw_payloads_without_headers() {
        let config = AudioExtractConfig {
            write_adts_header: false,
            ..Default::default()
        };
        // the rate is never looked up when headers are off
        let mut writer = AdtsStreamWriter::new(Vec::new(), config, lc_stereo(50000));

        writer.write_payload(&[1, 2, 3]).unwrap();
        writer.write_payload(&[4]).unwrap();

        let (out, stats) = writer.finish().unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(stats.bytes_written, 4);
    }

    #[test]
    fn test_params_from_audio_specific_config() {
        let mut codec_params = CodecParameters::new();
        codec_params
            .for_codec(CODEC_TYPE_AAC)
            .with_sample_rate(48000)
            .with_extra_data(vec![0x12u8, 0x10].into_boxed_slice());

        let params = AdtsParams::from_codec_params(&codec_params).unwrap();
        assert_eq!(params, lc_stereo(44100), "the AudioSpecificConfig takes precedence");
    }

    #[test]
    fn test_params_fallback_to_track_values() {
        let mut codec_params = CodecParameters::new();
        codec_params
            .for_codec(CODEC_TYPE_AAC)
            .with_sample_rate(22050)
            .with_channels(Channels::FRONT_LEFT);

        let params = AdtsParams::from_codec_params(&codec_params).unwrap();
        assert_eq!(params.object_type, AudioObjectType::AacLowComplexity);
        assert_eq!(params.sample_rate, 22050);
        assert_eq!(params.channels, 1);
    }

    #[test]
    fn test_params_require_sample_rate() {
        let mut codec_params = CodecParameters::new();
        codec_params.for_codec(CODEC_TYPE_AAC);

        assert!(matches!(
            AdtsParams::from_codec_params(&codec_params),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_extract_rejects_non_aac_track() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tone.wav");
        crate::commands::testing::write_wav(&input, 44100, 2, &[0; 64]);

        let err = extract_audio(&input, &dir.path().join("out.aac"), AudioExtractConfig::default(), false).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedCodec(_)));
        assert!(!dir.path().join("out.aac").exists());
    }

    fn adts_payloads() -> Vec<Vec<u8>> {
        // no byte may look like the start of a sync word
        [24usize, 7, 61]
            .iter()
            .enumerate()
            .map(|(frame, len)| (0..*len).map(|i| ((i + frame * 3) % 0x70) as u8 + 1).collect())
            .collect()
    }

    fn write_adts_file(path: &Path, payloads: &[Vec<u8>]) -> Vec<u8> {
        let mut data = Vec::new();
        for payload in payloads {
            data.extend_from_slice(&aac::build_adts_header(payload.len(), 2, 44100, 2).unwrap());
            data.extend_from_slice(payload);
        }
        std::fs::write(path, &data).unwrap();
        data
    }

    #[test]
    fn test_extract_adts_stream_reframes_identically() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.aac");
        let output = dir.path().join("out.aac");
        let source = write_adts_file(&input, &adts_payloads());

        let stats = extract_audio(&input, &output, AudioExtractConfig::default(), false).unwrap();

        assert_eq!(stats.packets_written, 3);
        assert_eq!(stats.packets_skipped, 0);
        assert_eq!(stats.bytes_written, source.len() as u64);
        assert_eq!(std::fs::read(&output).unwrap(), source);
    }

    #[test]
    fn test_extract_adts_stream_without_headers() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.aac");
        let output = dir.path().join("out.raw");
        let payloads = adts_payloads();
        write_adts_file(&input, &payloads);

        let config = AudioExtractConfig {
            write_adts_header: false,
            ..Default::default()
        };
        let stats = extract_audio(&input, &output, config, false).unwrap();

        assert_eq!(stats.packets_written, 3);
        assert_eq!(std::fs::read(&output).unwrap(), payloads.concat());
    }
}
