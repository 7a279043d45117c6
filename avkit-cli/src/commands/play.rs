//! Raw PCM playback on the default output device.
//!
//! A reader thread decodes the file into `f32` chunks and hands them to the
//! device callback over a bounded channel. The callback never blocks: it
//! plays silence when the channel is momentarily empty.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, Stream, StreamConfig};
use crossbeam::channel::{Receiver, Sender, TryRecvError, bounded};
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::config::PlaybackConfig;
use crate::error::AppError;
use crate::media::pcm;
use crate::utils::format_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    /// The buffer was filled completely
    Playing,
    /// The reader fell behind; the tail of the buffer is silence
    Underrun,
    /// The reader is done and every sample has been handed out
    Finished,
}

/// Callback-side end of the chunk channel
pub struct ChunkDrain {
    receiver: Receiver<Vec<f32>>,
    pending: Vec<f32>,
    pending_pos: usize,
    disconnected: bool,
}

impl ChunkDrain {
    pub fn new(receiver: Receiver<Vec<f32>>) -> Self {
        Self {
            receiver,
            pending: Vec::new(),
            pending_pos: 0,
            disconnected: false,
        }
    }

    /// Fills `out` with queued samples, padding with silence.
    ///
    /// Returns the number of real samples written along with the state.
    pub fn fill(&mut self, out: &mut [f32]) -> (usize, DrainState) {
        let mut written = 0;
        let mut underrun = false;

        while written < out.len() {
            if self.pending_pos < self.pending.len() {
                let take = (self.pending.len() - self.pending_pos).min(out.len() - written);
                out[written..written + take].copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + take]);
                written += take;
                self.pending_pos += take;
                continue;
            }

            if self.disconnected {
                break;
            }

            match self.receiver.try_recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.pending_pos = 0;
                }
                Err(TryRecvError::Empty) => {
                    underrun = true;
                    break;
                }
                Err(TryRecvError::Disconnected) => self.disconnected = true,
            }
        }

        out[written..].fill(0.0);

        let state = if self.disconnected && written == 0 {
            DrainState::Finished
        } else if underrun || written < out.len() {
            DrainState::Underrun
        } else {
            DrainState::Playing
        };
        (written, state)
    }
}

/// Reads `reader` to the end in chunks of `config.chunk_bytes()`, sending the
/// decoded samples. Stops early when the receiving side is gone.
///
/// Returns the number of samples sent.
pub fn pump_samples<R: Read>(mut reader: R, config: &PlaybackConfig, sender: &Sender<Vec<f32>>) -> io::Result<u64> {
    let chunk_bytes = config.chunk_bytes();
    let mut buf = Vec::with_capacity(chunk_bytes);
    let mut sent = 0u64;

    loop {
        buf.clear();
        let len = reader.by_ref().take(chunk_bytes as u64).read_to_end(&mut buf)?;
        if len == 0 {
            break;
        }

        let mut samples = Vec::with_capacity(len / config.format.bytes_per_sample());
        pcm::decode_samples(&buf, config.format, &mut samples);
        let count = samples.len() as u64;

        if !samples.is_empty() {
            if sender.send(samples).is_err() {
                debug!("Output closed, stopping reader");
                break;
            }
            sent += count;
        }

        if len < chunk_bytes {
            break;
        }
    }

    Ok(sent)
}

fn build_stream(
    config: &PlaybackConfig,
    mut drain: ChunkDrain,
    finished: Arc<Notify>,
    samples_played: Arc<AtomicU64>,
) -> Result<Stream, AppError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AppError::Playback("No audio output device found".to_string()))?;

    info!(
        device = device.name().unwrap_or_else(|_| "unknown".to_string()).as_str(),
        "Using audio output device"
    );

    let stream_config = StreamConfig {
        channels: config.channels,
        sample_rate: SampleRate(config.sample_rate),
        buffer_size: BufferSize::Default,
    };

    let mut signalled = false;
    device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let (written, state) = drain.fill(data);
                samples_played.fetch_add(written as u64, Ordering::Relaxed);

                if state == DrainState::Finished && !signalled {
                    signalled = true;
                    finished.notify_one();
                }
            },
            move |err| {
                error!(error = %err, "Audio output stream error");
            },
            None,
        )
        .map_err(|e| AppError::Playback(format!("Failed to build audio stream: {e}")))
}

/// Plays `path` until it ends or Ctrl-C is pressed. Returns the number of
/// samples handed to the device.
pub async fn play(path: &Path, config: PlaybackConfig) -> Result<u64, AppError> {
    config.validate().map_err(AppError::InvalidInput)?;
    info!("{config}");

    let file = File::open(path)?;
    let (sender, receiver) = bounded::<Vec<f32>>(config.buffered_chunks);

    let reader_config = config;
    thread::Builder::new().name("pcm-reader".to_string()).spawn(move || {
        match pump_samples(file, &reader_config, &sender) {
            Ok(sent) => debug!(samples = sent, "PCM reader finished"),
            Err(e) => error!(error = %e, "Failed to read PCM file"),
        }
    })?;

    let finished = Arc::new(Notify::new());
    let samples_played = Arc::new(AtomicU64::new(0));
    let stream = build_stream(&config, ChunkDrain::new(receiver), finished.clone(), samples_played.clone())?;
    stream
        .play()
        .map_err(|e| AppError::Playback(format!("Failed to play audio stream: {e}")))?;

    info!(path = %path.display(), "Playing, press Ctrl-C to stop");

    tokio::select! {
        _ = finished.notified() => info!("Playback finished"),
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Playback interrupted");
        }
    }
    drop(stream);

    let played = samples_played.load(Ordering::Relaxed);
    let frames = played / u64::from(config.channels);
    info!(
        duration = %format_duration(std::time::Duration::from_secs_f64(frames as f64 / f64::from(config.sample_rate))),
        "Played audio"
    );

    Ok(played)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::pcm::PcmFormat;
    use std::io::Cursor;

    #[test]
    fn test_drain_spans_chunks() {
        let (sender, receiver) = bounded(4);
        sender.send(vec![0.1, 0.2, 0.3]).unwrap();
        sender.send(vec![0.4, 0.5]).unwrap();
        let mut drain = ChunkDrain::new(receiver);

        let mut out = [9.0; 4];
        assert_eq!(drain.fill(&mut out), (4, DrainState::Playing));
        assert_eq!(out, [0.1, 0.2, 0.3, 0.4]);

        let mut out = [9.0; 4];
        assert_eq!(drain.fill(&mut out), (1, DrainState::Underrun));
        assert_eq!(out, [0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_drain_finishes_after_disconnect() {
        let (sender, receiver) = bounded(4);
        sender.send(vec![0.25; 3]).unwrap();
        drop(sender);
        let mut drain = ChunkDrain::new(receiver);

        let mut out = [9.0; 2];
        assert_eq!(drain.fill(&mut out), (2, DrainState::Playing));

        // the last real sample still plays before the end is reported
        assert_eq!(drain.fill(&mut out), (1, DrainState::Underrun));
        assert_eq!(out, [0.25, 0.0]);

        assert_eq!(drain.fill(&mut out), (0, DrainState::Finished));
        assert_eq!(out, [0.0, 0.0]);
    }

    #[test]
    fn test_pump_samples_chunks_file() {
        let config = PlaybackConfig {
            channels: 1,
            format: PcmFormat::S16le,
            chunk_frames: 2,
            ..Default::default()
        };
        // 5 samples plus a dangling byte
        let data = Cursor::new(vec![0x00, 0x40, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x40, 0x00, 0x40, 0x7F]);
        let (sender, receiver) = bounded(8);

        let sent = pump_samples(data, &config, &sender).unwrap();
        drop(sender);

        assert_eq!(sent, 5);
        let chunks: Vec<Vec<f32>> = receiver.iter().collect();
        assert_eq!(chunks, vec![vec![0.5, -0.5], vec![0.0, 0.5], vec![0.5]]);
    }

    /// Hands out one byte per read call
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let end = buf.len().min(1);
            self.0.read(&mut buf[..end])
        }
    }

    #[test]
    fn test_pump_samples_fills_chunks_from_short_reads() {
        let config = PlaybackConfig {
            channels: 1,
            format: PcmFormat::S16le,
            chunk_frames: 2,
            ..Default::default()
        };
        let data = Trickle(Cursor::new(vec![0x00, 0x40, 0x00, 0xC0, 0x00, 0x40]));
        let (sender, receiver) = bounded(8);

        assert_eq!(pump_samples(data, &config, &sender).unwrap(), 3);
        drop(sender);

        let chunks: Vec<Vec<f32>> = receiver.iter().collect();
        assert_eq!(chunks, vec![vec![0.5, -0.5], vec![0.5]]);
    }

    #[test]
    fn test_pump_samples_stops_when_output_closed() {
        let config = PlaybackConfig {
            chunk_frames: 1,
            ..Default::default()
        };
        let (sender, receiver) = bounded(1);
        drop(receiver);

        let sent = pump_samples(Cursor::new(vec![0u8; 64]), &config, &sender).unwrap();
        assert_eq!(sent, 0);
    }
}
