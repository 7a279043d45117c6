//! Opening media files through Symphonia.

use std::fs::File;
use std::path::Path;

use symphonia::core::codecs::{CODEC_TYPE_NULL, CodecType};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet, Track};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::AppError;

/// Probes `path` and returns the demuxer for it
pub fn open_format(path: &Path) -> Result<Box<dyn FormatReader>, AppError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    debug!(path = %path.display(), tracks = probed.format.tracks().len(), "Probed media file");
    Ok(probed.format)
}

/// The default audio track, or the first track with a known codec
pub fn first_audio_track(reader: &dyn FormatReader) -> Result<Track, AppError> {
    reader
        .default_track()
        .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .or_else(|| reader.tracks().iter().find(|t| t.codec_params.codec != CODEC_TYPE_NULL))
        .cloned()
        .ok_or(AppError::StreamNotFound("audio"))
}

/// Reads the next packet, mapping end of stream to `None`
pub fn next_packet(reader: &mut dyn FormatReader) -> Result<Option<Packet>, AppError> {
    match reader.next_packet() {
        Ok(packet) => Ok(Some(packet)),
        Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Short codec name as registered with Symphonia, e.g. `aac`
pub fn codec_name(codec: CodecType) -> String {
    symphonia::default::get_codecs()
        .get_codec(codec)
        .map(|descriptor| descriptor.short_name.to_string())
        .unwrap_or_else(|| format!("{codec:?}"))
}
