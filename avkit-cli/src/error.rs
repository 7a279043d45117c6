use thiserror::Error;

use crate::media::annexb::NalError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Media error: {0}")]
    Media(#[from] symphonia::core::errors::Error),

    #[error("MP4 error: {0}")]
    Mp4(#[from] mp4::Error),

    #[error("ADTS error: {0}")]
    Adts(#[from] aac::AdtsError),

    #[error("Malformed sample: {0}")]
    Nal(#[from] NalError),

    #[error("No {0} stream found")]
    StreamNotFound(&'static str),

    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Audio output error: {0}")]
    Playback(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
