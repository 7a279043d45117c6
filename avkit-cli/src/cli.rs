use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::UnsupportedRatePolicy;
use crate::media::pcm::PcmFormat;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    author = "hua0512 <https://github.com/hua0512>",
    version,
    about = "Media elementary stream toolkit",
    long_about = "Inspect media files, extract AAC (ADTS) and H.264 (Annex-B) elementary\n\
                  streams, decode audio to raw PCM and play raw PCM on the default output device."
)]
pub struct CliArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Mirror log output into a file
    #[arg(long, global = true, value_name = "PATH", help = "Also write log output to this file")]
    pub log_file: Option<PathBuf>,

    /// Show progress bars for operations
    #[arg(
        short = 'P',
        long = "progress",
        global = true,
        default_value = "false",
        help = "Show progress bars while extracting or decoding"
    )]
    pub show_progress: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print container and stream metadata
    Info {
        #[arg(help = "Media file to inspect")]
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = InfoFormat::Pretty, help = "Output format")]
        format: InfoFormat,
    },

    /// Extract the AAC audio stream, framed with ADTS headers
    ExtractAudio {
        #[arg(help = "Input media file (MP4, MKV, ...)")]
        input: PathBuf,

        #[arg(help = "Output .aac file")]
        output: PathBuf,

        #[arg(long, help = "Write raw AAC payloads without ADTS headers")]
        no_adts: bool,

        #[arg(
            long,
            value_enum,
            default_value_t = UnsupportedRatePolicy::Skip,
            help = "What to do with payloads whose sample rate has no ADTS index"
        )]
        on_unsupported_rate: UnsupportedRatePolicy,
    },

    /// Extract the H.264 video stream as Annex-B
    ExtractVideo {
        #[arg(help = "Input MP4 file")]
        input: PathBuf,

        #[arg(help = "Output .h264 file")]
        output: PathBuf,
    },

    /// Decode the first audio stream to interleaved raw PCM
    DecodeAudio {
        #[arg(help = "Input audio or media file")]
        input: PathBuf,

        #[arg(help = "Output .pcm file")]
        output: PathBuf,

        #[arg(long, value_enum, default_value_t = PcmFormat::F32le, help = "Output sample format")]
        format: PcmFormat,
    },

    /// Play an interleaved raw PCM file
    Play {
        #[arg(help = "Raw PCM file")]
        input: PathBuf,

        #[arg(long, default_value = "44100", help = "Sample rate in Hz")]
        sample_rate: u32,

        #[arg(long, default_value = "2", help = "Number of interleaved channels")]
        channels: u16,

        #[arg(long, value_enum, default_value_t = PcmFormat::S16le, help = "Sample format of the file")]
        format: PcmFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InfoFormat {
    Pretty,
    Json,
}
