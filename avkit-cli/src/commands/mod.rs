pub mod decode_audio;
pub mod extract_audio;
pub mod extract_video;
pub mod info;
pub mod play;
