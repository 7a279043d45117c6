pub mod annexb;
pub mod pcm;
pub mod source;
