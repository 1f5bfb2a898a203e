//! Elementary stream bitstream primitives.

pub mod aac;
pub mod h264;
pub mod mpeg_audio;

// Re-export common types and functions
pub use aac::{parse_adts_header, ADTSHeader};
pub use h264::{H264Parser, NALUnit};
pub use mpeg_audio::{parse_mpeg_audio_header, MpegAudioHeader};
