//! Core audio/video types shared by the codec parsers and the demuxer.

mod config;
mod packet;
mod timestamp;

pub use config::*;
pub use packet::*;
pub use timestamp::AudioTimestampHelper;

/// Codecs the demuxer knows how to frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecType {
    /// H.264 / AVC in Annex-B byte-stream form
    H264,
    /// AAC carried in ADTS frames
    AAC,
    /// MPEG-1/2/2.5 audio, layers I to III
    MP3,
}

/// The kind of track a [`Packet`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackType {
    /// Audio elementary stream
    Audio,
    /// Video elementary stream
    Video,
}

/// Track id given to the selected video stream.
pub const VIDEO_TRACK_ID: u32 = 1;
/// Track id given to the selected audio stream.
pub const AUDIO_TRACK_ID: u32 = 2;

/// Codec parameters describing one stream.
pub trait CodecData: Send + Sync + std::fmt::Debug {
    /// The codec carried by the stream
    fn codec_type(&self) -> CodecType;
    /// Display width in pixels, for video streams
    fn width(&self) -> Option<u32>;
    /// Display height in pixels, for video streams
    fn height(&self) -> Option<u32>;
    /// Codec-specific initialization bytes, if any
    fn extra_data(&self) -> Option<&[u8]>;
    /// Output sample rate, for audio streams
    fn sample_rate(&self) -> Option<u32> {
        None
    }
}
