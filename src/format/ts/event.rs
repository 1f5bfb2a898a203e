use crate::av::{AudioDecoderConfig, Packet, VideoDecoderConfig};

/// Output of the section and elementary stream parsers.
///
/// Parsers push events into a `Vec` owned by the caller. The stream parser
/// drains it after each TS packet, so registrations can change the PID map
/// without a parser holding a reference into it.
#[derive(Debug, Clone, PartialEq)]
pub enum ParserEvent {
    /// The PAT announced the program map table of a program.
    RegisterPmt {
        /// Non-zero program number.
        program_number: u16,
        /// PID carrying the program's PMT.
        pmt_pid: u16,
    },
    /// The PMT announced an elementary stream.
    RegisterPes {
        /// PID of the elementary stream.
        pes_pid: u16,
        /// PMT stream type, such as [`STREAM_TYPE_H264`](super::types::STREAM_TYPE_H264).
        stream_type: u8,
    },
    /// An audio parser found a new decoder configuration.
    AudioConfig(AudioDecoderConfig),
    /// A video parser found a new decoder configuration.
    VideoConfig(VideoDecoderConfig),
    /// A complete audio frame or video access unit.
    Buffer(Packet),
}
