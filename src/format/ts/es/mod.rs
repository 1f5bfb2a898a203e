//! Elementary stream parsers.
//!
//! Each parser receives the payload of PES packets together with their
//! timestamps, cuts it into audio frames or video access units and reports
//! them as [`ParserEvent`]s.

mod adapter_video;
mod adts;
mod h264;
mod mpeg1_audio;

pub use adapter_video::EsAdapterVideo;
pub use adts::EsParserAdts;
pub use h264::EsParserH264;
pub use mpeg1_audio::EsParserMpeg1Audio;

use std::collections::VecDeque;

use super::event::ParserEvent;
use super::types::{STREAM_TYPE_AAC, STREAM_TYPE_H264, STREAM_TYPE_MPEG1_AUDIO};
use crate::av::{AudioTimestampHelper, TrackType};
use crate::config::Mp2tConfig;
use crate::error::Result;
use crate::utils::OffsetByteQueue;

/// Presentation and decode timestamps in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingDesc {
    /// Decode timestamp, when the PES header carries one.
    pub dts: Option<i64>,
    /// Presentation timestamp.
    pub pts: Option<i64>,
}

/// Elementary stream bytes plus the PES timestamps anchored in them.
///
/// A timestamp is anchored at the stream offset of the first byte of the
/// PES payload it came with.
#[derive(Debug, Default)]
pub struct EsQueue {
    bytes: OffsetByteQueue,
    timing_desc_list: VecDeque<(i64, TimingDesc)>,
}

impl EsQueue {
    /// An empty queue starting at offset 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a PES payload. Timing is recorded only when a PTS is present.
    pub fn push(&mut self, data: &[u8], pts: Option<i64>, dts: Option<i64>) {
        if pts.is_some() {
            self.timing_desc_list
                .push_back((self.bytes.tail(), TimingDesc { dts, pts }));
        }
        self.bytes.push(data);
    }

    /// Returns the latest timing anchored at or before `es_byte_count`,
    /// dropping every anchor up to it.
    pub fn timing_descriptor(&mut self, es_byte_count: i64) -> TimingDesc {
        let mut timing_desc = TimingDesc::default();
        while let Some(&(offset, desc)) = self.timing_desc_list.front() {
            if offset > es_byte_count {
                break;
            }
            timing_desc = desc;
            self.timing_desc_list.pop_front();
        }
        timing_desc
    }

    /// The buffered elementary stream bytes.
    pub fn bytes(&self) -> &OffsetByteQueue {
        &self.bytes
    }

    /// Mutable access to the buffered bytes, for popping consumed frames.
    pub fn bytes_mut(&mut self) -> &mut OffsetByteQueue {
        &mut self.bytes
    }

    /// Drops all bytes and timing anchors.
    pub fn reset(&mut self) {
        self.bytes.reset();
        self.timing_desc_list.clear();
    }
}

/// The elementary stream parser of a PES PID.
#[derive(Debug)]
pub enum EsParser {
    /// H.264 access units.
    H264(EsParserH264),
    /// AAC in ADTS framing.
    Adts(EsParserAdts),
    /// MPEG-1/2 audio frames.
    Mpeg1Audio(EsParserMpeg1Audio),
}

impl EsParser {
    /// Builds the parser for a PMT stream type, `None` when unsupported.
    pub fn for_stream_type(stream_type: u8, config: &Mp2tConfig) -> Option<Self> {
        match stream_type {
            STREAM_TYPE_H264 => Some(EsParser::H264(EsParserH264::new(config))),
            STREAM_TYPE_AAC => Some(EsParser::Adts(EsParserAdts::new(config.sbr_in_mimetype))),
            STREAM_TYPE_MPEG1_AUDIO => Some(EsParser::Mpeg1Audio(EsParserMpeg1Audio::new())),
            _ => None,
        }
    }

    /// Audio or video.
    pub fn track_type(&self) -> TrackType {
        match self {
            EsParser::H264(_) => TrackType::Video,
            EsParser::Adts(_) | EsParser::Mpeg1Audio(_) => TrackType::Audio,
        }
    }

    /// Feeds one PES payload. Timestamps are in microseconds.
    pub fn parse(
        &mut self,
        data: &[u8],
        pts: Option<i64>,
        dts: Option<i64>,
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        match self {
            EsParser::H264(parser) => parser.parse(data, pts, dts, events),
            EsParser::Adts(parser) => parser.parse(data, pts, dts, events),
            EsParser::Mpeg1Audio(parser) => parser.parse(data, pts, dts, events),
        }
    }

    /// Emits any unit that can be completed from the buffered bytes.
    pub fn flush(&mut self, events: &mut Vec<ParserEvent>) -> Result<()> {
        match self {
            EsParser::H264(parser) => parser.flush(events),
            // Audio frames are emitted as soon as they are complete.
            EsParser::Adts(_) | EsParser::Mpeg1Audio(_) => Ok(()),
        }
    }

    /// Drops all buffered state.
    pub fn reset(&mut self) {
        match self {
            EsParser::H264(parser) => parser.reset(),
            EsParser::Adts(parser) => parser.reset(),
            EsParser::Mpeg1Audio(parser) => parser.reset(),
        }
    }
}

/// Switches `helper` to a new sample rate, keeping the current position as
/// the new base when there is one.
pub(crate) fn restart_timestamp_helper(helper: &mut AudioTimestampHelper, samples_per_second: u32) {
    let current = helper.timestamp();
    *helper = AudioTimestampHelper::new(samples_per_second);
    if let Some(timestamp) = current {
        helper.set_base_timestamp(timestamp);
    }
}
