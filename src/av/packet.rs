use bytes::Bytes;
use std::time::Duration;

use super::TrackType;

/// A coded audio frame or video access unit.
///
/// Timestamps are in microseconds on the unrolled stream timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Frame bytes. H.264 access units keep their Annex B start codes.
    pub data: Bytes,
    /// Presentation timestamp.
    pub pts: Option<i64>,
    /// Decode timestamp.
    pub dts: Option<i64>,
    /// Audio or video.
    pub track_type: TrackType,
    /// [`AUDIO_TRACK_ID`](super::AUDIO_TRACK_ID) or [`VIDEO_TRACK_ID`](super::VIDEO_TRACK_ID).
    pub track_id: u32,
    /// Decodable on its own. Always set for audio.
    pub is_key: bool,
    /// Frame duration, when known.
    pub duration: Option<Duration>,
}

impl Packet {
    /// A packet without timestamps or duration.
    pub fn new(data: impl Into<Bytes>, track_type: TrackType, track_id: u32) -> Self {
        Self {
            data: data.into(),
            pts: None,
            dts: None,
            track_type,
            track_id,
            is_key: false,
            duration: None,
        }
    }

    /// Sets the presentation timestamp.
    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = Some(pts);
        self
    }

    /// Sets the decode timestamp.
    pub fn with_dts(mut self, dts: i64) -> Self {
        self.dts = Some(dts);
        self
    }

    /// Sets the key frame flag.
    pub fn with_key_flag(mut self, is_key: bool) -> Self {
        self.is_key = is_key;
        self
    }

    /// Sets the frame duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// True for audio packets.
    pub fn is_audio(&self) -> bool {
        self.track_type == TrackType::Audio
    }

    /// True for video packets.
    pub fn is_video(&self) -> bool {
        self.track_type == TrackType::Video
    }
}
