use std::time::Duration;

use crate::format::ts::types::TS_PACKET_SIZE;

/// Tunables shared by [`Mp2tStreamParser`](crate::format::ts::Mp2tStreamParser)
/// and [`TSDemuxer`](crate::format::ts::TSDemuxer).
///
/// ```
/// use mp2t::Mp2tConfig;
/// use std::time::Duration;
///
/// let config = Mp2tConfig::default()
///     .with_sbr_in_mimetype(true)
///     .with_default_frame_duration(Duration::from_millis(33));
/// assert!(config.sbr_in_mimetype);
/// assert_eq!(config.video_history_size, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mp2tConfig {
    /// The container MIME type signalled implicit SBR (HE-AAC), so the AAC
    /// output sample rate is doubled (capped at 48 kHz).
    pub sbr_in_mimetype: bool,
    /// Number of video frames held back to compute frame durations.
    pub video_history_size: usize,
    /// Frame duration assumed until a real one can be measured.
    pub default_frame_duration: Duration,
    /// Bytes requested per read by the async demuxer.
    pub read_chunk_size: usize,
}

impl Default for Mp2tConfig {
    fn default() -> Self {
        Self {
            sbr_in_mimetype: false,
            video_history_size: 5,
            default_frame_duration: Duration::from_millis(40),
            read_chunk_size: TS_PACKET_SIZE * 64,
        }
    }
}

impl Mp2tConfig {
    /// Sets whether implicit SBR is signalled by the MIME type.
    pub fn with_sbr_in_mimetype(mut self, sbr_in_mimetype: bool) -> Self {
        self.sbr_in_mimetype = sbr_in_mimetype;
        self
    }

    /// Sets the video duration-estimation window. Zero is bumped to one.
    pub fn with_video_history_size(mut self, size: usize) -> Self {
        self.video_history_size = size.max(1);
        self
    }

    /// Sets the fallback video frame duration.
    pub fn with_default_frame_duration(mut self, duration: Duration) -> Self {
        self.default_frame_duration = duration;
        self
    }

    /// Sets the async read size. Values below one TS packet are raised to one packet.
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(TS_PACKET_SIZE);
        self
    }
}
