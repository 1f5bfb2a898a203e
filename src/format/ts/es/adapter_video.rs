use std::collections::VecDeque;
use std::time::Duration;

use crate::av::{Packet, TrackType, VideoDecoderConfig};
use crate::error::{Mp2tError, Result};
use crate::format::ts::event::ParserEvent;

/// Sits between a video ES parser and the stream parser.
///
/// Frames are held back in a small window so each one can be given a
/// duration: the gap to the closest presentation timestamp at or after its
/// own, looking at both pending and recently emitted frames (B-frames make
/// the next frame in decode order a poor guess).
///
/// A segment has to start on a key frame. Non-key frames seen before the
/// first key frame are dropped and later replaced by copies of that key
/// frame, with timestamps spread evenly from the earliest dropped one.
#[derive(Debug)]
pub struct EsAdapterVideo {
    history_size: usize,
    default_frame_duration: Duration,

    has_valid_config: bool,
    has_valid_frame: bool,
    last_frame_duration: Duration,

    /// Configs keyed by the index of the first buffer using them
    config_list: VecDeque<(u64, VideoDecoderConfig)>,
    /// Index of the front of `buffer_list` in the overall buffer sequence
    buffer_index: u64,
    buffer_list: VecDeque<Packet>,
    emitted_pts: VecDeque<i64>,

    min_pts: Option<i64>,
    min_dts: Option<i64>,
    discarded_frame_count: u32,
}

impl EsAdapterVideo {
    /// `history_size` frames are kept to estimate durations. `default_frame_duration`
    /// is used until two timestamps are known.
    pub fn new(history_size: usize, default_frame_duration: Duration) -> Self {
        Self {
            history_size: history_size.max(1),
            default_frame_duration,
            has_valid_config: false,
            has_valid_frame: false,
            last_frame_duration: default_frame_duration,
            config_list: VecDeque::new(),
            buffer_index: 0,
            buffer_list: VecDeque::new(),
            emitted_pts: VecDeque::new(),
            min_pts: None,
            min_dts: None,
            discarded_frame_count: 0,
        }
    }

    /// Emits every pending frame.
    pub fn flush(&mut self, events: &mut Vec<ParserEvent>) {
        self.process_pending_buffers(true, events);
    }

    /// Drops pending frames and configs.
    pub fn reset(&mut self) {
        *self = Self::new(self.history_size, self.default_frame_duration);
    }

    /// Records a config that applies from the next frame on.
    pub fn on_config_changed(&mut self, config: VideoDecoderConfig, events: &mut Vec<ParserEvent>) {
        let index = self.buffer_index + self.buffer_list.len() as u64;
        self.config_list.push_back((index, config));
        self.has_valid_config = true;
        self.process_pending_buffers(false, events);
    }

    /// Accepts a frame in decode order.
    ///
    /// Fails when a frame without a timestamp follows valid frames.
    pub fn on_new_buffer(&mut self, packet: Packet, events: &mut Vec<ParserEvent>) -> Result<()> {
        let Some(pts) = packet.pts else {
            if self.has_valid_frame {
                return Err(Mp2tError::Parser(
                    "video frame without timestamp".into(),
                ));
            }
            log::debug!("Skipping frame with missing timestamp");
            return Ok(());
        };

        let dts = packet.dts.unwrap_or(pts);
        self.min_pts = Some(self.min_pts.map_or(pts, |min_pts| min_pts.min(pts)));
        self.min_dts = Some(self.min_dts.map_or(dts, |min_dts| min_dts.min(dts)));

        if !self.has_valid_config || (!self.has_valid_frame && !packet.is_key) {
            self.discarded_frame_count += 1;
            return Ok(());
        }

        self.has_valid_frame = true;
        if self.discarded_frame_count > 0 {
            self.replace_discarded_frames(&packet);
        }

        self.buffer_list.push_back(packet);
        self.process_pending_buffers(false, events);
        Ok(())
    }

    fn process_pending_buffers(&mut self, flush: bool, events: &mut Vec<ParserEvent>) {
        while !self.buffer_list.is_empty() && (flush || self.buffer_list.len() > self.history_size)
        {
            // Signal a config change right before its first frame.
            if let Some((index, _)) = self.config_list.front() {
                if *index == self.buffer_index {
                    if let Some((_, config)) = self.config_list.pop_front() {
                        events.push(ParserEvent::VideoConfig(config));
                    }
                }
            }

            let Some(mut buffer) = self.buffer_list.pop_front() else {
                break;
            };
            self.buffer_index += 1;

            if let (None, Some(pts)) = (buffer.duration, buffer.pts) {
                let duration = match self.next_frame_pts(pts) {
                    Some(next_pts) => Duration::from_micros((next_pts - pts) as u64),
                    // Last frame, or the next one shares this timestamp
                    None => self.last_frame_duration,
                };
                buffer.duration = Some(duration);
            }

            if let Some(pts) = buffer.pts {
                self.emitted_pts.push_back(pts);
                if self.emitted_pts.len() > self.history_size {
                    self.emitted_pts.pop_front();
                }
            }
            if let Some(duration) = buffer.duration {
                self.last_frame_duration = duration;
            }

            log::trace!(
                "video frame: pts={:?} dts={:?} duration={:?} key={}",
                buffer.pts,
                buffer.dts,
                buffer.duration,
                buffer.is_key
            );
            events.push(ParserEvent::Buffer(buffer));
        }
    }

    /// Smallest timestamp at or after `current_pts` among pending and
    /// recently emitted frames.
    fn next_frame_pts(&self, current_pts: i64) -> Option<i64> {
        self.buffer_list
            .iter()
            .filter_map(|buffer| buffer.pts)
            .chain(self.emitted_pts.iter().copied())
            .filter(|&pts| pts >= current_pts)
            .min()
    }

    fn replace_discarded_frames(&mut self, key_frame: &Packet) {
        let Some(key_pts) = key_frame.pts else {
            return;
        };
        let key_dts = key_frame.dts.unwrap_or(key_pts);
        let count = self.discarded_frame_count as i64;

        // Integer steps, so the rounding error grows with the copy count.
        let mut pts = self.min_pts.unwrap_or(key_pts);
        let pts_delta = (key_pts - pts) / count;
        let mut dts = self.min_dts.unwrap_or(key_dts);
        let dts_delta = (key_dts - dts) / count;

        log::debug!("Replacing {} leading frames with key frame copies", count);
        for _ in 0..count {
            let frame = Packet::new(key_frame.data.clone(), TrackType::Video, key_frame.track_id)
                .with_key_flag(key_frame.is_key)
                .with_pts(pts)
                .with_dts(dts)
                .with_duration(Duration::from_micros(pts_delta.max(0) as u64));
            self.buffer_list.push_back(frame);
            pts += pts_delta;
            dts += dts_delta;
        }
        self.discarded_frame_count = 0;
    }
}
