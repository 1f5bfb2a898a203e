use bytes::Bytes;

use super::{restart_timestamp_helper, EsQueue};
use crate::av::{
    AudioDecoderConfig, AudioTimestampHelper, CodecType, Packet, TrackType, AUDIO_TRACK_ID,
};
use crate::codec::mpeg_audio::{parse_mpeg_audio_header, MpegAudioHeader, MPEG_AUDIO_HEADER_SIZE};
use crate::error::Result;
use crate::format::ts::event::ParserEvent;

/// Splits an MPEG-1/2 audio elementary stream into frames.
#[derive(Debug)]
pub struct EsParserMpeg1Audio {
    es: EsQueue,
    timestamp_helper: AudioTimestampHelper,
    last_config: Option<AudioDecoderConfig>,
}

impl EsParserMpeg1Audio {
    /// A parser with no config yet.
    pub fn new() -> Self {
        Self {
            es: EsQueue::new(),
            timestamp_helper: AudioTimestampHelper::new(1),
            last_config: None,
        }
    }

    /// Appends PES payload data and emits every complete frame.
    pub fn parse(
        &mut self,
        data: &[u8],
        pts: Option<i64>,
        dts: Option<i64>,
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        self.es.push(data, pts, dts);
        self.parse_from_es_queue(events)
    }

    /// Drops buffered data and the current config.
    pub fn reset(&mut self) {
        self.es.reset();
        self.timestamp_helper = AudioTimestampHelper::new(1);
        self.last_config = None;
    }

    fn parse_from_es_queue(&mut self, events: &mut Vec<ParserEvent>) -> Result<()> {
        loop {
            let (skip, header) = look_for_mpeg1_audio_frame(self.es.bytes().peek());
            self.es.bytes_mut().pop(skip);
            let Some(header) = header else {
                return Ok(());
            };

            let frame_offset = self.es.bytes().head();
            let frame = Bytes::copy_from_slice(&self.es.bytes().peek()[..header.frame_size]);
            self.es.bytes_mut().pop(header.frame_size);

            self.update_audio_configuration(&header, events);

            let timing = self.es.timing_descriptor(frame_offset);
            if let Some(pts) = timing.pts {
                self.timestamp_helper.set_base_timestamp(pts);
            }

            let Some(pts) = self.timestamp_helper.timestamp() else {
                log::debug!("Skipping audio frame with unknown timestamp");
                continue;
            };
            let sample_count = header.sample_count as i64;
            let duration = self.timestamp_helper.frame_duration(sample_count);

            log::trace!("MPEG audio frame: pts={}us size={}", pts, header.frame_size);
            events.push(ParserEvent::Buffer(
                Packet::new(frame, TrackType::Audio, AUDIO_TRACK_ID)
                    .with_pts(pts)
                    .with_dts(pts)
                    .with_key_flag(true)
                    .with_duration(duration),
            ));

            self.timestamp_helper.add_frames(sample_count);
        }
    }

    fn update_audio_configuration(
        &mut self,
        header: &MpegAudioHeader,
        events: &mut Vec<ParserEvent>,
    ) {
        let config = AudioDecoderConfig {
            codec: CodecType::MP3,
            channel_layout: header.channel_layout(),
            samples_per_second: header.sample_rate,
            extra_data: Vec::new(),
        };

        if self.last_config.as_ref() != Some(&config) {
            log::debug!(
                "MPEG audio config: {:?} {:?} sample_rate={} channel_mode={:?}",
                header.version,
                header.layer,
                header.sample_rate,
                header.channel_mode
            );
            restart_timestamp_helper(&mut self.timestamp_helper, header.sample_rate);
            self.last_config = Some(config.clone());
            events.push(ParserEvent::AudioConfig(config));
        }
    }
}

impl Default for EsParserMpeg1Audio {
    fn default() -> Self {
        Self::new()
    }
}

/// Scans `es` for an MPEG audio frame, see the ADTS scanner for the
/// returned values. A frame is confirmed by a `0xFF` byte right after it
/// when that byte is available.
fn look_for_mpeg1_audio_frame(es: &[u8]) -> (usize, Option<MpegAudioHeader>) {
    if es.len() <= MPEG_AUDIO_HEADER_SIZE {
        return (0, None);
    }
    let max_offset = es.len() - MPEG_AUDIO_HEADER_SIZE;

    for offset in 0..max_offset {
        let cur = &es[offset..];
        if cur[0] != 0xFF {
            continue;
        }

        let Ok(header) = parse_mpeg_audio_header(cur) else {
            continue;
        };
        if header.frame_size < MPEG_AUDIO_HEADER_SIZE {
            continue;
        }

        let remaining = cur.len();
        if remaining < header.frame_size {
            return (offset, None);
        }
        if remaining > header.frame_size && cur[header.frame_size] != 0xFF {
            continue;
        }
        return (offset, Some(header));
    }

    (max_offset, None)
}
