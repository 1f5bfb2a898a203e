use bytes::Bytes;

use super::{restart_timestamp_helper, EsQueue};
use crate::av::{
    AudioDecoderConfig, AudioTimestampHelper, CodecType, Packet, TrackType, AUDIO_TRACK_ID,
};
use crate::codec::aac::{
    adts_frame_size, is_adts_sync, parse_adts_header, ADTS_HEADER_MIN_SIZE, SAMPLES_PER_AAC_FRAME,
};
use crate::error::{Mp2tError, Result};
use crate::format::ts::event::ParserEvent;

/// Highest sample rate implicit SBR may double up to.
const MAX_SBR_SAMPLE_RATE: u32 = 48_000;

/// Splits an AAC elementary stream into ADTS frames.
#[derive(Debug)]
pub struct EsParserAdts {
    es: EsQueue,
    sbr_in_mimetype: bool,
    /// Rebuilt at the core sample rate on every config change
    timestamp_helper: AudioTimestampHelper,
    last_config: Option<AudioDecoderConfig>,
}

impl EsParserAdts {
    /// With `sbr_in_mimetype`, configs announce HE-AAC at twice the core rate.
    pub fn new(sbr_in_mimetype: bool) -> Self {
        Self {
            es: EsQueue::new(),
            sbr_in_mimetype,
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
            let (skip, frame_size) = look_for_adts_frame(self.es.bytes().peek());
            self.es.bytes_mut().pop(skip);
            let Some(frame_size) = frame_size else {
                return Ok(());
            };

            let frame_offset = self.es.bytes().head();
            let frame = Bytes::copy_from_slice(&self.es.bytes().peek()[..frame_size]);
            self.es.bytes_mut().pop(frame_size);

            self.update_audio_configuration(&frame, events)?;

            let timing = self.es.timing_descriptor(frame_offset);
            if let Some(pts) = timing.pts {
                self.timestamp_helper.set_base_timestamp(pts);
            }

            let Some(pts) = self.timestamp_helper.timestamp() else {
                log::debug!("Skipping audio frame with unknown timestamp");
                continue;
            };
            let duration = self.timestamp_helper.frame_duration(SAMPLES_PER_AAC_FRAME);

            log::trace!("ADTS frame: pts={}us size={}", pts, frame_size);
            events.push(ParserEvent::Buffer(
                Packet::new(frame, TrackType::Audio, AUDIO_TRACK_ID)
                    .with_pts(pts)
                    .with_dts(pts)
                    .with_key_flag(true)
                    .with_duration(duration),
            ));

            self.timestamp_helper.add_frames(SAMPLES_PER_AAC_FRAME);
        }
    }

    fn update_audio_configuration(
        &mut self,
        adts_header: &[u8],
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        let header = parse_adts_header(adts_header)?;

        // Indices 13 and 14 are reserved, 15 means an explicit frequency.
        let samples_per_second = header.sample_rate().ok_or_else(|| {
            Mp2tError::Codec(format!(
                "unsupported ADTS frequency index {}",
                header.sample_rate_index
            ))
        })?;
        let channel_layout = header.channel_layout().ok_or_else(|| {
            Mp2tError::Codec(format!(
                "unsupported ADTS channel configuration {}",
                header.channel_configuration
            ))
        })?;

        let extended_samples_per_second = if self.sbr_in_mimetype {
            (2 * samples_per_second).min(MAX_SBR_SAMPLE_RATE)
        } else {
            samples_per_second
        };

        let config = AudioDecoderConfig {
            codec: CodecType::AAC,
            channel_layout,
            samples_per_second: extended_samples_per_second,
            extra_data: header.audio_specific_config().to_vec(),
        };

        if self.last_config.as_ref() != Some(&config) {
            log::debug!(
                "ADTS config: profile={:?} sample_rate={} extended_sample_rate={} channels={}",
                header.profile,
                samples_per_second,
                extended_samples_per_second,
                header.channel_configuration
            );
            restart_timestamp_helper(&mut self.timestamp_helper, samples_per_second);
            self.last_config = Some(config.clone());
            events.push(ParserEvent::AudioConfig(config));
        }
        Ok(())
    }
}

/// Scans `es` for an ADTS frame.
///
/// Returns the number of leading bytes that can be dropped and, when a
/// frame starts right after them, its size. A sync word counts only when
/// the frame is complete and, if the bytes are there, another sync word
/// follows it.
fn look_for_adts_frame(es: &[u8]) -> (usize, Option<usize>) {
    if es.len() <= ADTS_HEADER_MIN_SIZE {
        return (0, None);
    }
    let max_offset = es.len() - ADTS_HEADER_MIN_SIZE;

    for offset in 0..max_offset {
        let cur = &es[offset..];
        if !is_adts_sync(cur) {
            continue;
        }

        let frame_size = adts_frame_size(cur);
        if frame_size < ADTS_HEADER_MIN_SIZE {
            continue;
        }

        let remaining = cur.len();
        if remaining < frame_size {
            // Wait for the rest of the frame.
            return (offset, None);
        }
        if remaining >= frame_size + 2 && !is_adts_sync(&cur[frame_size..]) {
            continue;
        }
        return (offset, Some(frame_size));
    }

    (max_offset, None)
}
