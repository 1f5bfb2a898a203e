use bytes::Bytes;

use super::adapter_video::EsAdapterVideo;
use super::EsQueue;
use crate::av::{CodecType, Packet, Size, TrackType, VideoDecoderConfig, VIDEO_TRACK_ID};
use crate::codec::h264::{find_start_code, nal_units, H264Parser, NALUnitType, SPSInfo};
use crate::config::Mp2tConfig;
use crate::error::{Mp2tError, Result};
use crate::format::ts::event::ParserEvent;

/// Start code plus NAL header byte.
const MIN_AUD_SIZE: i64 = 4;

/// AUD appended by [`EsParserH264::flush`] to close the last access unit.
const FLUSH_AUD: [u8; 4] = [0x00, 0x00, 0x01, 0x09];

/// Splits an H.264 Annex-B stream into access units.
///
/// Access units are delimited by AUD NAL units, so a unit is only emitted
/// once the next AUD shows up (or on flush). Missing parameter sets and
/// unparsable slice headers are tolerated until the first video config has
/// been found, since a stream may start mid-GOP.
#[derive(Debug)]
pub struct EsParserH264 {
    es: EsQueue,
    adapter: EsAdapterVideo,
    parser: H264Parser,
    current_access_unit_pos: i64,
    next_access_unit_pos: i64,
    last_config: Option<VideoDecoderConfig>,
}

impl EsParserH264 {
    /// Sizes the frame duration window from `config`.
    pub fn new(config: &Mp2tConfig) -> Self {
        Self {
            es: EsQueue::new(),
            adapter: EsAdapterVideo::new(config.video_history_size, config.default_frame_duration),
            parser: H264Parser::new(),
            current_access_unit_pos: 0,
            next_access_unit_pos: 0,
            last_config: None,
        }
    }

    /// Appends PES payload data and emits every access unit that is complete.
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

    /// Treats the buffered bytes as a complete access unit and drains the
    /// adapter.
    pub fn flush(&mut self, events: &mut Vec<ParserEvent>) -> Result<()> {
        log::debug!("Flushing H.264 parser");
        let mut pos = self.current_access_unit_pos;
        let aud_found = self.find_aud(&mut pos);
        self.current_access_unit_pos = pos;
        if !aud_found {
            return Ok(());
        }

        self.es.bytes_mut().push(&FLUSH_AUD);
        let result = self.parse_from_es_queue(events);
        self.adapter.flush(events);
        result
    }

    /// Drops buffered bytes, parameter sets and pending frames.
    pub fn reset(&mut self) {
        self.es.reset();
        self.parser.reset();
        self.current_access_unit_pos = 0;
        self.next_access_unit_pos = 0;
        self.last_config = None;
        self.adapter.reset();
    }

    /// Moves `stream_pos` to the next AUD at or after it.
    ///
    /// When none is found `stream_pos` stops where the search should resume.
    fn find_aud(&self, stream_pos: &mut i64) -> bool {
        loop {
            let es = self.es.bytes().peek_at(*stream_pos);
            let Some((offset, size)) = find_start_code(es) else {
                // The last two bytes may begin a start code.
                *stream_pos += es.len().saturating_sub(2) as i64;
                return false;
            };

            *stream_pos += offset as i64;
            // NAL header not there yet
            if offset + size >= es.len() {
                return false;
            }
            // AUD header: nal_ref_idc 0, type 9
            if es[offset + size] == NALUnitType::AccessUnitDelimiter as u8 {
                return true;
            }
            *stream_pos += size as i64;
        }
    }

    fn parse_from_es_queue(&mut self, events: &mut Vec<ParserEvent>) -> Result<()> {
        loop {
            let mut current = self.current_access_unit_pos;
            let aud_found = self.find_aud(&mut current);
            self.current_access_unit_pos = current;
            self.es.bytes_mut().trim(current);
            if self.next_access_unit_pos < current {
                self.next_access_unit_pos = current;
            }
            if !aud_found {
                return Ok(());
            }

            // The next AUD bounds a complete access unit.
            let mut next = self.next_access_unit_pos.max(current + MIN_AUD_SIZE);
            let next_found = self.find_aud(&mut next);
            self.next_access_unit_pos = next;
            if !next_found {
                return Ok(());
            }

            let access_unit_size = (next - current) as usize;
            let access_unit =
                Bytes::copy_from_slice(&self.es.bytes().peek_at(current)[..access_unit_size]);
            let (is_key_frame, pps_id) = self.parse_access_unit(access_unit.clone())?;
            self.emit_frame(current, access_unit, is_key_frame, pps_id, events)?;

            self.current_access_unit_pos = next;
            self.es.bytes_mut().trim(next);
        }
    }

    /// Walks the NAL units of one access unit, updating the parameter sets.
    /// Returns the key frame flag and the PPS used by its slices.
    fn parse_access_unit(&mut self, access_unit: Bytes) -> Result<(bool, Option<u32>)> {
        let mut is_key_frame = false;
        let mut pps_id = None;

        for nalu in nal_units(access_unit) {
            let nalu = nalu?;
            match nalu.nal_type {
                NALUnitType::AccessUnitDelimiter => log::trace!("NALU: AUD"),
                NALUnitType::SPS => {
                    log::trace!("NALU: SPS");
                    self.parser.parse_sps(&nalu)?;
                }
                NALUnitType::PPS => {
                    log::trace!("NALU: PPS");
                    if let Err(err) = self.parser.parse_pps(&nalu) {
                        // Waiting for the SPS is fine at the start.
                        if self.last_config.is_some() {
                            return Err(err);
                        }
                    }
                }
                NALUnitType::CodedSliceIDR | NALUnitType::CodedSliceNonIDR => {
                    is_key_frame = nalu.nal_type == NALUnitType::CodedSliceIDR;
                    log::trace!("NALU: slice IDR={}", is_key_frame);
                    match self.parser.parse_slice_header(&nalu) {
                        Ok(header) => pps_id = Some(header.pic_parameter_set_id),
                        Err(err) => {
                            // The stream does not necessarily start with SPS/PPS/IDR.
                            if self.last_config.is_some() {
                                return Err(err);
                            }
                        }
                    }
                }
                other => log::trace!("NALU: {:?}", other),
            }
        }

        Ok((is_key_frame, pps_id))
    }

    fn emit_frame(
        &mut self,
        access_unit_pos: i64,
        access_unit: Bytes,
        is_key_frame: bool,
        pps_id: Option<u32>,
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        // Streams relying on VUI timing carry no PTS; the adapter handles it.
        let timing = self.es.timing_descriptor(access_unit_pos);
        if timing.pts.is_none() {
            log::debug!("Missing timestamp");
        }
        let pts = timing.pts;
        let dts = timing.dts.or(pts);

        match pps_id.and_then(|id| self.parser.pps(id)) {
            Some(pps) => {
                let sps = self
                    .parser
                    .sps(pps.seq_parameter_set_id)
                    .cloned()
                    .ok_or_else(|| {
                        Mp2tError::Codec(format!(
                            "access unit references unknown sps {}",
                            pps.seq_parameter_set_id
                        ))
                    })?;
                self.update_video_decoder_config(&sps, events)?;
            }
            None => {
                // Leading frames before the first parameter sets go to the
                // adapter, which drops them while it has no config.
                if self.last_config.is_some() {
                    return Err(Mp2tError::Codec(
                        "access unit without a valid PPS".into(),
                    ));
                }
            }
        }

        log::trace!(
            "Emit frame: stream_pos={} size={}",
            access_unit_pos,
            access_unit.len()
        );
        let mut packet =
            Packet::new(access_unit, TrackType::Video, VIDEO_TRACK_ID).with_key_flag(is_key_frame);
        packet.pts = pts;
        packet.dts = dts;
        self.adapter.on_new_buffer(packet, events)
    }

    fn update_video_decoder_config(
        &mut self,
        sps: &SPSInfo,
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        let (sar_width, sar_height) = sps.sar.unwrap_or((1, 1));
        let sar_width = if sar_width == 0 { 1 } else { sar_width };
        let sar_height = if sar_height == 0 { 1 } else { sar_height };

        let coded_size = sps.coded_size();
        let visible_rect = sps.visible_rect();
        if coded_size.width <= 0
            || coded_size.height <= 0
            || visible_rect.width <= 0
            || visible_rect.height <= 0
        {
            return Err(Mp2tError::Codec(format!(
                "invalid picture size: coded {:?}, visible {:?}",
                coded_size, visible_rect
            )));
        }

        let natural_width = visible_rect.width as i64 * sar_width as i64 / sar_height as i64;
        if natural_width <= 0 || natural_width > i32::MAX as i64 {
            return Err(Mp2tError::Codec(format!(
                "invalid natural width {}",
                natural_width
            )));
        }

        let config = VideoDecoderConfig {
            codec: CodecType::H264,
            profile: sps.profile(),
            coded_size,
            visible_rect,
            natural_size: Size::new(natural_width as i32, visible_rect.height),
            extra_data: Vec::new(),
        };

        if self.last_config.as_ref() != Some(&config) {
            log::debug!(
                "H.264 config: profile_idc={} level_idc={} coded={}x{} visible={:?} sar={}:{}",
                sps.profile_idc,
                sps.level_idc,
                coded_size.width,
                coded_size.height,
                visible_rect,
                sar_width,
                sar_height
            );
            self.last_config = Some(config.clone());
            self.adapter.on_config_changed(config, events);
        }
        Ok(())
    }
}
