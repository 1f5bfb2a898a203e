use super::es::EsParser;
use super::event::ParserEvent;
use super::timestamp_unroller::TimestampUnroller;
use super::types::{ticks_to_micros, PES_START_CODE, STREAM_ID_PRIVATE_STREAM_1};
use crate::error::{Mp2tError, Result};
use crate::utils::{BitReader, OffsetByteQueue};

/// Start code, stream id and packet length.
const PES_PREFIX_SIZE: usize = 6;
/// Prefix plus the two flag bytes and the header data length.
const PES_FIXED_HEADER_SIZE: usize = 9;

/// The fixed part of a PES header plus its timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PESHeader {
    /// Stream identifier indicating content type (video/audio/etc.)
    pub stream_id: u8,
    /// Bytes following the length field, 0 when unbounded
    pub packet_length: u16,
    /// PES scrambling control, 0 when clear.
    pub scrambling_control: u8,
    /// PES priority.
    pub priority: bool,
    /// Payload starts with an access unit or sync word.
    pub data_alignment: bool,
    /// Copyright flag.
    pub copyright: bool,
    /// Original or copy.
    pub original: bool,
    /// `0b10` for PTS only, `0b11` for PTS and DTS
    pub pts_dts_flags: u8,
    /// ESCR present.
    pub escr_flag: bool,
    /// ES rate present.
    pub es_rate_flag: bool,
    /// DSM trick mode present.
    pub dsm_trick_mode_flag: bool,
    /// Additional copy info present.
    pub additional_copy_info_flag: bool,
    /// PES CRC present.
    pub crc_flag: bool,
    /// PES extension present.
    pub extension_flag: bool,
    /// Length of the optional fields that precede the payload
    pub header_data_length: u8,
    /// Presentation timestamp, 33-bit 90 kHz ticks
    pub pts: Option<i64>,
    /// Decoding timestamp, 33-bit 90 kHz ticks
    pub dts: Option<i64>,
}

impl PESHeader {
    /// Parses the header of an audio or video PES packet.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BitReader::new(data);

        let start_code = reader.read_bits(24)?;
        if start_code != PES_START_CODE {
            return Err(Mp2tError::InvalidData(format!(
                "invalid PES start code {:#08x}",
                start_code
            )));
        }
        let stream_id = reader.read_bits(8)? as u8;
        let packet_length = reader.read_bits(16)? as u16;

        // '10' marker
        reader.skip_bits(2)?;
        let scrambling_control = reader.read_bits(2)? as u8;
        let priority = reader.read_flag()?;
        let data_alignment = reader.read_flag()?;
        let copyright = reader.read_flag()?;
        let original = reader.read_flag()?;
        let pts_dts_flags = reader.read_bits(2)? as u8;
        let escr_flag = reader.read_flag()?;
        let es_rate_flag = reader.read_flag()?;
        let dsm_trick_mode_flag = reader.read_flag()?;
        let additional_copy_info_flag = reader.read_flag()?;
        let crc_flag = reader.read_flag()?;
        let extension_flag = reader.read_flag()?;
        let header_data_length = reader.read_bits(8)? as u8;

        let mut pts = None;
        let mut dts = None;
        match pts_dts_flags {
            0b10 => {
                pts = Some(read_timestamp(&mut reader, 0x2)?);
            }
            0b11 => {
                pts = Some(read_timestamp(&mut reader, 0x3)?);
                dts = Some(read_timestamp(&mut reader, 0x1)?);
            }
            _ => {}
        }

        Ok(Self {
            stream_id,
            packet_length,
            scrambling_control,
            priority,
            data_alignment,
            copyright,
            original,
            pts_dts_flags,
            escr_flag,
            es_rate_flag,
            dsm_trick_mode_flag,
            additional_copy_info_flag,
            crc_flag,
            extension_flag,
            header_data_length,
            pts,
            dts,
        })
    }
}

/// Reads a 40-bit timestamp field: a 4-bit prefix, then 33 bits split in
/// three parts, each followed by a marker bit.
fn read_timestamp(reader: &mut BitReader<&[u8]>, prefix: u64) -> Result<i64> {
    let section = reader.read_bits_u64(40)?;
    let markers_set = section & 0x1 != 0 && section & 0x1_0000 != 0 && section & 0x1_0000_0000 != 0;
    if section >> 36 != prefix || !markers_set {
        return Err(Mp2tError::InvalidData(format!(
            "invalid PES timestamp field {:#012x}",
            section
        )));
    }

    let timestamp = (((section >> 33) & 0x7) << 30)
        | (((section >> 17) & 0x7fff) << 15)
        | ((section >> 1) & 0x7fff);
    Ok(timestamp as i64)
}

fn is_audio_stream_id(stream_id: u8) -> bool {
    (stream_id & 0xe0) == 0xc0 || stream_id == STREAM_ID_PRIVATE_STREAM_1
}

fn is_video_stream_id(stream_id: u8) -> bool {
    (stream_id & 0xf0) == 0xe0
}

/// Reassembles PES packets of one PID and hands their payload to the
/// elementary stream parser.
///
/// A packet with a declared length is emitted as soon as it is complete.
/// One with length 0 is unbounded and only emitted on the next unit start
/// or on flush.
#[derive(Debug)]
pub struct TsSectionPes {
    pid: u16,
    wait_for_pusi: bool,
    pes_byte_queue: OffsetByteQueue,
    es_parser: EsParser,
}

impl TsSectionPes {
    /// Wraps `es_parser`; input is dropped until the first payload unit start.
    pub fn new(pid: u16, es_parser: EsParser) -> Self {
        Self {
            pid,
            wait_for_pusi: true,
            pes_byte_queue: OffsetByteQueue::new(),
            es_parser,
        }
    }

    /// The elementary stream parser fed by this PID.
    pub fn es_parser(&self) -> &EsParser {
        &self.es_parser
    }

    /// Feeds one TS payload. A payload unit start completes any pending packet
    /// of unknown length before the new one begins.
    pub fn parse(
        &mut self,
        payload_unit_start: bool,
        payload: &[u8],
        unroller: &mut TimestampUnroller,
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        let mut result = Ok(());
        if payload_unit_start {
            // A pending packet of unknown size ends here.
            result = self.emit(true, unroller, events);
            self.reset_pes_state();
            self.wait_for_pusi = false;
        }

        if self.wait_for_pusi {
            return Ok(());
        }
        if !payload.is_empty() {
            self.pes_byte_queue.push(payload);
        }

        result.and_then(|_| self.emit(false, unroller, events))
    }

    /// Emits the pending packet and drains the elementary stream parser.
    pub fn flush(
        &mut self,
        unroller: &mut TimestampUnroller,
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        let emitted = self.emit(true, unroller, events);
        self.es_parser.flush(events)?;
        emitted
    }

    /// Drops the pending packet and the elementary stream state.
    pub fn reset(&mut self) {
        self.reset_pes_state();
        self.es_parser.reset();
    }

    fn reset_pes_state(&mut self) {
        self.pes_byte_queue.reset();
        self.wait_for_pusi = true;
    }

    fn emit(
        &mut self,
        emit_for_unknown_size: bool,
        unroller: &mut TimestampUnroller,
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        if self.wait_for_pusi {
            return Ok(());
        }

        let raw_pes = self.pes_byte_queue.peek();
        if raw_pes.len() < PES_PREFIX_SIZE {
            return Ok(());
        }

        let packet_length = u16::from_be_bytes([raw_pes[4], raw_pes[5]]) as usize;
        if packet_length == 0 && !emit_for_unknown_size {
            return Ok(());
        }
        if packet_length != 0 && raw_pes.len() < packet_length + PES_PREFIX_SIZE {
            return Ok(());
        }

        log::trace!(
            "Emit PES packet: pid={} size={} declared={}",
            self.pid,
            raw_pes.len(),
            packet_length
        );
        let raw_pes = raw_pes.to_vec();
        let result = self.parse_internal(&raw_pes, unroller, events);
        self.reset_pes_state();
        result
    }

    fn parse_internal(
        &mut self,
        raw_pes: &[u8],
        unroller: &mut TimestampUnroller,
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        let stream_id = raw_pes[3];
        let start_code = u32::from_be_bytes([0, raw_pes[0], raw_pes[1], raw_pes[2]]);
        if start_code == PES_START_CODE
            && !is_audio_stream_id(stream_id)
            && !is_video_stream_id(stream_id)
        {
            log::debug!("Skipping PES stream_id {:#04x} on pid {}", stream_id, self.pid);
            return Ok(());
        }

        let header = PESHeader::parse(raw_pes)?;

        let packet_length = match header.packet_length as usize {
            0 => raw_pes.len() - PES_PREFIX_SIZE,
            length => length,
        };
        let es_offset = PES_FIXED_HEADER_SIZE + header.header_data_length as usize;
        let es_size = packet_length as i64 - 3 - header.header_data_length as i64;
        if es_size < 0 || es_offset + es_size as usize > raw_pes.len() {
            return Err(Mp2tError::InvalidData(format!(
                "PES payload out of bounds on pid {}: offset={} size={} available={}",
                self.pid,
                es_offset,
                es_size,
                raw_pes.len()
            )));
        }

        let pts = header
            .pts
            .map(|pts| ticks_to_micros(unroller.unrolled_timestamp(pts)));
        let dts = header
            .dts
            .map(|dts| ticks_to_micros(unroller.unrolled_timestamp(dts)));

        log::trace!(
            "PES payload: pid={} stream_id={:#04x} pts={:?} dts={:?} size={}",
            self.pid,
            header.stream_id,
            pts,
            dts,
            es_size
        );
        let es = &raw_pes[es_offset..es_offset + es_size as usize];
        self.es_parser.parse(es, pts, dts, events)
    }
}
