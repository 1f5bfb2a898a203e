use std::time::Duration;

// PIDs
/// PID of the program association table.
pub const PID_PAT: u16 = 0x0000;
/// Null packet PID.
pub const PID_NULL: u16 = 0x1fff;

// Table IDs
/// table_id of a PAT section.
pub const TABLE_ID_PAT: u8 = 0x00;
/// table_id of a PMT section.
pub const TABLE_ID_PMT: u8 = 0x02;

// Elementary Stream Types (ISO/IEC 13818-1 Table 2-34)
/// ISO/IEC 11172-3 audio.
pub const STREAM_TYPE_MPEG1_AUDIO: u8 = 0x03;
/// ISO/IEC 13818-7 audio in ADTS framing.
pub const STREAM_TYPE_AAC: u8 = 0x0f;
/// H.264/AVC video.
pub const STREAM_TYPE_H264: u8 = 0x1b;

// Stream IDs
/// Private stream 1, used for non-MPEG payloads.
pub const STREAM_ID_PRIVATE_STREAM_1: u8 = 0xbd;

// Constants
/// First byte of every TS packet.
pub const TS_SYNC_BYTE: u8 = 0x47;
/// TS packet size in bytes.
pub const TS_PACKET_SIZE: usize = 188;
/// Fixed TS header size.
pub const TS_HEADER_SIZE: usize = 4;
/// 24-bit PES packet start code prefix.
pub const PES_START_CODE: u32 = 0x000001;
/// Largest allowed `section_length` of a PAT or PMT.
pub const MAX_SECTION_LENGTH: usize = 1021;
/// PTS/DTS clock rate.
pub const PTS_HZ: u64 = 90_000;
/// PCR clock rate.
pub const PCR_HZ: u64 = 27_000_000;

/// Decoded adaptation field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdaptationField {
    /// Value of the adaptation_field_length byte.
    pub length: usize,
    /// Discontinuity indicator.
    pub discontinuity: bool,
    /// Random access indicator.
    pub random_access: bool,
    /// Elementary stream priority indicator.
    pub es_priority: bool,
    /// Program clock reference in 27 MHz units
    pub pcr: Option<u64>,
    /// Original program clock reference in 27 MHz units
    pub opcr: Option<u64>,
    /// Packets left until a splice point.
    pub splice_countdown: Option<i8>,
    /// Transport private data bytes.
    pub private_data: Option<Vec<u8>>,
}

/// The fixed 4-byte TS packet header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TSHeader {
    /// Always 0x47.
    pub sync_byte: u8,
    /// Transport error indicator.
    pub transport_error: bool,
    /// Payload unit start indicator.
    pub payload_unit_start: bool,
    /// Transport priority.
    pub transport_priority: bool,
    /// 13-bit packet identifier.
    pub pid: u16,
    /// Transport scrambling control.
    pub scrambling_control: u8,
    /// Adaptation field control bit 1.
    pub adaptation_field_exists: bool,
    /// Adaptation field control bit 0.
    pub contains_payload: bool,
    /// 4-bit continuity counter.
    pub continuity_counter: u8,
}

// Time conversion utilities

/// Converts a 27 MHz clock value (`base * 300 + ext`) to a duration.
pub fn pcr_to_time(pcr: u64) -> Duration {
    Duration::from_nanos((pcr as u128 * 1_000_000_000 / PCR_HZ as u128) as u64)
}

/// Converts 90 kHz ticks to a duration.
pub fn pts_to_time(pts: u64) -> Duration {
    Duration::from_nanos((pts as u128 * 1_000_000_000 / PTS_HZ as u128) as u64)
}

/// Converts unrolled 90 kHz ticks to microseconds.
pub fn ticks_to_micros(ticks: i64) -> i64 {
    (ticks as i128 * 1000 / 90) as i64
}
