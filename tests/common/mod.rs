//! Synthetic transport streams for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;

use mp2t::utils::Crc32Mpeg2;

pub const PMT_PID: u16 = 0x1000;
pub const VIDEO_PID: u16 = 0x100;
pub const AUDIO_PID: u16 = 0x101;

pub const STREAM_TYPE_AAC: u8 = 0x0f;
pub const STREAM_TYPE_H264: u8 = 0x1b;

/// Writes TS packets with per-PID continuity counters.
#[derive(Debug, Default)]
pub struct TsWriter {
    out: Vec<u8>,
    counters: HashMap<u16, u8>,
}

impl TsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    /// Single-program PAT pointing at `pmt_pid`.
    pub fn pat(&mut self, pmt_pid: u16) -> &mut Self {
        let mut body = vec![0x00, 0x01];
        body.extend_from_slice(&(0xE000 | pmt_pid).to_be_bytes());
        let section = psi_section(0x00, 1, &body);
        self.psi(0, &section)
    }

    pub fn pmt(&mut self, pmt_pid: u16, streams: &[(u8, u16)]) -> &mut Self {
        let mut body = Vec::new();
        body.extend_from_slice(&(0xE000 | VIDEO_PID).to_be_bytes());
        body.extend_from_slice(&[0xF0, 0x00]);
        for &(stream_type, pid) in streams {
            body.push(stream_type);
            body.extend_from_slice(&(0xE000 | pid).to_be_bytes());
            body.extend_from_slice(&[0xF0, 0x00]);
        }
        let section = psi_section(0x02, 1, &body);
        self.psi(pmt_pid, &section)
    }

    /// PES packet with an explicit length.
    pub fn audio_pes(&mut self, pid: u16, pts: u64, payload: &[u8]) -> &mut Self {
        let pes = pes_packet(0xC0, Some(pts), None, payload, true);
        self.packetize(pid, &pes)
    }

    /// Unbounded PES packet carrying both timestamps.
    pub fn video_pes(&mut self, pid: u16, pts: u64, dts: u64, payload: &[u8]) -> &mut Self {
        let pes = pes_packet(0xE0, Some(pts), Some(dts), payload, false);
        self.packetize(pid, &pes)
    }

    /// Makes the next packet of `pid` break continuity.
    pub fn skip_counter(&mut self, pid: u16) -> &mut Self {
        let counter = self.counters.entry(pid).or_insert(0);
        *counter = (*counter + 1) % 16;
        self
    }

    fn psi(&mut self, pid: u16, section: &[u8]) -> &mut Self {
        let mut payload = vec![0x00];
        payload.extend_from_slice(section);
        self.packetize(pid, &payload)
    }

    /// Splits `payload` into packets. The last one is padded with
    /// adaptation field stuffing.
    fn packetize(&mut self, pid: u16, payload: &[u8]) -> &mut Self {
        for (i, chunk) in payload.chunks(184).enumerate() {
            let counter = self.counters.entry(pid).or_insert(0);
            let pusi = if i == 0 { 0x40 } else { 0x00 };
            let start = self.out.len();
            self.out.extend_from_slice(&[0x47, pusi | (pid >> 8) as u8, pid as u8]);

            if chunk.len() == 184 {
                self.out.push(0x10 | *counter);
            } else {
                let af_length = 183 - chunk.len();
                self.out.push(0x30 | *counter);
                self.out.push(af_length as u8);
                if af_length > 0 {
                    self.out.push(0x00);
                    self.out.resize(self.out.len() + af_length - 1, 0xFF);
                }
            }
            self.out.extend_from_slice(chunk);
            assert_eq!(self.out.len() - start, 188);
            *counter = (*counter + 1) % 16;
        }
        self
    }
}

fn psi_section(table_id: u8, table_id_extension: u16, body: &[u8]) -> Vec<u8> {
    let section_length = 5 + body.len() + 4;
    let mut section = vec![
        table_id,
        0xB0 | (section_length >> 8) as u8,
        section_length as u8,
    ];
    section.extend_from_slice(&table_id_extension.to_be_bytes());
    section.extend_from_slice(&[0xC1, 0x00, 0x00]);
    section.extend_from_slice(body);
    let crc = Crc32Mpeg2::new().calculate(&section);
    section.extend_from_slice(&crc.to_be_bytes());
    section
}

fn write_timestamp(buf: &mut Vec<u8>, marker: u8, ts: u64) {
    let ts = ts & 0x1_FFFF_FFFF;
    buf.push(marker | ((ts >> 29) & 0x0E) as u8 | 0x01);
    buf.extend_from_slice(&((((ts >> 14) & 0xFFFE) | 0x01) as u16).to_be_bytes());
    buf.extend_from_slice(&((((ts << 1) & 0xFFFE) | 0x01) as u16).to_be_bytes());
}

pub fn pes_packet(
    stream_id: u8,
    pts: Option<u64>,
    dts: Option<u64>,
    payload: &[u8],
    bounded: bool,
) -> Vec<u8> {
    let mut header = Vec::new();
    let mut flags = 0u8;
    if let Some(pts) = pts {
        write_timestamp(&mut header, if dts.is_some() { 0x30 } else { 0x20 }, pts);
        flags |= 0x80;
    }
    if let Some(dts) = dts {
        write_timestamp(&mut header, 0x10, dts);
        flags |= 0x40;
    }

    let length = if bounded { 3 + header.len() + payload.len() } else { 0 };
    let mut out = vec![0x00, 0x00, 0x01, stream_id];
    out.extend_from_slice(&(length as u16).to_be_bytes());
    out.extend_from_slice(&[0x80, flags, header.len() as u8]);
    out.extend(header);
    out.extend_from_slice(payload);
    out
}

/// AAC-LC ADTS frame, 44.1 kHz stereo.
pub fn adts_frame(size: usize) -> Vec<u8> {
    let mut frame = vec![
        0xFF,
        0xF1,
        0x50,
        0x80 | ((size >> 11) as u8 & 0x03),
        (size >> 3) as u8,
        ((size as u8 & 0x07) << 5) | 0x1F,
        0xFC,
    ];
    frame.resize(size, 0x21);
    frame
}

const AUD: [u8; 2] = [0x09, 0xF0];
/// Baseline SPS, 320x240, no VUI.
const SPS: [u8; 8] = [0x67, 0x42, 0xC0, 0x1E, 0xF4, 0x0A, 0x0F, 0xC8];
const PPS: [u8; 4] = [0x68, 0xCE, 0x3C, 0x80];
/// I slice referencing PPS 0.
const IDR_SLICE: [u8; 4] = [0x65, 0x88, 0xD2, 0xC0];
/// P slice referencing PPS 0.
const NON_IDR_SLICE: [u8; 3] = [0x41, 0x9B, 0x4B];

fn annex_b(nals: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for nal in nals {
        out.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
        out.extend_from_slice(nal);
    }
    out
}

/// AUD, SPS, PPS and an IDR slice.
pub fn key_access_unit() -> Vec<u8> {
    annex_b(&[&AUD, &SPS, &PPS, &IDR_SLICE])
}

pub fn delta_access_unit() -> Vec<u8> {
    annex_b(&[&AUD, &NON_IDR_SLICE])
}

/// PAT, PMT, then `count` video access units at 25 fps interleaved with
/// audio PES packets of two ADTS frames each. Timestamps start at 1 s.
pub fn av_stream(count: usize) -> Vec<u8> {
    let mut writer = TsWriter::new();
    writer
        .pat(PMT_PID)
        .pmt(PMT_PID, &[(STREAM_TYPE_H264, VIDEO_PID), (STREAM_TYPE_AAC, AUDIO_PID)]);

    for i in 0..count as u64 {
        let au = if i == 0 {
            key_access_unit()
        } else {
            delta_access_unit()
        };
        let pts = 90_000 + i * 3_600;
        writer.video_pes(VIDEO_PID, pts, pts, &au);

        let mut frames = adts_frame(150);
        frames.extend(adts_frame(150));
        writer.audio_pes(AUDIO_PID, 90_000 + i * 4_180, &frames);
    }
    writer.into_bytes()
}

/// PAT, PMT and `count` audio PES packets of two ADTS frames each.
pub fn audio_stream(first_pts: u64, count: usize) -> Vec<u8> {
    let mut writer = TsWriter::new();
    writer
        .pat(PMT_PID)
        .pmt(PMT_PID, &[(STREAM_TYPE_AAC, AUDIO_PID)]);
    for i in 0..count as u64 {
        let mut frames = adts_frame(120);
        frames.extend(adts_frame(120));
        writer.audio_pes(AUDIO_PID, first_pts + i * 4_180, &frames);
    }
    writer.into_bytes()
}
