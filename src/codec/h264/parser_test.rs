//! H.264 parser tests plus a small bitstream writer that builds parameter
//! sets and slices for the demuxer tests.

use super::*;
use crate::av::{Rect, Size, VideoCodecProfile};
use crate::error::Mp2tError;
use bytes::Bytes;
use pretty_assertions::assert_eq;

/// MSB-first bit writer for hand-built RBSPs.
#[derive(Default)]
pub(crate) struct BitWriter {
    bits: Vec<bool>,
}

impl BitWriter {
    pub(crate) fn bits(&mut self, value: u32, n: u32) -> &mut Self {
        for i in (0..n).rev() {
            self.bits.push((value >> i) & 1 == 1);
        }
        self
    }

    pub(crate) fn flag(&mut self, value: bool) -> &mut Self {
        self.bits.push(value);
        self
    }

    pub(crate) fn ue(&mut self, value: u32) -> &mut Self {
        let code = value as u64 + 1;
        let len = 64 - code.leading_zeros();
        for _ in 0..len - 1 {
            self.bits.push(false);
        }
        for i in (0..len).rev() {
            self.bits.push((code >> i) & 1 == 1);
        }
        self
    }

    pub(crate) fn se(&mut self, value: i32) -> &mut Self {
        let code = if value > 0 {
            (2 * value - 1) as u32
        } else {
            (-2 * value) as u32
        };
        self.ue(code)
    }

    /// Appends the RBSP stop bit and byte-aligns.
    pub(crate) fn finish(&mut self) -> Vec<u8> {
        self.bits.push(true);
        let mut out = vec![0u8; self.bits.len().div_ceil(8)];
        for (i, &bit) in self.bits.iter().enumerate() {
            if bit {
                out[i / 8] |= 1 << (7 - (i % 8));
            }
        }
        out
    }
}

/// Prefixes a NAL header byte and inserts emulation prevention bytes.
pub(crate) fn nal(header: u8, rbsp: &[u8]) -> Vec<u8> {
    let mut out = vec![header];
    let mut zeros = 0;
    for &byte in rbsp {
        if zeros >= 2 && byte <= 3 {
            out.push(0x03);
            zeros = 0;
        }
        out.push(byte);
        zeros = if byte == 0 { zeros + 1 } else { 0 };
    }
    out
}

/// Baseline profile SPS with id 0.
pub(crate) fn sps_nal(
    width_mbs: u32,
    height_mbs: u32,
    crop: Option<(u32, u32, u32, u32)>,
    sar: Option<(u32, u32)>,
) -> Vec<u8> {
    let mut w = BitWriter::default();
    w.bits(66, 8).bits(0xC0, 8).bits(30, 8);
    w.ue(0); // seq_parameter_set_id
    w.ue(0); // log2_max_frame_num_minus4
    w.ue(0); // pic_order_cnt_type
    w.ue(0); // log2_max_pic_order_cnt_lsb_minus4
    w.ue(1); // max_num_ref_frames
    w.flag(false);
    w.ue(width_mbs - 1).ue(height_mbs - 1);
    w.flag(true); // frame_mbs_only_flag
    w.flag(true); // direct_8x8_inference_flag
    match crop {
        Some((left, right, top, bottom)) => {
            w.flag(true).ue(left).ue(right).ue(top).ue(bottom);
        }
        None => {
            w.flag(false);
        }
    }
    match sar {
        Some((sar_w, sar_h)) => {
            w.flag(true).flag(true).bits(255, 8).bits(sar_w, 16).bits(sar_h, 16);
            w.bits(0, 8); // remaining VUI flags
        }
        None => {
            w.flag(false);
        }
    }
    nal(0x67, &w.finish())
}

/// PPS with id 0 referencing SPS 0.
pub(crate) fn pps_nal() -> Vec<u8> {
    let mut w = BitWriter::default();
    w.ue(0).ue(0).flag(false).flag(false);
    w.ue(0); // num_slice_groups_minus1
    w.ue(0).ue(0); // num_ref_idx_l0/l1_default_active_minus1
    w.flag(false).bits(0, 2);
    w.se(0).se(0).se(0);
    w.flag(true).flag(false).flag(false);
    nal(0x68, &w.finish())
}

/// A slice NAL referencing PPS `pps_id`.
pub(crate) fn slice_nal(idr: bool, pps_id: u32) -> Vec<u8> {
    let mut w = BitWriter::default();
    w.ue(0); // first_mb_in_slice
    w.ue(if idr { 7 } else { 5 });
    w.ue(pps_id);
    w.bits(0xA5, 8);
    nal(if idr { 0x65 } else { 0x41 }, &w.finish())
}

/// Access unit delimiter NAL.
pub(crate) fn aud_nal() -> Vec<u8> {
    vec![0x09, 0xF0]
}

/// Joins NAL units with 4-byte start codes.
pub(crate) fn annex_b(nals: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for nal in nals {
        out.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
        out.extend_from_slice(nal);
    }
    out
}

#[test]
fn test_remove_emulation_prevention() {
    // Test basic emulation prevention removal
    let input = vec![0x00, 0x00, 0x03, 0x01];
    assert_eq!(remove_emulation_prevention(&input), vec![0x00, 0x00, 0x01]);

    // Test multiple emulation prevention bytes
    let input = vec![0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03, 0x02];
    assert_eq!(
        remove_emulation_prevention(&input),
        vec![0x00, 0x00, 0x01, 0x00, 0x00, 0x02]
    );

    // Test no emulation prevention bytes
    let input = vec![0x00, 0x01, 0x02, 0x03];
    assert_eq!(remove_emulation_prevention(&input), input);
}

#[test]
fn test_find_start_code() {
    assert_eq!(find_start_code(&[0x00, 0x00, 0x01, 0x09]), Some((0, 3)));
    assert_eq!(find_start_code(&[0xAA, 0x00, 0x00, 0x00, 0x01]), Some((1, 4)));
    assert_eq!(find_start_code(&[0x00, 0x00, 0x02, 0x00, 0x00]), None);
    assert_eq!(find_start_code(&[]), None);
}

#[test]
fn test_nal_units_split() {
    let mut data = vec![0xEE];
    data.extend(annex_b(&[aud_nal(), vec![0x41, 0x9A]]));
    // A 3-byte start code followed by an empty unit and trailing data
    data.extend_from_slice(&[0x00, 0x00, 0x01, 0x00, 0x00, 0x01, 0x06, 0x05]);

    let nals: Vec<_> = nal_units(Bytes::from(data))
        .collect::<crate::Result<Vec<_>>>()
        .unwrap();
    let types: Vec<_> = nals.iter().map(|n| n.nal_type).collect();
    assert_eq!(
        types,
        vec![
            NALUnitType::AccessUnitDelimiter,
            NALUnitType::CodedSliceNonIDR,
            NALUnitType::SEI
        ]
    );
    assert_eq!(&nals[1].data[..], &[0x41, 0x9A]);
    assert_eq!(nals[1].nal_ref_idc, 2);
}

#[test]
fn test_forbidden_bit_is_rejected() {
    let data = Bytes::from(annex_b(&[vec![0x89, 0x00]]));
    let mut iter = nal_units(data);
    assert!(iter.next().unwrap().is_err());
    assert!(iter.next().is_none());
}

#[test]
fn test_parse_sps_with_cropping() {
    let mut parser = H264Parser::new();
    let sps = NALUnit::new(Bytes::from(sps_nal(120, 68, Some((0, 0, 0, 4)), None)));
    assert_eq!(parser.parse_sps(&sps).unwrap(), 0);

    let info = parser.sps(0).unwrap();
    assert_eq!(info.profile(), VideoCodecProfile::H264Baseline);
    assert_eq!(info.level_idc, 30);
    assert_eq!(info.coded_size(), Size::new(1920, 1088));
    assert_eq!(info.visible_rect(), Rect::new(0, 0, 1920, 1080));
    assert_eq!(info.sar, None);
}

#[test]
fn test_parse_sps_with_sar() {
    let mut parser = H264Parser::new();
    let sps = NALUnit::new(Bytes::from(sps_nal(45, 36, None, Some((4, 3)))));
    parser.parse_sps(&sps).unwrap();
    let info = parser.sps(0).unwrap();
    assert_eq!(info.coded_size(), Size::new(720, 576));
    assert_eq!(info.sar, Some((4, 3)));
}

#[test]
fn test_sps_with_oversized_frame_num_is_rejected() {
    let mut parser = H264Parser::new();
    // log2_max_frame_num_minus4 is a 31-zero Golomb code
    let sps = NALUnit::new(Bytes::from(vec![
        0x67, 66, 0, 30, 0x80, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF,
    ]));
    assert!(matches!(parser.parse_sps(&sps), Err(Mp2tError::Codec(_))));
    assert!(parser.sps(0).is_none());
}

#[test]
fn test_pps_requires_sps() {
    let mut parser = H264Parser::new();
    let pps = NALUnit::new(Bytes::from(pps_nal()));
    assert!(parser.parse_pps(&pps).is_err());

    let sps = NALUnit::new(Bytes::from(sps_nal(20, 15, None, None)));
    parser.parse_sps(&sps).unwrap();
    assert_eq!(parser.parse_pps(&pps).unwrap(), 0);
    assert_eq!(parser.pps(0).unwrap().seq_parameter_set_id, 0);
}

#[test]
fn test_slice_header() {
    let mut parser = H264Parser::new();
    let idr = NALUnit::new(Bytes::from(slice_nal(true, 0)));
    assert!(parser.parse_slice_header(&idr).is_err());

    parser
        .parse_sps(&NALUnit::new(Bytes::from(sps_nal(20, 15, None, None))))
        .unwrap();
    parser.parse_pps(&NALUnit::new(Bytes::from(pps_nal()))).unwrap();

    let header = parser.parse_slice_header(&idr).unwrap();
    assert!(header.idr_pic);
    assert_eq!(header.slice_type, 7);
    assert_eq!(header.pic_parameter_set_id, 0);

    let p_slice = NALUnit::new(Bytes::from(slice_nal(false, 0)));
    assert!(!parser.parse_slice_header(&p_slice).unwrap().idr_pic);

    let unknown_pps = NALUnit::new(Bytes::from(slice_nal(false, 3)));
    assert!(parser.parse_slice_header(&unknown_pps).is_err());

    parser.reset();
    assert!(parser.parse_slice_header(&idr).is_err());
}
