use bytes::Bytes;
use std::collections::HashMap;

use super::types::{
    NALUnit, NALUnitType, PPSInfo, SPSInfo, SliceHeader, EXTENDED_SAR, SAR_TABLE,
};
use crate::error::{Mp2tError, Result};
use crate::utils::BitReader;

const MAX_SPS_ID: u32 = 31;
const MAX_PPS_ID: u32 = 255;

/// Locates the next Annex-B start code in `data`.
///
/// Returns `(offset, start_code_size)`. A zero byte right before `00 00 01`
/// is counted as part of a 4-byte start code, so `offset` points at it.
pub fn find_start_code(data: &[u8]) -> Option<(usize, usize)> {
    let pos = data.windows(3).position(|w| w == [0x00, 0x00, 0x01])?;
    if pos > 0 && data[pos - 1] == 0x00 {
        Some((pos - 1, 4))
    } else {
        Some((pos, 3))
    }
}

/// Strips emulation prevention bytes (`00 00 03` becomes `00 00`).
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        if i + 2 < data.len() && data[i] == 0x00 && data[i + 1] == 0x00 && data[i + 2] == 0x03 {
            out.extend_from_slice(&[0x00, 0x00]);
            i += 3;
            continue;
        }
        out.push(data[i]);
        i += 1;
    }

    out
}

/// Splits an Annex-B byte range into NAL units.
///
/// Bytes before the first start code are ignored, as are empty units.
pub fn nal_units(data: Bytes) -> NalUnitIter {
    NalUnitIter { data, pos: 0 }
}

/// Iterator returned by [`nal_units`].
#[derive(Debug)]
pub struct NalUnitIter {
    data: Bytes,
    pos: usize,
}

impl Iterator for NalUnitIter {
    type Item = Result<NALUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (offset, size) = find_start_code(&self.data[self.pos..])?;
            let begin = self.pos + offset + size;
            let end = find_start_code(&self.data[begin..])
                .map(|(next, _)| begin + next)
                .unwrap_or(self.data.len());
            self.pos = end;

            if begin == end {
                continue;
            }
            if self.data[begin] & 0x80 != 0 {
                self.pos = self.data.len();
                return Some(Err(Mp2tError::Codec(
                    "NAL unit with forbidden_zero_bit set".into(),
                )));
            }

            let nalu = NALUnit::new(self.data.slice(begin..end));
            log::trace!("nal unit {:?}, {} bytes", nalu.nal_type, nalu.data.len());
            return Some(Ok(nalu));
        }
    }
}

/// Tracks the active parameter sets of an H.264 stream.
#[derive(Debug, Default)]
pub struct H264Parser {
    sps: HashMap<u32, SPSInfo>,
    pps: HashMap<u32, PPSInfo>,
}

impl H264Parser {
    /// Creates a parser with no parameter sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every parameter set.
    pub fn reset(&mut self) {
        self.sps.clear();
        self.pps.clear();
    }

    /// The SPS stored under `id`, if any.
    pub fn sps(&self, id: u32) -> Option<&SPSInfo> {
        self.sps.get(&id)
    }

    /// The PPS stored under `id`, if any.
    pub fn pps(&self, id: u32) -> Option<&PPSInfo> {
        self.pps.get(&id)
    }

    /// Parses and stores an SPS, returning its id.
    pub fn parse_sps(&mut self, nalu: &NALUnit) -> Result<u32> {
        if nalu.nal_type != NALUnitType::SPS {
            return Err(Mp2tError::Codec("not an SPS NAL unit".into()));
        }
        let rbsp = remove_emulation_prevention(nalu.payload());
        let sps = Self::read_sps(&mut BitReader::new(&rbsp[..]))?;
        let id = sps.seq_parameter_set_id;
        log::trace!(
            "sps {}: profile {} level {} {}x{} mbs",
            id,
            sps.profile_idc,
            sps.level_idc,
            sps.pic_width_in_mbs,
            sps.pic_height_in_map_units
        );
        self.sps.insert(id, sps);
        Ok(id)
    }

    /// Parses and stores a PPS, returning its id. Fails when the referenced
    /// SPS has not been seen.
    pub fn parse_pps(&mut self, nalu: &NALUnit) -> Result<u32> {
        if nalu.nal_type != NALUnitType::PPS {
            return Err(Mp2tError::Codec("not a PPS NAL unit".into()));
        }
        let rbsp = remove_emulation_prevention(nalu.payload());
        let mut reader = BitReader::new(&rbsp[..]);

        let pic_parameter_set_id = reader.read_golomb()?;
        if pic_parameter_set_id > MAX_PPS_ID {
            return Err(Mp2tError::Codec(format!(
                "invalid pps id {}",
                pic_parameter_set_id
            )));
        }
        let seq_parameter_set_id = reader.read_golomb()?;
        if !self.sps.contains_key(&seq_parameter_set_id) {
            return Err(Mp2tError::Codec(format!(
                "pps {} references unknown sps {}",
                pic_parameter_set_id, seq_parameter_set_id
            )));
        }
        let entropy_coding_mode_flag = reader.read_flag()?;

        self.pps.insert(
            pic_parameter_set_id,
            PPSInfo {
                pic_parameter_set_id,
                seq_parameter_set_id,
                entropy_coding_mode_flag,
            },
        );
        Ok(pic_parameter_set_id)
    }

    /// Reads the first fields of a slice header. Fails when the slice's PPS,
    /// or that PPS's SPS, is unknown.
    pub fn parse_slice_header(&self, nalu: &NALUnit) -> Result<SliceHeader> {
        if !nalu.is_slice() {
            return Err(Mp2tError::Codec("not a slice NAL unit".into()));
        }
        let rbsp = remove_emulation_prevention(nalu.payload());
        let mut reader = BitReader::new(&rbsp[..]);

        let first_mb_in_slice = reader.read_golomb()?;
        let slice_type = reader.read_golomb()?;
        if slice_type > 9 {
            return Err(Mp2tError::Codec(format!("invalid slice type {}", slice_type)));
        }
        let pic_parameter_set_id = reader.read_golomb()?;

        let pps = self.pps.get(&pic_parameter_set_id).ok_or_else(|| {
            Mp2tError::Codec(format!("slice references unknown pps {}", pic_parameter_set_id))
        })?;
        if !self.sps.contains_key(&pps.seq_parameter_set_id) {
            return Err(Mp2tError::Codec(format!(
                "slice references unknown sps {}",
                pps.seq_parameter_set_id
            )));
        }

        Ok(SliceHeader {
            first_mb_in_slice,
            slice_type,
            pic_parameter_set_id,
            idr_pic: nalu.nal_type == NALUnitType::CodedSliceIDR,
        })
    }

    fn read_sps<B: bytes::Buf>(reader: &mut BitReader<B>) -> Result<SPSInfo> {
        let profile_idc = reader.read_bits(8)? as u8;
        let constraint_flags = reader.read_bits(8)? as u8;
        let level_idc = reader.read_bits(8)? as u8;

        let seq_parameter_set_id = reader.read_golomb()?;
        if seq_parameter_set_id > MAX_SPS_ID {
            return Err(Mp2tError::Codec(format!(
                "invalid sps id {}",
                seq_parameter_set_id
            )));
        }

        let mut chroma_format_idc = 1;
        let mut separate_colour_plane_flag = false;
        if matches!(
            profile_idc,
            100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
        ) {
            chroma_format_idc = reader.read_golomb()?;
            if chroma_format_idc > 3 {
                return Err(Mp2tError::Codec(format!(
                    "invalid chroma_format_idc {}",
                    chroma_format_idc
                )));
            }
            if chroma_format_idc == 3 {
                separate_colour_plane_flag = reader.read_flag()?;
            }
            reader.read_golomb()?; // bit_depth_luma_minus8
            reader.read_golomb()?; // bit_depth_chroma_minus8
            reader.read_flag()?; // qpprime_y_zero_transform_bypass_flag

            if reader.read_flag()? {
                let count = if chroma_format_idc != 3 { 8 } else { 12 };
                for i in 0..count {
                    if reader.read_flag()? {
                        Self::skip_scaling_list(reader, if i < 6 { 16 } else { 64 })?;
                    }
                }
            }
        }

        let log2_max_frame_num_minus4 = reader.read_golomb()?;
        if log2_max_frame_num_minus4 > 12 {
            return Err(Mp2tError::Codec(format!(
                "invalid log2_max_frame_num_minus4 {}",
                log2_max_frame_num_minus4
            )));
        }
        let log2_max_frame_num = log2_max_frame_num_minus4 + 4;
        let pic_order_cnt_type = reader.read_golomb()?;
        match pic_order_cnt_type {
            0 => {
                reader.read_golomb()?; // log2_max_pic_order_cnt_lsb_minus4
            }
            1 => {
                reader.read_flag()?; // delta_pic_order_always_zero_flag
                reader.read_signed_golomb()?; // offset_for_non_ref_pic
                reader.read_signed_golomb()?; // offset_for_top_to_bottom_field
                let cycle = reader.read_golomb()?;
                if cycle > 255 {
                    return Err(Mp2tError::Codec(
                        "num_ref_frames_in_pic_order_cnt_cycle out of range".into(),
                    ));
                }
                for _ in 0..cycle {
                    reader.read_signed_golomb()?;
                }
            }
            2 => {}
            _ => {
                return Err(Mp2tError::Codec(format!(
                    "invalid pic_order_cnt_type {}",
                    pic_order_cnt_type
                )))
            }
        }

        let max_num_ref_frames = reader.read_golomb()?;
        reader.read_flag()?; // gaps_in_frame_num_value_allowed_flag

        let pic_width_in_mbs = reader
            .read_golomb()?
            .checked_add(1)
            .ok_or_else(|| Mp2tError::Codec("pic_width_in_mbs out of range".into()))?;
        let pic_height_in_map_units = reader
            .read_golomb()?
            .checked_add(1)
            .ok_or_else(|| Mp2tError::Codec("pic_height_in_map_units out of range".into()))?;
        let frame_mbs_only_flag = reader.read_flag()?;
        if !frame_mbs_only_flag {
            reader.read_flag()?; // mb_adaptive_frame_field_flag
        }
        reader.read_flag()?; // direct_8x8_inference_flag

        let frame_crop = if reader.read_flag()? {
            Some((
                reader.read_golomb()?,
                reader.read_golomb()?,
                reader.read_golomb()?,
                reader.read_golomb()?,
            ))
        } else {
            None
        };

        let mut sar = None;
        let vui_parameters_present = reader.read_flag()?;
        if vui_parameters_present && reader.read_flag()? {
            let aspect_ratio_idc = reader.read_bits(8)?;
            sar = match aspect_ratio_idc {
                0 => None,
                EXTENDED_SAR => Some((reader.read_bits(16)?, reader.read_bits(16)?)),
                idc if (idc as usize) <= SAR_TABLE.len() => Some(SAR_TABLE[idc as usize - 1]),
                idc => {
                    return Err(Mp2tError::Codec(format!(
                        "invalid aspect_ratio_idc {}",
                        idc
                    )))
                }
            };
        }

        Ok(SPSInfo {
            profile_idc,
            constraint_flags,
            level_idc,
            seq_parameter_set_id,
            chroma_format_idc,
            separate_colour_plane_flag,
            log2_max_frame_num,
            pic_order_cnt_type,
            max_num_ref_frames,
            pic_width_in_mbs,
            pic_height_in_map_units,
            frame_mbs_only_flag,
            frame_crop,
            sar,
        })
    }

    fn skip_scaling_list<B: bytes::Buf>(reader: &mut BitReader<B>, size: usize) -> Result<()> {
        let mut last_scale = 8;
        let mut next_scale = 8;

        for _ in 0..size {
            if next_scale != 0 {
                let delta_scale = reader.read_signed_golomb()?;
                if !(-128..=127).contains(&delta_scale) {
                    return Err(Mp2tError::Codec("delta_scale out of range".into()));
                }
                next_scale = (last_scale + delta_scale + 256) % 256;
            }
            last_scale = if next_scale == 0 { last_scale } else { next_scale };
        }

        Ok(())
    }
}
