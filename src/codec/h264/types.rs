use bytes::Bytes;

use crate::av::{Rect, Size, VideoCodecProfile};

/// One NAL unit, header byte included, emulation prevention bytes still in place.
#[derive(Debug, Clone)]
pub struct NALUnit {
    /// Type from the low five header bits.
    pub nal_type: NALUnitType,
    /// Two-bit reference priority. Zero means the unit is never referenced.
    pub nal_ref_idc: u8,
    /// Full unit bytes.
    pub data: Bytes,
}

impl NALUnit {
    /// Wraps `data`, whose first byte is the NAL header. `data` must not be empty.
    pub fn new(data: Bytes) -> Self {
        let header = data[0];
        Self {
            nal_type: NALUnitType::from(header & 0x1F),
            nal_ref_idc: (header >> 5) & 0x03,
            data,
        }
    }

    /// Bytes following the one-byte NAL header.
    pub fn payload(&self) -> &[u8] {
        &self.data[1..]
    }

    /// True for IDR and non-IDR coded slices.
    pub fn is_slice(&self) -> bool {
        matches!(
            self.nal_type,
            NALUnitType::CodedSliceNonIDR | NALUnitType::CodedSliceIDR
        )
    }
}

/// Sequence parameter set fields needed to describe the coded picture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SPSInfo {
    /// Profile indicator.
    pub profile_idc: u8,
    /// The `constraint_set0..5` flags and reserved bits.
    pub constraint_flags: u8,
    /// Level indicator, ten times the level number.
    pub level_idc: u8,
    /// SPS id, 0 to 31.
    pub seq_parameter_set_id: u32,
    /// 0 = monochrome, 1 = 4:2:0, 2 = 4:2:2, 3 = 4:4:4. Defaults to 1 outside the high profiles.
    pub chroma_format_idc: u32,
    /// 4:4:4 planes coded separately.
    pub separate_colour_plane_flag: bool,
    /// Bits used by `frame_num` in slice headers.
    pub log2_max_frame_num: u32,
    /// Picture order count type.
    pub pic_order_cnt_type: u32,
    /// Maximum reference frames.
    pub max_num_ref_frames: u32,
    /// Width in macroblocks.
    pub pic_width_in_mbs: u32,
    /// Height in map units: macroblocks for frames, macroblock pairs for fields.
    pub pic_height_in_map_units: u32,
    /// No field coding.
    pub frame_mbs_only_flag: bool,
    /// left, right, top, bottom, in crop units
    pub frame_crop: Option<(u32, u32, u32, u32)>,
    /// Sample aspect ratio as (width, height), when the VUI signals one
    pub sar: Option<(u32, u32)>,
}

impl SPSInfo {
    /// Maps `profile_idc` to a known profile.
    pub fn profile(&self) -> VideoCodecProfile {
        VideoCodecProfile::from(self.profile_idc)
    }

    /// Size of the decoded picture in whole macroblocks.
    pub fn coded_size(&self) -> Size {
        let field_factor = if self.frame_mbs_only_flag { 1 } else { 2 };
        let width = self.pic_width_in_mbs as i64 * 16;
        let height = self.pic_height_in_map_units as i64 * field_factor * 16;
        Size::new(clamp_i32(width), clamp_i32(height))
    }

    /// The picture area left after frame cropping.
    ///
    /// Crop offsets count chroma samples, so they scale by the chroma
    /// subsampling factors (and by two vertically for field coding).
    pub fn visible_rect(&self) -> Rect {
        let coded = self.coded_size();
        let Some((left, right, top, bottom)) = self.frame_crop else {
            return Rect::new(0, 0, coded.width, coded.height);
        };

        let field_factor: i64 = if self.frame_mbs_only_flag { 1 } else { 2 };
        let chroma_array_type = if self.separate_colour_plane_flag {
            0
        } else {
            self.chroma_format_idc
        };
        let (unit_x, unit_y) = match chroma_array_type {
            0 => (1, field_factor),
            1 => (2, 2 * field_factor),
            2 => (2, field_factor),
            _ => (1, field_factor),
        };

        let x = left as i64 * unit_x;
        let y = top as i64 * unit_y;
        let width = coded.width as i64 - (left as i64 + right as i64) * unit_x;
        let height = coded.height as i64 - (top as i64 + bottom as i64) * unit_y;
        Rect::new(clamp_i32(x), clamp_i32(y), clamp_i32(width), clamp_i32(height))
    }
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Picture parameter set fields used to resolve slices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PPSInfo {
    /// PPS id.
    pub pic_parameter_set_id: u32,
    /// The SPS this PPS refers to.
    pub seq_parameter_set_id: u32,
    /// CABAC rather than CAVLC.
    pub entropy_coding_mode_flag: bool,
}

/// The leading fields of a slice header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceHeader {
    /// Address of the first macroblock.
    pub first_mb_in_slice: u32,
    /// Slice type; values 5 to 9 mean every slice of the picture has the same type.
    pub slice_type: u32,
    /// PPS the slice refers to.
    pub pic_parameter_set_id: u32,
    /// Taken from the NAL unit type.
    pub idr_pic: bool,
}

/// NAL unit types (H.264 Table 7-1). Values not listed map to `Reserved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NALUnitType {
    /// Unspecified.
    Unspecified = 0,
    /// Slice of a non-IDR picture.
    CodedSliceNonIDR = 1,
    /// Data partition A.
    CodedSliceDataPartitionA = 2,
    /// Data partition B.
    CodedSliceDataPartitionB = 3,
    /// Data partition C.
    CodedSliceDataPartitionC = 4,
    /// Slice of an IDR picture.
    CodedSliceIDR = 5,
    /// Supplemental enhancement information.
    SEI = 6,
    /// Sequence parameter set.
    SPS = 7,
    /// Picture parameter set.
    PPS = 8,
    /// Access unit delimiter.
    AccessUnitDelimiter = 9,
    /// End of sequence.
    EndOfSequence = 10,
    /// End of stream.
    EndOfStream = 11,
    /// Filler data.
    FillerData = 12,
    /// SPS extension.
    SPSExtension = 13,
    /// Prefix NAL unit.
    Prefix = 14,
    /// Subset SPS.
    SubsetSPS = 15,
    /// Auxiliary coded picture slice.
    CodedSliceAux = 19,
    /// Coded slice extension.
    CodedSliceExtension = 20,
    /// Reserved or unknown.
    Reserved = 31,
}

impl From<u8> for NALUnitType {
    fn from(value: u8) -> Self {
        match value {
            0 => NALUnitType::Unspecified,
            1 => NALUnitType::CodedSliceNonIDR,
            2 => NALUnitType::CodedSliceDataPartitionA,
            3 => NALUnitType::CodedSliceDataPartitionB,
            4 => NALUnitType::CodedSliceDataPartitionC,
            5 => NALUnitType::CodedSliceIDR,
            6 => NALUnitType::SEI,
            7 => NALUnitType::SPS,
            8 => NALUnitType::PPS,
            9 => NALUnitType::AccessUnitDelimiter,
            10 => NALUnitType::EndOfSequence,
            11 => NALUnitType::EndOfStream,
            12 => NALUnitType::FillerData,
            13 => NALUnitType::SPSExtension,
            14 => NALUnitType::Prefix,
            15 => NALUnitType::SubsetSPS,
            19 => NALUnitType::CodedSliceAux,
            20 => NALUnitType::CodedSliceExtension,
            _ => NALUnitType::Reserved,
        }
    }
}

/// Sample aspect ratios for `aspect_ratio_idc` 1 to 16 (H.264 Table E-1).
pub(crate) const SAR_TABLE: [(u32, u32); 16] = [
    (1, 1),
    (12, 11),
    (10, 11),
    (16, 11),
    (40, 33),
    (24, 11),
    (20, 11),
    (32, 11),
    (80, 33),
    (18, 11),
    (15, 11),
    (64, 33),
    (160, 99),
    (4, 3),
    (3, 2),
    (2, 1),
];

/// `aspect_ratio_idc` value announcing explicit sar_width/sar_height fields.
pub(crate) const EXTENDED_SAR: u32 = 255;
