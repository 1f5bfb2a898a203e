use crate::av::ChannelLayout;
use crate::error::{Mp2tError, Result};
use crate::utils::BitReader;

/// Size of an MPEG audio frame header.
pub const MPEG_AUDIO_HEADER_SIZE: usize = 4;

/// Audio version ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    /// MPEG-2.5, an unofficial low sample rate extension.
    V2_5,
    /// MPEG-2 LSF.
    V2,
    /// MPEG-1.
    V1,
}

/// Layer description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegLayer {
    /// Layer I.
    Layer1,
    /// Layer II.
    Layer2,
    /// Layer III.
    Layer3,
}

/// Channel mode bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    /// Stereo.
    Stereo,
    /// Joint stereo.
    JointStereo,
    /// Two independent mono channels.
    DualChannel,
    /// Single channel.
    Mono,
}

impl From<u8> for ChannelMode {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        }
    }
}

/// Bitrates in kbps, columns V1L1, V1L2, V1L3, V2L1, V2L2/L3.
/// Index 0 is free format and 15 is invalid.
const BITRATE_TABLE: [[u32; 5]; 16] = [
    [0, 0, 0, 0, 0],
    [32, 32, 32, 32, 8],
    [64, 48, 40, 48, 16],
    [96, 56, 48, 56, 24],
    [128, 64, 56, 64, 32],
    [160, 80, 64, 80, 40],
    [192, 96, 80, 96, 48],
    [224, 112, 96, 112, 56],
    [256, 128, 112, 128, 64],
    [288, 160, 128, 144, 80],
    [320, 192, 160, 160, 96],
    [352, 224, 192, 176, 112],
    [384, 256, 224, 192, 128],
    [416, 320, 256, 224, 144],
    [448, 384, 320, 256, 160],
    [0, 0, 0, 0, 0],
];

/// Sample rates indexed by `[sampling_frequency][version]`, version order
/// 2.5, reserved, 2, 1.
const SAMPLE_RATE_TABLE: [[u32; 4]; 3] = [
    [11025, 0, 22050, 44100],
    [12000, 0, 24000, 48000],
    [8000, 0, 16000, 32000],
];

/// A decoded MPEG-1/2/2.5 audio frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpegAudioHeader {
    /// MPEG version.
    pub version: MpegVersion,
    /// Layer.
    pub layer: MpegLayer,
    /// A CRC follows the header
    pub protected: bool,
    /// Bitrate in kbit/s. Free format is rejected, so never zero.
    pub bitrate_kbps: u32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// One padding slot is appended.
    pub padding: bool,
    /// Channel mode.
    pub channel_mode: ChannelMode,
    /// Whole frame length in bytes, header included
    pub frame_size: usize,
    /// PCM samples per channel carried by the frame
    pub sample_count: u32,
}

impl MpegAudioHeader {
    /// Mono for single channel frames, stereo otherwise.
    pub fn channel_layout(&self) -> ChannelLayout {
        if self.channel_mode == ChannelMode::Mono {
            ChannelLayout::Mono
        } else {
            ChannelLayout::Stereo
        }
    }
}

/// Decodes the 4-byte frame header at the start of `data`.
pub fn parse_mpeg_audio_header(data: &[u8]) -> Result<MpegAudioHeader> {
    if data.len() < MPEG_AUDIO_HEADER_SIZE {
        return Err(Mp2tError::Parser("MPEG audio header too short".into()));
    }

    let mut reader = BitReader::new(&data[..MPEG_AUDIO_HEADER_SIZE]);
    let sync = reader.read_bits(11)?;
    let version_bits = reader.read_bits(2)? as usize;
    let layer_bits = reader.read_bits(2)?;
    let protection_bit = reader.read_flag()?;
    let bitrate_index = reader.read_bits(4)? as usize;
    let sample_rate_index = reader.read_bits(2)? as usize;
    let padding = reader.read_flag()?;
    reader.skip_bits(1)?; // private_bit
    let channel_mode = ChannelMode::from(reader.read_bits(2)? as u8);
    reader.skip_bits(6)?; // mode_extension, copyright, original, emphasis

    if sync != 0x7FF {
        return Err(Mp2tError::Parser("Invalid MPEG audio sync word".into()));
    }

    let version = match version_bits {
        0 => MpegVersion::V2_5,
        2 => MpegVersion::V2,
        3 => MpegVersion::V1,
        _ => return Err(Mp2tError::Parser("Reserved MPEG audio version".into())),
    };
    let layer = match layer_bits {
        1 => MpegLayer::Layer3,
        2 => MpegLayer::Layer2,
        3 => MpegLayer::Layer1,
        _ => return Err(Mp2tError::Parser("Reserved MPEG audio layer".into())),
    };

    if bitrate_index == 0 || bitrate_index == 15 {
        return Err(Mp2tError::Parser(format!(
            "Unsupported MPEG audio bitrate index {}",
            bitrate_index
        )));
    }
    if sample_rate_index == 3 {
        return Err(Mp2tError::Parser("Reserved MPEG audio sample rate".into()));
    }

    let column = match (version, layer) {
        (MpegVersion::V1, MpegLayer::Layer1) => 0,
        (MpegVersion::V1, MpegLayer::Layer2) => 1,
        (MpegVersion::V1, MpegLayer::Layer3) => 2,
        (_, MpegLayer::Layer1) => 3,
        _ => 4,
    };
    let bitrate_kbps = BITRATE_TABLE[bitrate_index][column];
    let sample_rate = SAMPLE_RATE_TABLE[sample_rate_index][version_bits];

    // MPEG-1 Layer II only allows some bitrate and channel mode pairs.
    if version == MpegVersion::V1 && layer == MpegLayer::Layer2 {
        let mono = channel_mode == ChannelMode::Mono;
        let mono_only = matches!(bitrate_kbps, 32 | 48 | 56 | 80);
        let stereo_only = bitrate_kbps >= 224;
        if (mono_only && !mono) || (stereo_only && mono) {
            return Err(Mp2tError::Parser(format!(
                "Invalid Layer II bitrate {} kbps for channel mode {:?}",
                bitrate_kbps, channel_mode
            )));
        }
    }

    let sample_count = match layer {
        MpegLayer::Layer1 => 384,
        MpegLayer::Layer2 => 1152,
        MpegLayer::Layer3 if version == MpegVersion::V1 => 1152,
        MpegLayer::Layer3 => 576,
    };

    let bitrate = bitrate_kbps as usize * 1000;
    let frame_size = match layer {
        MpegLayer::Layer1 => (12 * bitrate / sample_rate as usize + padding as usize) * 4,
        _ => (sample_count as usize / 8) * bitrate / sample_rate as usize + padding as usize,
    };

    Ok(MpegAudioHeader {
        version,
        layer,
        protected: !protection_bit,
        bitrate_kbps,
        sample_rate,
        padding,
        channel_mode,
        frame_size,
        sample_count,
    })
}
