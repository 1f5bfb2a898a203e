use std::time::Duration;

use super::{CodecData, CodecType};

/// Speaker arrangement of an audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    /// One channel.
    Mono,
    /// L, R.
    Stereo,
    /// L, R, C
    Surround,
    /// L, R, C, Cs
    FourZero,
    /// L, R, C, Bl, Br
    FiveZeroBack,
    /// L, R, C, LFE, Bl, Br
    FiveOneBack,
    /// L, R, C, LFE, Bl, Br, Lw, Rw
    SevenOneWide,
}

impl ChannelLayout {
    /// Number of channels in the layout.
    pub fn channel_count(&self) -> u32 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
            ChannelLayout::Surround => 3,
            ChannelLayout::FourZero => 4,
            ChannelLayout::FiveZeroBack => 5,
            ChannelLayout::FiveOneBack => 6,
            ChannelLayout::SevenOneWide => 8,
        }
    }
}

/// H.264 profile, derived from `profile_idc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoCodecProfile {
    /// Baseline, `profile_idc` 66.
    H264Baseline,
    /// Main, 77.
    H264Main,
    /// Extended, 88.
    H264Extended,
    /// High, 100.
    H264High,
    /// High 10, 110.
    H264High10,
    /// High 4:2:2, 122.
    H264High422,
    /// High 4:4:4 Predictive, 244.
    H264High444Predictive,
    /// Any other `profile_idc`.
    Unknown,
}

impl From<u8> for VideoCodecProfile {
    fn from(profile_idc: u8) -> Self {
        match profile_idc {
            66 => VideoCodecProfile::H264Baseline,
            77 => VideoCodecProfile::H264Main,
            88 => VideoCodecProfile::H264Extended,
            100 => VideoCodecProfile::H264High,
            110 => VideoCodecProfile::H264High10,
            122 => VideoCodecProfile::H264High422,
            244 => VideoCodecProfile::H264High444Predictive,
            _ => VideoCodecProfile::Unknown,
        }
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Size {
    /// Builds a size.
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// A pixel rectangle inside a coded picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Rect {
    /// Builds a rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Width and height without the origin.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Everything an audio decoder needs before the first frame.
///
/// Two configs compare equal exactly when a decoder would not need to be
/// reconfigured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDecoderConfig {
    /// Always [`CodecType::AAC`] or [`CodecType::MP3`].
    pub codec: CodecType,
    /// Speaker arrangement.
    pub channel_layout: ChannelLayout,
    /// Output sample rate. Twice the ADTS rate when SBR is signalled.
    pub samples_per_second: u32,
    /// AudioSpecificConfig for AAC, empty for MPEG audio.
    pub extra_data: Vec<u8>,
}

/// Everything a video decoder needs before the first frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDecoderConfig {
    /// Always [`CodecType::H264`].
    pub codec: CodecType,
    /// Profile from the SPS.
    pub profile: VideoCodecProfile,
    /// Decoded picture size in whole macroblocks.
    pub coded_size: Size,
    /// Area left after cropping.
    pub visible_rect: Rect,
    /// Visible size stretched by the sample aspect ratio
    pub natural_size: Size,
    /// Unused for Annex B streams, always empty.
    pub extra_data: Vec<u8>,
}

impl CodecData for AudioDecoderConfig {
    fn codec_type(&self) -> CodecType {
        self.codec
    }

    fn width(&self) -> Option<u32> {
        None
    }

    fn height(&self) -> Option<u32> {
        None
    }

    fn extra_data(&self) -> Option<&[u8]> {
        (!self.extra_data.is_empty()).then_some(self.extra_data.as_slice())
    }

    fn sample_rate(&self) -> Option<u32> {
        Some(self.samples_per_second)
    }
}

impl CodecData for VideoDecoderConfig {
    fn codec_type(&self) -> CodecType {
        self.codec
    }

    fn width(&self) -> Option<u32> {
        u32::try_from(self.natural_size.width).ok()
    }

    fn height(&self) -> Option<u32> {
        u32::try_from(self.natural_size.height).ok()
    }

    fn extra_data(&self) -> Option<&[u8]> {
        (!self.extra_data.is_empty()).then_some(self.extra_data.as_slice())
    }
}

/// The audio/video config pair reported to a consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaTracks {
    /// Audio config, when an audio stream is selected.
    pub audio: Option<AudioDecoderConfig>,
    /// Video config, when a video stream is selected.
    pub video: Option<VideoDecoderConfig>,
}

/// Stream properties reported once the first configs are known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitParameters {
    /// `None` when the container carries no duration, which is always the
    /// case for a transport stream.
    pub duration: Option<Duration>,
}
