use crate::av::ChannelLayout;

/// Size of an ADTS header without CRC.
pub const ADTS_HEADER_MIN_SIZE: usize = 7;

/// Number of PCM samples in one AAC frame.
pub const SAMPLES_PER_AAC_FRAME: i64 = 1024;

/// Sampling frequencies indexed by `sampling_frequency_index`.
pub const ADTS_FREQUENCY_TABLE: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// Channel layouts indexed by `channel_configuration`. Index 0 means the
/// layout lives in the bitstream, which ADTS framing cannot describe.
pub const ADTS_CHANNEL_LAYOUT_TABLE: [Option<ChannelLayout>; 8] = [
    None,
    Some(ChannelLayout::Mono),
    Some(ChannelLayout::Stereo),
    Some(ChannelLayout::Surround),
    Some(ChannelLayout::FourZero),
    Some(ChannelLayout::FiveZeroBack),
    Some(ChannelLayout::FiveOneBack),
    Some(ChannelLayout::SevenOneWide),
];

/// AAC profile from the 2-bit ADTS `profile` field. The MPEG-4 audio
/// object type is this value plus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileType {
    /// AAC Main.
    Main = 0,
    /// Low Complexity.
    LC = 1,
    /// Scalable Sample Rate.
    SSR = 2,
    /// Long Term Prediction.
    LTP = 3,
}

impl From<u8> for ProfileType {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => ProfileType::Main,
            1 => ProfileType::LC,
            2 => ProfileType::SSR,
            _ => ProfileType::LTP,
        }
    }
}

/// A parsed ADTS frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ADTSHeader {
    /// 12-bit sync word, 0xFFF.
    pub sync_word: u32,
    /// MPEG version: 0 for MPEG-4, 1 for MPEG-2.
    pub id: u8,
    /// 2 bits, always 0.
    pub layer: u8,
    /// Set when no CRC follows the header.
    pub protection_absent: bool,
    /// 2-bit profile.
    pub profile: ProfileType,
    /// 4-bit index into [`ADTS_FREQUENCY_TABLE`].
    pub sample_rate_index: u8,
    /// Private bit.
    pub private_bit: bool,
    /// 3-bit index into [`ADTS_CHANNEL_LAYOUT_TABLE`].
    pub channel_configuration: u8,
    /// Originality flag.
    pub original_copy: bool,
    /// Home flag.
    pub home: bool,
    /// Copyright identification bit.
    pub copyright_id_bit: bool,
    /// Copyright identification start.
    pub copyright_id_start: bool,
    /// 13-bit frame length, header included.
    pub frame_length: u16,
    /// 11-bit buffer fullness.
    pub buffer_fullness: u16,
    /// Raw data blocks in the frame, minus one.
    pub number_of_raw_blocks: u8,
}

impl ADTSHeader {
    /// True when the 12-bit sync word is all ones.
    pub fn sync_word_valid(&self) -> bool {
        self.sync_word == 0xFFF
    }

    /// Sampling rate in Hz, `None` for reserved indices.
    pub fn sample_rate(&self) -> Option<u32> {
        ADTS_FREQUENCY_TABLE
            .get(self.sample_rate_index as usize)
            .copied()
    }

    /// `None` when the configuration is carried in-band.
    pub fn channel_layout(&self) -> Option<ChannelLayout> {
        ADTS_CHANNEL_LAYOUT_TABLE
            .get(self.channel_configuration as usize)
            .copied()
            .flatten()
    }

    /// Header length, including the CRC when present.
    pub fn header_size(&self) -> usize {
        if self.protection_absent {
            ADTS_HEADER_MIN_SIZE
        } else {
            ADTS_HEADER_MIN_SIZE + 2
        }
    }

    /// The 2-byte AudioSpecificConfig matching this header.
    pub fn audio_specific_config(&self) -> [u8; 2] {
        audio_specific_config(
            self.profile,
            self.sample_rate_index,
            self.channel_configuration,
        )
    }
}

/// Builds an AudioSpecificConfig: 5-bit object type (profile + 1), 4-bit
/// frequency index, 4-bit channel configuration, three zero flag bits.
pub fn audio_specific_config(
    profile: ProfileType,
    sample_rate_index: u8,
    channel_configuration: u8,
) -> [u8; 2] {
    let object_type = profile as u16 + 1;
    let config = (object_type << 11)
        + ((sample_rate_index as u16 & 0x0F) << 7)
        + ((channel_configuration as u16 & 0x0F) << 3);
    config.to_be_bytes()
}
