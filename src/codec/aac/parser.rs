use super::types::{ADTSHeader, ProfileType, ADTS_HEADER_MIN_SIZE};
use crate::error::{Mp2tError, Result};
use crate::utils::BitReader;

/// Checks for the 12-bit syncword followed by a zero layer field.
pub fn is_adts_sync(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && (data[1] & 0xF6) == 0xF0
}

/// Reads the 13-bit `frame_length` field without decoding the whole header.
pub fn adts_frame_size(data: &[u8]) -> usize {
    if data.len() < 6 {
        return 0;
    }
    ((data[3] as usize & 0x03) << 11) | ((data[4] as usize) << 3) | ((data[5] as usize) >> 5)
}

/// Decodes a 7-byte ADTS fixed + variable header.
pub fn parse_adts_header(data: &[u8]) -> Result<ADTSHeader> {
    if data.len() < ADTS_HEADER_MIN_SIZE {
        return Err(Mp2tError::Parser("ADTS header too short".into()));
    }

    let mut reader = BitReader::new(&data[..ADTS_HEADER_MIN_SIZE]);

    let sync_word = reader.read_bits(12)?;
    if sync_word != 0xFFF {
        return Err(Mp2tError::Parser("Invalid ADTS sync word".into()));
    }

    let id = reader.read_bits(1)? as u8;
    let layer = reader.read_bits(2)? as u8;
    let protection_absent = reader.read_flag()?;

    let profile = ProfileType::from(reader.read_bits(2)? as u8);
    let sample_rate_index = reader.read_bits(4)? as u8;
    let private_bit = reader.read_flag()?;
    let channel_configuration = reader.read_bits(3)? as u8;
    let original_copy = reader.read_flag()?;
    let home = reader.read_flag()?;

    let copyright_id_bit = reader.read_flag()?;
    let copyright_id_start = reader.read_flag()?;
    let frame_length = reader.read_bits(13)? as u16;
    let buffer_fullness = reader.read_bits(11)? as u16;
    let number_of_raw_blocks = reader.read_bits(2)? as u8;

    Ok(ADTSHeader {
        sync_word,
        id,
        layer,
        protection_absent,
        profile,
        sample_rate_index,
        private_bit,
        channel_configuration,
        original_copy,
        home,
        copyright_id_bit,
        copyright_id_start,
        frame_length,
        buffer_fullness,
        number_of_raw_blocks,
    })
}
