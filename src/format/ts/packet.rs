use super::types::*;
use crate::error::{Mp2tError, Result};

/// Number of aligned sync bytes checked by [`TsPacket::sync`].
const SYNC_CHECK_COUNT: usize = 4;

/// A parsed view over one 188-byte transport packet.
#[derive(Debug, Clone)]
pub struct TsPacket<'a> {
    header: TSHeader,
    adaptation_field: Option<AdaptationField>,
    payload: &'a [u8],
}

impl<'a> TsPacket<'a> {
    /// Returns how many leading bytes of `buf` to drop to land on a packet
    /// boundary.
    ///
    /// A position qualifies when every sync byte position 188 bytes apart
    /// (up to four, within `buf`) holds `0x47`. When nothing qualifies the
    /// whole buffer length is returned.
    pub fn sync(buf: &[u8]) -> usize {
        (0..buf.len())
            .find(|&k| {
                (0..SYNC_CHECK_COUNT)
                    .map(|i| k + i * TS_PACKET_SIZE)
                    .take_while(|&idx| idx < buf.len())
                    .all(|idx| buf[idx] == TS_SYNC_BYTE)
            })
            .unwrap_or(buf.len())
    }

    /// Parses the packet at the start of `buf`, which must hold at least
    /// 188 bytes.
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < TS_PACKET_SIZE {
            return Err(Mp2tError::InvalidData("TS packet too short".into()));
        }
        let data = &buf[..TS_PACKET_SIZE];
        let header = parse_header(data)?;

        if !header.adaptation_field_exists {
            return Ok(Self {
                header,
                adaptation_field: None,
                payload: &data[TS_HEADER_SIZE..],
            });
        }

        let length = data[TS_HEADER_SIZE] as usize;
        let start = TS_HEADER_SIZE + 1;
        if !header.contains_payload && length != TS_PACKET_SIZE - start {
            return Err(Mp2tError::InvalidData(format!(
                "adaptation_field_length={} without payload",
                length
            )));
        }
        if header.contains_payload && length > TS_PACKET_SIZE - start - 1 {
            return Err(Mp2tError::InvalidData(format!(
                "adaptation_field_length={} leaves no room for the payload",
                length
            )));
        }

        // A zero length is a single stuffing byte.
        let adaptation_field = if length == 0 {
            None
        } else {
            Some(parse_adaptation_field(&data[start..start + length])?)
        };

        Ok(Self {
            header,
            adaptation_field,
            payload: &data[start + length..],
        })
    }

    /// The fixed 4-byte header.
    pub fn header(&self) -> &TSHeader {
        &self.header
    }

    /// `None` when the packet carries no adaptation field.
    pub fn adaptation_field(&self) -> Option<&AdaptationField> {
        self.adaptation_field.as_ref()
    }

    /// Packet identifier.
    pub fn pid(&self) -> u16 {
        self.header.pid
    }

    /// 4-bit continuity counter.
    pub fn continuity_counter(&self) -> u8 {
        self.header.continuity_counter
    }

    /// A PES packet or PSI section starts in this payload.
    pub fn payload_unit_start_indicator(&self) -> bool {
        self.header.payload_unit_start
    }

    /// Transport error indicator.
    pub fn transport_error(&self) -> bool {
        self.header.transport_error
    }

    /// Transport priority.
    pub fn priority(&self) -> bool {
        self.header.transport_priority
    }

    /// Transport scrambling control, 0 when clear.
    pub fn scrambling_control(&self) -> u8 {
        self.header.scrambling_control
    }

    /// Set by the adaptation field's discontinuity flag.
    pub fn discontinuity_indicator(&self) -> bool {
        self.adaptation_field
            .as_ref()
            .is_some_and(|field| field.discontinuity)
    }

    /// Set by the adaptation field's random access flag.
    pub fn random_access_indicator(&self) -> bool {
        self.adaptation_field
            .as_ref()
            .is_some_and(|field| field.random_access)
    }

    /// Program clock reference in 27 MHz units.
    pub fn pcr(&self) -> Option<u64> {
        self.adaptation_field.as_ref().and_then(|field| field.pcr)
    }

    /// Original program clock reference in 27 MHz units.
    pub fn opcr(&self) -> Option<u64> {
        self.adaptation_field.as_ref().and_then(|field| field.opcr)
    }

    /// Bytes after the header and adaptation field. Empty when the packet
    /// carries no payload.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

fn parse_header(data: &[u8]) -> Result<TSHeader> {
    if data.len() < TS_HEADER_SIZE {
        return Err(Mp2tError::InvalidData("TS packet too short".into()));
    }

    if data[0] != TS_SYNC_BYTE {
        return Err(Mp2tError::InvalidData("Invalid sync byte".into()));
    }

    Ok(TSHeader {
        sync_byte: data[0],
        transport_error: (data[1] & 0x80) != 0,
        payload_unit_start: (data[1] & 0x40) != 0,
        transport_priority: (data[1] & 0x20) != 0,
        pid: (((data[1] & 0x1F) as u16) << 8) | data[2] as u16,
        scrambling_control: (data[3] >> 6) & 0x03,
        adaptation_field_exists: (data[3] & 0x20) != 0,
        contains_payload: (data[3] & 0x10) != 0,
        continuity_counter: data[3] & 0x0F,
    })
}

/// Reads a 33-bit base + 6 reserved bits + 9-bit extension clock field.
fn read_clock(data: &[u8]) -> u64 {
    let base = ((data[0] as u64) << 25)
        | ((data[1] as u64) << 17)
        | ((data[2] as u64) << 9)
        | ((data[3] as u64) << 1)
        | ((data[4] & 0x80) as u64 >> 7);
    let ext = (((data[4] & 0x01) as u64) << 8) | (data[5] as u64);
    base * 300 + ext
}

/// Parses the adaptation field body, `data` starting right after the
/// length byte. Anything past the optional fields is stuffing.
fn parse_adaptation_field(data: &[u8]) -> Result<AdaptationField> {
    let too_short = || Mp2tError::InvalidData("Adaptation field too short".into());

    let flags = data[0];
    let mut field = AdaptationField {
        length: data.len(),
        discontinuity: (flags & 0x80) != 0,
        random_access: (flags & 0x40) != 0,
        es_priority: (flags & 0x20) != 0,
        ..Default::default()
    };
    let pcr_flag = (flags & 0x10) != 0;
    let opcr_flag = (flags & 0x08) != 0;
    let splicing_point_flag = (flags & 0x04) != 0;
    let private_data_flag = (flags & 0x02) != 0;
    let extension_flag = (flags & 0x01) != 0;

    let mut pos = 1;

    if pcr_flag {
        let clock = data.get(pos..pos + 6).ok_or_else(too_short)?;
        field.pcr = Some(read_clock(clock));
        pos += 6;
    }

    if opcr_flag {
        let clock = data.get(pos..pos + 6).ok_or_else(too_short)?;
        field.opcr = Some(read_clock(clock));
        pos += 6;
    }

    if splicing_point_flag {
        let countdown = *data.get(pos).ok_or_else(too_short)?;
        field.splice_countdown = Some(countdown as i8);
        pos += 1;
    }

    if private_data_flag {
        let private_data_length = *data.get(pos).ok_or_else(too_short)? as usize;
        pos += 1;
        let private_data = data
            .get(pos..pos + private_data_length)
            .ok_or_else(too_short)?;
        field.private_data = Some(private_data.to_vec());
        pos += private_data_length;
    }

    if extension_flag {
        let extension_length = *data.get(pos).ok_or_else(too_short)? as usize;
        pos += 1;
        if pos + extension_length > data.len() {
            return Err(too_short());
        }
    }

    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn packet(pid: u16, pusi: bool, cc: u8, afc: u8) -> Vec<u8> {
        let mut data = vec![0xFF; TS_PACKET_SIZE];
        data[0] = TS_SYNC_BYTE;
        data[1] = ((pusi as u8) << 6) | ((pid >> 8) as u8 & 0x1F);
        data[2] = pid as u8;
        data[3] = (afc << 4) | (cc & 0x0F);
        data
    }

    #[test]
    fn test_sync_aligned() {
        let mut buf = Vec::new();
        for _ in 0..4 {
            buf.extend(packet(0x100, false, 0, 1));
        }
        assert_eq!(TsPacket::sync(&buf), 0);
    }

    #[test]
    fn test_sync_skips_garbage() {
        let mut buf = vec![0x00, 0x47, 0x12, 0x34, 0x56];
        for _ in 0..4 {
            buf.extend(packet(0x100, false, 0, 1));
        }
        // The stray 0x47 at index 1 fails the spacing check.
        assert_eq!(TsPacket::sync(&buf), 5);
        assert_eq!(TsPacket::sync(&[0x00; 300]), 300);
    }

    #[test]
    fn test_parse_header() {
        let data = packet(0x1FF, true, 7, 1);
        let packet = TsPacket::parse(&data).unwrap();
        assert_eq!(packet.pid(), 0x1FF);
        assert!(packet.payload_unit_start_indicator());
        assert_eq!(packet.continuity_counter(), 7);
        assert_eq!(packet.payload().len(), 184);
        assert!(!packet.discontinuity_indicator());
        assert_eq!(packet.pcr(), None);
    }

    #[test]
    fn test_reserved_adaptation_field_control_passes_payload() {
        let data = packet(0x100, false, 2, 0);
        let packet = TsPacket::parse(&data).unwrap();
        assert!(packet.adaptation_field().is_none());
        assert_eq!(packet.payload().len(), 184);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        let mut data = packet(0x100, false, 0, 1);
        assert!(TsPacket::parse(&data[..100]).is_err());
        data[0] = 0x48;
        assert!(TsPacket::parse(&data).is_err());
    }

    #[test]
    fn test_adaptation_field_with_pcr() {
        let mut data = packet(0x100, false, 3, 3);
        data[4] = 7; // adaptation_field_length
        data[5] = 0x50; // random_access | pcr
        // base = 1, ext = 2
        data[6..12].copy_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x80 | 0x7E, 0x02]);
        let packet = TsPacket::parse(&data).unwrap();
        assert!(packet.random_access_indicator());
        assert_eq!(packet.pcr(), Some(302));
        assert_eq!(packet.payload().len(), 188 - 4 - 1 - 7);
    }

    #[test]
    fn test_adaptation_field_lengths() {
        // Stuffing-only adaptation field
        let mut data = packet(0x100, false, 0, 3);
        data[4] = 0;
        assert_eq!(TsPacket::parse(&data).unwrap().payload().len(), 183);

        // Adaptation field only must fill the packet
        let mut data = packet(0x100, false, 0, 2);
        data[4] = 183;
        data[5] = 0x00;
        assert!(TsPacket::parse(&data).unwrap().payload().is_empty());
        data[4] = 100;
        assert!(TsPacket::parse(&data).is_err());

        // With a payload, 183 bytes of adaptation field is malformed
        let mut data = packet(0x100, false, 0, 3);
        data[4] = 183;
        assert!(TsPacket::parse(&data).is_err());
    }

    #[test]
    fn test_adaptation_field_overflow() {
        let mut data = packet(0x100, false, 0, 3);
        data[4] = 3;
        data[5] = 0x10; // PCR needs 6 bytes
        assert!(TsPacket::parse(&data).is_err());
    }
}
