use std::collections::BTreeMap;

use super::event::ParserEvent;
use super::section::PsiSection;
use super::types::{MAX_SECTION_LENGTH, TABLE_ID_PMT};
use crate::error::{Mp2tError, Result};
use crate::utils::BitReader;

/// Program map table parser.
///
/// Every elementary stream of a validated table is reported as a
/// [`ParserEvent::RegisterPes`], in PID order.
#[derive(Debug)]
pub struct TsSectionPmt {
    psi: PsiSection,
}

impl TsSectionPmt {
    /// A PMT parser for `pmt_pid`.
    pub fn new(pmt_pid: u16) -> Self {
        Self {
            psi: PsiSection::new(pmt_pid),
        }
    }

    /// Feeds one TS payload and handles each completed section.
    pub fn parse(
        &mut self,
        payload_unit_start: bool,
        payload: &[u8],
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        match self.psi.push(payload_unit_start, payload)? {
            Some(section) => parse_section(&section, events),
            None => Ok(()),
        }
    }

    /// Forgets partial sections.
    pub fn reset(&mut self) {
        self.psi.reset();
    }
}

fn parse_section(section: &[u8], events: &mut Vec<ParserEvent>) -> Result<()> {
    let mut reader = BitReader::new(section);

    let table_id = reader.read_bits(8)? as u8;
    let section_syntax_indicator = reader.read_flag()?;
    let dummy_zero = reader.read_flag()?;
    reader.skip_bits(2)?;
    let section_length = reader.read_bits(12)? as usize;
    let _program_number = reader.read_bits(16)?;
    reader.skip_bits(2)?;
    let _version_number = reader.read_bits(5)?;
    let _current_next_indicator = reader.read_flag()?;
    let section_number = reader.read_bits(8)?;
    let last_section_number = reader.read_bits(8)?;

    if table_id != TABLE_ID_PMT
        || !section_syntax_indicator
        || dummy_zero
        || section_length > MAX_SECTION_LENGTH
    {
        return Err(Mp2tError::InvalidData(format!(
            "invalid PMT header: table_id={:#04x} section_length={}",
            table_id, section_length
        )));
    }
    if section_number != 0 || last_section_number != 0 {
        return Err(Mp2tError::InvalidData(
            "multi-section PMT not supported".into(),
        ));
    }

    reader.skip_bits(3)?;
    let _pcr_pid = reader.read_bits(13)?;
    reader.skip_bits(4)?;
    let program_info_length = reader.read_bits(12)? as usize;
    reader.skip_bits(8 * program_info_length)?;

    // Registration waits until the whole table, CRC included, is read.
    let mut pid_map = BTreeMap::new();
    while reader.available_bits() > 32 {
        let stream_type = reader.read_bits(8)? as u8;
        reader.skip_bits(3)?;
        let pid_es = reader.read_bits(13)? as u16;
        reader.skip_bits(4)?;
        let es_info_length = reader.read_bits(12)? as usize;
        reader.skip_bits(8 * es_info_length)?;
        pid_map.insert(pid_es, stream_type);
    }
    let _crc32 = reader.read_bits(32)?;

    for (pes_pid, stream_type) in pid_map {
        log::debug!(
            "PMT: pid {:#06x} stream_type {:#04x}",
            pes_pid,
            stream_type
        );
        events.push(ParserEvent::RegisterPes {
            pes_pid,
            stream_type,
        });
    }
    Ok(())
}
