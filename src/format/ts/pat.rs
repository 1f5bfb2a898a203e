use super::event::ParserEvent;
use super::section::PsiSection;
use super::types::{PID_PAT, TABLE_ID_PAT};
use crate::error::{Mp2tError, Result};
use crate::utils::BitReader;

/// Program association table parser.
///
/// Only single-program streams are accepted. The PMT PID of the first
/// non-zero program is reported through [`ParserEvent::RegisterPmt`].
#[derive(Debug)]
pub struct TsSectionPat {
    psi: PsiSection,
    version_number: Option<u8>,
}

impl TsSectionPat {
    /// A PAT parser for PID 0.
    pub fn new() -> Self {
        Self {
            psi: PsiSection::new(PID_PAT),
            version_number: None,
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
            Some(section) => self.parse_section(&section, events),
            None => Ok(()),
        }
    }

    /// Forgets partial sections and the table version.
    pub fn reset(&mut self) {
        self.psi.reset();
        self.version_number = None;
    }

    fn parse_section(&mut self, section: &[u8], events: &mut Vec<ParserEvent>) -> Result<()> {
        let mut reader = BitReader::new(section);

        let table_id = reader.read_bits(8)? as u8;
        let section_syntax_indicator = reader.read_flag()?;
        let dummy_zero = reader.read_flag()?;
        reader.skip_bits(2)?;
        let section_length = reader.read_bits(12)? as usize;
        let _transport_stream_id = reader.read_bits(16)?;
        reader.skip_bits(2)?;
        let version_number = reader.read_bits(5)? as u8;
        let current_next_indicator = reader.read_flag()?;
        let _section_number = reader.read_bits(8)?;
        let _last_section_number = reader.read_bits(8)?;

        if table_id != TABLE_ID_PAT || !section_syntax_indicator || dummy_zero {
            return Err(Mp2tError::InvalidData(format!(
                "invalid PAT header: table_id={:#04x}",
                table_id
            )));
        }
        // Program loop plus CRC, both made of 4-byte entries
        if section_length < 9 || (section_length - 5) % 4 != 0 {
            return Err(Mp2tError::InvalidData(format!(
                "invalid PAT section_length={}",
                section_length
            )));
        }

        let program_count = (section_length - 9) / 4;
        let mut programs = Vec::with_capacity(program_count);
        for _ in 0..program_count {
            let program_number = reader.read_bits(16)? as u16;
            reader.skip_bits(3)?;
            let pmt_pid = reader.read_bits(13)? as u16;
            programs.push((program_number, pmt_pid));
        }
        let _crc32 = reader.read_bits(32)?;

        if !current_next_indicator {
            log::debug!("Ignoring PAT not applicable yet");
            return Ok(());
        }

        if self.version_number == Some(version_number) {
            return Ok(());
        }

        if programs.len() > 1 {
            return Err(Mp2tError::InvalidData(
                "multiple programs in the transport stream".into(),
            ));
        }

        if let Some(&(program_number, pmt_pid)) = programs.iter().find(|(number, _)| *number != 0)
        {
            log::debug!(
                "PAT version {}: program {} on pid {:#06x}",
                version_number,
                program_number,
                pmt_pid
            );
            events.push(ParserEvent::RegisterPmt {
                program_number,
                pmt_pid,
            });
        }

        self.version_number = Some(version_number);
        Ok(())
    }
}

impl Default for TsSectionPat {
    fn default() -> Self {
        Self::new()
    }
}
