use super::event::ParserEvent;
use super::pat::TsSectionPat;
use super::pes::TsSectionPes;
use super::pmt::TsSectionPmt;
use super::timestamp_unroller::TimestampUnroller;
use super::types::MAX_SECTION_LENGTH;
use crate::error::{Mp2tError, Result};
use crate::utils::{Crc32Mpeg2, OffsetByteQueue};

/// The payload parser attached to a PID.
#[derive(Debug)]
pub enum TsSection {
    /// Program association table.
    Pat(TsSectionPat),
    /// Program map table.
    Pmt(TsSectionPmt),
    /// Audio or video PES.
    Pes(TsSectionPes),
}

impl TsSection {
    /// Feeds the payload of one TS packet.
    pub fn parse(
        &mut self,
        payload_unit_start: bool,
        payload: &[u8],
        unroller: &mut TimestampUnroller,
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        match self {
            TsSection::Pat(pat) => pat.parse(payload_unit_start, payload, events),
            TsSection::Pmt(pmt) => pmt.parse(payload_unit_start, payload, events),
            TsSection::Pes(pes) => pes.parse(payload_unit_start, payload, unroller, events),
        }
    }

    /// Emits whatever complete or force-completable unit is pending.
    pub fn flush(
        &mut self,
        unroller: &mut TimestampUnroller,
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        match self {
            TsSection::Pes(pes) => pes.flush(unroller, events),
            TsSection::Pat(_) | TsSection::Pmt(_) => Ok(()),
        }
    }

    /// Drops all buffered data and decoding state.
    pub fn reset(&mut self) {
        match self {
            TsSection::Pat(pat) => pat.reset(),
            TsSection::Pmt(pmt) => pmt.reset(),
            TsSection::Pes(pes) => pes.reset(),
        }
    }
}

/// Reassembles PSI sections spread over several TS packets.
#[derive(Debug)]
pub struct PsiSection {
    pid: u16,
    wait_for_pusi: bool,
    leading_bytes_to_discard: usize,
    queue: OffsetByteQueue,
    crc: Crc32Mpeg2,
}

impl PsiSection {
    /// A reassembler that waits for the next payload unit start.
    pub fn new(pid: u16) -> Self {
        Self {
            pid,
            wait_for_pusi: true,
            leading_bytes_to_discard: 0,
            queue: OffsetByteQueue::new(),
            crc: Crc32Mpeg2::new(),
        }
    }

    /// Buffers a packet payload and returns the next complete section, CRC
    /// included and verified.
    pub fn push(&mut self, payload_unit_start: bool, payload: &[u8]) -> Result<Option<Vec<u8>>> {
        // Partial section before the first unit start
        if self.wait_for_pusi && !payload_unit_start {
            return Ok(None);
        }

        let mut payload = payload;
        if payload_unit_start {
            self.reset();
            self.wait_for_pusi = false;
            let (&pointer_field, rest) = payload
                .split_first()
                .ok_or_else(|| Mp2tError::InvalidData("PSI pointer field missing".into()))?;
            self.leading_bytes_to_discard = pointer_field as usize;
            payload = rest;
        }

        let discard = self.leading_bytes_to_discard.min(payload.len());
        self.leading_bytes_to_discard -= discard;
        let payload = &payload[discard..];
        if payload.is_empty() {
            return Ok(None);
        }

        self.queue.push(payload);
        let raw = self.queue.peek();
        if raw.len() < 3 {
            return Ok(None);
        }

        let section_length = (((raw[1] as usize) << 8) | raw[2] as usize) & 0xfff;
        if section_length > MAX_SECTION_LENGTH {
            return Err(Mp2tError::InvalidData(format!(
                "section_length={} on pid {:#06x}",
                section_length, self.pid
            )));
        }

        let psi_length = section_length + 3;
        if raw.len() < psi_length {
            return Ok(None);
        }

        let section = raw[..psi_length].to_vec();
        // Only stuffing may follow a section in the same unit.
        self.reset();

        if !self.crc.is_valid_section(&section) {
            return Err(Mp2tError::Crc { pid: self.pid });
        }
        Ok(Some(section))
    }

    /// Waits for the next payload unit start again.
    pub fn reset(&mut self) {
        self.wait_for_pusi = true;
        self.leading_bytes_to_discard = 0;
        self.queue.reset();
    }
}
