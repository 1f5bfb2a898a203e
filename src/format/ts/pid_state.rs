use super::event::ParserEvent;
use super::packet::TsPacket;
use super::section::TsSection;
use super::timestamp_unroller::TimestampUnroller;
use crate::error::{Mp2tError, Result};

/// What a PID carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidType {
    /// PID 0.
    Pat,
    /// The program map table PID.
    Pmt,
    /// An audio elementary stream.
    AudioPes,
    /// A video elementary stream.
    VideoPes,
}

/// A PID together with its section parser and continuity tracking.
#[derive(Debug)]
pub struct PidState {
    pid: u16,
    pid_type: PidType,
    section: TsSection,
    enabled: bool,
    continuity_counter: Option<u8>,
}

impl PidState {
    /// A disabled PID with no continuity history.
    pub fn new(pid: u16, pid_type: PidType, section: TsSection) -> Self {
        Self {
            pid,
            pid_type,
            section,
            enabled: false,
            continuity_counter: None,
        }
    }

    /// Packet identifier.
    pub fn pid(&self) -> u16 {
        self.pid
    }

    /// What the PID carries.
    pub fn pid_type(&self) -> PidType {
        self.pid_type
    }

    /// Whether packets are being parsed.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Feeds a packet of this PID. Disabled PIDs ignore their packets.
    ///
    /// A continuity counter that does not follow the previous one fails
    /// without touching the section state. Section errors reset the PID.
    pub fn push_packet(
        &mut self,
        packet: &TsPacket<'_>,
        unroller: &mut TimestampUnroller,
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let actual = packet.continuity_counter();
        if let Some(previous) = self.continuity_counter {
            let expected = (previous + 1) % 16;
            if actual != expected {
                log::debug!(
                    "Continuity error on pid {}: expected {}, got {}",
                    self.pid,
                    expected,
                    actual
                );
                return Err(Mp2tError::Continuity {
                    pid: self.pid,
                    expected,
                    actual,
                });
            }
        }
        self.continuity_counter = Some(actual);

        let result = self.section.parse(
            packet.payload_unit_start_indicator(),
            packet.payload(),
            unroller,
            events,
        );
        if let Err(err) = result {
            log::debug!("Parsing failed on pid {}: {}", self.pid, err);
            self.reset();
            return Err(err);
        }
        Ok(())
    }

    /// Emits what the section still holds, then resets.
    pub fn flush(
        &mut self,
        unroller: &mut TimestampUnroller,
        events: &mut Vec<ParserEvent>,
    ) -> Result<()> {
        let result = self.section.flush(unroller, events);
        self.reset();
        result
    }

    /// Starts parsing packets of this PID.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stops parsing and drops buffered state. No-op when already disabled.
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.reset();
        self.enabled = false;
    }

    fn reset(&mut self) {
        self.section.reset();
        self.continuity_counter = None;
    }
}
