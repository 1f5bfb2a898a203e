use thiserror::Error;

/// Errors produced while demuxing an MPEG-2 transport stream.
#[derive(Error, Debug)]
pub enum Mp2tError {
    /// Reading from the underlying source failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A codec bitstream (NAL unit, parameter set, audio header) is malformed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The container parser reached an inconsistent state.
    #[error("parser error: {0}")]
    Parser(String),

    /// Malformed container data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A packet on `pid` skipped continuity counter values.
    #[error("continuity error on pid {pid:#06x}: expected counter {expected}, got {actual}")]
    Continuity {
        /// PID of the offending packet.
        pid: u16,
        /// Counter value the packet should have carried.
        expected: u8,
        /// Counter value it carried.
        actual: u8,
    },

    /// A PSI section failed its CRC32 check.
    #[error("crc mismatch in psi section on pid {pid:#06x}")]
    Crc {
        /// PID the section arrived on.
        pid: u16,
    },

    /// The client returned `false` from a config or buffer callback.
    #[error("client rejected {0}")]
    ClientRejected(&'static str),

    /// The demuxer has no packets left.
    #[error("end of stream")]
    EndOfStream,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Mp2tError>;
