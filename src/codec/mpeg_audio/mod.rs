//! MPEG-1, MPEG-2 and MPEG-2.5 audio (layers I to III) frame headers.

/// Frame header decoding and the bitrate/sample-rate tables
pub mod parser;

pub use parser::*;
