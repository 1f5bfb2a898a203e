//! # MPEG Transport Stream (TS) Demuxing
//!
//! This module turns an MPEG-2 transport stream into audio frames and video
//! access units:
//!
//! - TS packet parsing, resync and adaptation fields (PCR/OPCR)
//! - Program Specific Information: PAT and PMT reassembly with CRC checks
//! - Packetized Elementary Stream (PES) reassembly and PTS/DTS decoding
//! - 33-bit timestamp unrolling
//! - Elementary stream framing for H.264, AAC (ADTS) and MPEG audio
//!
//! ## Layers
//!
//! Every PID known to the parser has a [`PidState`] that checks continuity
//! counters and feeds a section parser: PAT, PMT or PES. PES sections own the
//! elementary stream parser for their PID. Parsers report through
//! [`ParserEvent`]s that [`Mp2tStreamParser`] handles once a TS packet has
//! been processed, then buffers are grouped by decoder config and passed to
//! the [`StreamParserClient`](crate::format::StreamParserClient).
//!
//! ## Example Usage
//!
//! ### Reading Packets
//!
//! ```rust
//! use mp2t::format::Demuxer;
//! use mp2t::format::ts::TSDemuxer;
//! use mp2t::Mp2tError;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # tokio_test::block_on(async {
//! let input: &[u8] = &[];
//! let mut demuxer = TSDemuxer::new(input);
//!
//! loop {
//!     match demuxer.read_packet().await {
//!         Ok(packet) => println!("{:?} pts={:?}", packet.track_type, packet.pts),
//!         Err(Mp2tError::EndOfStream) => break,
//!         Err(err) => return Err(err.into()),
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # })
//! # }
//! ```
//!
//! ### Inspecting TS Packets
//!
//! ```rust
//! use mp2t::format::ts::{TsPacket, TS_PACKET_SIZE};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut data = vec![0x47, 0x41, 0x00, 0x17];
//! data.resize(TS_PACKET_SIZE, 0xFF);
//!
//! assert_eq!(TsPacket::sync(&data), 0);
//! let packet = TsPacket::parse(&data)?;
//! assert_eq!(packet.pid(), 0x100);
//! assert!(packet.payload_unit_start_indicator());
//! assert_eq!(packet.continuity_counter(), 7);
//! # Ok(())
//! # }
//! ```

/// Async demuxer on top of the stream parser
pub mod demuxer;

/// Elementary stream parsers and the video adapter
pub mod es;

/// Events passed from the section parsers to the stream parser
pub mod event;

/// TS packet header and adaptation field parsing
pub mod packet;

/// Program association table
pub mod pat;

/// PES packet reassembly and header parsing
pub mod pes;

/// Per-PID continuity tracking
pub mod pid_state;

/// Program map table
pub mod pmt;

/// PSI section reassembly and section dispatch
pub mod section;

/// The top-level transport stream parser
pub mod stream_parser;

/// 33-bit timestamp unrolling
pub mod timestamp_unroller;

/// Core TS types and constants
pub mod types;

// Re-export commonly used types and constants
pub use demuxer::TSDemuxer;
pub use event::ParserEvent;
pub use packet::TsPacket;
pub use pes::PESHeader;
pub use pid_state::{PidState, PidType};
pub use stream_parser::Mp2tStreamParser;
pub use timestamp_unroller::TimestampUnroller;
pub use types::{
    AdaptationField,
    TSHeader,
    PID_PAT,
    STREAM_TYPE_AAC,
    STREAM_TYPE_H264,
    STREAM_TYPE_MPEG1_AUDIO,
    TS_PACKET_SIZE,
};
