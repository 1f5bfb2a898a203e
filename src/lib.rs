#![doc(html_root_url = "https://docs.rs/mp2t/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # mp2t - MPEG-2 Transport Stream Demuxer
//!
//! `mp2t` turns an MPEG-2 transport stream into decoder configurations and
//! timestamped coded buffers: AAC and MPEG audio frames, H.264 access units.
//! Input can be pushed in chunks of any size, split anywhere.
//!
//! ## Features
//!
//! ### Transport Stream
//! - TS packet resync and adaptation field parsing
//! - PAT/PMT reassembly with CRC32 validation
//! - PES reassembly with PTS/DTS decoding and 33-bit wrap unrolling
//! - Continuity counter checks
//!
//! ### Elementary Streams
//! - H.264/AVC access units delimited by AUD NAL units, SPS/PPS tracking
//! - AAC in ADTS framing, with implicit SBR signalling
//! - MPEG-1/2/2.5 audio, layers I to III
//! - Video frame durations from a short reorder window
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! mp2t = "0.1.0"
//! ```
//!
//! ### Async Demuxer Example
//!
//! ```rust,no_run
//! use mp2t::format::{ts::TSDemuxer, Demuxer};
//! use mp2t::Mp2tError;
//! use tokio::fs::File;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = File::open("input.ts").await?;
//!     let mut demuxer = TSDemuxer::new(file);
//!
//!     for stream in demuxer.streams().await? {
//!         println!("stream: {:?}", stream);
//!     }
//!
//!     loop {
//!         match demuxer.read_packet().await {
//!             Ok(packet) => println!("{:?} pts={:?}us", packet.track_type, packet.pts),
//!             Err(Mp2tError::EndOfStream) => break,
//!             Err(err) => return Err(err.into()),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Push Parser Example
//!
//! [`Mp2tStreamParser`](format::ts::Mp2tStreamParser) is the synchronous
//! core. It reports through a [`StreamParserClient`](format::StreamParserClient)
//! borrowed for each call:
//!
//! ```rust,no_run
//! use mp2t::av::{InitParameters, MediaTracks, Packet};
//! use mp2t::format::{ts::Mp2tStreamParser, StreamParser, StreamParserClient};
//!
//! struct Printer;
//!
//! impl StreamParserClient for Printer {
//!     fn on_init(&mut self, _params: InitParameters) {}
//!     fn on_new_config(&mut self, tracks: &MediaTracks) -> bool {
//!         println!("config: {:?}", tracks);
//!         true
//!     }
//!     fn on_new_buffers(&mut self, audio: &[Packet], video: &[Packet]) -> bool {
//!         println!("{} audio, {} video", audio.len(), video.len());
//!         true
//!     }
//!     fn on_new_media_segment(&mut self) {}
//!     fn on_end_of_segment(&mut self) {}
//! }
//!
//! # fn main() -> mp2t::Result<()> {
//! let data = std::fs::read("input.ts")?;
//! let mut parser = Mp2tStreamParser::new();
//! for chunk in data.chunks(4096) {
//!     parser.parse(chunk, &mut Printer)?;
//! }
//! parser.flush(&mut Printer)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `av`: Core audio/video types
//!   - Coded packets and track types
//!   - Audio and video decoder configurations
//!   - Sample-count based audio timestamps
//!
//! - `codec`: Bitstream parsers
//!   - H.264 NAL units, SPS, PPS and slice headers
//!   - AAC ADTS headers
//!   - MPEG audio frame headers
//!
//! - `format`: Container parsing
//!   - Stream parser and client traits, async demuxer trait
//!   - TS (Transport Stream) demuxing
//!
//! - `error`: Error handling types and utilities
//!
//! - `utils`: Common utilities and helper functions
//!   - Bitstream reading
//!   - CRC calculations
//!   - Offset-addressed byte buffering
//!

/// Audio/Video base types and utilities
pub mod av;

/// Codec bitstream parsers for video and audio formats
pub mod codec;

/// Error types and utilities
pub mod error;

/// Container format implementations
pub mod format;

/// Common utilities and helper functions
pub mod utils;

/// Configuration module
pub mod config;

pub use config::Mp2tConfig;
pub use error::{Mp2tError, Result};
