//! Container formats.
//!
//! Parsing is split in two layers. A [`StreamParser`] is synchronous: bytes
//! go in through `parse` and results come out through a borrowed
//! [`StreamParserClient`]. A [`Demuxer`] wraps one behind an async reader
//! and hands out packets one at a time.

use crate::av::{CodecData, InitParameters, MediaTracks, Packet};
use crate::Result;

pub mod ts;

/// Receives what a [`StreamParser`] finds in the stream.
///
/// Methods are called synchronously from within `parse` and `flush`, in
/// stream order.
pub trait StreamParserClient {
    /// The stream is ready. Called once, after the first configs.
    fn on_init(&mut self, params: InitParameters);

    /// New decoder configs. Returning `false` aborts parsing.
    fn on_new_config(&mut self, tracks: &MediaTracks) -> bool;

    /// Coded buffers in decode order. Returning `false` aborts parsing.
    fn on_new_buffers(&mut self, audio: &[Packet], video: &[Packet]) -> bool;

    /// The next buffers start a new media segment.
    fn on_new_media_segment(&mut self);

    /// The current media segment is complete.
    fn on_end_of_segment(&mut self);
}

/// A push-style container parser.
pub trait StreamParser {
    /// Parses a chunk of the byte stream. Chunks may split units anywhere.
    fn parse(&mut self, buf: &[u8], client: &mut dyn StreamParserClient) -> Result<()>;

    /// Emits everything still buffered, as if the stream ended here.
    fn flush(&mut self, client: &mut dyn StreamParserClient) -> Result<()>;

    /// Drops all state without emitting anything.
    fn reset(&mut self);
}

/// Common trait for format demuxers
#[async_trait::async_trait]
pub trait Demuxer: Send {
    /// Read the next packet from the stream
    async fn read_packet(&mut self) -> Result<Packet>;

    /// Get stream information
    async fn streams(&mut self) -> Result<Vec<Box<dyn CodecData>>>;
}

pub use self::ts::{Mp2tStreamParser, TSDemuxer};
