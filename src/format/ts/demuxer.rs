use std::collections::VecDeque;

use super::stream_parser::Mp2tStreamParser;
use crate::av::{CodecData, InitParameters, MediaTracks, Packet};
use crate::config::Mp2tConfig;
use crate::error::{Mp2tError, Result};
use crate::format::{Demuxer as FormatDemuxer, StreamParser, StreamParserClient};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Collects what the stream parser reports for the demuxer to hand out.
#[derive(Debug, Default)]
struct PacketQueue {
    tracks: Option<MediaTracks>,
    packets: VecDeque<Packet>,
}

impl StreamParserClient for PacketQueue {
    fn on_init(&mut self, params: InitParameters) {
        log::debug!("Stream initialized, duration {:?}", params.duration);
    }

    fn on_new_config(&mut self, tracks: &MediaTracks) -> bool {
        self.tracks = Some(tracks.clone());
        true
    }

    fn on_new_buffers(&mut self, audio: &[Packet], video: &[Packet]) -> bool {
        self.packets.extend(audio.iter().cloned());
        self.packets.extend(video.iter().cloned());
        true
    }

    fn on_new_media_segment(&mut self) {}

    fn on_end_of_segment(&mut self) {}
}

/// MPEG Transport Stream demuxer.
///
/// Reads the transport stream from an async reader and returns the audio
/// frames and video access units found by [`Mp2tStreamParser`]. Within a
/// batch reported by the parser, audio packets come before video packets.
///
/// Once the reader is exhausted the parser is flushed, the remaining
/// packets are returned and then every call fails with
/// [`Mp2tError::EndOfStream`].
pub struct TSDemuxer<R: AsyncRead + Unpin + Send> {
    reader: R,
    parser: Mp2tStreamParser,
    queue: PacketQueue,
    read_chunk_size: usize,
    eof: bool,
}

impl<R: AsyncRead + Unpin + Send> TSDemuxer<R> {
    /// Creates a new TS demuxer.
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, Mp2tConfig::default())
    }

    /// Creates a TS demuxer with custom parser settings.
    pub fn with_config(reader: R, config: Mp2tConfig) -> Self {
        Self {
            reader,
            read_chunk_size: config.read_chunk_size,
            parser: Mp2tStreamParser::with_config(config),
            queue: PacketQueue::default(),
            eof: false,
        }
    }

    /// Reads one chunk into the parser, flushing it at the end of input.
    async fn fill(&mut self) -> Result<()> {
        let mut buf = vec![0u8; self.read_chunk_size];
        let n = self.reader.read(&mut buf).await?;
        if n == 0 {
            log::debug!("End of input, flushing");
            self.eof = true;
            return self.parser.flush(&mut self.queue);
        }
        self.parser.parse(&buf[..n], &mut self.queue)
    }
}

#[async_trait::async_trait]
impl<R: AsyncRead + Unpin + Send> FormatDemuxer for TSDemuxer<R> {
    async fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = self.queue.packets.pop_front() {
                return Ok(packet);
            }
            if self.eof {
                return Err(Mp2tError::EndOfStream);
            }
            self.fill().await?;
        }
    }

    async fn streams(&mut self) -> Result<Vec<Box<dyn CodecData>>> {
        // Read until the parser reports configs
        while self.queue.tracks.is_none() && !self.eof {
            self.fill().await?;
        }

        let mut streams: Vec<Box<dyn CodecData>> = Vec::new();
        if let Some(tracks) = &self.queue.tracks {
            if let Some(video) = &tracks.video {
                streams.push(Box::new(video.clone()));
            }
            if let Some(audio) = &tracks.audio {
                streams.push(Box::new(audio.clone()));
            }
        }
        Ok(streams)
    }
}
