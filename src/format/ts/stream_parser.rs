use std::collections::{BTreeMap, VecDeque};

use super::es::EsParser;
use super::event::ParserEvent;
use super::packet::TsPacket;
use super::pat::TsSectionPat;
use super::pes::TsSectionPes;
use super::pid_state::{PidState, PidType};
use super::pmt::TsSectionPmt;
use super::section::TsSection;
use super::timestamp_unroller::TimestampUnroller;
use super::types::{PID_PAT, TS_PACKET_SIZE};
use crate::av::{
    AudioDecoderConfig, InitParameters, MediaTracks, Packet, TrackType, VideoDecoderConfig,
};
use crate::config::Mp2tConfig;
use crate::error::{Mp2tError, Result};
use crate::format::{StreamParser, StreamParserClient};
use crate::utils::OffsetByteQueue;

/// Buffers that share one pair of decoder configs.
#[derive(Debug, Default)]
struct BufferQueueWithConfig {
    is_config_sent: bool,
    audio_config: Option<AudioDecoderConfig>,
    video_config: Option<VideoDecoderConfig>,
    audio_queue: Vec<Packet>,
    video_queue: Vec<Packet>,
}

impl BufferQueueWithConfig {
    fn tracks(&self) -> MediaTracks {
        MediaTracks {
            audio: self.audio_config.clone(),
            video: self.video_config.clone(),
        }
    }
}

/// Demultiplexes an MPEG-2 transport stream into audio and video buffers.
///
/// Only one program is supported. Of its elementary streams, the audio and
/// the video stream with the lowest PID are selected, the others are
/// ignored.
///
/// ```
/// use mp2t::format::{StreamParser, StreamParserClient};
/// use mp2t::format::ts::Mp2tStreamParser;
/// use mp2t::av::{InitParameters, MediaTracks, Packet};
///
/// #[derive(Default)]
/// struct Collector {
///     audio: Vec<Packet>,
///     video: Vec<Packet>,
/// }
///
/// impl StreamParserClient for Collector {
///     fn on_init(&mut self, _params: InitParameters) {}
///     fn on_new_config(&mut self, _tracks: &MediaTracks) -> bool {
///         true
///     }
///     fn on_new_buffers(&mut self, audio: &[Packet], video: &[Packet]) -> bool {
///         self.audio.extend_from_slice(audio);
///         self.video.extend_from_slice(video);
///         true
///     }
///     fn on_new_media_segment(&mut self) {}
///     fn on_end_of_segment(&mut self) {}
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut parser = Mp2tStreamParser::new();
/// let mut collector = Collector::default();
/// // Null packets carry nothing.
/// let mut null_packet = vec![0x47, 0x1F, 0xFF, 0x10];
/// null_packet.resize(188, 0xFF);
/// parser.parse(&null_packet, &mut collector)?;
/// parser.flush(&mut collector)?;
/// assert!(collector.audio.is_empty() && collector.video.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Mp2tStreamParser {
    config: Mp2tConfig,
    ts_byte_queue: OffsetByteQueue,
    pids: BTreeMap<u16, PidState>,
    selected_audio_pid: Option<u16>,
    selected_video_pid: Option<u16>,
    timestamp_unroller: TimestampUnroller,
    /// Never empty once initialized, except during flush
    buffer_queue_chain: VecDeque<BufferQueueWithConfig>,
    is_initialized: bool,
    segment_started: bool,
}

impl Mp2tStreamParser {
    /// A parser with the default [`Mp2tConfig`].
    pub fn new() -> Self {
        Self::with_config(Mp2tConfig::default())
    }

    /// A parser tuned by `config`.
    pub fn with_config(config: Mp2tConfig) -> Self {
        Self {
            config,
            ts_byte_queue: OffsetByteQueue::new(),
            pids: BTreeMap::new(),
            selected_audio_pid: None,
            selected_video_pid: None,
            timestamp_unroller: TimestampUnroller::new(),
            buffer_queue_chain: VecDeque::new(),
            is_initialized: false,
            segment_started: false,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &Mp2tConfig {
        &self.config
    }

    /// PID of the audio stream being demuxed, if one was selected.
    pub fn selected_audio_pid(&self) -> Option<u16> {
        self.selected_audio_pid
    }

    /// PID of the video stream being demuxed, if one was selected.
    pub fn selected_video_pid(&self) -> Option<u16> {
        self.selected_video_pid
    }

    /// True once `on_init` has been sent to the client.
    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    fn process_events(&mut self, events: Vec<ParserEvent>) {
        for event in events {
            match event {
                ParserEvent::RegisterPmt {
                    program_number,
                    pmt_pid,
                } => self.register_pmt(program_number, pmt_pid),
                ParserEvent::RegisterPes {
                    pes_pid,
                    stream_type,
                } => self.register_pes(pes_pid, stream_type),
                ParserEvent::AudioConfig(config) => self.on_audio_config_changed(config),
                ParserEvent::VideoConfig(config) => self.on_video_config_changed(config),
                ParserEvent::Buffer(packet) => self.on_emit_buffer(packet),
            }
        }
    }

    fn register_pmt(&mut self, program_number: u16, pmt_pid: u16) {
        // One program only: keep the first PMT.
        if self.pids.values().any(|state| state.pid_type() == PidType::Pmt) {
            log::debug!("Ignoring PMT pid {} of program {}", pmt_pid, program_number);
            return;
        }

        log::debug!("Registering PMT pid {} for program {}", pmt_pid, program_number);
        let mut state = PidState::new(
            pmt_pid,
            PidType::Pmt,
            TsSection::Pmt(TsSectionPmt::new(pmt_pid)),
        );
        state.enable();
        self.pids.insert(pmt_pid, state);
    }

    fn register_pes(&mut self, pes_pid: u16, stream_type: u8) {
        if self.pids.contains_key(&pes_pid) {
            return;
        }

        let Some(es_parser) = EsParser::for_stream_type(stream_type, &self.config) else {
            log::debug!(
                "Ignoring pid {} with unsupported stream type {:#04x}",
                pes_pid,
                stream_type
            );
            return;
        };
        let pid_type = match es_parser.track_type() {
            TrackType::Audio => PidType::AudioPes,
            TrackType::Video => PidType::VideoPes,
        };

        log::debug!(
            "Registering {:?} pid {} with stream type {:#04x}",
            pid_type,
            pes_pid,
            stream_type
        );
        let section = TsSection::Pes(TsSectionPes::new(pes_pid, es_parser));
        self.pids
            .insert(pes_pid, PidState::new(pes_pid, pid_type, section));
        self.update_pid_filter();
    }

    /// Enables the lowest audio and video PES PIDs and disables the rest.
    fn update_pid_filter(&mut self) {
        let lowest_pid = |pids: &BTreeMap<u16, PidState>, pid_type: PidType| {
            pids.values()
                .find(|state| state.pid_type() == pid_type)
                .map(PidState::pid)
        };
        let audio_pid = lowest_pid(&self.pids, PidType::AudioPes);
        let video_pid = lowest_pid(&self.pids, PidType::VideoPes);

        if audio_pid != self.selected_audio_pid {
            log::debug!("Selected audio pid: {:?}", audio_pid);
            self.selected_audio_pid = audio_pid;
        }
        if video_pid != self.selected_video_pid {
            log::debug!("Selected video pid: {:?}", video_pid);
            self.selected_video_pid = video_pid;
        }

        for state in self.pids.values_mut() {
            let selected = match state.pid_type() {
                PidType::AudioPes => audio_pid,
                PidType::VideoPes => video_pid,
                PidType::Pat | PidType::Pmt => continue,
            };
            if selected == Some(state.pid()) {
                state.enable();
            } else {
                state.disable();
            }
        }
    }

    fn on_audio_config_changed(&mut self, config: AudioDecoderConfig) {
        // A reported entry keeps its configs: a new track gets a new entry.
        match self.buffer_queue_chain.back_mut() {
            Some(back) if !back.is_config_sent && back.audio_config.is_none() => {
                back.audio_config = Some(config.clone())
            }
            back => {
                let video_config = back.and_then(|back| back.video_config.clone());
                self.buffer_queue_chain.push_back(BufferQueueWithConfig {
                    audio_config: Some(config.clone()),
                    video_config,
                    ..Default::default()
                });
            }
        }

        // Earlier entries had no audio config to report.
        for queue in self.buffer_queue_chain.iter_mut() {
            if queue.audio_config.is_some() {
                break;
            }
            queue.audio_config = Some(config.clone());
        }
    }

    fn on_video_config_changed(&mut self, config: VideoDecoderConfig) {
        match self.buffer_queue_chain.back_mut() {
            Some(back) if !back.is_config_sent && back.video_config.is_none() => {
                back.video_config = Some(config.clone())
            }
            back => {
                let audio_config = back.and_then(|back| back.audio_config.clone());
                self.buffer_queue_chain.push_back(BufferQueueWithConfig {
                    audio_config,
                    video_config: Some(config.clone()),
                    ..Default::default()
                });
            }
        }

        for queue in self.buffer_queue_chain.iter_mut() {
            if queue.video_config.is_some() {
                break;
            }
            queue.video_config = Some(config.clone());
        }
    }

    fn on_emit_buffer(&mut self, packet: Packet) {
        let Some(back) = self.buffer_queue_chain.back_mut() else {
            log::warn!("Dropping {:?} buffer received before any config", packet.track_type);
            return;
        };
        match packet.track_type {
            TrackType::Audio => back.audio_queue.push(packet),
            TrackType::Video => back.video_queue.push(packet),
        }
    }

    fn has_needed_configs(&self, queue: &BufferQueueWithConfig) -> bool {
        (self.selected_audio_pid.is_none() || queue.audio_config.is_some())
            && (self.selected_video_pid.is_none() || queue.video_config.is_some())
    }

    fn finish_initialization_if_needed(
        &mut self,
        client: &mut dyn StreamParserClient,
    ) -> Result<()> {
        if self.is_initialized {
            return Ok(());
        }
        let Some(front) = self.buffer_queue_chain.front() else {
            return Ok(());
        };
        if !self.has_needed_configs(front) {
            return Ok(());
        }

        let tracks = front.tracks();
        if !client.on_new_config(&tracks) {
            return Err(Mp2tError::ClientRejected("config"));
        }
        if let Some(front) = self.buffer_queue_chain.front_mut() {
            front.is_config_sent = true;
        }

        // A transport stream does not carry its duration.
        client.on_init(InitParameters { duration: None });
        self.is_initialized = true;
        log::debug!(
            "Initialized: audio={:?} video={:?}",
            tracks.audio.map(|config| config.codec),
            tracks.video.map(|config| config.coded_size)
        );
        Ok(())
    }

    fn emit_remaining_buffers(&mut self, client: &mut dyn StreamParserClient) -> Result<()> {
        if !self.is_initialized {
            return Ok(());
        }
        let Some(back) = self.buffer_queue_chain.back() else {
            return Ok(());
        };
        // Wait until the latest entry has every config it needs.
        if !self.has_needed_configs(back) {
            return Ok(());
        }
        let last_audio_config = back.audio_config.clone();
        let last_video_config = back.video_config.clone();

        while let Some(queue) = self.buffer_queue_chain.pop_front() {
            if !self.segment_started {
                log::debug!("Starting new media segment");
                client.on_new_media_segment();
                self.segment_started = true;
            }

            if !queue.is_config_sent && !client.on_new_config(&queue.tracks()) {
                return Err(Mp2tError::ClientRejected("config"));
            }

            if queue.audio_queue.is_empty() && queue.video_queue.is_empty() {
                continue;
            }
            log::trace!(
                "Emitting {} audio and {} video buffers",
                queue.audio_queue.len(),
                queue.video_queue.len()
            );
            if !client.on_new_buffers(&queue.audio_queue, &queue.video_queue) {
                return Err(Mp2tError::ClientRejected("buffers"));
            }
        }

        // Incoming buffers land in an entry carrying the latest configs.
        self.buffer_queue_chain.push_back(BufferQueueWithConfig {
            is_config_sent: true,
            audio_config: last_audio_config,
            video_config: last_video_config,
            ..Default::default()
        });
        Ok(())
    }
}

impl Default for Mp2tStreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamParser for Mp2tStreamParser {
    fn parse(&mut self, buf: &[u8], client: &mut dyn StreamParserClient) -> Result<()> {
        log::trace!("Parsing {} bytes", buf.len());
        self.ts_byte_queue.push(buf);

        while self.ts_byte_queue.len() >= TS_PACKET_SIZE {
            let skipped_bytes = TsPacket::sync(self.ts_byte_queue.peek());
            if skipped_bytes > 0 {
                log::trace!("Skipping {} bytes to resync", skipped_bytes);
                self.ts_byte_queue.pop(skipped_bytes);
                continue;
            }

            let packet = match TsPacket::parse(self.ts_byte_queue.peek()) {
                Ok(packet) => packet,
                Err(err) => {
                    log::trace!("Dropping a byte after a bad TS packet: {}", err);
                    self.ts_byte_queue.pop(1);
                    continue;
                }
            };

            let pid = packet.pid();
            if pid == PID_PAT && !self.pids.contains_key(&PID_PAT) {
                log::debug!("Creating PAT pid state");
                let mut state =
                    PidState::new(PID_PAT, PidType::Pat, TsSection::Pat(TsSectionPat::new()));
                state.enable();
                self.pids.insert(PID_PAT, state);
            }

            let mut events = Vec::new();
            let result = match self.pids.get_mut(&pid) {
                Some(state) => {
                    state.push_packet(&packet, &mut self.timestamp_unroller, &mut events)
                }
                None => {
                    log::trace!("Ignoring TS packet for pid {}", pid);
                    Ok(())
                }
            };
            self.ts_byte_queue.pop(TS_PACKET_SIZE);

            // Registrations change the PID map, so they wait until the
            // packet is done.
            self.process_events(events);
            if let Err(err) = result {
                log::warn!("Parsing failed on pid {}: {}", pid, err);
                return Err(err);
            }
        }

        self.finish_initialization_if_needed(client)?;
        self.emit_remaining_buffers(client)
    }

    fn flush(&mut self, client: &mut dyn StreamParserClient) -> Result<()> {
        log::debug!("Flushing MP2T stream parser");

        let mut events = Vec::new();
        let pids = std::mem::take(&mut self.pids);
        for (pid, mut state) in pids {
            if let Err(err) = state.flush(&mut self.timestamp_unroller, &mut events) {
                log::warn!("Flushing pid {} failed: {}", pid, err);
            }
        }
        self.process_events(events);

        // Configs cannot change during a flush: drop entries whose configs
        // were never reported.
        if let Some(unsent) = self
            .buffer_queue_chain
            .iter()
            .position(|queue| !queue.is_config_sent)
        {
            self.buffer_queue_chain.truncate(unsent);
        }
        let result = self.emit_remaining_buffers(client);
        self.buffer_queue_chain.clear();

        if self.segment_started {
            log::debug!("Ending media segment");
            client.on_end_of_segment();
            self.segment_started = false;
        }

        // Partial TS packets are dropped.
        self.ts_byte_queue.reset();
        self.selected_audio_pid = None;
        self.selected_video_pid = None;
        self.timestamp_unroller.reset();
        result
    }

    fn reset(&mut self) {
        log::debug!("Resetting MP2T stream parser");
        *self = Self::with_config(self.config.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::Size;
    use crate::codec::h264::parser_test::{annex_b, aud_nal, pps_nal, slice_nal, sps_nal};
    use crate::format::ts::types::{STREAM_TYPE_AAC, STREAM_TYPE_H264};
    use crate::utils::Crc32Mpeg2;
    use pretty_assertions::assert_eq;

    const PMT_PID: u16 = 0x1000;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Init,
        Config(MediaTracks),
        Buffers { audio: usize, video: usize },
        NewSegment,
        EndOfSegment,
    }

    #[derive(Debug)]
    struct RecordingClient {
        calls: Vec<Call>,
        audio: Vec<Packet>,
        accept_config: bool,
    }

    impl RecordingClient {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                audio: Vec::new(),
                accept_config: true,
            }
        }
    }

    impl StreamParserClient for RecordingClient {
        fn on_init(&mut self, params: InitParameters) {
            assert_eq!(params.duration, None);
            self.calls.push(Call::Init);
        }

        fn on_new_config(&mut self, tracks: &MediaTracks) -> bool {
            self.calls.push(Call::Config(tracks.clone()));
            self.accept_config
        }

        fn on_new_buffers(&mut self, audio: &[Packet], video: &[Packet]) -> bool {
            self.calls.push(Call::Buffers {
                audio: audio.len(),
                video: video.len(),
            });
            self.audio.extend_from_slice(audio);
            true
        }

        fn on_new_media_segment(&mut self) {
            self.calls.push(Call::NewSegment);
        }

        fn on_end_of_segment(&mut self) {
            self.calls.push(Call::EndOfSegment);
        }
    }

    fn psi_section(table_id: u8, table_id_extension: u16, body: &[u8]) -> Vec<u8> {
        let section_length = 5 + body.len() + 4;
        let mut section = vec![
            table_id,
            0xB0 | (section_length >> 8) as u8,
            section_length as u8,
        ];
        section.extend_from_slice(&table_id_extension.to_be_bytes());
        section.extend_from_slice(&[0xC1, 0x00, 0x00]);
        section.extend_from_slice(body);
        let crc = Crc32Mpeg2::new().calculate(&section);
        section.extend_from_slice(&crc.to_be_bytes());
        section
    }

    fn pat() -> Vec<u8> {
        let mut body = vec![0x00, 0x01];
        body.extend_from_slice(&(0xE000 | PMT_PID).to_be_bytes());
        psi_section(0x00, 1, &body)
    }

    fn pmt(streams: &[(u8, u16)]) -> Vec<u8> {
        let mut body = vec![0xE1, 0x00, 0xF0, 0x00];
        for &(stream_type, pid) in streams {
            body.push(stream_type);
            body.extend_from_slice(&(0xE000 | pid).to_be_bytes());
            body.extend_from_slice(&[0xF0, 0x00]);
        }
        psi_section(0x02, 1, &body)
    }

    /// Splits `payload` into TS packets, padding the last one with 0xFF.
    fn ts_packets(pid: u16, counter: &mut u8, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, chunk) in payload.chunks(184).enumerate() {
            let pusi = if i == 0 { 0x40 } else { 0x00 };
            out.extend_from_slice(&[0x47, pusi | (pid >> 8) as u8, pid as u8, 0x10 | *counter]);
            out.extend_from_slice(chunk);
            out.resize(out.len() + 184 - chunk.len(), 0xFF);
            *counter = (*counter + 1) % 16;
        }
        out
    }

    fn psi_packets(pid: u16, counter: &mut u8, section: &[u8]) -> Vec<u8> {
        let mut payload = vec![0x00];
        payload.extend_from_slice(section);
        ts_packets(pid, counter, &payload)
    }

    fn adts_frame(size: usize) -> Vec<u8> {
        let mut frame = vec![
            0xFF,
            0xF1,
            0x50,
            0x80 | ((size >> 11) as u8 & 0x03),
            (size >> 3) as u8,
            ((size as u8 & 0x07) << 5) | 0x1F,
            0xFC,
        ];
        frame.resize(size, 0x21);
        frame
    }

    fn audio_pes(pts: u64, payload: &[u8]) -> Vec<u8> {
        pes_packet(0xC0, 3 + 5 + payload.len(), pts, payload)
    }

    /// Unbounded video PES, as muxers usually write them.
    fn video_pes(pts: u64, payload: &[u8]) -> Vec<u8> {
        pes_packet(0xE0, 0, pts, payload)
    }

    fn pes_packet(stream_id: u8, length: usize, pts: u64, payload: &[u8]) -> Vec<u8> {
        let mut pes = vec![0x00, 0x00, 0x01, stream_id];
        pes.extend_from_slice(&(length as u16).to_be_bytes());
        pes.extend_from_slice(&[0x80, 0x80, 0x05]);
        pes.push(0x21 | ((pts >> 29) & 0x0E) as u8);
        pes.extend_from_slice(&((((pts >> 14) & 0xFFFE) | 0x01) as u16).to_be_bytes());
        pes.extend_from_slice(&((((pts << 1) & 0xFFFE) | 0x01) as u16).to_be_bytes());
        pes.extend_from_slice(payload);
        pes
    }

    fn audio_only_stream() -> Vec<u8> {
        let (mut pat_cc, mut pmt_cc, mut audio_cc) = (0, 0, 0);
        let mut stream = psi_packets(PID_PAT, &mut pat_cc, &pat());
        stream.extend(psi_packets(PMT_PID, &mut pmt_cc, &pmt(&[(STREAM_TYPE_AAC, 0x101)])));
        let mut frames = adts_frame(100);
        frames.extend(adts_frame(100));
        stream.extend(ts_packets(0x101, &mut audio_cc, &audio_pes(90_000, &frames)));
        stream
    }

    #[test]
    fn test_audio_only_stream() {
        let mut parser = Mp2tStreamParser::new();
        let mut client = RecordingClient::new();

        parser.parse(&audio_only_stream(), &mut client).unwrap();
        assert!(parser.is_initialized());
        assert_eq!(parser.selected_audio_pid(), Some(0x101));
        assert_eq!(parser.selected_video_pid(), None);

        assert_eq!(client.calls.len(), 4);
        match &client.calls[0] {
            Call::Config(tracks) => {
                assert_eq!(tracks.video, None);
                assert_eq!(tracks.audio.as_ref().map(|a| a.samples_per_second), Some(44100));
            }
            other => panic!("unexpected call {:?}", other),
        }
        assert_eq!(
            client.calls[1..].to_vec(),
            vec![Call::Init, Call::NewSegment, Call::Buffers { audio: 2, video: 0 }]
        );
        assert_eq!(client.audio[0].pts, Some(1_000_000));
        assert_eq!(client.audio[1].pts, Some(1_023_219));

        parser.flush(&mut client).unwrap();
        assert_eq!(client.calls.last(), Some(&Call::EndOfSegment));
        assert_eq!(client.calls.len(), 5);
    }

    #[test]
    fn test_track_added_after_init_reports_config() {
        let mut parser = Mp2tStreamParser::new();
        let mut client = RecordingClient::new();
        let (mut pat_cc, mut pmt_cc, mut audio_cc, mut video_cc) = (0, 0, 0, 0);

        let mut frames = adts_frame(100);
        frames.extend(adts_frame(100));
        let mut stream = psi_packets(PID_PAT, &mut pat_cc, &pat());
        stream.extend(psi_packets(PMT_PID, &mut pmt_cc, &pmt(&[(STREAM_TYPE_AAC, 0x101)])));
        stream.extend(ts_packets(0x101, &mut audio_cc, &audio_pes(90_000, &frames)));
        parser.parse(&stream, &mut client).unwrap();
        assert!(parser.is_initialized());

        // The updated PMT adds a video stream.
        let mut stream = psi_packets(
            PMT_PID,
            &mut pmt_cc,
            &pmt(&[(STREAM_TYPE_H264, 0x100), (STREAM_TYPE_AAC, 0x101)]),
        );
        for i in 0..10u64 {
            let access_unit = if i == 0 {
                annex_b(&[
                    aud_nal(),
                    sps_nal(20, 15, None, None),
                    pps_nal(),
                    slice_nal(true, 0),
                ])
            } else {
                annex_b(&[aud_nal(), slice_nal(false, 0)])
            };
            stream.extend(ts_packets(
                0x100,
                &mut video_cc,
                &video_pes(93_600 + i * 3_600, &access_unit),
            ));
            stream.extend(ts_packets(
                0x101,
                &mut audio_cc,
                &audio_pes(94_180 + i * 4_180, &frames),
            ));
        }
        parser.parse(&stream, &mut client).unwrap();
        parser.flush(&mut client).unwrap();

        let configs: Vec<(usize, &MediaTracks)> = client
            .calls
            .iter()
            .enumerate()
            .filter_map(|(i, call)| match call {
                Call::Config(tracks) => Some((i, tracks)),
                _ => None,
            })
            .collect();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].1.video, None);
        let (video_config_at, tracks) = configs[1];
        assert!(tracks.audio.is_some());
        assert_eq!(
            tracks.video.as_ref().map(|video| video.coded_size),
            Some(Size::new(320, 240))
        );

        let first_video_at = client
            .calls
            .iter()
            .position(|call| matches!(call, Call::Buffers { video, .. } if *video > 0))
            .unwrap();
        assert!(video_config_at < first_video_at);

        let video_buffers: usize = client
            .calls
            .iter()
            .map(|call| match call {
                Call::Buffers { video, .. } => *video,
                _ => 0,
            })
            .sum();
        assert_eq!(video_buffers, 10);
        assert_eq!(client.audio.len(), 22);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut parser = Mp2tStreamParser::new();
        let mut client = RecordingClient::new();
        for byte in audio_only_stream() {
            parser.parse(&[byte], &mut client).unwrap();
        }
        assert_eq!(client.audio.len(), 2);
    }

    #[test]
    fn test_resync_after_garbage() {
        let mut parser = Mp2tStreamParser::new();
        let mut client = RecordingClient::new();
        let mut stream = vec![0x47, 0x00, 0x12, 0x47, 0x33];
        stream.extend(audio_only_stream());

        parser.parse(&stream, &mut client).unwrap();
        assert_eq!(client.audio.len(), 2);
    }

    #[test]
    fn test_selects_lowest_pids() {
        let mut parser = Mp2tStreamParser::new();
        let mut client = RecordingClient::new();
        let (mut pat_cc, mut pmt_cc) = (0, 0);
        let mut stream = psi_packets(PID_PAT, &mut pat_cc, &pat());
        stream.extend(psi_packets(
            PMT_PID,
            &mut pmt_cc,
            &pmt(&[
                (STREAM_TYPE_AAC, 0x120),
                (STREAM_TYPE_H264, 0x111),
                (STREAM_TYPE_AAC, 0x102),
                (0x06, 0x100),
                (STREAM_TYPE_H264, 0x130),
            ]),
        ));

        parser.parse(&stream, &mut client).unwrap();
        assert_eq!(parser.selected_audio_pid(), Some(0x102));
        assert_eq!(parser.selected_video_pid(), Some(0x111));
        assert!(parser.pids[&0x102].is_enabled());
        assert!(!parser.pids[&0x120].is_enabled());
        assert!(!parser.pids[&0x130].is_enabled());
        assert!(!parser.pids.contains_key(&0x100));
        // No config yet
        assert!(client.calls.is_empty());
        assert!(!parser.is_initialized());
    }

    #[test]
    fn test_continuity_error_fails_parse() {
        let mut parser = Mp2tStreamParser::new();
        let mut client = RecordingClient::new();
        let mut counter = 0;
        let mut stream = psi_packets(PID_PAT, &mut counter, &pat());
        counter = 5;
        stream.extend(psi_packets(PID_PAT, &mut counter, &pat()));

        match parser.parse(&stream, &mut client) {
            Err(Mp2tError::Continuity {
                pid: PID_PAT,
                expected: 1,
                actual: 5,
            }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_rejected_config() {
        let mut parser = Mp2tStreamParser::new();
        let mut client = RecordingClient::new();
        client.accept_config = false;
        assert!(matches!(
            parser.parse(&audio_only_stream(), &mut client),
            Err(Mp2tError::ClientRejected("config"))
        ));
    }

    #[test]
    fn test_reset_starts_over() {
        let mut parser = Mp2tStreamParser::new();
        let mut client = RecordingClient::new();
        let stream = audio_only_stream();
        // Stop inside the audio PES
        parser.parse(&stream[..3 * 188], &mut client).unwrap();
        parser.reset();
        assert!(!parser.is_initialized());
        assert_eq!(parser.selected_audio_pid(), None);

        parser.parse(&stream, &mut client).unwrap();
        let configs = client
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Config(_)))
            .count();
        assert_eq!(configs, 1);
        assert_eq!(client.audio.len(), 2);
    }

    #[test]
    fn test_flush_without_config_emits_nothing() {
        let mut parser = Mp2tStreamParser::new();
        let mut client = RecordingClient::new();
        let stream = audio_only_stream();
        parser.parse(&stream[..2 * 188], &mut client).unwrap();
        parser.flush(&mut client).unwrap();
        assert!(client.calls.is_empty());
    }
}
