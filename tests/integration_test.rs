mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use mp2t::av::{CodecType, InitParameters, MediaTracks, Packet, TrackType};
    use mp2t::format::ts::{Mp2tStreamParser, TSDemuxer};
    use mp2t::format::{Demuxer, StreamParser, StreamParserClient};
    use mp2t::Mp2tError;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio_test::block_on;

    #[derive(Debug, Default)]
    struct Collector {
        inits: usize,
        configs: Vec<MediaTracks>,
        audio: Vec<Packet>,
        video: Vec<Packet>,
        segments: usize,
        segment_ends: usize,
    }

    impl StreamParserClient for Collector {
        fn on_init(&mut self, _params: InitParameters) {
            self.inits += 1;
        }

        fn on_new_config(&mut self, tracks: &MediaTracks) -> bool {
            self.configs.push(tracks.clone());
            true
        }

        fn on_new_buffers(&mut self, audio: &[Packet], video: &[Packet]) -> bool {
            self.audio.extend_from_slice(audio);
            self.video.extend_from_slice(video);
            true
        }

        fn on_new_media_segment(&mut self) {
            self.segments += 1;
        }

        fn on_end_of_segment(&mut self) {
            self.segment_ends += 1;
        }
    }

    fn parse_in_chunks(data: &[u8], chunk_size: usize) -> Collector {
        let mut parser = Mp2tStreamParser::new();
        let mut client = Collector::default();
        for chunk in data.chunks(chunk_size) {
            parser.parse(chunk, &mut client).unwrap();
        }
        parser.flush(&mut client).unwrap();
        client
    }

    fn assert_non_decreasing(packets: &[Packet]) {
        for pair in packets.windows(2) {
            assert!(
                pair[0].pts <= pair[1].pts,
                "pts went backwards: {:?} then {:?}",
                pair[0].pts,
                pair[1].pts
            );
        }
    }

    #[test]
    fn test_audio_video_stream() {
        let client = parse_in_chunks(&av_stream(10), 188 * 4);

        assert_eq!(client.inits, 1);
        assert_eq!(client.configs.len(), 1);
        assert_eq!(client.segments, 1);
        assert_eq!(client.segment_ends, 1);

        let tracks = &client.configs[0];
        let audio = tracks.audio.as_ref().unwrap();
        assert_eq!(audio.codec, CodecType::AAC);
        assert_eq!(audio.samples_per_second, 44100);
        let video = tracks.video.as_ref().unwrap();
        assert_eq!(video.codec, CodecType::H264);
        assert_eq!((video.coded_size.width, video.coded_size.height), (320, 240));

        assert_eq!(client.audio.len(), 20);
        assert_eq!(client.video.len(), 10);
        assert_non_decreasing(&client.audio);
        assert_non_decreasing(&client.video);

        assert!(client.audio.iter().all(|p| p.track_type == TrackType::Audio));
        assert_eq!(client.audio[0].pts, Some(1_000_000));
        assert_eq!(client.audio[1].pts, Some(1_023_219));
        assert_eq!(client.audio[0].duration, Some(Duration::from_micros(23_219)));

        assert!(client.video[0].is_key);
        assert!(client.video[1..].iter().all(|p| !p.is_key));
        assert_eq!(client.video[0].pts, Some(1_000_000));
        assert_eq!(client.video[0].dts, Some(1_000_000));
        assert_eq!(client.video[1].pts, Some(1_040_000));
        assert_eq!(client.video[0].data[..], key_access_unit()[..]);
    }

    #[test]
    fn test_chunking_does_not_change_output() {
        let data = av_stream(8);
        let whole = parse_in_chunks(&data, data.len());

        for chunk_size in [1, 7, 188, 1000] {
            let chunked = parse_in_chunks(&data, chunk_size);
            assert_eq!(chunked.audio, whole.audio, "chunk size {}", chunk_size);
            assert_eq!(chunked.video, whole.video, "chunk size {}", chunk_size);
            assert_eq!(chunked.configs.len(), 1);
        }
    }

    #[test]
    fn test_leading_garbage_is_skipped() {
        let mut data = vec![0x00, 0x12, 0x34, 0x99];
        data.extend(audio_stream(90_000, 3));

        let client = parse_in_chunks(&data, 100);
        assert_eq!(client.audio.len(), 6);
        assert!(client.video.is_empty());
    }

    #[test]
    fn test_continuity_error_fails_parse() {
        let mut writer = TsWriter::new();
        writer
            .pat(PMT_PID)
            .pmt(PMT_PID, &[(STREAM_TYPE_AAC, AUDIO_PID)])
            .audio_pes(AUDIO_PID, 90_000, &adts_frame(100))
            .skip_counter(AUDIO_PID)
            .audio_pes(AUDIO_PID, 94_180, &adts_frame(100));

        let mut parser = Mp2tStreamParser::new();
        let mut client = Collector::default();
        let err = parser.parse(&writer.into_bytes(), &mut client).unwrap_err();
        assert!(matches!(
            err,
            Mp2tError::Continuity {
                pid: AUDIO_PID,
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_timestamp_wraparound_is_unrolled() {
        let first_pts = (1u64 << 33) - 1_000;
        let client = parse_in_chunks(&audio_stream(first_pts, 3), 188);

        assert_eq!(client.audio.len(), 6);
        assert_non_decreasing(&client.audio);

        let first = client.audio[0].pts.unwrap();
        let third = client.audio[2].pts.unwrap();
        assert!((46_444..=46_445).contains(&(third - first)));
    }

    #[test]
    fn test_demuxer_reads_all_packets() {
        let data = av_stream(6);
        let reader = tokio_test::io::Builder::new()
            .read(&data[..1000])
            .read(&data[1000..])
            .build();

        block_on(async {
            let mut demuxer = TSDemuxer::new(reader);

            let streams = demuxer.streams().await.unwrap();
            assert_eq!(streams.len(), 2);
            assert_eq!(streams[0].codec_type(), CodecType::H264);
            assert_eq!(streams[0].width(), Some(320));
            assert_eq!(streams[1].codec_type(), CodecType::AAC);
            assert_eq!(streams[1].sample_rate(), Some(44100));

            let mut audio = 0;
            let mut video = 0;
            loop {
                match demuxer.read_packet().await {
                    Ok(packet) if packet.is_audio() => audio += 1,
                    Ok(_) => video += 1,
                    Err(Mp2tError::EndOfStream) => break,
                    Err(err) => panic!("unexpected error: {}", err),
                }
            }
            assert_eq!(audio, 12);
            assert_eq!(video, 6);
        });
    }

    #[test]
    fn test_demuxer_audio_timing() {
        let data = audio_stream(180_000, 2);

        block_on(async {
            let mut demuxer = TSDemuxer::new(&data[..]);
            let mut pts = Vec::new();
            let mut durations = Vec::new();
            loop {
                match demuxer.read_packet().await {
                    Ok(packet) => {
                        pts.push(packet.pts.unwrap());
                        durations.push(packet.duration.unwrap().as_micros());
                    }
                    Err(Mp2tError::EndOfStream) => break,
                    Err(err) => panic!("unexpected error: {}", err),
                }
            }
            assert_eq!(pts, vec![2_000_000, 2_023_219, 2_046_444, 2_069_663]);
            // Sample counts are converted without drift
            assert_eq!(durations, vec![23_219, 23_220, 23_219, 23_220]);
        });
    }
}
