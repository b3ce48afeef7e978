//! End-to-end decode session tests over a scripted engine.

use std::{collections::VecDeque, time::Duration};

use aulos_decode::{DecodeError, DecodeSession, Packet, PcmBlock, SampleFormat};
use aulos_engine::{
    BitrateMode, EngineError, EnginePolicy, FormatReport, FrameInfo, MpegLayer, MpegVersion,
    SampleEncoding, ScriptedEngine,
};

const RATE: u32 = 44100;

fn stereo_s16() -> FormatReport {
    FormatReport {
        sample_rate: RATE,
        channels: 2,
        encoding: SampleEncoding::Signed16,
    }
}

fn info(bitrate: u32, mode: BitrateMode) -> FrameInfo {
    FrameInfo {
        bitrate,
        mode,
        frame_size: 417,
        version: MpegVersion::Mpeg1,
        layer: MpegLayer::III,
        sample_rate: RATE,
    }
}

/// One decoded frame's worth of stereo S16 PCM (4 bytes per sample frame).
fn frame_bytes(samples: usize) -> Vec<u8> {
    vec![0u8; samples * 4]
}

fn packets(data: &[Packet]) -> VecDeque<Packet> {
    data.iter().cloned().collect()
}

fn decode_all(
    session: &mut DecodeSession<ScriptedEngine>,
    source: &mut VecDeque<Packet>,
) -> Vec<PcmBlock> {
    let mut blocks = Vec::new();
    while let Some(block) = session.decode_packet(source).unwrap() {
        blocks.push(block);
    }
    blocks
}

#[test]
fn test_exhausted_source_is_end_of_stream_not_error() {
    // The scripted engine would fail loudly if decode were attempted, so
    // this also proves the engine is never touched without a packet.
    let mut session = DecodeSession::with_engine(ScriptedEngine::new());
    let mut source: VecDeque<Packet> = VecDeque::new();

    assert!(session.decode_packet(&mut source).unwrap().is_none());
    assert!(session.decode_packet(&mut source).unwrap().is_none());
}

#[test]
fn test_need_more_returns_empty_block() {
    let mut engine = ScriptedEngine::new();
    engine.push_need_more();
    let mut session = DecodeSession::with_engine(engine);
    let mut source = packets(&[Packet::untimed(vec![0xff, 0xfb])]);

    let block = session.decode_packet(&mut source).unwrap().unwrap();
    assert!(block.is_empty());
    assert_eq!(block.meta.spec, None);
    // No frame decoded, no bitrate update.
    assert_eq!(session.bitrate(), 0);
}

#[test]
fn test_format_event_then_decoded_frame() {
    let mut engine = ScriptedEngine::new();
    engine.push_format(stereo_s16());
    engine.push_decoded(frame_bytes(1152));
    engine.push_frame_info(info(128_000, BitrateMode::Cbr));
    let mut session = DecodeSession::with_engine(engine);
    let mut source = packets(&[
        Packet::untimed(vec![1u8; 100]),
        Packet::untimed(vec![2u8; 100]),
    ]);

    // Format change: empty block carrying the freshly resolved spec.
    let first = session.decode_packet(&mut source).unwrap().unwrap();
    assert!(first.is_empty());
    let spec = first.meta.spec.unwrap();
    assert_eq!(spec.sample_rate, RATE);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.format, SampleFormat::S16);
    assert_eq!(session.spec(), Some(spec));

    let second = session.decode_packet(&mut source).unwrap().unwrap();
    assert_eq!(second.samples(), 1152);
    assert_eq!(session.bitrate(), 128_000);
}

#[test]
fn test_frame_before_any_format_fails_with_no_sample_size() {
    let mut engine = ScriptedEngine::new();
    engine.push_decoded(frame_bytes(1152));
    let mut session = DecodeSession::with_engine(engine);
    let mut source = packets(&[Packet::untimed(vec![0u8; 100])]);

    let err = session.decode_packet(&mut source).unwrap_err();
    assert!(matches!(err, DecodeError::NoSampleSize));
}

#[test]
fn test_unrepresentable_encoding_is_fatal() {
    let mut engine = ScriptedEngine::new();
    engine.push_format(FormatReport {
        encoding: SampleEncoding::Float64,
        ..stereo_s16()
    });
    let mut session = DecodeSession::with_engine(engine);
    let mut source = packets(&[Packet::untimed(vec![0u8; 100])]);

    let err = session.decode_packet(&mut source).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::UnsupportedEncoding(SampleEncoding::Float64)
    ));
}

#[test]
fn test_engine_decode_failure_surfaces_diagnostic_text() {
    let mut engine = ScriptedEngine::new();
    engine.push_error(EngineError::Decode("out of sync".into()));
    let mut session = DecodeSession::with_engine(engine);
    let mut source = packets(&[Packet::untimed(vec![0u8; 100])]);

    let err = session.decode_packet(&mut source).unwrap_err();
    assert!(matches!(err, DecodeError::Engine(_)));
    assert_eq!(err.to_string(), "engine error: decode failed: out of sync");
}

#[test]
fn test_timestamp_continuity_across_untimed_packets() {
    let mut engine = ScriptedEngine::new();
    engine.push_format(stereo_s16());
    engine.push_decoded(frame_bytes(1152));
    engine.push_decoded(frame_bytes(1152));
    let mut session = DecodeSession::with_engine(engine);

    let base = Duration::from_secs(2);
    let mut source = packets(&[
        Packet::timestamped(vec![0u8; 10], base),
        Packet::untimed(vec![0u8; 10]),
        Packet::untimed(vec![0u8; 10]),
    ]);

    // Format block: offset zero at the adopted timestamp.
    let format_block = session.decode_packet(&mut source).unwrap().unwrap();
    assert_eq!(format_block.meta.timestamp, Some(base));
    assert_eq!(format_block.meta.frame_offset, 0);

    let first = session.decode_packet(&mut source).unwrap().unwrap();
    assert_eq!(first.meta.timestamp, Some(base));
    assert_eq!(first.meta.frame_offset, 0);
    assert_eq!(first.samples(), 1152);

    // Second block continues from the same timestamp, 1152 samples later.
    let second = session.decode_packet(&mut source).unwrap().unwrap();
    assert_eq!(second.meta.timestamp, Some(base));
    assert_eq!(second.meta.frame_offset, 1152);

    let expected = base + Duration::from_secs_f64(1152.0 / f64::from(RATE));
    assert_eq!(second.meta.effective_timestamp(), Some(expected));
}

#[test]
fn test_new_timestamp_resets_sample_offset() {
    let mut engine = ScriptedEngine::new();
    engine.push_format(stereo_s16());
    engine.push_decoded(frame_bytes(1152));
    engine.push_decoded(frame_bytes(1152));
    let mut session = DecodeSession::with_engine(engine);

    let mut source = packets(&[
        Packet::timestamped(vec![0u8; 10], Duration::from_secs(1)),
        Packet::untimed(vec![0u8; 10]),
        Packet::timestamped(vec![0u8; 10], Duration::from_secs(5)),
    ]);

    let _format = session.decode_packet(&mut source).unwrap().unwrap();
    let _first = session.decode_packet(&mut source).unwrap().unwrap();

    let second = session.decode_packet(&mut source).unwrap().unwrap();
    assert_eq!(second.meta.timestamp, Some(Duration::from_secs(5)));
    assert_eq!(second.meta.frame_offset, 0);
}

#[test]
fn test_chunking_does_not_change_fed_bytes_or_output() {
    let stream: Vec<u8> = (0u8..200).collect();
    let frame_one = frame_bytes(1152);
    let frame_two: Vec<u8> = vec![7u8; 1152 * 4];

    // Coarse chunking: format lands on the first call, frames back to back.
    let mut coarse = ScriptedEngine::new();
    let coarse_logs = coarse.logs();
    coarse.push_format(stereo_s16());
    coarse.push_decoded(frame_one.clone());
    coarse.push_decoded(frame_two.clone());
    let mut coarse_session = DecodeSession::with_engine(coarse);
    let mut coarse_source = packets(&[
        Packet::untimed(stream[..150].to_vec()),
        Packet::untimed(stream[150..].to_vec()),
        Packet::untimed(Vec::new()),
    ]);

    // Fine chunking of the same bytes: the engine buffers longer before
    // each frame comes out.
    let mut fine = ScriptedEngine::new();
    let fine_logs = fine.logs();
    fine.push_format(stereo_s16());
    fine.push_need_more();
    fine.push_decoded(frame_one.clone());
    fine.push_need_more();
    fine.push_decoded(frame_two.clone());
    let mut fine_session = DecodeSession::with_engine(fine);
    let mut fine_source = packets(&[
        Packet::untimed(stream[..20].to_vec()),
        Packet::untimed(stream[20..90].to_vec()),
        Packet::untimed(stream[90..91].to_vec()),
        Packet::untimed(stream[91..].to_vec()),
        Packet::untimed(Vec::new()),
    ]);

    let coarse_blocks = decode_all(&mut coarse_session, &mut coarse_source);
    let fine_blocks = decode_all(&mut fine_session, &mut fine_source);

    // The engine saw the identical byte stream either way.
    assert_eq!(coarse_logs.fed_bytes(), fine_logs.fed_bytes());
    assert_eq!(coarse_logs.fed_bytes().len(), 200);

    // And the decoded sample stream is identical, chunking ignored.
    let coarse_pcm: Vec<u8> = coarse_blocks
        .iter()
        .flat_map(|b| b.pcm.iter().copied())
        .collect();
    let fine_pcm: Vec<u8> = fine_blocks
        .iter()
        .flat_map(|b| b.pcm.iter().copied())
        .collect();
    assert_eq!(coarse_pcm, fine_pcm);
}

#[test]
fn test_cbr_stream_publishes_immediately_every_frame() {
    let mut engine = ScriptedEngine::new();
    engine.push_format(stereo_s16());
    for _ in 0..10 {
        engine.push_decoded(frame_bytes(1152));
    }
    engine.push_frame_info(info(128_000, BitrateMode::Cbr));
    let mut session = DecodeSession::with_engine(engine);

    let mut source: VecDeque<Packet> =
        (0..11).map(|_| Packet::untimed(vec![0u8; 417])).collect();

    // Format block first, then ten frames at a stable 128 kbit/s with no
    // smoothing delay.
    let _format = session.decode_packet(&mut source).unwrap().unwrap();
    for _ in 0..10 {
        let block = session.decode_packet(&mut source).unwrap().unwrap();
        assert_eq!(block.samples(), 1152);
        assert_eq!(session.bitrate(), 128_000);
    }
}

#[test]
fn test_vbr_stream_publishes_every_tenth_frame() {
    // The format-change block consumes the first frame-info query, so the
    // script carries one info entry per decode call, format included.
    let mut engine = ScriptedEngine::new();
    engine.push_format(stereo_s16());
    engine.push_frame_info(info(32_000, BitrateMode::Vbr));
    for _ in 0..10 {
        engine.push_decoded(frame_bytes(1152));
        engine.push_frame_info(info(320_000, BitrateMode::Vbr));
    }
    let mut session = DecodeSession::with_engine(engine);

    let mut source: VecDeque<Packet> =
        (0..11).map(|_| Packet::untimed(vec![0u8; 417])).collect();

    // First fold happens on the first frame seen.
    let _format = session.decode_packet(&mut source).unwrap().unwrap();
    assert_eq!(session.bitrate(), 32_000);

    // Nine frames in between leave the published value untouched even
    // though every one of them reports 320 kbit/s.
    for _ in 0..9 {
        let _ = session.decode_packet(&mut source).unwrap().unwrap();
        assert_eq!(session.bitrate(), 32_000);
    }

    // The tenth frame after the fold publishes the running mean of the
    // sampled values, not the latest instantaneous one.
    let _ = session.decode_packet(&mut source).unwrap().unwrap();
    assert_eq!(session.bitrate(), 176_000);
}

#[test]
fn test_cbr_frame_restarts_vbr_mean() {
    let mut engine = ScriptedEngine::new();
    engine.push_format(stereo_s16());
    engine.push_frame_info(info(320_000, BitrateMode::Vbr));
    engine.push_decoded(frame_bytes(1152));
    engine.push_frame_info(info(128_000, BitrateMode::Cbr));
    engine.push_decoded(frame_bytes(1152));
    engine.push_frame_info(info(64_000, BitrateMode::Vbr));
    let mut session = DecodeSession::with_engine(engine);

    let mut source: VecDeque<Packet> =
        (0..3).map(|_| Packet::untimed(vec![0u8; 417])).collect();

    let _format = session.decode_packet(&mut source).unwrap().unwrap();
    assert_eq!(session.bitrate(), 320_000);

    let _ = session.decode_packet(&mut source).unwrap().unwrap();
    assert_eq!(session.bitrate(), 128_000);

    // Mean restarted: the next VBR frame stands alone, the 320 kbit/s
    // sample is gone.
    let _ = session.decode_packet(&mut source).unwrap().unwrap();
    assert_eq!(session.bitrate(), 64_000);
}

#[test]
fn test_garbage_mid_stream_recovers_with_monotonic_timestamps() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut engine = ScriptedEngine::new();
    engine.push_format(stereo_s16());
    engine.push_decoded(frame_bytes(1152));
    // The engine swallows the garbage while resyncing and just asks for
    // more input; no adapter-level error for the garbage itself.
    engine.push_need_more();
    engine.push_decoded(frame_bytes(1152));
    let mut session = DecodeSession::with_engine(engine);

    let mut source = packets(&[
        Packet::timestamped(vec![0u8; 417], Duration::from_secs(1)),
        Packet::untimed(vec![0u8; 417]),
        Packet::untimed(vec![0xde, 0xad, 0xbe, 0xef]),
        Packet::untimed(vec![0u8; 417]),
    ]);

    let _format = session.decode_packet(&mut source).unwrap().unwrap();
    let first = session.decode_packet(&mut source).unwrap().unwrap();
    let garbage = session.decode_packet(&mut source).unwrap().unwrap();
    assert!(garbage.is_empty());
    let recovered = session.decode_packet(&mut source).unwrap().unwrap();

    assert_eq!(recovered.samples(), 1152);
    let first_ts = first.meta.effective_timestamp().unwrap();
    let recovered_ts = recovered.meta.effective_timestamp().unwrap();
    assert!(recovered_ts > first_ts);
}

#[test]
fn test_finished_step_emits_trailing_samples() {
    let mut engine = ScriptedEngine::new();
    engine.push_format(stereo_s16());
    engine.push_finished(frame_bytes(576));
    let mut session = DecodeSession::with_engine(engine);
    let mut source = packets(&[
        Packet::untimed(vec![0u8; 417]),
        Packet::untimed(vec![0u8; 417]),
    ]);

    let _format = session.decode_packet(&mut source).unwrap().unwrap();
    let last = session.decode_packet(&mut source).unwrap().unwrap();
    assert_eq!(last.samples(), 576);
}

#[test]
fn test_reset_clears_timing_and_bitrate_state() {
    let mut engine = ScriptedEngine::new();
    let logs = engine.logs();
    engine.push_format(stereo_s16());
    engine.push_decoded(frame_bytes(1152));
    engine.push_frame_info(info(128_000, BitrateMode::Cbr));
    // Fresh stream after the reset.
    engine.push_format(stereo_s16());
    engine.push_decoded(frame_bytes(1152));
    let mut session = DecodeSession::with_engine(engine);

    let mut source = packets(&[
        Packet::timestamped(vec![0u8; 417], Duration::from_secs(30)),
        Packet::untimed(vec![0u8; 417]),
    ]);
    let _format = session.decode_packet(&mut source).unwrap().unwrap();
    let _frame = session.decode_packet(&mut source).unwrap().unwrap();
    assert_eq!(session.bitrate(), 128_000);

    session.reset().unwrap();
    assert_eq!(logs.resets(), 1);
    assert_eq!(session.bitrate(), 0);

    // Immediately able to decode a fresh stream from byte zero; the old
    // timestamp is gone.
    let mut fresh = packets(&[
        Packet::untimed(vec![0u8; 417]),
        Packet::untimed(vec![0u8; 417]),
    ]);
    let format_block = session.decode_packet(&mut fresh).unwrap().unwrap();
    assert_eq!(format_block.meta.timestamp, None);
    assert_eq!(format_block.meta.frame_offset, 0);

    let frame = session.decode_packet(&mut fresh).unwrap().unwrap();
    assert_eq!(frame.samples(), 1152);
}

#[test]
fn test_failed_reset_reports_and_later_reset_recovers() {
    let mut engine = ScriptedEngine::new();
    let logs = engine.logs();
    engine.fail_next_reset(EngineError::OpenFeed("scripted".into()));
    let mut session = DecodeSession::with_engine(engine);

    let err = session.reset().unwrap_err();
    assert!(matches!(err, DecodeError::ResetFailed(_)));
    assert_eq!(logs.resets(), 0);

    session.reset().unwrap();
    assert_eq!(logs.resets(), 1);
}

#[test]
fn test_open_applies_tolerant_policy_and_drop_releases_engine() {
    let session = DecodeSession::<ScriptedEngine>::open(EnginePolicy::default()).unwrap();
    let logs = session.engine().logs();

    let policy = session.engine().policy().cloned().unwrap();
    assert!(policy.quiet);
    assert_eq!(policy.resync_limit, None);
    assert!(!policy.auto_resample);

    drop(session);
    assert_eq!(logs.drops(), 1);
}
