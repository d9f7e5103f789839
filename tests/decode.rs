//! Decode session tests against the scripted demuxer.

mod common;

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use common::{ScriptedDemuxer, mixed_streams};
use mediakit::{
    CancelReason, CancellationToken, DecodeOptions, Manager, Media, MediaError, MediaFlag,
    OperationType, ProgressCallback, ProgressInfo,
};

#[test]
fn dispatches_only_selected_streams_in_order() {
    let manager = Manager::new();
    let demuxer = ScriptedDemuxer::new(mixed_streams()).with_packets(&[0, 1, 2, 1, 4, 0, 3, 1], 16);
    let media = manager.open_source("mixed", demuxer.boxed()).expect("open");
    let map = manager.map(&media, MediaFlag::AUDIO).expect("map");

    let mut seen = Vec::new();
    manager
        .decode(&CancellationToken::new(), map, |_, packet| {
            assert_eq!(packet.flags(), MediaFlag::AUDIO);
            seen.push((packet.stream().index(), packet.position()));
            Ok(())
        })
        .expect("decode");

    let indices: Vec<usize> = seen.iter().map(|(index, _)| *index).collect();
    assert_eq!(indices, vec![1, 1, 1]);

    let positions: Vec<u64> = seen.iter().filter_map(|(_, position)| *position).collect();
    assert_eq!(positions, vec![16, 48, 112]);
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn end_of_stream_is_not_an_error() {
    let manager = Manager::new();
    let demuxer = ScriptedDemuxer::new(mixed_streams()).with_packets(&[0; 7], 4);
    let reads = demuxer.read_counter();
    let media = manager.open_source("video", demuxer.boxed()).expect("open");
    let map = manager.map(&media, MediaFlag::NONE).expect("map");

    let mut calls = 0;
    let result = manager.decode(&CancellationToken::new(), map, |_, _| {
        calls += 1;
        Ok(())
    });

    assert!(result.is_ok());
    assert_eq!(calls, 7);
    assert_eq!(reads.load(Ordering::SeqCst), 8);
}

#[test]
fn cancelled_token_stops_before_first_read() {
    let manager = Manager::new();
    let demuxer = ScriptedDemuxer::new(mixed_streams()).with_packets(&[0, 1, 0], 4);
    let reads = demuxer.read_counter();
    let media = manager.open_source("mixed", demuxer.boxed()).expect("open");
    let map = manager.map(&media, MediaFlag::NONE).expect("map");

    let token = CancellationToken::new();
    token.cancel();

    let mut calls = 0;
    let error = manager
        .decode(&token, map, |_, _| {
            calls += 1;
            Ok(())
        })
        .unwrap_err();

    assert_eq!(calls, 0);
    assert_eq!(reads.load(Ordering::SeqCst), 0);
    assert_eq!(error.cancel_reason(), Some(CancelReason::Cancelled));
    assert_eq!(error.errors().len(), 1);
}

#[test]
fn expired_deadline_reports_deadline_exceeded() {
    let manager = Manager::new();
    let demuxer = ScriptedDemuxer::new(mixed_streams()).with_packets(&[0, 1], 4);
    let media = manager.open_source("mixed", demuxer.boxed()).expect("open");
    let map = manager.map(&media, MediaFlag::NONE).expect("map");

    let token = CancellationToken::with_timeout(Duration::ZERO);
    let error = manager.decode(&token, map, |_, _| Ok(())).unwrap_err();
    assert_eq!(error.cancel_reason(), Some(CancelReason::DeadlineExceeded));
}

#[test]
fn cancelling_from_handler_stops_at_next_iteration() {
    let manager = Manager::new();
    let demuxer = ScriptedDemuxer::new(mixed_streams()).with_packets(&[0; 10], 4);
    let reads = demuxer.read_counter();
    let media = manager.open_source("video", demuxer.boxed()).expect("open");
    let map = manager.map(&media, MediaFlag::VIDEO).expect("map");

    let mut calls = 0;
    let error = manager
        .decode(&CancellationToken::new(), map, |token, _| {
            calls += 1;
            if calls == 3 {
                token.cancel();
            }
            Ok(())
        })
        .unwrap_err();

    assert!(error.is_cancelled());
    assert_eq!(calls, 3);
    assert_eq!(reads.load(Ordering::SeqCst), 3);
}

#[test]
fn handler_error_ends_session() {
    let manager = Manager::new();
    let demuxer = ScriptedDemuxer::new(mixed_streams()).with_packets(&[0; 5], 4);
    let media = manager.open_source("video", demuxer.boxed()).expect("open");
    let map = manager.map(&media, MediaFlag::NONE).expect("map");

    let mut calls = 0;
    let error = manager
        .decode(&CancellationToken::new(), map, |_, _| {
            calls += 1;
            if calls == 2 {
                Err(MediaError::handler("enough"))
            } else {
                Ok(())
            }
        })
        .unwrap_err();

    assert_eq!(calls, 2);
    assert_eq!(error.errors().len(), 1);
    assert!(matches!(error.errors()[0], MediaError::Handler(_)));
    assert!(!error.is_cancelled());
}

#[test]
fn read_failure_is_reported() {
    let manager = Manager::new();
    let demuxer = ScriptedDemuxer::new(mixed_streams())
        .with_packets(&[0; 5], 4)
        .failing_read_at(2);
    let media = manager.open_source("video", demuxer.boxed()).expect("open");
    let map = manager.map(&media, MediaFlag::NONE).expect("map");

    let mut calls = 0;
    let error = manager
        .decode(&CancellationToken::new(), map, |_, _| {
            calls += 1;
            Ok(())
        })
        .unwrap_err();

    assert_eq!(calls, 2);
    assert!(matches!(
        error.errors(),
        [MediaError::ReadFailed { reason, .. }] if reason == "read 2 failed"
    ));
}

#[test]
fn concurrent_session_on_same_media_is_busy() {
    let manager = Manager::new();
    let demuxer = ScriptedDemuxer::new(mixed_streams()).with_packets(&[0, 1], 4);
    let media = manager.open_source("mixed", demuxer.boxed()).expect("open");

    let first = manager.map(&media, MediaFlag::VIDEO).expect("first map");
    let mut second = Some(manager.map(&media, MediaFlag::AUDIO).expect("second map"));

    let mut nested = None;
    manager
        .decode(&CancellationToken::new(), first, |_, _| {
            if let Some(map) = second.take() {
                nested = Some(manager.decode(&CancellationToken::new(), map, |_, _| Ok(())));
            }
            Ok(())
        })
        .expect("outer decode");

    assert!(matches!(nested, Some(Err(MediaError::Busy(_)))));

    let again = manager.map(&media, MediaFlag::AUDIO).expect("map after session");
    manager
        .decode(&CancellationToken::new(), again, |_, _| Ok(()))
        .expect("lease is released after the session");
}

#[test]
fn closing_media_mid_session_fails_next_read() {
    let manager = Manager::new();
    let demuxer = ScriptedDemuxer::new(mixed_streams()).with_packets(&[0; 4], 4);
    let media = manager.open_source("video", demuxer.boxed()).expect("open");
    let map = manager.map(&media, MediaFlag::NONE).expect("map");

    let mut calls = 0;
    let error = manager
        .decode(&CancellationToken::new(), map, |_, _| {
            calls += 1;
            media.close()
        })
        .unwrap_err();

    assert_eq!(calls, 1);
    assert!(matches!(error.errors(), [MediaError::Closed(url)] if url == "video"));
    assert!(manager.is_empty());
}

#[test]
fn decoding_closed_media_is_invalid() {
    let manager = Manager::new();
    let media = manager
        .open_source("mixed", ScriptedDemuxer::new(mixed_streams()).boxed())
        .expect("open");
    let map = manager.map(&media, MediaFlag::NONE).expect("map");
    media.close().expect("close");

    let mut calls = 0;
    let error = manager
        .decode(&CancellationToken::new(), map, |_, _| {
            calls += 1;
            Ok(())
        })
        .unwrap_err();

    assert_eq!(calls, 0);
    assert!(matches!(error, MediaError::InvalidParameter("input")));
}

#[test]
fn packets_carry_timing_and_payload() {
    let manager = Manager::new();
    let demuxer = ScriptedDemuxer::new(mixed_streams()).with_packets(&[1, 1, 1], 8);
    let media = manager.open_source("audio", demuxer.boxed()).expect("open");
    let map = manager.map(&media, MediaFlag::AUDIO).expect("map");

    let mut packets = Vec::new();
    manager
        .decode(&CancellationToken::new(), map, |_, packet| {
            packets.push((
                packet.is_key_frame(),
                packet.timestamp(),
                packet.duration(),
                packet.to_vec(),
            ));
            Ok(())
        })
        .expect("decode");

    assert_eq!(packets.len(), 3);
    assert!(packets[0].0);
    assert!(!packets[1].0);
    assert_eq!(packets[2].1, Some(Duration::from_millis(20)));
    assert_eq!(packets[2].2, Duration::from_millis(10));
    assert_eq!(packets[2].3, vec![2u8; 8]);
}

struct CountingProgress {
    reports: AtomicU64,
    last: AtomicU64,
}

impl ProgressCallback for CountingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        assert_eq!(info.operation, OperationType::Decoding);
        self.reports.fetch_add(1, Ordering::SeqCst);
        self.last.store(info.current, Ordering::SeqCst);
    }
}

#[test]
fn progress_is_reported_per_batch_and_at_end() {
    let manager = Manager::new();
    let demuxer = ScriptedDemuxer::new(mixed_streams()).with_packets(&[0, 1, 0, 5, 0, 1, 2], 4);
    let media = manager.open_source("mixed", demuxer.boxed()).expect("open");
    let map = manager.map(&media, MediaFlag::VIDEO | MediaFlag::AUDIO).expect("map");

    let progress = Arc::new(CountingProgress {
        reports: AtomicU64::new(0),
        last: AtomicU64::new(0),
    });
    let options = DecodeOptions::new()
        .with_progress(progress.clone())
        .with_batch_size(2);

    manager
        .decode_with_options(&CancellationToken::new(), map, &options, |_, _| Ok(()))
        .expect("decode");

    // Five dispatched packets: reports after 2 and 4, then the final one.
    assert_eq!(progress.reports.load(Ordering::SeqCst), 3);
    assert_eq!(progress.last.load(Ordering::SeqCst), 5);
}
