//! Manager lifecycle tests.

mod common;

use std::{fs, sync::atomic::Ordering};

use common::{ScriptedDemuxer, mixed_streams};
use mediakit::{Manager, Media, MediaError, MediaFlag, MediaKey, Metadata, Stream};

#[test]
fn close_attempts_every_media_and_aggregates_failures() {
    let manager = Manager::new();

    let first = ScriptedDemuxer::new(mixed_streams());
    let second = ScriptedDemuxer::new(mixed_streams()).failing_close();
    let third = ScriptedDemuxer::new(mixed_streams());
    let counters = [
        first.close_counter(),
        second.close_counter(),
        third.close_counter(),
    ];

    let handles = [
        manager.open_source("first", first.boxed()).expect("open first"),
        manager.open_source("second", second.boxed()).expect("open second"),
        manager.open_source("third", third.boxed()).expect("open third"),
    ];
    assert_eq!(manager.len(), 3);

    let error = manager.close().unwrap_err();
    assert_eq!(error.errors().len(), 1);
    assert!(matches!(error.errors()[0], MediaError::Io(_)));

    for counter in &counters {
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
    assert!(handles.iter().all(|media| !media.is_open()));
    assert!(manager.is_empty());
}

#[test]
fn close_with_nothing_open_succeeds() {
    let manager = Manager::new();
    assert!(manager.close().is_ok());
}

#[test]
fn closing_twice_is_a_no_op() {
    let manager = Manager::new();
    let demuxer = ScriptedDemuxer::new(mixed_streams());
    let closes = demuxer.close_counter();
    let media = manager.open_source("once", demuxer.boxed()).expect("open");

    media.close().expect("first close");
    media.close().expect("second close");
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(!media.is_open());
}

#[test]
fn failed_demuxer_close_still_deregisters() {
    let manager = Manager::new();
    let media = manager
        .open_source("broken", ScriptedDemuxer::new(mixed_streams()).failing_close().boxed())
        .expect("open");

    assert!(media.close().is_err());
    assert!(manager.is_empty());
}

#[test]
fn closing_one_media_deregisters_only_it() {
    let manager = Manager::new();
    let a = manager
        .open_source("a", ScriptedDemuxer::new(mixed_streams()).boxed())
        .expect("open a");
    let b = manager
        .open_source("b", ScriptedDemuxer::new(mixed_streams()).boxed())
        .expect("open b");
    assert_ne!(a.id(), b.id());

    a.close().expect("close a");
    let open = manager.open_media();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id(), b.id());
    assert_eq!(open[0].url(), "b");
}

#[test]
fn dropping_manager_closes_remaining_media() {
    let demuxer = ScriptedDemuxer::new(mixed_streams());
    let closes = demuxer.close_counter();

    let media = {
        let manager = Manager::new();
        manager.open_source("left-open", demuxer.boxed()).expect("open")
    };

    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(!media.is_open());
}

#[test]
fn failed_probe_is_open_failure_and_not_registered() {
    let manager = Manager::new();
    let error = manager
        .open_source("unprobeable", ScriptedDemuxer::new(mixed_streams()).failing_probe().boxed())
        .unwrap_err();

    assert!(matches!(error, MediaError::OpenFailed { .. }));
    assert!(error.to_string().contains("unprobeable"));
    assert!(manager.is_empty());
}

#[test]
fn stream_indices_must_match_positions() {
    let manager = Manager::new();
    let streams = vec![Stream::new(0, MediaFlag::VIDEO), Stream::new(2, MediaFlag::AUDIO)];
    let error = manager
        .open_source("gap", ScriptedDemuxer::new(streams).boxed())
        .unwrap_err();
    assert!(matches!(error, MediaError::OpenFailed { .. }));
}

#[test]
fn media_flags_aggregate_streams_metadata_and_source() {
    let mut metadata = Metadata::new();
    metadata.insert_raw(MediaKey::ALBUM, "Blue Train");
    metadata.insert_raw(MediaKey::TRACK, "2/5");

    let streams = vec![
        Stream::new(0, MediaFlag::AUDIO),
        Stream::new(1, MediaFlag::VIDEO).with_artwork(vec![0xFF, 0xD8]),
        Stream::new(2, MediaFlag::SUBTITLE | MediaFlag::CAPTIONS),
    ];
    let demuxer = ScriptedDemuxer::new(streams)
        .with_metadata(metadata)
        .with_flags(MediaFlag::FILE);

    let manager = Manager::new();
    let media = manager.open_source("album.m4a", demuxer.boxed()).expect("open");

    let flags = media.flags();
    for expected in [
        MediaFlag::FILE,
        MediaFlag::AUDIO,
        MediaFlag::VIDEO,
        MediaFlag::SUBTITLE,
        MediaFlag::ARTWORK,
        MediaFlag::CAPTIONS,
        MediaFlag::ALBUM,
        MediaFlag::ALBUM_TRACK,
    ] {
        assert!(flags.is(expected), "{flags} lacks {expected}");
    }
    assert!(!flags.is(MediaFlag::TVSHOW));
    assert_eq!(
        media.metadata().get(&MediaKey::TRACK).and_then(|value| value.as_u64()),
        Some(2)
    );
    assert_eq!(media.stream(1).and_then(Stream::artwork), Some(&[0xFF, 0xD8][..]));
}

#[test]
fn opening_missing_file_fails() {
    let manager = Manager::new();
    let error = manager
        .open_file("tests/fixtures/does_not_exist.mp4")
        .unwrap_err();

    assert!(matches!(error, MediaError::OpenFailed { .. }));
    assert!(error.to_string().starts_with("Failed to open media"));
    assert!(manager.is_empty());
}

#[test]
fn opening_garbage_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("garbage.mp4");
    fs::write(&path, b"definitely not a media container").expect("write");

    let manager = Manager::new();
    let error = manager.open_file(&path).unwrap_err();
    assert!(matches!(error, MediaError::OpenFailed { .. }));
}

#[test]
fn create_file_registers_output_media() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out.mkv");

    let manager = Manager::new();
    let output = manager.create_file(&path).expect("create");
    assert!(output.is_open());
    assert!(output.flags().is(MediaFlag::FILE));
    assert!(output.streams().is_empty());
    assert_eq!(output.format_name(), "matroska");
    assert_eq!(manager.len(), 1);

    output.close().expect("close");
    assert!(!output.is_open());
    assert!(manager.is_empty());
}

#[test]
fn create_file_in_missing_directory_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing").join("out.mp4");

    let manager = Manager::new();
    let error = manager.create_file(&path).unwrap_err();
    assert!(matches!(error, MediaError::CreateFailed { .. }));
    assert!(manager.is_empty());
}

#[test]
fn debug_toggle_is_remembered() {
    let manager = Manager::new();
    assert!(!manager.is_debug());
    manager.set_debug(true);
    assert!(manager.is_debug());
    manager.set_debug(false);
    assert!(!manager.is_debug());
}
