//! Tests for record and replay modes

use super::*;
use crate::appender::BufferedAppender;
use crate::appender::tests::SharedSink;
use crate::log::{LogRecord, LogWriter};
use std::path::PathBuf;
use tempfile::TempDir;

fn scratch() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("reduce.rlog");
    (dir, path)
}

fn key(s: &str) -> String {
    s.to_string()
}

/// Runs a record-mode job over `groups` and returns what each reduction saw.
fn record_job(path: &Path, groups: &[(&str, Vec<u64>)]) -> Vec<Vec<u64>> {
    let recorder = ReduceRecorder::<String, u64>::record(path).unwrap();
    let seen = groups
        .iter()
        .map(|(k, values)| {
            let mut live = values.clone().into_iter();
            recorder.get_sequence(&key(k), &mut live).collect::<Vec<u64>>()
        })
        .collect();
    recorder.finish().unwrap();
    seen
}

#[test]
fn test_passthrough_is_transparent() {
    let (dir, _) = scratch();
    let recorder = ReduceRecorder::<String, u64>::passthrough();
    assert_eq!(recorder.mode(), RecorderMode::Passthrough);

    let mut live = vec![5u64, 3, 9].into_iter();
    let view = recorder.get_sequence(&key("k"), &mut live);
    assert!(!view.is_replayed());
    assert_eq!(view.total(), 3);
    assert_eq!(view.collect::<Vec<_>>(), vec![5, 3, 9]);
    assert_eq!(live.next(), None);

    recorder.finish().unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_record_leaves_live_iterator_untouched() {
    let (_dir, path) = scratch();
    let recorder = ReduceRecorder::<String, u64>::record(&path).unwrap();

    let mut live = vec![1u64, 1, 2, 3, 5].into_iter();
    let reference = live.clone();

    let view = recorder.get_sequence(&key("fib"), &mut live);
    assert!(!view.is_replayed());
    assert_eq!(view.total(), 5);
    assert_eq!(view.collect::<Vec<_>>(), reference.collect::<Vec<_>>());
    assert_eq!(recorder.recorded_groups(), 1);
}

#[test]
fn test_record_then_replay_roundtrip() {
    let (_dir, path) = scratch();
    let groups = vec![
        ("A", vec![1u64, 2, 3]),
        ("B", vec![4]),
        ("empty", vec![]),
        ("ordered", vec![9, 1, 8, 2, 7]),
    ];
    let seen = record_job(&path, &groups);
    for ((_, values), observed) in groups.iter().zip(&seen) {
        assert_eq!(values, observed);
    }

    let replayer = ReduceRecorder::<String, u64>::replay(&path).unwrap();
    assert_eq!(replayer.mode(), RecorderMode::Replay);
    assert_eq!(replayer.replay_table().unwrap().len(), groups.len());

    for (k, values) in &groups {
        let mut ignored = vec![999u64].into_iter();
        let view = replayer.get_sequence(&key(k), &mut ignored);
        assert!(view.is_replayed());
        assert_eq!(view.total(), values.len());
        assert_eq!(&view.collect::<Vec<_>>(), values);
        // Replay never touches the live iterator
        assert_eq!(ignored.len(), 1);
    }
}

#[test]
fn test_replay_serves_fresh_copy_each_call() {
    let (_dir, path) = scratch();
    record_job(&path, &[("A", vec![1, 2])]);
    let replayer = ReduceRecorder::<String, u64>::replay(&path).unwrap();

    let mut live = Vec::<u64>::new().into_iter();
    let first: Vec<u64> = replayer.get_sequence(&key("A"), &mut live).collect();
    let second: Vec<u64> = replayer.get_sequence(&key("A"), &mut live).collect();
    assert_eq!(first, second);
}

#[test]
fn test_dropped_recorder_flushes_log() {
    let (_dir, path) = scratch();
    {
        let recorder = ReduceRecorder::<String, u64>::record(&path).unwrap();
        let mut live = vec![8u64, 6].into_iter();
        let _ = recorder.get_sequence(&key("A"), &mut live).count();
        // Still buffered: nothing on disk yet
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    let replayer = ReduceRecorder::<String, u64>::replay(&path).unwrap();
    let mut live = Vec::<u64>::new().into_iter();
    let values: Vec<u64> = replayer.get_sequence(&key("A"), &mut live).collect();
    assert_eq!(values, vec![8, 6]);
}

#[test]
fn test_replay_rejects_duplicate_keys() {
    let (_dir, path) = scratch();
    // Querying the same key twice while recording breaks the single-query contract
    record_job(&path, &[("A", vec![1]), ("B", vec![2]), ("A", vec![3])]);

    let err = ReduceRecorder::<String, u64>::replay(&path).unwrap_err();
    match err {
        RewindError::DuplicateKey(k) => assert_eq!(k, "\"A\""),
        other => panic!("expected duplicate key error, got {other}"),
    }
}

#[test]
fn test_replay_table_from_reader_rejects_duplicates() {
    let sink = SharedSink::default();
    let writer = LogWriter::from_appender(BufferedAppender::new(sink.clone()));
    writer.append_record(&LogRecord::new(7u32, vec![1u8])).unwrap();
    writer.append_record(&LogRecord::new(7u32, vec![2u8])).unwrap();
    writer.close().unwrap();

    let bytes = sink.contents();
    let result = ReplayTable::<u32, u8>::from_reader(bytes.as_slice());
    assert!(matches!(result, Err(RewindError::DuplicateKey(_))));
}

#[test]
fn test_replay_missing_key_is_error() {
    let (_dir, path) = scratch();
    record_job(&path, &[("A", vec![1])]);
    let replayer = ReduceRecorder::<String, u64>::replay(&path).unwrap();

    let mut live = Vec::<u64>::new().into_iter();
    let err = replayer.try_get_sequence(&key("C"), &mut live).unwrap_err();
    assert!(matches!(err, RewindError::MissingKey(_)));
}

#[test]
#[should_panic(expected = "Key not present in replay log")]
fn test_replay_missing_key_aborts() {
    let (_dir, path) = scratch();
    record_job(&path, &[("A", vec![1])]);
    let replayer = ReduceRecorder::<String, u64>::replay(&path).unwrap();

    let mut live = Vec::<u64>::new().into_iter();
    let _ = replayer.get_sequence(&key("C"), &mut live);
}

#[test]
fn test_replay_of_missing_log_fails_at_open() {
    let (_dir, path) = scratch();
    let err = ReduceRecorder::<String, u64>::replay(&path).unwrap_err();
    assert!(matches!(err, RewindError::OpenLog { .. }));
}

#[test]
fn test_record_into_missing_directory_fails_at_open() {
    let (dir, _) = scratch();
    let path = dir.path().join("no-such-dir").join("reduce.rlog");
    let err = ReduceRecorder::<String, u64>::record(&path).unwrap_err();
    assert!(matches!(err, RewindError::OpenLog { .. }));
}

#[test]
fn test_open_from_config() {
    let (_dir, path) = scratch();

    let recorder = ReduceRecorder::<u64, String>::open(&RecorderConfig::record(&path)).unwrap();
    assert_eq!(recorder.mode(), RecorderMode::Record);
    let mut live = vec!["x".to_string()].into_iter();
    let _ = recorder.get_sequence(&1, &mut live);
    recorder.finish().unwrap();

    let replayer = ReduceRecorder::<u64, String>::open(&RecorderConfig::replay(&path)).unwrap();
    assert!(replayer.replay_table().unwrap().contains_key(&1));

    let missing_path = RecorderConfig {
        mode: RecorderMode::Replay,
        log_path: None,
    };
    let err = ReduceRecorder::<u64, String>::open(&missing_path).unwrap_err();
    assert!(matches!(err, RewindError::Configuration(_)));
}

#[test]
fn test_concurrent_recording_keeps_records_whole() {
    let (_dir, path) = scratch();
    let recorder = ReduceRecorder::<u64, String>::record(&path).unwrap();

    std::thread::scope(|s| {
        for worker in 0..4u64 {
            let recorder = &recorder;
            s.spawn(move || {
                for i in 0..250u64 {
                    let k = worker * 1000 + i;
                    let values: Vec<String> = (0..(k % 7)).map(|n| format!("{k}-{n}")).collect();
                    let mut live = values.into_iter();
                    let reduced: usize = recorder.get_sequence(&k, &mut live).map(|v| v.len()).sum();
                    assert!(reduced > 0 || k % 7 == 0);
                }
            });
        }
    });
    assert_eq!(recorder.recorded_groups(), 1000);
    recorder.finish().unwrap();

    let table = ReplayTable::<u64, String>::load(&path).unwrap();
    assert_eq!(table.len(), 1000);
    for k in table.keys() {
        let values = table.get(k).unwrap();
        assert_eq!(values.len() as u64, k % 7);
        for (n, v) in values.iter().enumerate() {
            assert_eq!(v, &format!("{k}-{n}"));
        }
    }
}

#[test]
fn test_mode_serde_names() {
    assert_eq!(RecorderMode::Replay.to_string(), "replay");
    let parsed: RecorderMode = serde::Deserialize::deserialize(
        serde::de::value::StrDeserializer::<serde::de::value::Error>::new("record"),
    )
    .unwrap();
    assert_eq!(parsed, RecorderMode::Record);
}
