use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, SystemTime};

use gasview::data::cache::{DatasetCache, DatasetSource};
use gasview::data::loader::{Engine, ParseOptions};
use gasview::data::model::ColumnType;
use gasview::error::DatasetError;
use tempfile::tempdir;

const HEADER: &str = "Time;AgentType;CarbonMonoxide;Hydrogen";

fn write_rows(path: &Path, rows: &[&str]) {
    let mut body = String::from(HEADER);
    for row in rows {
        body.push('\n');
        body.push_str(row);
    }
    body.push('\n');
    fs::write(path, body).unwrap();
}

fn dataset(dir: &Path) -> PathBuf {
    let path = dir.join("GasificationDataset.csv");
    write_rows(&path, &["0;Air;10.5;3.0", "1;Air;11.5;4.0"]);
    path
}

#[test]
fn repeated_gets_share_one_snapshot() {
    let temp = tempdir().unwrap();
    let cache = DatasetCache::new(DatasetSource::new(dataset(temp.path())));

    let first = cache.get().unwrap();
    let second = cache.get().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.reload_count(), 1);
    assert_eq!(first.len(), 2);
}

#[test]
fn size_change_triggers_reload() {
    let temp = tempdir().unwrap();
    let path = dataset(temp.path());
    let cache = DatasetCache::new(DatasetSource::new(&path));

    let before = cache.get().unwrap();
    write_rows(&path, &["0;Air;10.5;3.0", "1;Air;11.5;4.0", "2;Oxygen;12.5;5.0"]);
    let after = cache.get().unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.len(), 3);
    assert_eq!(cache.reload_count(), 2);
}

#[test]
fn mtime_change_with_same_size_triggers_reload() {
    let temp = tempdir().unwrap();
    let path = dataset(temp.path());
    let cache = DatasetCache::new(DatasetSource::new(&path));

    let before = cache.get().unwrap();
    write_rows(&path, &["0;Air;99.5;3.0", "1;Air;11.5;4.0"]);
    let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(stamp)
        .unwrap();

    let after = cache.get().unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(
        after.column("CarbonMonoxide").unwrap().values.f64_at(0),
        Some(99.5)
    );
    assert_eq!(cache.signature().unwrap().modified, Some(stamp));
}

#[test]
fn held_snapshot_survives_reload() {
    let temp = tempdir().unwrap();
    let path = dataset(temp.path());
    let cache = DatasetCache::new(DatasetSource::new(&path));

    let held = cache.get().unwrap();
    write_rows(&path, &["5;Oxygen;1.0;1.0"]);
    let fresh = cache.get().unwrap();

    assert_eq!(held.len(), 2);
    assert_eq!(fresh.len(), 1);
    assert_eq!(held.column("Time").unwrap().values.f64_at(0), Some(0.0));
}

#[test]
fn concurrent_callers_reload_once_per_change() {
    const CALLERS: usize = 8;

    let temp = tempdir().unwrap();
    let path = dataset(temp.path());
    let cache = DatasetCache::new(DatasetSource::new(&path));
    cache.get().unwrap();

    write_rows(&path, &["0;Air;10.5;3.0", "1;Air;11.5;4.0", "2;Air;12.5;5.0"]);

    let barrier = Barrier::new(CALLERS);
    let snapshots: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    cache.get().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(cache.reload_count(), 2);
    assert!(snapshots.iter().all(|s| Arc::ptr_eq(s, &snapshots[0])));
    assert_eq!(snapshots[0].len(), 3);
}

#[test]
fn inference_failure_retries_with_float_overrides() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("data.csv");
    write_rows(&path, &["0;Air;10;3", "1;Air;11;4", "2;Oxygen;12.25;4.75"]);

    let options = ParseOptions {
        infer_rows: 2,
        ..ParseOptions::default()
    };
    let cache = DatasetCache::new(DatasetSource::new(&path).with_options(options));

    let snapshot = cache.get().unwrap();
    for name in ["CarbonMonoxide", "Hydrogen"] {
        assert_eq!(snapshot.column(name).unwrap().column_type(), ColumnType::Float);
    }
    assert_eq!(snapshot.column("Time").unwrap().column_type(), ColumnType::Integer);
}

#[test]
fn missing_file_is_reported_and_retarget_recovers() {
    let temp = tempdir().unwrap();
    let cache = DatasetCache::new(DatasetSource::new(temp.path().join("missing.csv")));

    let err = cache.get().unwrap_err();
    assert!(matches!(err, DatasetError::Unavailable { .. }));
    assert!(err.to_string().contains("missing.csv"));
    assert_eq!(cache.reload_count(), 0);

    let path = dataset(temp.path());
    cache.retarget(&path);
    assert_eq!(cache.path(), path);
    assert_eq!(cache.get().unwrap().len(), 2);
}

#[test]
fn parse_failure_is_reported_then_recovers() {
    let temp = tempdir().unwrap();
    let path = dataset(temp.path());
    let cache = DatasetCache::new(DatasetSource::new(&path));
    cache.get().unwrap();

    fs::write(&path, "Time;AgentType\n1;Air;extra;fields\n").unwrap();
    let err = cache.get().unwrap_err();
    assert!(matches!(err, DatasetError::Parse { .. }));
    assert_eq!(cache.reload_count(), 2);

    assert!(matches!(cache.get(), Err(DatasetError::Parse { .. })));
    assert_eq!(cache.reload_count(), 3);

    write_rows(&path, &["7;Air;1.0;2.0"]);
    assert_eq!(cache.get().unwrap().len(), 1);
}

#[test]
fn simple_engine_reads_through_cache() {
    let temp = tempdir().unwrap();
    let path = dataset(temp.path());
    let cache = DatasetCache::new(DatasetSource::new(&path).with_engine(Engine::Simple));

    let snapshot = cache.get().unwrap();
    assert_eq!(snapshot.column("AgentType").unwrap().column_type(), ColumnType::String);
    assert_eq!(snapshot.column("Hydrogen").unwrap().column_type(), ColumnType::Float);
}
