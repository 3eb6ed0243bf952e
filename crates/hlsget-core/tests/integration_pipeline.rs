//! End-to-end pipeline tests against a local scriptable HTTP server.

mod common;

use common::segment_server::{self, Behavior};
use hlsget_core::config::{Container, DownloadOptions};
use hlsget_core::manifest::SegmentMap;
use hlsget_core::pipeline::{self, PipelineError};
use hlsget_core::progress::ProgressSink;
use std::collections::HashMap;
use std::time::Duration;
use tempfile::tempdir;

fn options(dir: &std::path::Path, name: &str, workers: usize) -> DownloadOptions {
    let mut opts = DownloadOptions::new(dir, name);
    opts.workers = workers;
    opts.pool_size = workers;
    opts.timeout = Duration::from_secs(10);
    opts
}

#[derive(Default)]
struct RecordingSink {
    calls: Vec<(usize, f64)>,
}

impl ProgressSink for RecordingSink {
    fn report(&mut self, index: usize, fraction: f64) {
        self.calls.push((index, fraction));
    }
}

#[test]
fn three_segments_assemble_in_order_and_cleanup_runs() {
    let mut routes = HashMap::new();
    routes.insert("/seg0".to_string(), Behavior::Serve(b"alpha-".to_vec()));
    routes.insert("/seg1".to_string(), Behavior::Serve(b"beta-".to_vec()));
    routes.insert("/seg2".to_string(), Behavior::Serve(b"gamma".to_vec()));
    let base = segment_server::start(routes);

    let map = SegmentMap::from_entries(vec![
        ("0", format!("{}/seg0", base)),
        ("1", format!("{}/seg1", base)),
        ("2", format!("{}/seg2", base)),
    ])
    .unwrap();

    let out = tempdir().unwrap();
    let opts = options(out.path(), "movie.ts", 2);
    let mut sink = RecordingSink::default();
    let report = pipeline::run(&map, &opts, Some(&mut sink)).unwrap();

    assert_eq!(report.stats.succeeded, 3);
    assert_eq!(report.stats.total, 3);
    assert_eq!(
        std::fs::read(&report.artifact.path).unwrap(),
        b"alpha-beta-gamma"
    );
    assert_eq!(report.artifact.size, 16);

    // Cleanup removed all three temp files.
    for i in 0..3 {
        let seg = out.path().join(format!("temp_segments/segment_{:04}.ts", i));
        assert!(!seg.exists(), "temp segment {} should be gone", i);
    }

    // One progress call per job, fractions climbing to 1.0.
    assert_eq!(sink.calls.len(), 3);
    let fractions: Vec<f64> = sink.calls.iter().map(|(_, f)| *f).collect();
    assert!(fractions.windows(2).all(|w| w[0] < w[1]));
    assert!((fractions.last().unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn indices_sort_numerically_not_lexically() {
    let mut routes = HashMap::new();
    routes.insert("/early".to_string(), Behavior::Serve(b"EARLY".to_vec()));
    routes.insert("/late".to_string(), Behavior::Serve(b"LATE".to_vec()));
    let base = segment_server::start(routes);

    // Lexically "10" < "2"; numerically 2 must come first.
    let map = SegmentMap::from_entries(vec![
        ("10", format!("{}/late", base)),
        ("2", format!("{}/early", base)),
    ])
    .unwrap();

    let out = tempdir().unwrap();
    let mut opts = options(out.path(), "clip.ts", 2);
    opts.cleanup = false;
    let report = pipeline::run(&map, &opts, None).unwrap();

    assert_eq!(std::fs::read(&report.artifact.path).unwrap(), b"EARLYLATE");
    // keep-temp leaves the segment files in place
    assert!(out.path().join("temp_segments/segment_0002.ts").exists());
    assert!(out.path().join("temp_segments/segment_0010.ts").exists());
}

#[test]
fn partial_failure_still_produces_an_artifact() {
    let mut routes = HashMap::new();
    for i in [0usize, 1, 3, 4] {
        routes.insert(
            format!("/seg{}", i),
            Behavior::Serve(format!("<{}>", i).into_bytes()),
        );
    }
    routes.insert("/seg2".to_string(), Behavior::AlwaysStatus(404));
    let base = segment_server::start(routes);

    let map = SegmentMap::from_entries(
        (0..5).map(|i| (i.to_string(), format!("{}/seg{}", base, i))),
    )
    .unwrap();

    let out = tempdir().unwrap();
    let mut opts = options(out.path(), "movie.ts", 3);
    opts.cleanup = false;
    let report = pipeline::run(&map, &opts, None).unwrap();

    assert_eq!(report.stats.succeeded, 4);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(
        std::fs::read(&report.artifact.path).unwrap(),
        b"<0><1><3><4>"
    );

    // The failed job left nothing behind, complete or partial.
    let temp = out.path().join("temp_segments");
    assert!(!temp.join("segment_0002.ts").exists());
    assert!(!temp.join("segment_0002.ts.part").exists());
}

#[test]
fn all_failed_batch_is_fatal_and_writes_nothing() {
    let mut routes = HashMap::new();
    routes.insert("/a".to_string(), Behavior::AlwaysStatus(404));
    routes.insert("/b".to_string(), Behavior::AlwaysStatus(403));
    let base = segment_server::start(routes);

    let map = SegmentMap::from_entries(vec![
        ("0", format!("{}/a", base)),
        ("1", format!("{}/b", base)),
    ])
    .unwrap();

    let out = tempdir().unwrap();
    let opts = options(out.path(), "movie.ts", 2);
    let err = pipeline::run(&map, &opts, None).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PipelineError>(),
        Some(&PipelineError::BatchFailed { total: 2 })
    );
    assert!(!out.path().join("movie.ts").exists());
}

#[test]
fn empty_manifest_fails_before_any_network_call() {
    let map = SegmentMap::default();
    let out = tempdir().unwrap();
    let opts = options(out.path(), "movie.ts", 2);
    let err = pipeline::run(&map, &opts, None).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PipelineError>(),
        Some(&PipelineError::EmptyManifest)
    );
    // Rejected before provisioning: no working directory was created.
    assert!(!out.path().join("temp_segments").exists());
}

#[test]
fn transient_failures_retry_and_succeed() {
    let mut routes = HashMap::new();
    routes.insert(
        "/flaky".to_string(),
        Behavior::FailThenServe {
            failures: 1,
            status: 503,
            body: b"finally".to_vec(),
        },
    );
    routes.insert("/solid".to_string(), Behavior::Serve(b" here".to_vec()));
    let base = segment_server::start(routes);

    let map = SegmentMap::from_entries(vec![
        ("0", format!("{}/flaky", base)),
        ("1", format!("{}/solid", base)),
    ])
    .unwrap();

    let out = tempdir().unwrap();
    let opts = options(out.path(), "movie.ts", 2);
    let report = pipeline::run(&map, &opts, None).unwrap();

    // A success on a later attempt is indistinguishable from a first-try one.
    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(
        std::fs::read(&report.artifact.path).unwrap(),
        b"finally here"
    );
}

#[test]
fn mp4_container_renames_the_artifact_only() {
    let mut routes = HashMap::new();
    routes.insert("/seg".to_string(), Behavior::Serve(b"mpegts-bytes".to_vec()));
    let base = segment_server::start(routes);

    let map = SegmentMap::from_entries(vec![("0", format!("{}/seg", base))]).unwrap();
    let out = tempdir().unwrap();
    let mut opts = options(out.path(), "movie.ts", 1);
    opts.container = Container::Mp4;
    let report = pipeline::run(&map, &opts, None).unwrap();

    assert_eq!(report.artifact.path, out.path().join("movie.mp4"));
    assert_eq!(std::fs::read(&report.artifact.path).unwrap(), b"mpegts-bytes");
}
