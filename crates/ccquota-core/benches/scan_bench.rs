//! Session scan and full-pass benchmarks for ccquota-core
//!
//! Run with:
//! ```bash
//! cargo bench --bench scan_bench
//! ```

use ccquota_core::parsers::{SessionScanner, WholeFile};
use ccquota_core::{ConfigSource, PassReport, QuotaConfig, Reconciler, SharedConfig, SourcePaths, UsageWindows};
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc, Weekday};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

const LINES_PER_SESSION: usize = 200;

/// Claude home with `fresh` sessions written today and `stale` ones from last week
fn create_fixture(fresh: usize, stale: usize) -> PathBuf {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_path_buf();
    let now = Utc::now();

    let projects = path.join("projects").join("-home-bench-app");
    std::fs::create_dir_all(&projects).unwrap();

    for i in 0..fresh + stale {
        let mut body = String::new();
        for j in 0..LINES_PER_SESSION {
            let ts = (now - ChronoDuration::seconds(j as i64 * 30))
                .to_rfc3339_opts(SecondsFormat::Millis, true);
            if j % 2 == 0 {
                body.push_str(&format!(
                    r#"{{"type":"user","message":{{"role":"user","content":"step {j}"}},"timestamp":"{ts}"}}"#
                ));
            } else {
                body.push_str(&format!(
                    r#"{{"type":"assistant","message":{{"role":"assistant","content":"ok"}},"timestamp":"{ts}"}}"#
                ));
            }
            body.push('\n');
        }
        let file = projects.join(format!("session-{i:04}.jsonl"));
        std::fs::write(&file, body).unwrap();

        if i >= fresh {
            let old = SystemTime::now() - Duration::from_secs(7 * 24 * 3600);
            std::fs::File::options()
                .write(true)
                .open(&file)
                .unwrap()
                .set_modified(old)
                .unwrap();
        }
    }

    let mut history = String::new();
    for j in (0..500).rev() {
        let ts = now - ChronoDuration::seconds(j * 60);
        history.push_str(&format!(
            r#"{{"display":"prompt {j}","timestamp":{}}}"#,
            ts.timestamp_millis()
        ));
        history.push('\n');
    }
    std::fs::write(path.join("history.jsonl"), history).unwrap();
    std::fs::write(
        path.join("stats-cache.json"),
        r#"{"version": 2, "dailyActivity": []}"#,
    )
    .unwrap();

    // Leak the tempdir to keep it alive for benchmarks
    std::mem::forget(dir);

    path
}

/// Session scan as the tree grows, half the files stale
fn bench_session_scan_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_scan_scaling");
    group.measurement_time(Duration::from_secs(5));

    for count in [10, 100, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let home = create_fixture(count / 2, count / 2);
            let root = home.join("projects");
            let scanner = SessionScanner::new(Arc::new(WholeFile));

            b.iter(|| {
                let windows = UsageWindows::compute(&Utc::now(), Weekday::Mon);
                let mut report = PassReport::new();
                scanner.scan(&root, &windows, &mut report)
            });
        });
    }

    group.finish();
}

/// One full reconciliation pass over the fixture
fn bench_full_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    let home = create_fixture(50, 200);
    let config: Arc<dyn ConfigSource> = Arc::new(SharedConfig::new(QuotaConfig::default()));
    let reconciler = Reconciler::new(SourcePaths::from_claude_home(&home), config);

    group.bench_function("full_pass", |b| b.iter(|| reconciler.reconcile()));

    group.finish();
}

criterion_group!(benches, bench_session_scan_scaling, bench_full_pass);
criterion_main!(benches);
