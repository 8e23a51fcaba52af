//! Controller lifecycle scenarios against the fake runtime, on real time.
mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::FakeRuntime;
use proctop_core::{Config, Controller, Error, Lifecycle, OptionsUpdate, OutputFormat, SortField, Transition};
use tokio::time::{sleep, timeout, Instant};

fn text_config(dir: &Path, first_ms: u64, interval_ms: u64) -> Config {
    Config {
        interval_ms,
        first_interval_ms: Some(first_ms),
        file: Some(dir.join("out.txt")),
        ..Config::default()
    }
}

fn runtime() -> Arc<FakeRuntime> {
    let rt = Arc::new(FakeRuntime::new());
    rt.set(1, 100);
    rt.set(2, 50);
    rt.set_total(150);
    rt
}

async fn wait_for_passes(c: &Controller, n: u64) {
    timeout(Duration::from_secs(5), async {
        while c.status_detailed().await.unwrap().counters.passes < n {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("passes did not complete in time");
}

#[tokio::test]
async fn start_pause_and_stray_tick() {
    let dir = tempfile::tempdir().unwrap();
    let c = Controller::spawn(runtime());
    assert_eq!(c.status().await.unwrap().state, Lifecycle::Idle);

    let started = Instant::now();
    assert_eq!(
        c.start(Some(text_config(dir.path(), 10, 400))).await.unwrap(),
        Transition::Started
    );
    wait_for_passes(&c, 1).await;
    assert!(started.elapsed() < Duration::from_millis(400), "first pass uses first_interval");
    assert_eq!(c.pause().await.unwrap(), Transition::Paused);

    sleep(Duration::from_millis(600)).await;
    c.nudge().await.unwrap();
    sleep(Duration::from_millis(50)).await;

    let d = c.status_detailed().await.unwrap();
    assert_eq!(d.status.state, Lifecycle::Paused);
    assert_eq!(d.counters.passes, 1);
    assert_eq!(d.counters.ticks, 1);
    assert!(d.status.last_report.is_some());

    let text = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert!(text.contains("fake@localhost"));
}

#[tokio::test]
async fn repeated_transitions_are_reported_not_errors() {
    let dir = tempfile::tempdir().unwrap();
    let c = Controller::spawn(runtime());
    assert_eq!(c.pause().await.unwrap(), Transition::AlreadyHalted);
    c.start(Some(text_config(dir.path(), 1_000, 1_000))).await.unwrap();
    assert_eq!(c.start(None).await.unwrap(), Transition::AlreadyActive);
    assert_eq!(c.pause().await.unwrap(), Transition::Paused);
    assert_eq!(c.pause().await.unwrap(), Transition::AlreadyHalted);
    assert_eq!(c.start(None).await.unwrap(), Transition::Started);
    assert_eq!(c.stop().await.unwrap(), Transition::Stopped);
    assert_eq!(c.stop().await.unwrap(), Transition::Stopped);
    assert_eq!(c.status().await.unwrap().state, Lifecycle::Idle);
}

#[tokio::test]
async fn invalid_options_leave_config_untouched() {
    let c = Controller::spawn(runtime());
    let before = c.status().await.unwrap().config;

    let bad_sort = OptionsUpdate::from_pairs([("sort", "cpu")]);
    assert!(matches!(bad_sort, Err(Error::InvalidSortField(_))));

    let half_bad = OptionsUpdate {
        sort: Some(SortField::Memory),
        interval_ms: Some(0),
        ..OptionsUpdate::default()
    };
    assert!(c.set_options(half_bad).await.is_err());
    assert_eq!(c.status().await.unwrap().config, before);

    let ok = OptionsUpdate::from_pairs([("sort", "MSGQ"), ("human", "on")]).unwrap();
    let after = c.set_options(ok).await.unwrap();
    assert_eq!(after.sort, Some(SortField::MsgQ));
    assert!(after.human);
    assert_eq!(c.status().await.unwrap().config, after);
}

#[tokio::test]
async fn start_rejects_an_invalid_config() {
    let c = Controller::spawn(runtime());
    let bad = Config {
        format: OutputFormat::Structured,
        file: None,
        ..Config::default()
    };
    assert!(c.start(Some(bad)).await.is_err());
    assert_eq!(c.status().await.unwrap().state, Lifecycle::Idle);
}

#[tokio::test]
async fn stop_clears_the_previous_sample() {
    let dir = tempfile::tempdir().unwrap();
    let rt = runtime();
    let c = Controller::spawn(rt.clone());
    c.start(Some(text_config(dir.path(), 10, 5_000))).await.unwrap();
    wait_for_passes(&c, 1).await;
    assert_eq!(c.status_detailed().await.unwrap().counters.cached_processes, 2);

    c.stop().await.unwrap();
    assert_eq!(c.status_detailed().await.unwrap().counters.cached_processes, 0);

    // after a restart the deltas are absolute again
    rt.set(1, 130);
    rt.set_total(180);
    c.start(Some(text_config(dir.path(), 5_000, 5_000))).await.unwrap();
    c.nudge().await.unwrap();
    wait_for_passes(&c, 2).await;
    let report = c.status().await.unwrap().last_report.unwrap();
    assert_eq!(report.samples[0].reduction_delta, 130);
}

#[tokio::test]
async fn ticks_during_a_slow_pass_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let rt = runtime();
    rt.slow_down(Duration::from_millis(300));
    let c = Controller::spawn(rt.clone());
    c.start(Some(text_config(dir.path(), 5, 20))).await.unwrap();

    wait_for_passes(&c, 1).await;
    c.pause().await.unwrap();
    // let any pass already started finish
    sleep(Duration::from_millis(400)).await;

    let counters = c.status_detailed().await.unwrap().counters;
    assert!(counters.skipped_ticks > 0, "{counters:?}");
    assert!(!counters.in_flight);
    assert_eq!(counters.passes + counters.skipped_ticks, counters.ticks);
}

#[tokio::test]
async fn structured_log_is_loadable_through_the_controller() {
    let dir = tempfile::tempdir().unwrap();
    let c = Controller::spawn(runtime());
    assert!(c.load(None).await.unwrap().is_none(), "no log written yet");

    let cfg = Config::default()
        .apply(
            &OptionsUpdate::from_pairs([
                ("file", dir.path().join("run.ndjson").to_str().unwrap()),
                ("interval", "30"),
                ("first_interval", "5"),
            ])
            .unwrap(),
        )
        .unwrap();
    assert_eq!(cfg.format, OutputFormat::Structured);
    c.start(Some(cfg)).await.unwrap();
    wait_for_passes(&c, 2).await;
    c.pause().await.unwrap();
    sleep(Duration::from_millis(50)).await;

    let passes = c.status_detailed().await.unwrap().counters.passes;
    let reports = c.load(None).await.unwrap().expect("active log");
    assert_eq!(reports.len() as u64, passes);
    assert_eq!(reports.last(), c.status().await.unwrap().last_report.as_ref());

    let explicit = c.load(Some(dir.path().join("run.ndjson").as_path())).await.unwrap().unwrap();
    assert_eq!(explicit, reports);
    assert!(matches!(
        c.load(Some(dir.path().join("missing.ndjson").as_path())).await,
        Err(Error::InvalidFile { .. })
    ));
}

#[tokio::test]
async fn write_failures_are_counted_and_sampling_continues() {
    let dir = tempfile::tempdir().unwrap();
    // a directory cannot be opened for appending
    let cfg = Config {
        interval_ms: 20,
        first_interval_ms: Some(5),
        file: Some(dir.path().to_path_buf()),
        ..Config::default()
    };
    let c = Controller::spawn(runtime());
    c.start(Some(cfg)).await.unwrap();
    wait_for_passes(&c, 2).await;
    c.stop().await.unwrap();

    let counters = c.status_detailed().await.unwrap().counters;
    assert!(counters.write_failures >= 2, "{counters:?}");
}

#[tokio::test]
async fn load_replays_a_large_log_while_commands_keep_flowing() {
    use proctop_core::delta::PreviousSample;
    use proctop_core::persist;
    use proctop_core::sampler::Sampler;
    use proctop_core::Report;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.jsonl");
    let rt = runtime();
    let sampler = Sampler::new(rt.clone());
    let mut previous = PreviousSample::default();
    for i in 0..500u64 {
        rt.set(1, 100 + i * 10);
        rt.set_total(150 + i * 10);
        let (r, next) = Report::build(sampler.collect(), &previous);
        persist::append(&path, &r).unwrap();
        previous = next;
    }

    let c = Controller::spawn(rt);
    let (loaded, status) = tokio::join!(c.load(Some(path.as_path())), c.status());
    assert_eq!(loaded.unwrap().expect("explicit path").len(), 500);
    assert_eq!(status.unwrap().state, Lifecycle::Idle);
}
