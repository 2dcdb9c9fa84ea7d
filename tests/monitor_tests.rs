// tests/monitor_tests.rs
use fabric_health_monitor::health::{
    ClusterHealthReport, HealthReport, NodeHealthReport, ServiceHealthReport,
};
use fabric_health_monitor::metrics::MetricsRegistry;
use fabric_health_monitor::monitor::CheckState;
use fabric_health_monitor::sink::MemorySink;
use fabric_health_monitor::{
    CheckContext, CheckKey, HealthMonitor, HealthReportKind, HealthState, MonitorError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use url::Url;

fn service_name() -> Url {
    Url::parse("fabric:/BasicAvailabilityApp/CrashableService").unwrap()
}

fn monitor() -> (HealthMonitor, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (HealthMonitor::new("MonitorService", sink.clone()), sink)
}

/// Records when each execution started and finished, and how many overlapped.
#[derive(Default)]
struct Recorder {
    runs: Mutex<Vec<(Instant, Option<Instant>)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Recorder {
    fn begin(&self) -> usize {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let mut runs = self.runs.lock().unwrap();
        runs.push((Instant::now(), None));
        runs.len() - 1
    }

    fn end(&self, index: usize) {
        self.runs.lock().unwrap()[index].1 = Some(Instant::now());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn started(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    fn finished(&self) -> usize {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, end)| end.is_some())
            .count()
    }
}

/// A Service-kind probe that takes `latency` and reports `state`.
fn timed_probe(
    recorder: Arc<Recorder>,
    latency: Duration,
    state: HealthState,
) -> impl Fn(CheckContext<ServiceHealthReport>) -> futures::future::BoxFuture<'static, anyhow::Result<ServiceHealthReport>>
       + Send
       + Sync
       + 'static {
    use futures::FutureExt;

    move |ctx| {
        let recorder = recorder.clone();
        async move {
            let run = recorder.begin();
            sleep(latency).await;
            recorder.end(run);

            let info = ctx
                .health_information(state, Duration::from_secs(15))
                .with_description("Web server is responding well.");
            anyhow::Ok(ServiceHealthReport::new(service_name(), info))
        }
        .boxed()
    }
}

fn node_probe(
    counter: Arc<AtomicUsize>,
    node: &'static str,
) -> impl Fn(CheckContext<NodeHealthReport>) -> futures::future::BoxFuture<'static, anyhow::Result<NodeHealthReport>>
       + Send
       + Sync
       + 'static {
    use futures::FutureExt;

    move |ctx| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            let info = ctx.health_information(HealthState::Ok, Duration::from_secs(30));
            anyhow::Ok(NodeHealthReport::new(node, info))
        }
        .boxed()
    }
}

#[tokio::test(start_paused = true)]
async fn test_fifty_ms_probe_runs_three_times_in_thirty_five_seconds() {
    let (monitor, sink) = monitor();
    let recorder = Arc::new(Recorder::default());

    monitor
        .add(
            Duration::from_secs(10),
            "PerformanceCheck",
            timed_probe(recorder.clone(), Duration::from_millis(50), HealthState::Ok),
        )
        .unwrap();

    sleep(Duration::from_secs(35)).await;

    assert_eq!(recorder.started(), 3);
    let reports = sink.submissions();
    assert_eq!(reports.len(), 3);
    for (source_id, report) in &reports {
        assert_eq!(source_id, "MonitorService");
        assert_eq!(report.kind(), HealthReportKind::Service);
        assert_eq!(report.health_state(), HealthState::Ok);
        assert_eq!(report.information().property(), "PerformanceCheck");
    }

    monitor.remove_all();
}

#[tokio::test(start_paused = true)]
async fn test_first_fire_waits_one_frequency() {
    let (monitor, sink) = monitor();
    let recorder = Arc::new(Recorder::default());

    monitor
        .add(
            Duration::from_secs(10),
            "PerformanceCheck",
            timed_probe(recorder.clone(), Duration::ZERO, HealthState::Ok),
        )
        .unwrap();

    sleep(Duration::from_millis(9_900)).await;
    assert_eq!(recorder.started(), 0);
    assert!(sink.is_empty());

    sleep(Duration::from_millis(200)).await;
    assert_eq!(recorder.started(), 1);

    monitor.remove_all();
}

#[tokio::test(start_paused = true)]
async fn test_next_fire_is_measured_from_end_of_previous_run() {
    let (monitor, _sink) = monitor();
    let recorder = Arc::new(Recorder::default());
    let frequency = Duration::from_secs(10);

    monitor
        .add(
            frequency,
            "PerformanceCheck",
            timed_probe(recorder.clone(), Duration::from_secs(3), HealthState::Ok),
        )
        .unwrap();

    sleep(Duration::from_secs(60)).await;
    monitor.remove_all();

    let runs = recorder.runs.lock().unwrap().clone();
    // Fires at 10, 23, 36, 49.
    assert_eq!(runs.len(), 4);
    for pair in runs.windows(2) {
        let previous_end = pair[0].1.expect("previous run finished");
        let next_start = pair[1].0;
        assert!(next_start - previous_end >= frequency);
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_probe_never_overlaps_itself() {
    let (monitor, _sink) = monitor();
    let recorder = Arc::new(Recorder::default());

    // Probe slower than the frequency.
    monitor
        .add(
            Duration::from_secs(1),
            "PerformanceCheck",
            timed_probe(recorder.clone(), Duration::from_secs(5), HealthState::Warning),
        )
        .unwrap();

    sleep(Duration::from_secs(60)).await;
    monitor.remove_all();

    assert!(recorder.started() >= 2);
    assert_eq!(recorder.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_always_failing_probe_keeps_running() {
    let (monitor, sink) = monitor();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();

    let key = monitor
        .add(
            Duration::from_secs(10),
            "ClusterCheck",
            move |_ctx: CheckContext<ClusterHealthReport>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<ClusterHealthReport, _>(anyhow::anyhow!("cluster unreachable"))
                }
            },
        )
        .unwrap();

    sleep(Duration::from_secs(55)).await;

    assert_eq!(attempts.load(Ordering::SeqCst), 5);
    assert!(sink.is_empty());
    let check = monitor.get(&key).unwrap();
    assert_eq!(check.executions(), 5);
    assert_eq!(check.state(), CheckState::Idle);

    monitor.remove_all();
}

#[tokio::test(start_paused = true)]
async fn test_panicking_probe_is_contained() {
    let (monitor, sink) = monitor();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();

    let key = monitor
        .add(
            Duration::from_secs(10),
            "ClusterCheck",
            move |ctx: CheckContext<ClusterHealthReport>| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        panic!("probe bug");
                    }
                    let info = ctx.health_information(HealthState::Error, Duration::from_secs(100));
                    anyhow::Ok(ClusterHealthReport::new(info))
                }
            },
        )
        .unwrap();

    sleep(Duration::from_secs(25)).await;

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(sink.len(), 1);
    assert!(monitor.contains(&key));

    monitor.remove_all();
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_registration_fails_and_first_keeps_running() {
    let (monitor, _sink) = monitor();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let key = monitor
        .add(Duration::from_secs(10), "X", node_probe(first.clone(), "_Node_0"))
        .unwrap();

    let err = monitor
        .add(Duration::from_secs(1), "X", node_probe(second.clone(), "_Node_1"))
        .unwrap_err();

    assert_eq!(
        err,
        MonitorError::DuplicateRegistration {
            kind: HealthReportKind::Node,
            property: "X".to_string(),
        }
    );
    assert_eq!(
        err.to_string(),
        "A health check with Kind=Node and Property=X was already registered"
    );
    assert_eq!(monitor.len(), 1);
    assert_eq!(monitor.get(&key).unwrap().frequency(), Duration::from_secs(10));

    sleep(Duration::from_secs(25)).await;

    assert_eq!(first.load(Ordering::SeqCst), 2);
    assert_eq!(second.load(Ordering::SeqCst), 0);

    monitor.remove_all();
}

#[tokio::test(start_paused = true)]
async fn test_same_property_different_kinds_coexist() {
    let (monitor, sink) = monitor();
    let node_runs = Arc::new(AtomicUsize::new(0));
    let recorder = Arc::new(Recorder::default());

    let node_key = monitor
        .add(Duration::from_secs(10), "X", node_probe(node_runs.clone(), "_Node_0"))
        .unwrap();
    let service_key = monitor
        .add(
            Duration::from_secs(10),
            "X",
            timed_probe(recorder.clone(), Duration::ZERO, HealthState::Ok),
        )
        .unwrap();

    assert_eq!(node_key, CheckKey::new(HealthReportKind::Node, "X"));
    assert_eq!(service_key, CheckKey::new(HealthReportKind::Service, "X"));
    assert_ne!(node_key.to_string(), service_key.to_string());
    assert_eq!(monitor.len(), 2);

    sleep(Duration::from_secs(15)).await;

    assert_eq!(node_runs.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.started(), 1);
    let mut kinds: Vec<_> = sink.reports().iter().map(HealthReport::kind).collect();
    kinds.sort_by_key(|k| k.as_str());
    assert_eq!(kinds, vec![HealthReportKind::Node, HealthReportKind::Service]);

    monitor.remove_all();
}

#[tokio::test(start_paused = true)]
async fn test_remove_prevents_further_fires() {
    let (monitor, sink) = monitor();
    let runs = Arc::new(AtomicUsize::new(0));

    let key = monitor
        .add(Duration::from_secs(10), "Heartbeat", node_probe(runs.clone(), "_Node_0"))
        .unwrap();

    sleep(Duration::from_secs(25)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    assert!(monitor.remove(&key));
    assert!(!monitor.contains(&key));

    sleep(Duration::from_secs(100)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(sink.len(), 2);

    // Removing twice is a no-op.
    assert!(!monitor.remove(&key));
}

#[tokio::test(start_paused = true)]
async fn test_remove_during_execution_lets_it_finish_and_drops_report() {
    let (monitor, sink) = monitor();
    let recorder = Arc::new(Recorder::default());

    let key = monitor
        .add(
            Duration::from_secs(10),
            "PerformanceCheck",
            timed_probe(recorder.clone(), Duration::from_secs(5), HealthState::Ok),
        )
        .unwrap();
    let check = monitor.get(&key).unwrap();

    // First execution runs from 10s to 15s.
    sleep(Duration::from_secs(12)).await;
    assert_eq!(check.state(), CheckState::Running);

    assert!(monitor.remove(&key));
    assert_eq!(check.state(), CheckState::Removed);

    sleep(Duration::from_secs(60)).await;

    assert_eq!(recorder.started(), 1);
    assert_eq!(recorder.finished(), 1);
    assert!(sink.is_empty());
    assert_eq!(check.executions(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_report_is_not_attributed_to_new_registration() {
    let (monitor, sink) = monitor();
    let old_runs = Arc::new(AtomicUsize::new(0));
    let new_runs = Arc::new(AtomicUsize::new(0));
    let old_counter = old_runs.clone();

    let key = monitor
        .add(
            Duration::from_secs(10),
            "Heartbeat",
            move |ctx: CheckContext<NodeHealthReport>| {
                let counter = old_counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    sleep(Duration::from_secs(5)).await;
                    let info = ctx.health_information(HealthState::Warning, Duration::from_secs(30));
                    anyhow::Ok(NodeHealthReport::new("old", info))
                }
            },
        )
        .unwrap();

    sleep(Duration::from_secs(12)).await;
    assert!(monitor.remove(&key));
    monitor
        .add(Duration::from_secs(10), "Heartbeat", node_probe(new_runs.clone(), "new"))
        .unwrap();

    // Old run finishes at 15s, new check fires at 22s.
    sleep(Duration::from_secs(18)).await;

    assert_eq!(old_runs.load(Ordering::SeqCst), 1);
    assert_eq!(new_runs.load(Ordering::SeqCst), 1);
    let nodes: Vec<_> = sink
        .reports()
        .into_iter()
        .map(|report| report.entity())
        .collect();
    assert_eq!(nodes, vec!["new".to_string()]);

    monitor.remove_all();
}

#[tokio::test(start_paused = true)]
async fn test_probe_can_remove_its_own_check() {
    let (monitor, sink) = monitor();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();

    let key = monitor
        .add(
            Duration::from_secs(10),
            "OneShot",
            move |ctx: CheckContext<ClusterHealthReport>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    ctx.check().remove();
                    let info = ctx.health_information(HealthState::Ok, Duration::from_secs(100));
                    anyhow::Ok(ClusterHealthReport::new(info))
                }
            },
        )
        .unwrap();

    sleep(Duration::from_secs(45)).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!monitor.contains(&key));
    assert!(sink.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failing_sink_does_not_stop_check() {
    let (monitor, sink) = monitor();
    let runs = Arc::new(AtomicUsize::new(0));
    sink.set_failing(true);

    monitor
        .add(Duration::from_secs(10), "Heartbeat", node_probe(runs.clone(), "_Node_0"))
        .unwrap();

    sleep(Duration::from_secs(25)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(sink.rejected(), 2);
    assert!(sink.is_empty());

    sink.set_failing(false);
    sleep(Duration::from_secs(10)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert_eq!(sink.len(), 1);

    monitor.remove_all();
}

#[tokio::test(start_paused = true)]
async fn test_frequency_change_applies_from_next_rearm() {
    let (monitor, _sink) = monitor();
    let runs = Arc::new(AtomicUsize::new(0));

    let key = monitor
        .add(Duration::from_secs(10), "Heartbeat", node_probe(runs.clone(), "_Node_0"))
        .unwrap();
    let check = monitor.get(&key).unwrap();

    sleep(Duration::from_secs(5)).await;
    check.set_frequency(Duration::from_secs(3)).unwrap();
    assert!(check.set_frequency(Duration::ZERO).is_err());

    // Fires at 10, 13 and 16.
    sleep(Duration::from_secs(12)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert_eq!(check.frequency(), Duration::from_secs(3));

    monitor.remove_all();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_loop_removes_every_check() {
    let (monitor, sink) = monitor();
    let runs = Arc::new(AtomicUsize::new(0));
    let recorder = Arc::new(Recorder::default());

    monitor
        .add(Duration::from_secs(10), "A", node_probe(runs.clone(), "_Node_0"))
        .unwrap();
    monitor
        .add(Duration::from_secs(10), "B", node_probe(runs.clone(), "_Node_1"))
        .unwrap();
    monitor
        .add(
            Duration::from_secs(10),
            "A",
            timed_probe(recorder.clone(), Duration::ZERO, HealthState::Ok),
        )
        .unwrap();
    assert_eq!(monitor.checks().len(), 3);

    for (_, check) in monitor.checks() {
        check.remove();
    }

    assert!(monitor.is_empty());
    assert_eq!(monitor.remove_all(), 0);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.started(), 0);
    assert!(sink.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_monitor_stops_checks() {
    let (monitor, _sink) = monitor();
    let runs = Arc::new(AtomicUsize::new(0));

    let key = monitor
        .add(Duration::from_secs(10), "Heartbeat", node_probe(runs.clone(), "_Node_0"))
        .unwrap();
    let check = monitor.get(&key).unwrap();

    drop(monitor);
    sleep(Duration::from_secs(30)).await;

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(check.state(), CheckState::Removed);
}

#[tokio::test(start_paused = true)]
async fn test_metrics_track_executions_and_reports() {
    let registry = MetricsRegistry::new().unwrap();
    let metrics = registry.collector();
    let sink = Arc::new(MemorySink::new());
    let monitor = HealthMonitor::with_metrics("MonitorService", sink.clone(), Some(metrics.clone()));
    let recorder = Arc::new(Recorder::default());

    monitor
        .add(
            Duration::from_secs(10),
            "PerformanceCheck",
            timed_probe(recorder.clone(), Duration::from_millis(50), HealthState::Warning),
        )
        .unwrap();
    monitor
        .add(
            Duration::from_secs(10),
            "ClusterCheck",
            |_ctx: CheckContext<ClusterHealthReport>| async {
                Err::<ClusterHealthReport, _>(anyhow::anyhow!("no cluster"))
            },
        )
        .unwrap();
    assert_eq!(metrics.registered_checks.get(), 2);

    sleep(Duration::from_secs(15)).await;

    assert_eq!(
        metrics
            .check_executions_total
            .with_label_values(&["Service", "PerformanceCheck", "success"])
            .get(),
        1
    );
    assert_eq!(
        metrics
            .check_executions_total
            .with_label_values(&["Cluster", "ClusterCheck", "failure"])
            .get(),
        1
    );
    assert_eq!(
        metrics
            .reports_total
            .with_label_values(&["Service", "Warning"])
            .get(),
        1
    );

    monitor.remove_all();
    assert_eq!(metrics.registered_checks.get(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_racing_adds_of_one_key_register_exactly_once() {
    for _ in 0..50 {
        let (monitor, _sink) = monitor();
        let runs = Arc::new(AtomicUsize::new(0));

        let attempts: Vec<_> = (0..16)
            .map(|_| {
                let monitor = monitor.clone();
                let runs = runs.clone();
                tokio::spawn(async move {
                    monitor.add(Duration::from_secs(60), "X", node_probe(runs, "_Node_0"))
                })
            })
            .collect();

        let mut registered = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(key) => {
                    assert_eq!(key, CheckKey::new(HealthReportKind::Node, "X"));
                    registered += 1;
                }
                Err(e) => assert!(matches!(e, MonitorError::DuplicateRegistration { .. })),
            }
        }

        assert_eq!(registered, 1);
        assert_eq!(monitor.len(), 1);
        assert_eq!(monitor.remove_all(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_add_remove_and_enumerate() {
    let (monitor, sink) = monitor();
    let runs = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..8usize)
        .map(|worker| {
            let monitor = monitor.clone();
            let runs = runs.clone();
            tokio::spawn(async move {
                for i in 0..200usize {
                    let property = format!("P{}", (worker + i) % 4);
                    let _ = monitor.add(
                        Duration::from_millis(1),
                        property.clone(),
                        node_probe(runs.clone(), "_Node_0"),
                    );

                    match i % 3 {
                        0 => {
                            for (key, check) in monitor.checks() {
                                if key.property == property {
                                    check.remove();
                                }
                            }
                        }
                        1 => {
                            monitor.remove(&CheckKey::new(HealthReportKind::Node, property));
                        }
                        _ => tokio::task::yield_now().await,
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.await.unwrap();
    }

    monitor.remove_all();
    assert!(monitor.is_empty());
    assert!(monitor.checks().is_empty());

    // Executions already past their registration check may still land.
    sleep(Duration::from_millis(50)).await;
    let settled = sink.len();

    sleep(Duration::from_millis(100)).await;
    assert_eq!(sink.len(), settled);
}
