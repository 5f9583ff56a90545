//! Dispatcher and metrics accounting, end to end.
//!
//! Runs with the tokio clock paused: jobs submitted back to back share an
//! arrival instant and every execution advances virtual time by exactly its
//! burst, so derived times are whole seconds.

mod test_harness;

use std::sync::Arc;
use std::time::Duration;

use batch_lite::config::{ExecutorConfig, SchedulerConfig};
use batch_lite::metrics::Outcome;
use batch_lite::node::Node;
use batch_lite::scheduler::{JobStatus, Policy};
use test_harness::{start_node, wait_until_running, MockExecutor};

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[tokio::test(start_paused = true)]
async fn test_metrics_for_sequential_jobs() {
    let executor = Arc::new(MockExecutor::new());
    let node = start_node(10, Policy::Fcfs, executor.clone());

    node.submit_job("a", 2, 0).await.unwrap();
    node.submit_job("b", 3, 0).await.unwrap();
    node.submit_job("c", 1, 0).await.unwrap();
    node.wait_idle().await;

    let report = node.report().await;
    assert_eq!(report.completed, 3);
    assert_eq!(report.submitted, 3);
    assert_eq!(report.policy, Policy::Fcfs);

    let jobs = &report.jobs;
    assert_eq!(jobs[0].command, "a");
    assert_eq!(jobs[0].turnaround, secs(2));
    assert_eq!(jobs[0].waiting, secs(0));
    assert_eq!(jobs[0].response, secs(0));

    assert_eq!(jobs[1].command, "b");
    assert_eq!(jobs[1].turnaround, secs(5));
    assert_eq!(jobs[1].waiting, secs(2));
    assert_eq!(jobs[1].response, secs(2));

    assert_eq!(jobs[2].command, "c");
    assert_eq!(jobs[2].turnaround, secs(6));
    assert_eq!(jobs[2].waiting, secs(5));
    assert_eq!(jobs[2].response, secs(5));

    for job in jobs {
        assert!(job.response <= job.turnaround);
        assert_eq!(job.elapsed, job.burst_duration());
        assert_eq!(job.outcome, Outcome::Succeeded);
    }

    let summary = report.summary.unwrap();
    assert_eq!(summary.turnaround.avg, 13.0 / 3.0);
    assert_eq!(summary.turnaround.min, 2.0);
    assert_eq!(summary.turnaround.max, 6.0);
    assert_eq!(summary.waiting.max, 5.0);
    assert_eq!(summary.total_burst_secs, 6);
    assert!((summary.throughput.unwrap() - 3.0 / 13.0).abs() < 1e-9);
    assert_eq!(summary.failed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_sjf_lowers_average_waiting_time() {
    async fn average_waiting(policy: Policy) -> f64 {
        let executor = Arc::new(MockExecutor::new().gated("blocker"));
        let node = start_node(10, policy, executor.clone());
        node.submit_job("blocker", 1, 0).await.unwrap();
        wait_until_running(&node, "blocker").await;
        for (name, burst) in [("l", 8), ("m", 4), ("s", 1)] {
            node.submit_job(name, burst, 0).await.unwrap();
        }
        executor.release();
        node.wait_idle().await;
        node.report().await.summary.unwrap().waiting.avg
    }

    let fcfs = average_waiting(Policy::Fcfs).await;
    let sjf = average_waiting(Policy::Sjf).await;
    assert!(sjf < fcfs, "sjf {} should beat fcfs {}", sjf, fcfs);
}

#[tokio::test(start_paused = true)]
async fn test_failed_execution_is_recorded() {
    let executor = Arc::new(MockExecutor::new().failing("broken"));
    let node = start_node(10, Policy::Fcfs, executor.clone());

    node.submit_job("broken", 2, 0).await.unwrap();
    node.submit_job("fine", 1, 0).await.unwrap();
    node.wait_idle().await;

    let report = node.report().await;
    assert_eq!(report.completed, 2);
    assert!(matches!(
        &report.jobs[0].outcome,
        Outcome::Failed { error } if error.contains("broken")
    ));
    assert_eq!(report.jobs[1].outcome, Outcome::Succeeded);
    // The failed job still occupied the executor for its burst
    assert_eq!(report.jobs[1].response, secs(2));
    assert_eq!(report.summary.unwrap().failed, 1);
    assert_eq!(executor.calls(), vec!["broken", "fine"]);
}

#[tokio::test(start_paused = true)]
async fn test_list_status_orders_finished_running_pending() {
    let executor = Arc::new(MockExecutor::new().gated("second"));
    let node = start_node(10, Policy::Sjf, executor.clone());

    node.submit_job("first", 1, 0).await.unwrap();
    node.submit_job("second", 2, 0).await.unwrap();
    wait_until_running(&node, "second").await;
    node.submit_job("big", 9, 0).await.unwrap();
    node.submit_job("small", 3, 0).await.unwrap();

    let rows = node.list_status().await;
    let view: Vec<(&str, JobStatus)> = rows.iter().map(|r| (r.name.as_str(), r.state)).collect();
    assert_eq!(
        view,
        vec![
            ("first", JobStatus::Finished),
            ("second", JobStatus::Running),
            ("small", JobStatus::Pending),
            ("big", JobStatus::Pending),
        ]
    );
    assert_eq!(rows[3].burst, 9);

    let report = node.report().await;
    assert_eq!(report.completed, 1);
    assert_eq!(report.submitted, 4);

    executor.release();
    node.wait_idle().await;
    let rows = node.list_status().await;
    assert!(rows.iter().all(|r| r.state == JobStatus::Finished));
    assert_eq!(rows.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_report_with_no_completions() {
    let node = start_node(10, Policy::Priority, Arc::new(MockExecutor::new()));

    let report = node.report().await;
    assert_eq!(report.completed, 0);
    assert!(report.summary.is_none());
    assert_eq!(report.to_string(), "No jobs completed.\n");
}

#[tokio::test(start_paused = true)]
async fn test_reset_metrics_clears_history() {
    let node = start_node(10, Policy::Fcfs, Arc::new(MockExecutor::new()));
    node.submit_job("a", 1, 0).await.unwrap();
    node.wait_idle().await;
    assert_eq!(node.report().await.completed, 1);

    node.reset_metrics().await;
    assert_eq!(node.report().await.completed, 0);
    assert!(node.list_status().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_report_serializes_to_json() {
    let node = start_node(10, Policy::Sjf, Arc::new(MockExecutor::new()));
    node.submit_job("a", 2, 1).await.unwrap();
    node.wait_idle().await;

    let report = node.report().await;
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["policy"], "sjf");
    assert_eq!(value["completed"], 1);
    assert_eq!(value["jobs"][0]["command"], "a");
    assert_eq!(value["jobs"][0]["turnaround"], 2.0);
    assert_eq!(value["jobs"][0]["outcome"]["status"], "succeeded");
}

#[tokio::test(start_paused = true)]
async fn test_unrunnable_sleep_is_recorded_as_failure() {
    let executor = ExecutorConfig {
        sleep_unit: Duration::from_millis(u64::MAX),
        ..ExecutorConfig::sleep()
    };
    let node = Node::start(SchedulerConfig::new(10, Policy::Fcfs).with_executor(executor));

    node.submit_job("huge", 2000, 0).await.unwrap();
    node.wait_idle().await;

    let report = node.report().await;
    assert_eq!(report.completed, 1);
    assert!(matches!(report.jobs[0].outcome, Outcome::Failed { .. }));
    assert_eq!(report.summary.unwrap().failed, 1);
}
