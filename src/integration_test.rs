use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::stream::FuturesUnordered;
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::mpsc::channel,
};
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::core::{
    domain::{MemoryPeak, RunStatus, TestCase, TestReport, Verdict},
    judge::Judge,
    pipeline::running::handle_running,
    sampler::MemorySampler,
};
use crate::native::{
    executor::NativeExecutor, probe::probe_for_platform, runtime::Runtime, staging::FileStager,
};
use crate::transport::{
    accepting::{accept_connections, bind},
    msg_handling::handle_messages,
    reading::read_sockets,
    responding::respond,
};

const SUM_PROGRAM: &str = "
read a
read b
echo $((a + b))
";

const PRODUCT_PROGRAM: &str = "
read a
read b
sleep 0.05
echo $((a * b))
";

fn staging_dir() -> PathBuf {
    std::env::temp_dir().join(format!("stdio-judge_{}", Uuid::new_v4()))
}

fn create_judge(staging_dir: &Path) -> Judge {
    let executor = NativeExecutor::new(
        Runtime::new("sh", vec![]),
        MemorySampler::new(probe_for_platform()),
        Duration::from_secs(5),
    );
    Judge::new(
        Arc::new(executor),
        Arc::new(FileStager::new(staging_dir, "sh")),
        Some("sh".to_string()),
    )
}

fn sum_tests() -> Vec<TestCase> {
    vec![
        TestCase::new("small positive", "5\n10\n", "15"),
        TestCase::new("zeros", "0\n0\n", "0"),
        TestCase::new("negative + positive", "-5\n10\n", "5"),
    ]
}

async fn staged_files(dir: &Path) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    let mut count = 0;
    while let Ok(Some(_)) = entries.next_entry().await {
        count += 1;
    }
    count
}

#[tokio::test]
async fn test_sum_submission() {
    let dir = staging_dir();
    let judge = create_judge(&dir);

    let report = judge
        .run(SUM_PROGRAM, &sum_tests())
        .await
        .expect("Run should succeed");

    assert_eq!(report.summary.passed_count, 3);
    assert_eq!(report.summary.total_count, 3);
    assert_eq!(report.summary.status, RunStatus::Ok);
    assert_eq!(report.summary.runtime_version.as_deref(), Some("sh"));
    assert!(report.summary.total_time_ms > 0.0);
    assert!(report.summary.peak_time_ms.unwrap() <= report.summary.total_time_ms);

    for test in &report.tests {
        let TestReport::Executed(outcome) = test else {
            panic!("Test {} should have been executed", test.name());
        };
        assert_eq!(outcome.verdict, Verdict::Accepted);
        assert!(outcome.memory.mb > 0.0);
        if !outcome.memory.measured {
            assert_eq!(outcome.memory, MemoryPeak::fallback());
        }
    }

    assert_eq!(staged_files(&dir).await, 0);
}

#[tokio::test]
async fn test_failing_tests_do_not_stop_the_run() {
    let dir = staging_dir();
    let judge = create_judge(&dir);
    let tests = vec![
        TestCase::new("wrong", "1\n1\n", "3"),
        TestCase::new("right", "1\n2\n", "3"),
    ];

    let report = judge.run(SUM_PROGRAM, &tests).await.unwrap();

    assert_eq!(report.summary.passed_count, 1);
    assert_eq!(report.summary.status, RunStatus::Failed);
    assert!(!report.tests[0].passed());
    assert!(report.tests[1].passed());
}

#[tokio::test]
async fn test_concurrent_submissions_are_isolated() {
    let dir = staging_dir();
    let judge = Arc::new(create_judge(&dir));

    let mut futures = FuturesUnordered::new();
    for round in 0..4 {
        let judge = judge.clone();
        futures.push(async move {
            let (program, expected) = if round % 2 == 0 {
                (PRODUCT_PROGRAM, "42")
            } else {
                (SUM_PROGRAM, "13")
            };
            let tests = vec![
                TestCase::new("first", "6\n7\n", expected),
                TestCase::new("second", "6\n7\n", expected),
            ];
            (round, judge.run(program, &tests).await)
        });
    }

    while let Some((round, report)) = futures.next().await {
        let report = report.expect("Run should succeed");
        assert_eq!(
            report.summary.status,
            RunStatus::Ok,
            "round {} was graded against another submission: {:?}",
            round,
            report.tests
        );
    }

    assert_eq!(staged_files(&dir).await, 0);
}

#[tokio::test]
async fn test_submission_over_tcp() {
    let judge = Arc::new(create_judge(&staging_dir()));

    let (read_tx, read_rx) = channel(16);
    let (msg_handle_tx, msg_handle_rx) = channel(16);
    let (run_tx, run_rx) = channel(16);
    let (res_tx, res_rx) = channel(16);
    let sockets = Arc::new(DashMap::new());

    respond(sockets.clone(), res_rx);
    handle_running(res_tx.clone(), run_rx, judge);
    handle_messages(res_tx, run_tx, msg_handle_rx);
    read_sockets(sockets, read_rx, msg_handle_tx);

    let listener = bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    accept_connections(read_tx, listener);

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let request = serde_json::json!({
        "type": "submit",
        "code": SUM_PROGRAM,
        "input": "5\n10",
        "expected": "15",
    });
    write_half
        .write_all(format!("{}\n", request).as_bytes())
        .await
        .unwrap();

    let status: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(status["type"], "status");
    assert_eq!(status["status"], "running");

    let results: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(results["type"], "results");
    assert_eq!(results["summary"]["status"], "OK");
    assert_eq!(results["summary"]["passedCount"], 1);
    assert_eq!(results["results"][0]["name"], "user test");
    assert_eq!(results["results"][0]["normalizedOutput"], "15");

    write_half
        .write_all(b"{\"type\":\"submit\",\"code\":\"\",\"input\":\"1\",\"expected\":\"1\"}\n")
        .await
        .unwrap();

    let error: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(error["type"], "error");
}
