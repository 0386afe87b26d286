use std::sync::Arc;

use tokio::{
    sync::mpsc::{Receiver, Sender},
    task::JoinHandle,
};

use crate::{
    constants::RES_TX_ERR,
    core::{domain::SubmissionEvent, judge::Judge},
    models::{MsgToRes, SubmissionInCh},
};

/// Grades every submission that arrives on `run_rx`.
///
/// Submissions are judged in their own tasks, so a slow one does not hold up
/// the rest. This is safe because each run stages its program separately.
#[tracing::instrument(skip_all)]
pub fn handle_running(
    res_tx: Sender<MsgToRes>,
    mut run_rx: Receiver<SubmissionInCh>,
    judge: Arc<Judge>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = run_rx.recv().await {
            let res_tx = res_tx.clone();
            let judge = judge.clone();

            tokio::spawn(async move {
                process_submission(msg, &res_tx, &judge).await;
            });
        }
    })
}

async fn process_submission(msg: SubmissionInCh, res_tx: &Sender<MsgToRes>, judge: &Judge) {
    let SubmissionInCh {
        conn_id,
        submission,
    } = msg;
    tracing::info!(
        "Running submission {} received at {}",
        submission.id,
        submission.received_at
    );

    res_tx
        .send(MsgToRes::new(conn_id, SubmissionEvent::Running))
        .await
        .expect(RES_TX_ERR);

    let event = match judge.run_submission(&submission).await {
        Ok(report) => SubmissionEvent::Finished(report),
        Err(e) => {
            tracing::error!("Submission {} failed: {}", submission.id, e);
            SubmissionEvent::Failed { msg: e.to_string() }
        }
    };

    res_tx
        .send(MsgToRes::new(conn_id, event))
        .await
        .expect(RES_TX_ERR);
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::*;
    use crate::core::{
        domain::{
            ExecutionOutcome, MemoryPeak, RunStatus, StagedProgram, Submission, TestCase, Verdict,
        },
        traits::{
            executor::MockExecutor,
            stager::{MockStager, StagingError},
        },
    };

    fn create_submission() -> Submission {
        Submission::new(
            "program".to_string(),
            vec![TestCase::new("user test", "5\n10\n", "15")],
        )
    }

    fn passing_executor() -> MockExecutor {
        let mut executor = MockExecutor::new();
        executor.expect_execute().returning(|_, test| {
            Ok(ExecutionOutcome {
                name: test.name.clone(),
                exit_code: Some(0),
                wall_time_ms: 12.5,
                memory: MemoryPeak::measured(40.0),
                normalized_output: "15".to_string(),
                normalized_expected: "15".to_string(),
                normalized_stderr: String::new(),
                verdict: Verdict::Accepted,
            })
        });
        executor
    }

    #[tokio::test]
    async fn test_successful_submission() {
        let mut stager = MockStager::new();
        stager.expect_stage().returning(|_| {
            Ok(StagedProgram {
                path: PathBuf::from("/tmp/program.js"),
            })
        });
        stager.expect_release().returning(|_| Ok(()));
        let judge = Arc::new(Judge::new(
            Arc::new(passing_executor()),
            Arc::new(stager),
            Some("v20.11.1".to_string()),
        ));

        let (res_tx, mut res_rx) = mpsc::channel(10);
        let (run_tx, run_rx) = mpsc::channel(10);
        handle_running(res_tx, run_rx, judge);

        let conn_id = Uuid::new_v4();
        run_tx
            .send(SubmissionInCh::new(conn_id, create_submission()))
            .await
            .unwrap();

        let running = res_rx.recv().await.unwrap();
        assert_eq!(running.conn_id, conn_id);
        assert!(matches!(running.event, SubmissionEvent::Running));

        let finished = res_rx.recv().await.unwrap();
        assert_eq!(finished.conn_id, conn_id);
        if let SubmissionEvent::Finished(report) = &finished.event {
            assert_eq!(report.summary.status, RunStatus::Ok);
            assert_eq!(report.summary.passed_count, 1);
            assert_eq!(report.tests.len(), 1);
        } else {
            panic!("Expected Finished event");
        }
    }

    #[tokio::test]
    async fn test_judge_error_becomes_failed_event() {
        let mut stager = MockStager::new();
        stager.expect_stage().returning(|_| {
            Err(StagingError::Write {
                msg: "disk full".to_string(),
            })
        });
        let judge = Arc::new(Judge::new(
            Arc::new(MockExecutor::new()),
            Arc::new(stager),
            None,
        ));

        let (res_tx, mut res_rx) = mpsc::channel(10);
        let (run_tx, run_rx) = mpsc::channel(10);
        handle_running(res_tx, run_rx, judge);

        run_tx
            .send(SubmissionInCh::new(Uuid::new_v4(), create_submission()))
            .await
            .unwrap();

        assert!(matches!(
            res_rx.recv().await.unwrap().event,
            SubmissionEvent::Running
        ));
        if let SubmissionEvent::Failed { msg } = res_rx.recv().await.unwrap().event {
            assert!(msg.contains("disk full"));
        } else {
            panic!("Expected Failed event");
        }
    }
}
