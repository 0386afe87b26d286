use std::sync::Arc;

use crate::core::{
    domain::{MemoryPeak, RunReport, RunStatus, RunSummary, Submission, TestCase, TestReport},
    traits::{
        executor::Executor,
        stager::{Stager, StagingError},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("submission has no test cases")]
    NoTests,
    #[error(transparent)]
    Staging(#[from] StagingError),
}

/// Grades whole submissions: stages the program once, runs every test in
/// order and folds the outcomes into a summary.
#[derive(Clone, Debug)]
pub struct Judge {
    executor: Arc<dyn Executor>,
    stager: Arc<dyn Stager>,
    runtime_version: Option<String>,
}

impl Judge {
    pub fn new(
        executor: Arc<dyn Executor>,
        stager: Arc<dyn Stager>,
        runtime_version: Option<String>,
    ) -> Self {
        Self {
            executor,
            stager,
            runtime_version,
        }
    }

    #[tracing::instrument(skip_all, fields(submission = %submission.id))]
    pub async fn run_submission(&self, submission: &Submission) -> Result<RunReport, JudgeError> {
        self.run(&submission.program, &submission.tests).await
    }

    /// Tests run one at a time. A test that cannot be executed is recorded as
    /// errored and the remaining tests still run.
    pub async fn run(&self, program: &str, tests: &[TestCase]) -> Result<RunReport, JudgeError> {
        if tests.is_empty() {
            return Err(JudgeError::NoTests);
        }

        let staged = self.stager.stage(program).await?;

        let mut reports = Vec::with_capacity(tests.len());
        for test in tests {
            let report = match self.executor.execute(&staged, test).await {
                Ok(outcome) => {
                    tracing::info!(
                        "Test {:?}: {:?} in {:.3} ms, {:.2} MB",
                        outcome.name,
                        outcome.verdict,
                        outcome.wall_time_ms,
                        outcome.memory.mb
                    );
                    TestReport::Executed(outcome)
                }
                Err(e) => {
                    tracing::warn!("Test {:?} could not be executed: {}", test.name, e);
                    TestReport::Errored {
                        name: test.name.clone(),
                        error: e.to_string(),
                    }
                }
            };
            reports.push(report);
        }

        if let Err(e) = self.stager.release(staged).await {
            tracing::warn!("{}", e);
        }

        let summary = summarize(&reports, self.runtime_version.clone());
        tracing::info!(
            "Run finished: {:?}, {}/{} passed",
            summary.status,
            summary.passed_count,
            summary.total_count
        );

        Ok(RunReport {
            summary,
            tests: reports,
        })
    }
}

pub fn summarize(reports: &[TestReport], runtime_version: Option<String>) -> RunSummary {
    let passed_count = reports.iter().filter(|report| report.passed()).count();
    let total_count = reports.len();
    let executed: Vec<_> = reports.iter().filter_map(TestReport::outcome).collect();

    let total_time_ms: f64 = executed.iter().map(|outcome| outcome.wall_time_ms).sum();
    let peak_time_ms = executed
        .iter()
        .map(|outcome| outcome.wall_time_ms)
        .reduce(f64::max);

    // A fallback value says nothing about the program, so it only wins when
    // no test was measured at all.
    let peak_memory = executed
        .iter()
        .filter(|outcome| outcome.memory.measured)
        .map(|outcome| outcome.memory.mb)
        .reduce(f64::max)
        .map(MemoryPeak::measured)
        .or_else(|| (!executed.is_empty()).then(MemoryPeak::fallback));

    let status = if passed_count == total_count {
        RunStatus::Ok
    } else {
        RunStatus::Failed
    };

    RunSummary {
        passed_count,
        total_count,
        total_time_ms,
        peak_time_ms,
        peak_memory,
        runtime_version,
        status,
    }
}
