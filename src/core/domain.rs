use std::path::PathBuf;

use uuid::Uuid;

use crate::constants::FALLBACK_MEMORY_MB;

#[derive(Clone, Debug)]
pub struct Submission {
    pub id: Uuid,
    pub received_at: chrono::DateTime<chrono::Utc>,
    pub program: String,
    pub tests: Vec<TestCase>,
}

impl Submission {
    pub fn new(program: String, tests: Vec<TestCase>) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: chrono::Utc::now(),
            program,
            tests,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub input: String,
    pub expected: String,
}

impl TestCase {
    /// Input is always delivered with a trailing line terminator, so
    /// line-buffered readers see the last line.
    pub fn new(
        name: impl Into<String>,
        input: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        let mut input = input.into();
        if !input.ends_with('\n') {
            input.push('\n');
        }

        Self {
            name: name.into(),
            input,
            expected: expected.into(),
        }
    }
}

/// A submitted program written to disk where the runtime can execute it.
#[derive(Clone, Debug, PartialEq)]
pub struct StagedProgram {
    pub path: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemoryPeak {
    pub mb: f64,
    pub measured: bool,
}

impl MemoryPeak {
    pub fn measured(mb: f64) -> Self {
        Self { mb, measured: true }
    }

    pub fn fallback() -> Self {
        Self {
            mb: FALLBACK_MEMORY_MB,
            measured: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    RuntimeError,
    TimedOut,
    /// Printed more than the per-stream output limit and was stopped.
    OutputLimitExceeded,
}

#[derive(Clone, Debug)]
pub struct ExecutionOutcome {
    pub name: String,
    pub exit_code: Option<i32>,
    pub wall_time_ms: f64,
    pub memory: MemoryPeak,
    pub normalized_output: String,
    pub normalized_expected: String,
    pub normalized_stderr: String,
    pub verdict: Verdict,
}

impl ExecutionOutcome {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Accepted
    }
}

#[derive(Clone, Debug)]
pub enum TestReport {
    Executed(ExecutionOutcome),
    Errored { name: String, error: String },
}

impl TestReport {
    pub fn name(&self) -> &str {
        match self {
            TestReport::Executed(outcome) => &outcome.name,
            TestReport::Errored { name, .. } => name,
        }
    }

    pub fn passed(&self) -> bool {
        match self {
            TestReport::Executed(outcome) => outcome.passed(),
            TestReport::Errored { .. } => false,
        }
    }

    pub fn outcome(&self) -> Option<&ExecutionOutcome> {
        match self {
            TestReport::Executed(outcome) => Some(outcome),
            TestReport::Errored { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    Failed,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub passed_count: usize,
    pub total_count: usize,
    pub total_time_ms: f64,
    pub peak_time_ms: Option<f64>,
    pub peak_memory: Option<MemoryPeak>,
    pub runtime_version: Option<String>,
    pub status: RunStatus,
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub tests: Vec<TestReport>,
}

/// What the judge has to say about a submission, in the order it says it.
#[derive(Clone, Debug)]
pub enum SubmissionEvent {
    Running,
    Finished(RunReport),
    Failed { msg: String },
}

impl SubmissionEvent {
    /// Every request gets exactly one final event.
    pub fn is_final(&self) -> bool {
        !matches!(self, SubmissionEvent::Running)
    }
}
