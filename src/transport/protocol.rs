use serde::{Deserialize, Serialize};

use crate::core::domain::{
    ExecutionOutcome, RunReport, RunStatus, RunSummary, Submission, SubmissionEvent, TestCase,
    TestReport, Verdict,
};

const SINGLE_TEST_NAME: &str = "user test";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Missing required field: {field}")]
    MissingField { field: String },
    #[error("Field must not be empty: {field}")]
    EmptyField { field: String },
    #[error("Submission has no tests")]
    NoTests,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// The editor flow: one test built from two free-text fields.
    Submit {
        code: Option<String>,
        input: Option<String>,
        expected: Option<String>,
    },
    SubmitTests {
        code: Option<String>,
        #[serde(default)]
        tests: Vec<TestData>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestData {
    pub name: Option<String>,
    pub input: Option<String>,
    pub expected: Option<String>,
}

pub fn parse_submission(text: &str) -> Result<Submission, ProtocolError> {
    let msg: ClientMessage = serde_json::from_str(text)?;
    msg.try_into()
}

impl TryFrom<ClientMessage> for Submission {
    type Error = ProtocolError;

    fn try_from(msg: ClientMessage) -> Result<Self, ProtocolError> {
        match msg {
            ClientMessage::Submit {
                code,
                input,
                expected,
            } => {
                let code = non_empty(code, "code")?;
                let input = non_empty(input, "input")?;
                let expected = non_empty(expected, "expected")?;

                let test = TestCase::new(SINGLE_TEST_NAME, input, expected.trim());
                Ok(Submission::new(code, vec![test]))
            }
            ClientMessage::SubmitTests { code, tests } => {
                let code = non_empty(code, "code")?;
                if tests.is_empty() {
                    return Err(ProtocolError::NoTests);
                }

                let tests = tests
                    .into_iter()
                    .enumerate()
                    .map(|(idx, test)| test.into_test_case(idx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Submission::new(code, tests))
            }
        }
    }
}

impl TestData {
    fn into_test_case(self, idx: usize) -> Result<TestCase, ProtocolError> {
        let input = required(self.input, &format!("tests[{}].input", idx))?;
        let expected = required(self.expected, &format!("tests[{}].expected", idx))?;
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("test {}", idx + 1));

        Ok(TestCase::new(name, input, expected))
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ProtocolError> {
    value.ok_or_else(|| ProtocolError::MissingField {
        field: field.to_string(),
    })
}

fn non_empty(value: Option<String>, field: &str) -> Result<String, ProtocolError> {
    let value = required(value, field)?;
    if value.trim().is_empty() {
        return Err(ProtocolError::EmptyField {
            field: field.to_string(),
        });
    }
    Ok(value)
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Status {
        status: String,
        message: String,
    },
    Results {
        results: Vec<TestResult>,
        summary: Summary,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TestResult {
    Executed(ExecutedTest),
    Errored(ErroredTest),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutedTest {
    pub name: String,
    pub passed: bool,
    pub verdict: &'static str,
    pub exit_code: Option<i32>,
    pub wall_time_ms: f64,
    pub peak_memory_mb: f64,
    pub memory_measured: bool,
    pub normalized_output: String,
    pub normalized_expected: String,
    pub stderr: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErroredTest {
    pub name: String,
    pub passed: bool,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub passed_count: usize,
    pub total_count: usize,
    pub total_time_ms: f64,
    pub peak_time_ms: Option<f64>,
    pub peak_memory_mb: Option<f64>,
    pub memory_measured: bool,
    pub runtime_version: Option<String>,
    pub status: &'static str,
}

impl From<SubmissionEvent> for ServerMessage {
    fn from(event: SubmissionEvent) -> Self {
        match event {
            SubmissionEvent::Running => ServerMessage::Status {
                status: "running".to_string(),
                message: "Running tests...".to_string(),
            },
            SubmissionEvent::Finished(report) => report.into(),
            SubmissionEvent::Failed { msg } => ServerMessage::Error { message: msg },
        }
    }
}

impl From<RunReport> for ServerMessage {
    fn from(report: RunReport) -> Self {
        ServerMessage::Results {
            results: report.tests.into_iter().map(Into::into).collect(),
            summary: report.summary.into(),
        }
    }
}

impl From<TestReport> for TestResult {
    fn from(report: TestReport) -> Self {
        match report {
            TestReport::Executed(outcome) => TestResult::Executed(outcome.into()),
            TestReport::Errored { name, error } => TestResult::Errored(ErroredTest {
                name,
                passed: false,
                error,
            }),
        }
    }
}

impl From<ExecutionOutcome> for ExecutedTest {
    fn from(outcome: ExecutionOutcome) -> Self {
        let passed = outcome.passed();
        let stderr = outcome.normalized_stderr;

        Self {
            passed,
            verdict: verdict_name(outcome.verdict),
            name: outcome.name,
            exit_code: outcome.exit_code,
            wall_time_ms: outcome.wall_time_ms,
            peak_memory_mb: outcome.memory.mb,
            memory_measured: outcome.memory.measured,
            normalized_output: outcome.normalized_output,
            normalized_expected: outcome.normalized_expected,
            stderr: (!stderr.is_empty()).then_some(stderr),
        }
    }
}

impl From<RunSummary> for Summary {
    fn from(summary: RunSummary) -> Self {
        Self {
            passed_count: summary.passed_count,
            total_count: summary.total_count,
            total_time_ms: summary.total_time_ms,
            peak_time_ms: summary.peak_time_ms,
            peak_memory_mb: summary.peak_memory.map(|peak| peak.mb),
            memory_measured: summary.peak_memory.is_some_and(|peak| peak.measured),
            runtime_version: summary.runtime_version,
            status: match summary.status {
                RunStatus::Ok => "OK",
                RunStatus::Failed => "FAILED",
            },
        }
    }
}

fn verdict_name(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Accepted => "ACCEPTED",
        Verdict::WrongAnswer => "WRONG_ANSWER",
        Verdict::RuntimeError => "RUNTIME_ERROR",
        Verdict::TimedOut => "TIMED_OUT",
        Verdict::OutputLimitExceeded => "OUTPUT_LIMIT_EXCEEDED",
    }
}
