use crate::core::domain::{ExecutionOutcome, StagedProgram, TestCase};

#[mockall::automock]
#[async_trait::async_trait]
pub trait Executor: std::fmt::Debug + Send + Sync {
    /// Runs `program` once with the test's input and grades what it printed.
    ///
    /// A program that crashes, exits non-zero or runs out of time still yields
    /// an outcome. An error means the test could not be executed at all.
    async fn execute(
        &self,
        program: &StagedProgram,
        test: &TestCase,
    ) -> Result<ExecutionOutcome, ExecuteError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecuteError {
    #[error("failed to spawn process: {msg}")]
    Spawn { msg: String },
    #[error("failed to communicate with process: {msg}")]
    Io { msg: String },
}
