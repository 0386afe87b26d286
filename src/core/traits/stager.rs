use crate::core::domain::StagedProgram;

#[mockall::automock]
#[async_trait::async_trait]
pub trait Stager: std::fmt::Debug + Send + Sync {
    /// Writes `program` somewhere no other in-flight submission can touch.
    async fn stage(&self, program: &str) -> Result<StagedProgram, StagingError>;

    async fn release(&self, program: StagedProgram) -> Result<(), StagingError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StagingError {
    #[error("failed to stage program: {msg}")]
    Write { msg: String },
    #[error("failed to remove staged program: {msg}")]
    Remove { msg: String },
}
