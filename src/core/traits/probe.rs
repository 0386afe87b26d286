/// Reads the resident memory of a foreign process.
///
/// Implementations must not fail loudly: a process that is gone, a platform
/// without a supported query or an unparsable answer all yield `None`.
#[mockall::automock]
#[async_trait::async_trait]
pub trait MemoryProbe: std::fmt::Debug + Send + Sync {
    /// Resident set size of `pid` in megabytes.
    async fn sample(&self, pid: u32) -> Option<f64>;
}
