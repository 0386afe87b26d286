use std::process::Stdio;
use std::time::Duration;

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::ChildStdin,
    time::Instant,
};

use crate::constants::DEFAULT_OUTPUT_LIMIT_BYTES;
use crate::core::{
    domain::{ExecutionOutcome, MemoryPeak, StagedProgram, TestCase, Verdict},
    normalize::normalize,
    sampler::{MemorySampler, SamplingSession},
    traits::executor::{ExecuteError, Executor},
};
use crate::native::runtime::Runtime;

const READ_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Clone, Debug)]
pub struct NativeExecutor {
    runtime: Runtime,
    sampler: MemorySampler,
    time_limit: Duration,
    output_limit: usize,
}

impl NativeExecutor {
    pub fn new(runtime: Runtime, sampler: MemorySampler, time_limit: Duration) -> Self {
        NativeExecutor {
            runtime,
            sampler,
            time_limit,
            output_limit: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }

    /// Bytes kept from each of stdout and stderr before the process is stopped.
    pub fn output_limit(mut self, bytes: usize) -> Self {
        self.output_limit = bytes;
        self
    }
}

#[derive(Debug, thiserror::Error)]
enum CaptureError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("output limit exceeded")]
    LimitExceeded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Termination {
    Exited,
    TimedOut,
    OutputLimitExceeded,
}

#[async_trait::async_trait]
impl Executor for NativeExecutor {
    #[tracing::instrument(skip(self, program, test), fields(test = %test.name))]
    async fn execute(
        &self,
        program: &StagedProgram,
        test: &TestCase,
    ) -> Result<ExecutionOutcome, ExecuteError> {
        let mut child = self
            .runtime
            .command(&program.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecuteError::Spawn {
                msg: format!("{}: {}", self.runtime.interpreter.display(), e),
            })?;
        let started_at = Instant::now();

        let session = child.id().map(|pid| self.sampler.start(pid));

        let stdin = child.stdin.take().ok_or_else(|| ExecuteError::Io {
            msg: "stdin is not captured".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| ExecuteError::Io {
            msg: "stdout is not captured".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| ExecuteError::Io {
            msg: "stderr is not captured".to_string(),
        })?;

        // Runs on its own so a child that never reads cannot hold up the rest.
        let feeder = tokio::spawn(feed_input(stdin, test.input.clone().into_bytes()));

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let result = tokio::time::timeout(self.time_limit, async {
            tokio::try_join!(
                pump(stdout, &mut stdout_buf, self.output_limit, session.as_ref()),
                pump(stderr, &mut stderr_buf, self.output_limit, session.as_ref()),
            )?;
            Ok::<_, CaptureError>(child.wait().await?)
        })
        .await;
        let wall_time_ms = started_at.elapsed().as_secs_f64() * 1000.0;

        let (exit_code, termination) = match result {
            Ok(Ok(status)) => (status.code(), Termination::Exited),
            Ok(Err(CaptureError::LimitExceeded)) => {
                tracing::info!(
                    "Output limit of {} bytes exceeded, killing process",
                    self.output_limit
                );
                kill(&mut child).await;
                (None, Termination::OutputLimitExceeded)
            }
            Ok(Err(CaptureError::Io(e))) => {
                kill(&mut child).await;
                feeder.abort();
                finish_sampling(session).await;
                return Err(ExecuteError::Io { msg: e.to_string() });
            }
            Err(_) => {
                tracing::info!(
                    peak_mb = ?session.as_ref().and_then(SamplingSession::peak),
                    "Time limit of {:?} exceeded, killing process",
                    self.time_limit
                );
                kill(&mut child).await;
                (None, Termination::TimedOut)
            }
        };
        feeder.abort();

        let memory = finish_sampling(session).await;

        let (raw_stdout, normalized_output, normalized_stderr) =
            tokio::task::spawn_blocking(move || {
                let raw_stdout = String::from_utf8_lossy(&stdout_buf).into_owned();
                let normalized_output = normalize(&raw_stdout).trim().to_string();
                let normalized_stderr = normalize(&String::from_utf8_lossy(&stderr_buf));
                (raw_stdout, normalized_output, normalized_stderr)
            })
            .await
            .map_err(|e| ExecuteError::Io { msg: e.to_string() })?;
        let normalized_expected = test.expected.trim().to_string();
        let verdict = judge(termination, exit_code, &normalized_output, &normalized_expected);

        tracing::debug!(
            input = ?test.input,
            raw_stdout = ?raw_stdout,
            normalized_output = ?normalized_output,
            normalized_expected = ?normalized_expected,
            exit_code = ?exit_code,
            "Process finished"
        );

        Ok(ExecutionOutcome {
            name: test.name.clone(),
            exit_code,
            wall_time_ms,
            memory,
            normalized_output,
            normalized_expected,
            normalized_stderr,
            verdict,
        })
    }
}

fn judge(
    termination: Termination,
    exit_code: Option<i32>,
    output: &str,
    expected: &str,
) -> Verdict {
    match termination {
        Termination::TimedOut => Verdict::TimedOut,
        Termination::OutputLimitExceeded => Verdict::OutputLimitExceeded,
        Termination::Exited if exit_code != Some(0) => Verdict::RuntimeError,
        Termination::Exited if output == expected => Verdict::Accepted,
        Termination::Exited => Verdict::WrongAnswer,
    }
}

async fn kill(child: &mut tokio::process::Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill process: {}", e);
    }
}

async fn finish_sampling(session: Option<SamplingSession>) -> MemoryPeak {
    match session {
        Some(session) => session.finish().await,
        None => MemoryPeak::fallback(),
    }
}

/// Writes the whole input and closes stdin. A child that exits without
/// reading everything is graded on what it printed, so a broken pipe is fine.
async fn feed_input(mut stdin: ChildStdin, input: Vec<u8>) {
    if let Err(e) = stdin.write_all(&input).await {
        tracing::debug!("Process stopped reading its input: {}", e);
        return;
    }
    if let Err(e) = stdin.shutdown().await {
        tracing::debug!("Failed to close stdin: {}", e);
    }
}

/// Collects a stream until EOF. At most `limit` bytes are kept; going past
/// it stops reading with `CaptureError::LimitExceeded`.
async fn pump<R>(
    mut reader: R,
    buf: &mut Vec<u8>,
    limit: usize,
    session: Option<&SamplingSession>,
) -> Result<(), CaptureError>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        if let Some(session) = session {
            session.poke();
        }

        let room = limit.saturating_sub(buf.len());
        if n > room {
            buf.extend_from_slice(&chunk[..room]);
            return Err(CaptureError::LimitExceeded);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}
