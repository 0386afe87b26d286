use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

/// The interpreter every submission runs under: `<interpreter> [args...] <program>`.
#[derive(Clone, Debug, PartialEq)]
pub struct Runtime {
    pub interpreter: PathBuf,
    pub args: Vec<String>,
}

impl Runtime {
    pub fn new<T>(interpreter: T, args: Vec<String>) -> Self
    where
        T: AsRef<Path>,
    {
        Runtime {
            interpreter: interpreter.as_ref().into(),
            args,
        }
    }

    pub fn command(&self, program: &Path) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.args(&self.args).arg(program);
        cmd
    }

    /// First line of `<interpreter> --version`, or `None` when the
    /// interpreter does not answer that question.
    #[tracing::instrument]
    pub async fn version(&self) -> Option<String> {
        let out = Command::new(&self.interpreter)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        let out = match out {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!("Failed to query runtime version: {}", e);
                return None;
            }
        };
        if !out.status.success() {
            tracing::warn!("Runtime version query exited with {}", out.status);
            return None;
        }

        let version = first_line(&String::from_utf8_lossy(&out.stdout));
        tracing::info!("Runtime version: {:?}", version);
        version
    }
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_appends_program_after_args() {
        let runtime = Runtime::new("sh", vec!["-e".to_string()]);

        let out = runtime
            .command(Path::new("/dev/null"))
            .output()
            .await
            .expect("Failed to run sh");

        assert!(out.status.success());
    }

    #[tokio::test]
    async fn test_version_of_missing_interpreter() {
        let runtime = Runtime::new("/nonexistent/interpreter", vec![]);

        assert_eq!(runtime.version().await, None);
    }

    #[test]
    fn test_first_line_skips_blank_lines() {
        assert_eq!(first_line("\n  v20.11.1  \nextra\n").as_deref(), Some("v20.11.1"));
        assert_eq!(first_line("\n\n"), None);
    }
}
