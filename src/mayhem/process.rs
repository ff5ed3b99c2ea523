use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;

use crate::error::Result;

/// Captured result of one CLI invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs the Mayhem CLI with a prepared argument vector.
///
/// A non-zero exit is a normal result; only failing to start the process is an error.
#[async_trait]
pub trait CliRunner: Send + Sync {
    async fn execute(&self, args: &[String]) -> Result<CommandOutput>;
}

/// Runs the real binary with an explicit environment.
pub struct CliProcess {
    binary: PathBuf,
    env: Vec<(String, String)>,
}

impl CliProcess {
    pub fn new(binary: PathBuf, env: Vec<(String, String)>) -> Self {
        Self { binary, env }
    }
}

#[async_trait]
impl CliRunner for CliProcess {
    async fn execute(&self, args: &[String]) -> Result<CommandOutput> {
        tracing::info!(cli = %self.binary.display(), args = ?args, "Running Mayhem CLI");

        let output = tokio::process::Command::new(&self.binary)
            .args(args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        for line in result.stderr.lines().filter(|l| !l.trim().is_empty()) {
            tracing::info!(target: "mayhem", "{line}");
        }
        tracing::debug!(
            exit_code = ?result.exit_code,
            stdout = %result.stdout,
            "Mayhem CLI finished"
        );

        Ok(result)
    }
}
