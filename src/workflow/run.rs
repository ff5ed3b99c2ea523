use std::path::Path;

use crate::config::RunConfig;
use crate::error::{AppError, Result};
use crate::mayhem::{mayhemfile, ArgumentAssembler, CliRunner, Phase, RunHandle};
use crate::platform::github::commands;
use crate::workflow::types::RunOutcome;

/// States of the run lifecycle, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Scheduling,
    Scheduled,
    WaitSkipped,
    Waiting,
    Waited,
    StatusChecked,
    Downloading,
    Done,
}

/// Drives one Mayhem run through `run` → `wait` → `show` → `download`.
///
/// Phases run strictly one after another; each CLI invocation completes
/// before the next is assembled.
pub struct RunOrchestrator<'a> {
    config: &'a RunConfig,
    runner: &'a dyn CliRunner,
    output_file: Option<&'a Path>,
}

impl<'a> RunOrchestrator<'a> {
    pub fn new(config: &'a RunConfig, runner: &'a dyn CliRunner) -> Self {
        Self {
            config,
            runner,
            output_file: None,
        }
    }

    /// Publish the run id as a step output to this file.
    pub fn with_output_file(mut self, output_file: Option<&'a Path>) -> Self {
        self.output_file = output_file;
        self
    }

    fn enter(&self, state: RunState) {
        tracing::debug!(state = ?state, "Run lifecycle transition");
    }

    /// Execute the lifecycle.
    ///
    /// Phase failures are returned as failure outcomes; only coverage download
    /// and local I/O failures come back as errors.
    pub async fn execute(&self) -> Result<RunOutcome> {
        let assembler = ArgumentAssembler::new(self.config);

        self.enter(RunState::Init);
        self.prepare().await?;

        self.enter(RunState::Scheduling);
        let handle = match self.schedule(&assembler).await {
            Ok(handle) => handle,
            Err(reason) => {
                tracing::error!(reason = %reason, "Mayhem run was not scheduled");
                return Ok(RunOutcome::NotStarted { reason });
            }
        };

        self.enter(RunState::Scheduled);
        tracing::info!(run = %handle, "Mayhem run scheduled");
        commands::set_output(self.output_file, "runId", handle.as_str())?;

        let Some(wait_args) = assembler.wait_args(&handle) else {
            self.enter(RunState::WaitSkipped);
            tracing::info!("No outputs requested, not waiting for the run to finish");
            return Ok(RunOutcome::Scheduled { handle });
        };

        self.enter(RunState::Waiting);
        if let Err(reason) = self.run_phase(Phase::Wait, &wait_args).await {
            return Ok(RunOutcome::WaitError { handle, reason });
        }
        self.enter(RunState::Waited);

        let status = match self.status(&assembler, &handle).await {
            Ok(status) => status,
            Err(reason) => return Ok(RunOutcome::WaitError { handle, reason }),
        };
        self.enter(RunState::StatusChecked);
        tracing::info!(run = %handle, status = %status, "Mayhem run finished");

        let outcome = RunOutcome::from_status(handle, status);
        if !outcome.is_success() {
            return Ok(outcome);
        }

        if let Some(handle) = outcome.handle() {
            if let Some(download_args) = assembler.download_args(handle) {
                self.enter(RunState::Downloading);
                self.run_phase(Phase::Download, &download_args)
                    .await
                    .map_err(AppError::Download)?;
            }
        }

        self.enter(RunState::Done);
        Ok(outcome)
    }

    /// Create requested output directories and pin the Mayhemfile project.
    async fn prepare(&self) -> Result<()> {
        for dir in self.config.output_dirs() {
            tokio::fs::create_dir_all(dir).await?;
        }
        mayhemfile::pin_project(&self.config.mayhemfile, &self.config.project).await?;
        Ok(())
    }

    async fn schedule(
        &self,
        assembler: &ArgumentAssembler<'_>,
    ) -> std::result::Result<RunHandle, String> {
        let output = self
            .runner
            .execute(&assembler.run_args())
            .await
            .map_err(|e| format!("failed to start mayhem run: {e}"))?;

        // Exit code is ignored; only the handle decides.
        RunHandle::parse(&output.stdout).ok_or_else(|| {
            let stdout = output.stdout.trim();
            if stdout.is_empty() {
                format!(
                    "mayhem run printed no run id (exit code {:?})",
                    output.exit_code
                )
            } else {
                format!("mayhem run printed an unrecognised run id: {stdout}")
            }
        })
    }

    async fn run_phase(&self, phase: Phase, args: &[String]) -> std::result::Result<(), String> {
        let output = self
            .runner
            .execute(args)
            .await
            .map_err(|e| format!("failed to start mayhem {phase}: {e}"))?;

        if output.success() {
            Ok(())
        } else {
            tracing::warn!(
                phase = %phase,
                exit_code = ?output.exit_code,
                "Mayhem CLI phase failed"
            );
            Err(format!(
                "mayhem {phase} exited with code {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            ))
        }
    }

    async fn status(
        &self,
        assembler: &ArgumentAssembler<'_>,
        handle: &RunHandle,
    ) -> std::result::Result<String, String> {
        let output = self
            .runner
            .execute(&assembler.show_args(handle))
            .await
            .map_err(|e| format!("failed to start mayhem show: {e}"))?;

        if !output.success() {
            return Err(format!(
                "mayhem show exited with code {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            ));
        }
        parse_status(&output.stdout)
    }
}

/// Extract `.[0].status` from `mayhem show --format json`.
pub fn parse_status(stdout: &str) -> std::result::Result<String, String> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(stdout.trim())
        .map_err(|e| format!("unparseable mayhem show output: {e}"))?;

    entries
        .first()
        .and_then(|entry| entry["status"].as_str())
        .map(str::to_string)
        .ok_or_else(|| "mayhem show returned no run status".to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::config::ActionInputs;
    use crate::mayhem::CommandOutput;
    use crate::platform::github::context::CiContext;

    /// Replays canned outputs and records every argument vector.
    struct ScriptedRunner {
        outputs: Mutex<VecDeque<CommandOutput>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn new(outputs: Vec<CommandOutput>) -> Self {
            Self {
                outputs: Mutex::new(outputs.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn subcommands(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|args| args[2].clone())
                .collect()
        }
    }

    #[async_trait]
    impl CliRunner for ScriptedRunner {
        async fn execute(&self, args: &[String]) -> Result<CommandOutput> {
            self.calls.lock().unwrap().push(args.to_vec());
            Ok(self
                .outputs
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected CLI invocation"))
        }
    }

    fn out(code: i32, stdout: &str) -> CommandOutput {
        CommandOutput {
            exit_code: Some(code),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    fn show(status: &str) -> CommandOutput {
        out(0, &format!(r#"[{{"status": "{status}", "n_defects": 0}}]"#))
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        config: RunConfig,
        output_file: std::path::PathBuf,
    }

    fn fixture(f: impl FnOnce(&mut ActionInputs, &Path)) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let mayhemfile = tmp.path().join("Mayhemfile");
        let mut inputs = ActionInputs {
            github_token: Some("token".into()),
            args: Some(format!("--file {}", mayhemfile.display())),
            ..Default::default()
        };
        f(&mut inputs, tmp.path());
        let ci = CiContext {
            repository: Some("acme/widget".into()),
            ..Default::default()
        };
        let config = RunConfig::resolve(inputs, &ci).unwrap();
        let output_file = tmp.path().join("github_output");
        Fixture {
            _tmp: tmp,
            config,
            output_file,
        }
    }

    async fn execute(fixture: &Fixture, runner: &ScriptedRunner) -> Result<RunOutcome> {
        RunOrchestrator::new(&fixture.config, runner)
            .with_output_file(Some(&fixture.output_file))
            .execute()
            .await
    }

    fn dir(root: &Path, name: &str) -> Option<String> {
        Some(root.join(name).display().to_string())
    }

    #[tokio::test]
    async fn test_skips_wait_without_outputs() {
        let fx = fixture(|_, _| {});
        let runner = ScriptedRunner::new(vec![out(0, "acme/widget/42\n")]);

        let outcome = execute(&fx, &runner).await.unwrap();

        assert_eq!(outcome.exit_code(), 0);
        assert!(matches!(outcome, RunOutcome::Scheduled { .. }));
        assert_eq!(runner.subcommands(), vec!["run"]);
        let output = std::fs::read_to_string(&fx.output_file).unwrap();
        assert!(output.contains("\nacme/widget/42\n"));
    }

    #[tokio::test]
    async fn test_empty_handle_is_not_started_regardless_of_exit_code() {
        for code in [0, 1, 7] {
            let fx = fixture(|i, root| i.sarif_output = dir(root, "sarif"));
            let runner = ScriptedRunner::new(vec![out(code, "")]);

            let outcome = execute(&fx, &runner).await.unwrap();

            assert!(matches!(outcome, RunOutcome::NotStarted { .. }));
            assert_eq!(outcome.exit_code(), 1);
            assert_eq!(runner.subcommands(), vec!["run"]);
            assert!(!fx.output_file.exists());
        }
    }

    #[tokio::test]
    async fn test_wait_failure_exits_three() {
        let fx = fixture(|i, root| i.sarif_output = dir(root, "sarif"));
        let runner = ScriptedRunner::new(vec![out(0, "acme/widget/42"), out(1, "")]);

        let outcome = execute(&fx, &runner).await.unwrap();

        assert!(matches!(outcome, RunOutcome::WaitError { .. }));
        assert_eq!(outcome.exit_code(), 3);
        assert_eq!(runner.subcommands(), vec!["run", "wait"]);
    }

    #[tokio::test]
    async fn test_failed_status_exits_two() {
        for status in ["build-failed", "stopped-early"] {
            let fx = fixture(|i, _| i.fail_on_defects = Some("true".into()));
            let runner = ScriptedRunner::new(vec![
                out(0, "acme/widget/42"),
                out(0, ""),
                show(status),
            ]);

            let outcome = execute(&fx, &runner).await.unwrap();

            assert_eq!(outcome.exit_code(), 2, "status {status}");
            assert_eq!(runner.subcommands(), vec!["run", "wait", "show"]);
        }
    }

    #[tokio::test]
    async fn test_completed_run_writes_outputs() {
        let fx = fixture(|i, root| {
            i.sarif_output = dir(root, "sarif-output");
            i.junit_output = dir(root, "junit-output");
        });
        let runner = ScriptedRunner::new(vec![
            out(0, "acme/widget/42"),
            out(0, ""),
            show("completed"),
        ]);

        let outcome = execute(&fx, &runner).await.unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Completed {
                handle: RunHandle::parse("acme/widget/42").unwrap(),
                status: "completed".into(),
            }
        );
        assert!(fx.config.sarif_output_dir.as_ref().unwrap().is_dir());
        assert!(fx.config.junit_output_dir.as_ref().unwrap().is_dir());

        let calls = runner.calls.lock().unwrap();
        let sarif_dir = fx.config.sarif_output_dir.as_ref().unwrap();
        let sarif = sarif_dir.join("widget.sarif");
        assert!(calls[1].contains(&sarif.display().to_string()));
        assert!(calls[2].contains(&"json".to_string()));
    }

    #[tokio::test]
    async fn test_coverage_is_downloaded_for_target() {
        let fx = fixture(|i, root| i.coverage_output = dir(root, "coverage-output"));
        let runner = ScriptedRunner::new(vec![
            out(0, "acme/widget/42"),
            out(0, ""),
            show("completed"),
            out(0, ""),
        ]);

        let outcome = execute(&fx, &runner).await.unwrap();

        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(
            runner.subcommands(),
            vec!["run", "wait", "show", "download"]
        );
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[3][3], "acme/widget");
    }

    #[tokio::test]
    async fn test_no_download_after_failed_status() {
        let fx = fixture(|i, root| i.coverage_output = dir(root, "coverage-output"));
        let runner = ScriptedRunner::new(vec![
            out(0, "acme/widget/42"),
            out(0, ""),
            show("failed"),
        ]);

        let outcome = execute(&fx, &runner).await.unwrap();

        assert_eq!(outcome.exit_code(), 2);
        assert_eq!(runner.subcommands(), vec!["run", "wait", "show"]);
    }

    #[tokio::test]
    async fn test_download_failure_is_its_own_error() {
        let fx = fixture(|i, root| i.coverage_output = dir(root, "coverage-output"));
        let runner = ScriptedRunner::new(vec![
            out(0, "acme/widget/42"),
            out(0, ""),
            show("completed"),
            out(2, ""),
        ]);

        let err = execute(&fx, &runner).await.unwrap_err();

        assert!(matches!(err, AppError::Download(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn test_unreadable_show_output_is_wait_error() {
        let fx = fixture(|i, _| i.fail_on_defects = Some("true".into()));
        let runner = ScriptedRunner::new(vec![
            out(0, "acme/widget/42"),
            out(0, ""),
            out(0, "not json"),
        ]);

        let outcome = execute(&fx, &runner).await.unwrap();

        assert_eq!(outcome.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_mayhemfile_project_is_pinned_before_run() {
        let fx = fixture(|_, _| {});
        std::fs::write(
            &fx.config.mayhemfile,
            "project: somebody/else\ntarget: widget\n",
        )
        .unwrap();
        let runner = ScriptedRunner::new(vec![out(0, "acme/widget/42")]);

        execute(&fx, &runner).await.unwrap();

        let contents = std::fs::read_to_string(&fx.config.mayhemfile).unwrap();
        assert_eq!(contents, "project: acme/widget\ntarget: widget\n");
    }

    #[tokio::test]
    async fn test_package_mayhemfile_is_pinned_without_file_flag() {
        let fx = fixture(|i, root| {
            i.args = None;
            i.package = Some(root.join("fuzz").display().to_string());
        });
        let package = Path::new(&fx.config.package_path);
        std::fs::create_dir_all(package).unwrap();
        std::fs::write(package.join("Mayhemfile"), "project: other/x\n").unwrap();
        let runner = ScriptedRunner::new(vec![out(0, "acme/widget/42")]);

        execute(&fx, &runner).await.unwrap();

        let contents = std::fs::read_to_string(package.join("Mayhemfile")).unwrap();
        assert_eq!(contents, "project: acme/widget\n");
        let calls = runner.calls.lock().unwrap();
        assert!(calls[0].contains(&fx.config.package_path));
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(
            parse_status(r#"[{"status": "completed"}]"#).unwrap(),
            "completed"
        );
        assert!(parse_status("[]").is_err());
        assert!(parse_status(r#"[{"id": 1}]"#).is_err());
        assert!(parse_status("").is_err());
    }
}
