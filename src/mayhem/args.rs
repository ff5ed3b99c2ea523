use std::fmt;

use crate::config::RunConfig;
use crate::mayhem::handle::RunHandle;

/// Lifecycle phase of the Mayhem CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Run,
    Wait,
    Show,
    Download,
}

impl Phase {
    pub fn subcommand(&self) -> &'static str {
        match self {
            Phase::Run => "run",
            Phase::Wait => "wait",
            Phase::Show => "show",
            Phase::Download => "download",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subcommand())
    }
}

/// Builds argument vectors for each CLI phase. Nothing here goes through a shell.
pub struct ArgumentAssembler<'a> {
    config: &'a RunConfig,
}

impl<'a> ArgumentAssembler<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Self { config }
    }

    fn base(&self, phase: Phase) -> Vec<String> {
        vec![
            "--verbosity".to_string(),
            self.config.verbosity.as_str().to_string(),
            phase.subcommand().to_string(),
        ]
    }

    pub fn run_args(&self) -> Vec<String> {
        let config = self.config;
        let provenance = &config.provenance;

        let mut args = self.base(Phase::Run);
        args.extend([
            config.package_path.clone(),
            "--project".to_string(),
            config.project.clone(),
            "--owner".to_string(),
            config.owner.clone(),
        ]);
        args.extend(config.extra_args.iter().cloned());
        args.extend([
            "--ci-url".to_string(),
            provenance.ci_url.clone(),
            "--merge-base-branch-name".to_string(),
            provenance.merge_base_branch_name.clone(),
            "--branch-name".to_string(),
            provenance.branch_name.clone(),
            "--revision".to_string(),
            provenance.revision.clone(),
        ]);
        args
    }

    /// `None` when no synchronous result was requested and `wait` must be skipped.
    pub fn wait_args(&self, handle: &RunHandle) -> Option<Vec<String>> {
        let config = self.config;
        if !config.wants_wait() {
            return None;
        }

        let mut args = self.base(Phase::Wait);
        args.extend([
            handle.as_str().to_string(),
            "--owner".to_string(),
            config.owner.clone(),
        ]);

        if let Some(dir) = &config.sarif_output_dir {
            args.push("--sarif".to_string());
            args.push(
                dir.join(format!("{}.sarif", handle.run_name()))
                    .display()
                    .to_string(),
            );
        }
        if let Some(dir) = &config.junit_output_dir {
            args.push("--junit".to_string());
            args.push(
                dir.join(format!("{}.xml", handle.run_name()))
                    .display()
                    .to_string(),
            );
        }
        if config.coverage_output_dir.is_some() {
            args.push("--coverage".to_string());
        }
        if config.fail_on_defects {
            args.push("--fail-on-defects".to_string());
        }

        Some(args)
    }

    pub fn show_args(&self, handle: &RunHandle) -> Vec<String> {
        let mut args = self.base(Phase::Show);
        args.extend([
            "--owner".to_string(),
            self.config.owner.clone(),
            "--format".to_string(),
            "json".to_string(),
            handle.as_str().to_string(),
        ]);
        args
    }

    /// `None` unless coverage output was requested.
    pub fn download_args(&self, handle: &RunHandle) -> Option<Vec<String>> {
        let dir = self.config.coverage_output_dir.as_ref()?;

        let mut args = self.base(Phase::Download);
        args.extend([
            handle.target_path().to_string(),
            "--owner".to_string(),
            self.config.owner.clone(),
            "--output".to_string(),
            dir.display().to_string(),
        ]);
        Some(args)
    }
}
