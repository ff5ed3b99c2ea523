pub mod report;
pub mod run;
pub mod types;

use crate::config::RunConfig;
use crate::error::Result;
use crate::mayhem::CliRunner;
use crate::platform::github::commands;
use crate::platform::github::context::CiContext;
use crate::platform::Platform;

pub use report::{MayhemApi, SummarySource};
pub use run::RunOrchestrator;
pub use types::RunOutcome;

/// Collaborators used to report a finished run back to the pull request.
pub struct Reporting<'a> {
    pub platform: &'a dyn Platform,
    pub summaries: &'a dyn SummarySource,
}

/// Run the Mayhem lifecycle and report the result.
///
/// Failure outcomes come back as the matching error; a failed pull-request
/// comment only produces a warning.
pub async fn run_action(
    config: &RunConfig,
    ci: &CiContext,
    runner: &dyn CliRunner,
    reporting: Option<Reporting<'_>>,
) -> Result<RunOutcome> {
    let outcome = RunOrchestrator::new(config, runner)
        .with_output_file(ci.output_path.as_deref())
        .execute()
        .await?
        .into_result()?;

    if let (RunOutcome::Completed { handle, .. }, Some(pr), Some(reporting)) =
        (&outcome, ci.pull_request(), reporting)
    {
        let reported = report::report_to_pull_request(
            reporting.platform,
            reporting.summaries,
            pr,
            &config.repository,
            &config.owner,
            &config.mayhem_url,
            handle,
        )
        .await;

        if let Err(e) = reported {
            tracing::warn!(error = %e, pr = pr.number, "Failed to report Mayhem results");
            commands::warning(&format!(
                "Failed to comment Mayhem results on the pull request: {e}"
            ));
        }
    }

    Ok(outcome)
}
