use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::mayhem::RunHandle;
use crate::platform::github::context::PullRequestPayload;
use crate::platform::Platform;

/// Run statistics shown in the pull-request comment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunSummary {
    pub n_defects: Option<u64>,
    pub tests_run: Option<u64>,
    pub cputime: Option<f64>,
    pub n_testcase_reports: Option<u64>,
    #[serde(default)]
    pub run_attributes: RunAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunAttributes {
    pub n_blocks_covered: Option<u64>,
    pub n_blocks_total: Option<u64>,
}

impl RunSummary {
    /// Dynamic block coverage in percent; NaN when unknown or no blocks exist.
    pub fn coverage(&self) -> f64 {
        match (
            self.run_attributes.n_blocks_covered,
            self.run_attributes.n_blocks_total,
        ) {
            (Some(covered), Some(total)) => coverage_percent(covered, total),
            _ => f64::NAN,
        }
    }
}

/// `covered * 100 / total`, or NaN for an empty target.
pub fn coverage_percent(covered: u64, total: u64) -> f64 {
    if total == 0 {
        return f64::NAN;
    }
    covered as f64 * 100.0 / total as f64
}

/// Source of run statistics for a finished run.
#[async_trait]
pub trait SummarySource: Send + Sync {
    async fn run_summary(&self, owner: &str, handle: &RunHandle) -> Result<RunSummary>;
}

/// Reads run statistics from the Mayhem REST API.
pub struct MayhemApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl MayhemApi {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn run_url(&self, owner: &str, handle: &RunHandle) -> String {
        format!(
            "{}/api/v2/namespace/{owner}/project/{}/target/{}/run/{}",
            self.base_url,
            handle.project(),
            handle.run_name(),
            handle.run_number()
        )
    }
}

#[async_trait]
impl SummarySource for MayhemApi {
    async fn run_summary(&self, owner: &str, handle: &RunHandle) -> Result<RunSummary> {
        let url = self.run_url(owner, handle);
        let response = self
            .client
            .get(&url)
            .header("X-Mayhem-Token", format!("token {}", self.token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::MayhemApi(format!(
                "GET {url} returned {status}: {body}"
            )));
        }

        Ok(response.json::<RunSummary>().await?)
    }
}

fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

fn short_sha(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}

/// Render the pull-request comment for a finished run.
pub fn render_comment(
    summary: &RunSummary,
    pr: &PullRequestPayload,
    mayhem_url: &str,
    repo: &str,
) -> String {
    let coverage = summary.coverage();
    let coverage = if coverage.is_nan() {
        "n/a".to_string()
    } else {
        format!("{coverage:.2}%")
    };

    format!(
        "# [Mayhem for Code]({mayhem_url}) Report :warning:\n\
         \n\
         Merging [#{number}]({html_url}) {head_ref} ({head_sha}) into {base_ref} ({base_sha})\n\
         \n\
         ## Active Defects: {defects} :x:\n\
         \n\
         ## Testing Iterations Performed: {tests_run} ({cputime} CPU seconds)\n\
         \n\
         ## Testing Inputs Stored: {inputs}\n\
         \n\
         ## Dynamic Block Coverage: {coverage}\n\
         \n\
         [Continue to view full report in Mayhem for Code]({mayhem_url}/{repo})\n",
        number = pr.number,
        html_url = pr.html_url,
        head_ref = pr.head.ref_name,
        head_sha = short_sha(&pr.head.sha),
        base_ref = pr.base.ref_name,
        base_sha = short_sha(&pr.base.sha),
        defects = or_unknown(summary.n_defects),
        tests_run = or_unknown(summary.tests_run),
        cputime = or_unknown(summary.cputime),
        inputs = or_unknown(summary.n_testcase_reports),
    )
}

/// Fetch the run summary and comment on the pull request.
pub async fn report_to_pull_request(
    platform: &dyn Platform,
    summaries: &dyn SummarySource,
    pr: &PullRequestPayload,
    repo: &str,
    owner: &str,
    mayhem_url: &str,
    handle: &RunHandle,
) -> Result<()> {
    let summary = summaries.run_summary(owner, handle).await?;
    let body = render_comment(&summary, pr, mayhem_url, repo);

    platform.post_comment(repo, pr.number, &body).await?;
    tracing::info!(pr = pr.number, run = %handle, "Posted Mayhem report comment");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::platform::github::context::PullRequestRef;

    fn pr() -> PullRequestPayload {
        PullRequestPayload {
            number: 7,
            html_url: "https://github.com/acme/widget/pull/7".into(),
            head: PullRequestRef {
                ref_name: "feature".into(),
                sha: "0123456789abcdef".into(),
            },
            base: PullRequestRef {
                ref_name: "main".into(),
                sha: "fedcba9876543210".into(),
            },
        }
    }

    fn summary() -> RunSummary {
        serde_json::from_str(
            r#"{
                "n_defects": 3,
                "tests_run": 12000,
                "cputime": 58,
                "n_testcase_reports": 41,
                "run_attributes": { "n_blocks_covered": 50, "n_blocks_total": 200 }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_coverage_percent() {
        assert_eq!(coverage_percent(50, 200), 25.0);
        assert!(coverage_percent(50, 0).is_nan());
        assert!(RunSummary::default().coverage().is_nan());
    }

    #[test]
    fn test_render_comment() {
        let body = render_comment(&summary(), &pr(), "https://mayhem.example", "acme/widget");
        assert!(body.starts_with(
            "# [Mayhem for Code](https://mayhem.example) Report :warning:\n"
        ));
        assert!(body.contains(
            "Merging [#7](https://github.com/acme/widget/pull/7) feature (01234567) into main (fedcba98)"
        ));
        assert!(body.contains("## Active Defects: 3 :x:"));
        assert!(body.contains(
            "## Testing Iterations Performed: 12000 (58 CPU seconds)"
        ));
        assert!(body.contains("## Testing Inputs Stored: 41"));
        assert!(body.contains("## Dynamic Block Coverage: 25.00%"));
        assert!(body.ends_with("(https://mayhem.example/acme/widget)\n"));
    }

    #[test]
    fn test_render_comment_without_blocks() {
        let mut s = summary();
        s.run_attributes.n_blocks_total = Some(0);
        s.n_defects = None;
        let body = render_comment(&s, &pr(), "u", "acme/widget");
        assert!(body.contains("## Dynamic Block Coverage: n/a"));
        assert!(body.contains("## Active Defects: unknown :x:"));
    }

    #[test]
    fn test_run_url() {
        let api = MayhemApi::new("https://mayhem.example/", "t");
        let handle = RunHandle::parse("widget/fuzzer/9").unwrap();
        assert_eq!(
            api.run_url("acme", &handle),
            "https://mayhem.example/api/v2/namespace/acme/project/widget/target/fuzzer/run/9"
        );
    }

    struct FixedSummary;

    #[async_trait]
    impl SummarySource for FixedSummary {
        async fn run_summary(&self, _owner: &str, _handle: &RunHandle) -> Result<RunSummary> {
            Ok(summary())
        }
    }

    #[derive(Default)]
    struct RecordingPlatform {
        comments: Mutex<Vec<(String, u64, String)>>,
    }

    #[async_trait]
    impl Platform for RecordingPlatform {
        async fn post_comment(&self, repo: &str, issue_number: u64, body: &str) -> Result<()> {
            self.comments
                .lock()
                .unwrap()
                .push((repo.to_string(), issue_number, body.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_report_posts_comment() {
        let platform = RecordingPlatform::default();
        let handle = RunHandle::parse("acme/widget/42").unwrap();

        report_to_pull_request(
            &platform,
            &FixedSummary,
            &pr(),
            "acme/widget",
            "acme",
            "u",
            &handle,
        )
        .await
        .unwrap();

        let comments = platform.comments.lock().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].0, "acme/widget");
        assert_eq!(comments[0].1, 7);
        assert!(comments[0].2.contains("Active Defects: 3"));
    }
}
