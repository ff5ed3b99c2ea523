use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_EVENT_PATH: &str = "event.json";

/// The subset of the triggering event payload that the action reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    pub pull_request: Option<PullRequestPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    #[serde(default)]
    pub html_url: String,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

/// Everything the action reads from the GitHub Actions runner environment.
#[derive(Debug, Clone, Default)]
pub struct CiContext {
    /// `owner/name` identity of the repository being scanned.
    pub repository: Option<String>,
    pub server_url: Option<String>,
    pub run_id: Option<String>,
    pub ref_name: Option<String>,
    pub sha: Option<String>,
    /// File that step outputs are appended to (`GITHUB_OUTPUT`).
    pub output_path: Option<PathBuf>,
    pub tool_cache: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub event: EventPayload,
}

/// Commit attribution passed to the scanner on `run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub ci_url: String,
    pub branch_name: String,
    pub revision: String,
    pub merge_base_branch_name: String,
}

impl CiContext {
    /// Read the context from the process environment.
    pub fn from_env() -> Self {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build the context from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let event_path = get("GITHUB_EVENT_PATH").unwrap_or_else(|| DEFAULT_EVENT_PATH.to_string());
        let event = read_event(Path::new(&event_path));

        Self {
            repository: get("GITHUB_REPOSITORY"),
            server_url: get("GITHUB_SERVER_URL"),
            run_id: get("GITHUB_RUN_ID"),
            ref_name: get("GITHUB_REF_NAME"),
            sha: get("GITHUB_SHA"),
            output_path: get("GITHUB_OUTPUT").map(PathBuf::from),
            tool_cache: get("RUNNER_TOOL_CACHE").map(PathBuf::from),
            temp_dir: get("RUNNER_TEMP").map(PathBuf::from),
            event,
        }
    }

    pub fn pull_request(&self) -> Option<&PullRequestPayload> {
        self.event.pull_request.as_ref()
    }

    /// Derive branch/commit attribution for `repo`.
    ///
    /// Each field prefers the pull-request event, then the push environment,
    /// then a fixed literal.
    pub fn provenance(&self, repo: &str) -> Provenance {
        let pr = self.pull_request();

        let ci_url = format!(
            "{}:443/{repo}/actions/runs/{}",
            self.server_url.as_deref().unwrap_or_default(),
            self.run_id.as_deref().unwrap_or_default()
        );

        let branch_name = match pr {
            Some(pr) => pr.head.ref_name.clone(),
            None => self
                .ref_name
                .as_deref()
                .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r))
                .filter(|r| !r.is_empty())
                .unwrap_or("main")
                .to_string(),
        };

        let revision = match pr {
            Some(pr) => pr.head.sha.clone(),
            None => self.sha.clone().unwrap_or_else(|| "unknown".to_string()),
        };

        let merge_base_branch_name = match pr {
            Some(pr) => pr.base.ref_name.clone(),
            None => "main".to_string(),
        };

        Provenance {
            ci_url,
            branch_name,
            revision,
            merge_base_branch_name,
        }
    }
}

fn read_event(path: &Path) -> EventPayload {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No event payload, assuming push");
            return EventPayload::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to parse event payload");
            EventPayload::default()
        }
    }
}
