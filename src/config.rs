use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::platform::github::context::{CiContext, Provenance};

const DEFAULT_MAYHEM_URL: &str = "https://mayhem.forallsecure.com";
const DEFAULT_IMAGE: &str = "forallsecure/debian-buster:latest";
const DEFAULT_DURATION: &str = "60";
const DEFAULT_MAYHEMFILE: &str = "Mayhemfile";

/// Raw action inputs, as declared in `action.yml`.
///
/// GitHub passes each input as an `INPUT_<NAME>` environment variable; an
/// optional file with the same keys sits underneath.
#[derive(Deserialize, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ActionInputs {
    pub mayhem_url: Option<String>,
    pub github_token: Option<String>,
    pub mayhem_token: Option<String>,
    pub package: Option<String>,
    pub sarif_output: Option<String>,
    pub junit_output: Option<String>,
    pub coverage_output: Option<String>,
    pub fail_on_defects: Option<String>,
    pub verbosity: Option<String>,
    pub owner: Option<String>,
    pub project: Option<String>,
    pub args: Option<String>,
}

// Manual Debug impl to avoid leaking tokens
impl fmt::Debug for ActionInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionInputs")
            .field("mayhem_url", &self.mayhem_url)
            .field("github_token", &redacted(&self.github_token))
            .field("mayhem_token", &redacted(&self.mayhem_token))
            .field("package", &self.package)
            .field("sarif_output", &self.sarif_output)
            .field("junit_output", &self.junit_output)
            .field("coverage_output", &self.coverage_output)
            .field("fail_on_defects", &self.fail_on_defects)
            .field("verbosity", &self.verbosity)
            .field("owner", &self.owner)
            .field("project", &self.project)
            .field("args", &self.args)
            .finish()
    }
}

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "[REDACTED]")
}

impl ActionInputs {
    /// Load inputs from an optional file and the `INPUT_*` environment.
    ///
    /// `env` replaces the process environment when given.
    pub fn load(config_path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(config::Environment::with_prefix("INPUT").source(env));

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }
}

/// CLI log level passed through `--verbosity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Info,
    Debug,
    Other(String),
}

impl Verbosity {
    pub fn parse(value: &str) -> Self {
        match value {
            "quiet" => Verbosity::Quiet,
            "info" => Verbosity::Info,
            "debug" => Verbosity::Debug,
            other => Verbosity::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
            Verbosity::Other(s) => s,
        }
    }

    /// Default tracing filter matching this verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Debug => "debug",
            _ => "info",
        }
    }
}

/// Fully resolved parameters for one action execution.
#[derive(Clone)]
pub struct RunConfig {
    pub mayhem_url: String,
    pub github_token: String,
    pub api_token: String,
    /// Raw `owner/name` repository identity.
    pub repository: String,
    pub owner: String,
    pub project: String,
    pub package_path: String,
    pub mayhemfile: PathBuf,
    pub sarif_output_dir: Option<PathBuf>,
    pub junit_output_dir: Option<PathBuf>,
    pub coverage_output_dir: Option<PathBuf>,
    pub fail_on_defects: bool,
    pub verbosity: Verbosity,
    pub provenance: Provenance,
    pub extra_args: Vec<String>,
}

// Manual Debug impl to avoid leaking tokens
impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("mayhem_url", &self.mayhem_url)
            .field("github_token", &"[REDACTED]")
            .field("api_token", &"[REDACTED]")
            .field("repository", &self.repository)
            .field("owner", &self.owner)
            .field("project", &self.project)
            .field("package_path", &self.package_path)
            .field("mayhemfile", &self.mayhemfile)
            .field("sarif_output_dir", &self.sarif_output_dir)
            .field("junit_output_dir", &self.junit_output_dir)
            .field("coverage_output_dir", &self.coverage_output_dir)
            .field("fail_on_defects", &self.fail_on_defects)
            .field("verbosity", &self.verbosity)
            .field("provenance", &self.provenance)
            .field("extra_args", &self.extra_args)
            .finish()
    }
}

impl RunConfig {
    /// Resolve inputs and CI context into a run configuration.
    pub fn resolve(inputs: ActionInputs, ci: &CiContext) -> Result<Self> {
        let repository = ci.repository.clone().ok_or_else(|| {
            AppError::Config(
                "Missing GITHUB_REPOSITORY environment variable. Are you not running this in a Github Action environment?"
                    .to_string(),
            )
        })?;

        let github_token = non_empty(inputs.github_token).ok_or_else(|| {
            AppError::Config("Input required and not supplied: github-token".to_string())
        })?;
        let api_token = non_empty(inputs.mayhem_token).unwrap_or_else(|| github_token.clone());

        let account = repository
            .split('/')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        let owner = non_empty(inputs.owner).unwrap_or(account);
        if owner.is_empty() {
            return Err(AppError::Config(format!(
                "Unable to determine owner from repository '{repository}'"
            )));
        }
        let project = non_empty(inputs.project).unwrap_or_else(|| repository.to_lowercase());

        let fail_on_defects = match non_empty(inputs.fail_on_defects) {
            Some(value) => parse_bool("fail-on-defects", &value)?,
            None => false,
        };

        let mut extra_args: Vec<String> = inputs
            .args
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        inject_default(&mut extra_args, "--duration", DEFAULT_DURATION);
        inject_default(&mut extra_args, "--image", DEFAULT_IMAGE);

        // `run <package>` reads `<package>/Mayhemfile` unless `--file` says otherwise.
        let package_path = non_empty(inputs.package).unwrap_or_else(|| ".".to_string());
        let mayhemfile = match flag_value(&extra_args, "--file") {
            Some(file) => PathBuf::from(file),
            None => Path::new(&package_path).join(DEFAULT_MAYHEMFILE),
        };
        let verbosity = non_empty(inputs.verbosity).unwrap_or_else(|| "info".to_string());

        let provenance = ci.provenance(&repository);

        Ok(Self {
            mayhem_url: non_empty(inputs.mayhem_url)
                .unwrap_or_else(|| DEFAULT_MAYHEM_URL.to_string()),
            github_token,
            api_token,
            owner,
            project,
            package_path,
            mayhemfile,
            sarif_output_dir: non_empty(inputs.sarif_output).map(PathBuf::from),
            junit_output_dir: non_empty(inputs.junit_output).map(PathBuf::from),
            coverage_output_dir: non_empty(inputs.coverage_output).map(PathBuf::from),
            fail_on_defects,
            verbosity: Verbosity::parse(&verbosity),
            provenance,
            extra_args,
            repository,
        })
    }

    /// Whether any synchronous result was requested, i.e. `wait` must run.
    pub fn wants_wait(&self) -> bool {
        self.sarif_output_dir.is_some()
            || self.junit_output_dir.is_some()
            || self.coverage_output_dir.is_some()
            || self.fail_on_defects
    }

    /// Output directories that must exist before the CLI writes into them.
    pub fn output_dirs(&self) -> impl Iterator<Item = &Path> {
        [
            &self.sarif_output_dir,
            &self.junit_output_dir,
            &self.coverage_output_dir,
        ]
        .into_iter()
        .filter_map(|d| d.as_deref())
    }

    /// Environment handed to every CLI invocation.
    pub fn cli_env(&self) -> Vec<(String, String)> {
        vec![
            ("MAYHEM_TOKEN".to_string(), self.api_token.clone()),
            ("MAYHEM_URL".to_string(), self.mayhem_url.clone()),
            ("MAYHEM_PROJECT".to_string(), self.repository.clone()),
            ("SKIP_MAPI_AUTO_UPDATE".to_string(), "true".to_string()),
        ]
    }
}

/// Append `flag value` unless the flag is already present.
pub fn inject_default(args: &mut Vec<String>, flag: &str, value: &str) {
    if !args.iter().any(|a| a == flag) {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a boolean input using the YAML 1.2 core schema tokens Actions accepts.
pub fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "True" | "TRUE" => Ok(true),
        "false" | "False" | "FALSE" => Ok(false),
        _ => Err(AppError::Config(format!(
            "Input does not meet YAML 1.2 \"Core Schema\" specification: {name}. Support boolean input list: `true | True | TRUE | false | False | FALSE`"
        ))),
    }
}
