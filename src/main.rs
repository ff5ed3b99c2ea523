use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mcode_action::config::{ActionInputs, RunConfig, Verbosity};
use mcode_action::error::AppError;
use mcode_action::mayhem::{install, CliProcess};
use mcode_action::platform::github::commands;
use mcode_action::platform::github::context::CiContext;
use mcode_action::platform::github::GitHubPlatform;
use mcode_action::workflow::{self, MayhemApi, Reporting};

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "mcode-action", about = "Run Mayhem for Code from a GitHub Actions job")]
struct Cli {
    /// Path to an inputs file layered under the INPUT_* environment
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use this Mayhem CLI instead of downloading one
    #[arg(long)]
    cli: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat, default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);
    let fmt_layer = tracing_subscriber::fmt::layer();

    match format {
        LogFormat::Text => registry.with(fmt_layer).init(),
        LogFormat::Json => registry.with(fmt_layer.json()).init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let inputs = ActionInputs::load(cli.config.as_deref(), None);
    let verbosity = inputs
        .as_ref()
        .ok()
        .and_then(|i| i.verbosity.as_deref())
        .map(|v| Verbosity::parse(v.trim()))
        .unwrap_or(Verbosity::Info);
    init_tracing(cli.log_format, verbosity.log_filter());

    let result = match inputs {
        Ok(inputs) => run(&cli, inputs).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e
                .downcast_ref::<AppError>()
                .map(AppError::exit_code)
                .unwrap_or(6);
            tracing::info!("mcode action failed with: {e:#}");
            commands::set_failed(&format!("{e:#}"));
            ExitCode::from(code as u8)
        }
    }
}

async fn run(cli: &Cli, inputs: ActionInputs) -> anyhow::Result<()> {
    let ci = CiContext::from_env();
    let config = RunConfig::resolve(inputs, &ci)?;

    commands::add_mask(&config.github_token);
    commands::add_mask(&config.api_token);
    tracing::debug!(config = ?config, "Resolved run configuration");

    let binary = match &cli.cli {
        Some(path) => path.clone(),
        None => {
            let cache = ci
                .tool_cache
                .clone()
                .or_else(|| ci.temp_dir.clone())
                .unwrap_or_else(std::env::temp_dir);
            install::ensure_cli(&config.mayhem_url, &cache).await?
        }
    };
    let runner = CliProcess::new(binary, config.cli_env());

    let platform = GitHubPlatform::new(&config.github_token)?;
    let summaries = MayhemApi::new(&config.mayhem_url, &config.api_token);
    let reporting = Reporting {
        platform: &platform,
        summaries: &summaries,
    };

    let outcome = workflow::run_action(&config, &ci, &runner, Some(reporting)).await?;
    tracing::info!(outcome = ?outcome, "Mayhem for Code action finished");

    Ok(())
}
