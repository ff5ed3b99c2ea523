use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("The Mayhem for Code scan was unable to execute the Mayhem run for your target. Check your configuration. For package visibility/permissions issues, see https://docs.github.com/en/packages/learn-github-packages/configuring-a-packages-access-control-and-visibility on how to set your package to 'Public'. ({0})")]
    Schedule(String),

    #[error("Waiting on the Mayhem run failed: {0}")]
    Wait(String),

    #[error("The Mayhem for Code scan detected the Mayhem run for your target was unsuccessful (status: {0})")]
    ScanFailed(String),

    #[error("Downloading coverage for the Mayhem run failed: {0}")]
    Download(String),

    #[error("Mayhem CLI installation failed: {0}")]
    Install(String),

    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    #[error("Mayhem API error: {0}")]
    MayhemApi(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Process exit code reported to the calling workflow.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Schedule(_) => 1,
            AppError::ScanFailed(_) => 2,
            AppError::Wait(_) => 3,
            AppError::Download(_) => 4,
            AppError::Config(_) => 5,
            AppError::Install(_)
            | AppError::GitHubApi(_)
            | AppError::MayhemApi(_)
            | AppError::Serialization(_)
            | AppError::Http(_)
            | AppError::Io(_) => 6,
        }
    }
}

impl From<octocrab::Error> for AppError {
    fn from(e: octocrab::Error) -> Self {
        AppError::GitHubApi(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
