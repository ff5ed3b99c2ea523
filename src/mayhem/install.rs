use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const BINARY: &str = "mayhem";
const VERSION: &str = "latest";
const OS: &str = "Linux";

/// Where the CLI lives in the runner tool cache.
pub fn cached_path(tool_cache: &Path) -> PathBuf {
    tool_cache.join(BINARY).join(VERSION).join(OS).join(BINARY)
}

pub fn download_url(mayhem_url: &str) -> String {
    format!("{}/cli/{OS}/{BINARY}", mayhem_url.trim_end_matches('/'))
}

/// Return a path to an executable Mayhem CLI, downloading it if needed.
pub async fn ensure_cli(mayhem_url: &str, tool_cache: &Path) -> Result<PathBuf> {
    let path = cached_path(tool_cache);
    if path.is_file() {
        tracing::debug!(path = %path.display(), "Found cached Mayhem CLI");
        return Ok(path);
    }

    let url = download_url(mayhem_url);
    tracing::info!(url = %url, "Downloading Mayhem CLI");

    let response = reqwest::get(&url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Install(format!("GET {url} returned {status}")));
    }
    let bytes = response.bytes().await?;

    install_bytes(&path, &bytes).await?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Installed Mayhem CLI");
    Ok(path)
}

/// Stage `bytes` next to `path`, make them executable, then move them into place.
///
/// A failed install removes the staged file, so `path` is either absent or complete.
async fn install_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let partial = path.with_extension("partial");
    let staged = stage(&partial, path, bytes).await;
    if staged.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    staged
}

async fn stage(partial: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| install_error("create", parent, e))?;
    }
    tokio::fs::write(partial, bytes)
        .await
        .map_err(|e| install_error("write", partial, e))?;
    make_executable(partial).await?;
    tokio::fs::rename(partial, path)
        .await
        .map_err(|e| install_error("move", path, e))
}

fn install_error(action: &str, path: &Path, e: std::io::Error) -> AppError {
    AppError::Install(format!("Failed to {action} {}: {e}", path.display()))
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| install_error("chmod", path, e))
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
