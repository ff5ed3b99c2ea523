//! GitHub Actions workflow commands.
//!
//! The runner interprets `::command::message` lines on stdout and reads step
//! outputs from the file named by `GITHUB_OUTPUT`.

use std::io::Write;
use std::path::Path;

use crate::error::{AppError, Result};

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

pub fn error_command(message: &str) -> String {
    format!("::error::{}", escape_data(message))
}

pub fn warning_command(message: &str) -> String {
    format!("::warning::{}", escape_data(message))
}

pub fn mask_command(secret: &str) -> String {
    format!("::add-mask::{}", escape_data(secret))
}

/// Mark the step failed with `message`.
pub fn set_failed(message: &str) {
    println!("{}", error_command(message));
}

pub fn warning(message: &str) {
    println!("{}", warning_command(message));
}

/// Ask the runner to redact `secret` from all logs.
pub fn add_mask(secret: &str) {
    if !secret.is_empty() {
        println!("{}", mask_command(secret));
    }
}

/// Publish a step output.
///
/// Appends a heredoc entry to `output_file`; without one, falls back to the
/// legacy `set-output` command.
pub fn set_output(output_file: Option<&Path>, name: &str, value: &str) -> Result<()> {
    match output_file {
        Some(path) => {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            file.write_all(output_entry(name, value)?.as_bytes())?;
        }
        None => println!(
            "::set-output name={}::{}",
            escape_property(name),
            escape_data(value)
        ),
    }
    Ok(())
}

fn output_entry(name: &str, value: &str) -> Result<String> {
    let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
    if name.contains(&delimiter) || value.contains(&delimiter) {
        return Err(AppError::Config(format!(
            "Output value for {name} contains the delimiter {delimiter}"
        )));
    }
    Ok(format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
}
