pub mod client;
pub mod commands;
pub mod context;

pub use client::GitHubPlatform;
