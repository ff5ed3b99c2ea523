pub mod config;
pub mod error;
pub mod mayhem;
pub mod platform;
pub mod workflow;
