//! CLI module - argument parsing, run configuration and interactive prompts

mod args;
mod config;
mod prompts;

pub use args::Cli;
pub use config::*;
pub use prompts::*;
