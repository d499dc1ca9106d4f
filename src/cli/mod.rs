//! CLI module for postsource.
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing
//! - Version display
//! - The scrape command
//!
//! # Usage
//!
//! ```ignore
//! use postsource::cli::{parse_args, CliCommand};
//!
//! let command = parse_args(std::env::args(), std::env::var(ENV_ENDPOINT).ok());
//! if let CliCommand::Run(args) = command {
//!     let job = ScrapeJob::start(http, &args, std::io::stdout())?;
//!     std::process::exit(job.finish().await.exit_code());
//! }
//! ```

pub mod args;
pub mod scrape;
pub mod version;

pub use args::{parse_args, CliCommand, RunArgs, DEFAULT_ENDPOINT, ENV_ENDPOINT, USAGE};
pub use scrape::{JobStatus, ScrapeJob};
pub use version::{handle_version_command, version_line, VERSION};
