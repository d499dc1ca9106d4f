//! Command-line argument parsing for postsource.
//!
//! This module handles parsing command-line arguments and determining
//! which CLI command to execute.

/// Environment variable overriding the default job endpoint.
pub const ENV_ENDPOINT: &str = "POSTSOURCE_ENDPOINT";

/// Job endpoint used when neither `--endpoint` nor the environment sets one.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/stream";

/// Usage text printed for `--help` and argument errors.
pub const USAGE: &str = "\
Usage: postsource [OPTIONS] <PAGE_URL>

Stream a scrape job for PAGE_URL and print its progress.

Options:
  -e, --endpoint <URL>  Job endpoint (env: POSTSOURCE_ENDPOINT)
  -v, --verbose         Increase log verbosity (repeatable)
  -V, --version         Print version
  -h, --help            Print help";

/// Options for a scrape run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// URL of the streaming job endpoint
    pub endpoint: String,
    /// Page to scrape
    pub page_url: String,
    /// Number of `-v` flags
    pub verbosity: u8,
}

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Stream a scrape job
    Run(RunArgs),
    /// Arguments could not be parsed
    Invalid(String),
}

/// Parse command-line arguments and return the appropriate command.
///
/// `env_endpoint` is the value of `POSTSOURCE_ENDPOINT`, if set.
///
/// # Examples
///
/// ```
/// use postsource::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["postsource".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter(), None), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I, env_endpoint: Option<String>) -> CliCommand
where
    I: Iterator<Item = String>,
{
    let mut endpoint = None;
    let mut page_url = None;
    let mut verbosity: u8 = 0;

    // Skip the program name
    let mut args = args.skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            "--help" | "-h" => return CliCommand::Help,
            "--endpoint" | "-e" => match args.next() {
                Some(value) => endpoint = Some(value),
                None => return CliCommand::Invalid(format!("{} requires a value", arg)),
            },
            "--verbose" => verbosity = verbosity.saturating_add(1),
            _ if arg.starts_with("--endpoint=") => {
                endpoint = Some(arg["--endpoint=".len()..].to_string());
            }
            _ if is_verbose_cluster(&arg) => {
                verbosity = verbosity.saturating_add((arg.len() - 1) as u8);
            }
            _ if arg.starts_with('-') => {
                return CliCommand::Invalid(format!("unknown option '{}'", arg));
            }
            _ => {
                if page_url.is_some() {
                    return CliCommand::Invalid(format!("unexpected argument '{}'", arg));
                }
                page_url = Some(arg);
            }
        }
    }

    let Some(page_url) = page_url else {
        return CliCommand::Invalid("missing <PAGE_URL>".to_string());
    };

    let endpoint = endpoint
        .or(env_endpoint.filter(|value| !value.is_empty()))
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    CliCommand::Run(RunArgs {
        endpoint,
        page_url,
        verbosity,
    })
}

/// `-v`, `-vv`, `-vvv`, ...
fn is_verbose_cluster(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('-') && arg[1..].chars().all(|c| c == 'v')
}
