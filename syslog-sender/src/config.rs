//! Command-line configuration.
//!
//! [`parse_config`] turns an argument list into a [`Config`] without
//! printing or exiting; `main` decides what to show the user for each
//! [`ConfigError`].

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use thiserror::Error;

use crate::replay::{ReplayOptions, MAX_DELAY};
use crate::transport::{Protocol, Target, DEFAULT_PORT};

/// Send arbitrary syslog messages to a server over TCP or UDP.
///
/// Useful for exercising any input built on raw or syslog TCP/UDP.
#[derive(Parser, Debug, Clone)]
#[command(name = "syslog-sender", version, long_about = None)]
#[command(
    after_help = "You must provide either a message or an input file.\n\
                  When using -w/--wrap, -l/--lines cannot be 0; the line count defaults to 1000."
)]
pub struct Cli {
    /// The syslog server
    #[arg(short, long, default_value = "localhost")]
    pub server: String,

    /// The syslog port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Send using UDP rather than TCP
    #[arg(short, long)]
    pub udp: bool,

    /// Delay after each line of a file, in tenths of a millisecond
    #[arg(
        short,
        long,
        default_value_t = 0,
        value_name = "0-1000",
        value_parser = clap::value_parser!(u16).range(0..=i64::from(MAX_DELAY))
    )]
    pub delay: u16,

    /// Limit the number of lines to transmit (0 = no limit)
    #[arg(short, long, default_value_t = 0)]
    pub lines: u64,

    /// Skip the first line of the file (CSV header)
    #[arg(short, long)]
    pub csv: bool,

    /// Send lines without syslog formatting, for raw TCP/UDP inputs
    #[arg(short, long)]
    pub raw: bool,

    /// Restart the file from the beginning until the line limit is met
    #[arg(short, long)]
    pub wrap: bool,

    /// The message to send (quote it if it contains spaces)
    #[arg(short, long, conflicts_with = "file")]
    pub message: Option<String>,

    /// A newline-delimited file of messages to send
    #[arg(short, long, conflicts_with = "message")]
    pub file: Option<PathBuf>,

    /// Debug logging and a per-run send summary
    #[arg(short, long)]
    pub verbose: bool,
}

/// What the run does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Single(String),
    Replay(PathBuf),
}

/// Validated run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub target: Target,
    pub mode: Mode,
    pub options: ReplayOptions,
    pub verbose: bool,
    /// Set when wrap was requested without a limit and the default was applied.
    pub lines_defaulted: bool,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    /// Bad flags, out-of-range values, `--help` or `--version`.
    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("File [{}] not found", .0.display())]
    FileNotFound(PathBuf),

    #[error("either a message or an input file is required")]
    NoInput,
}

impl Config {
    /// Validate parsed flags.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        if let Some(path) = &cli.file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
        }

        let mut options = ReplayOptions {
            delay: cli.delay,
            lines: cli.lines,
            csv: cli.csv,
            raw: cli.raw,
            wrap: cli.wrap,
        };
        let lines_defaulted = options.normalize();

        let mode = match (cli.message, cli.file) {
            (Some(message), _) if !message.is_empty() => Mode::Single(message),
            (_, Some(path)) => Mode::Replay(path),
            _ => return Err(ConfigError::NoInput),
        };

        let protocol = if cli.udp { Protocol::Udp } else { Protocol::Tcp };

        Ok(Self {
            target: Target::new(cli.server, cli.port, protocol),
            mode,
            options,
            verbose: cli.verbose,
            lines_defaulted,
        })
    }
}

/// Parse and validate an argument list (first element is the program name).
pub fn parse_config<I, T>(args: I) -> Result<Config, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    Config::from_cli(cli)
}

/// Rendered `--help` text.
pub fn usage() -> String {
    Cli::command().render_help().to_string()
}
