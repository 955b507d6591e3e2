//! Entry point for `syslog-sender`.
//!
//! Owns everything user-facing: logging setup, usage and error output, and
//! the final summary.  Sending is delegated to the library.

use anyhow::{Context, Result};
use syslog_sender::config::{self, Config, ConfigError, Mode};
use syslog_sender::{replay, Transport};

fn main() -> Result<()> {
    let config = match config::parse_config(std::env::args_os()) {
        Ok(config) => config,
        // clap prints its own message and picks the exit status.
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(ConfigError::FileNotFound(path)) => {
            eprintln!("ERROR: File [{}] not found", path.display());
            println!("{}", config::usage());
            return Ok(());
        }
        Err(ConfigError::NoInput) => {
            println!("{}", config::usage());
            return Ok(());
        }
    };

    init_logging(config.verbose);
    run(&config)
}

/// Initialise env_logger; `RUST_LOG` overrides the default filter.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn run(config: &Config) -> Result<()> {
    if config.lines_defaulted {
        log::warn!(
            "Cannot use wrap without line limit, setting line limit to {}",
            config.options.lines
        );
    }

    log::debug!("sending to {}", config.target);
    let mut transport = Transport::new(config.target.clone());

    match &config.mode {
        Mode::Single(message) => replay::send_single(&mut transport, message, config.options.raw),
        Mode::Replay(path) => {
            let report = replay::replay_file(&mut transport, path, &config.options)
                .with_context(|| format!("failed to replay {}", path.display()))?;
            eprintln!("{}", report.summary(path));
        }
    }

    let stats = transport.stats();
    if config.verbose {
        log::info!(
            "sent={} skipped={} failed={}",
            stats.sent,
            stats.skipped,
            stats.failed
        );
    } else if stats.skipped + stats.failed > 0 {
        log::warn!(
            "{} line(s) not delivered to {}",
            stats.skipped + stats.failed,
            config.target
        );
    }

    Ok(())
}
