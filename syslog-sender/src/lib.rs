//! `syslog-sender` — emit syslog-formatted or raw lines to a TCP/UDP
//! listener, for testing log-ingestion endpoints.
//!
//! ```text
//!  args ──▶ config::parse_config ──▶ Config
//!                                      │
//!                     ┌────────────────┴────────────────┐
//!                     ▼                                 ▼
//!            replay::send_single               replay::replay_file
//!                     │                                 │
//!                     └──────────▶ Sink ◀───────────────┘
//!                                   │
//!                          transport::Transport
//!                         (lazy TCP/UDP socket)
//! ```
//!
//! - [`config`]    — clap CLI and validation, no side effects
//! - [`format`]    — syslog header / raw framing
//! - [`replay`]    — single-message and file-replay drivers
//! - [`transport`] — blocking socket with lazy connect and silent failure

pub mod config;
pub mod format;
pub mod replay;
pub mod transport;

pub use config::{parse_config, Config, ConfigError, Mode};
pub use replay::{replay, replay_file, send_single, ReplayOptions, ReplayReport};
pub use transport::{Protocol, SendStats, Sink, Target, Transport};
