//! Line framing: syslog header or raw passthrough.
//!
//! Every framed line ends in exactly one `\n`; callers pass the message body
//! without its line terminator.

use chrono::{DateTime, Utc};

/// PRI (facility user, severity info) and syslog protocol version.
pub const SYSLOG_PRI_VERSION: &str = "<14>1";

/// HOSTNAME field written into every framed message.
pub const SENDER_NAME: &str = "PYTHON_TEST_SENDER";

/// Timestamp layout: ISO-8601, UTC, microsecond precision, no offset.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Frame `message` for the wire using the current time.
pub fn frame(message: &str, raw: bool) -> String {
    frame_at(message, raw, Utc::now())
}

/// Frame `message` with an explicit timestamp.
///
/// Non-raw: `<14>1 {timestamp}Z PYTHON_TEST_SENDER - - - - {message}\n`.
/// Raw: `{message}\n`.
pub fn frame_at(message: &str, raw: bool, now: DateTime<Utc>) -> String {
    if raw {
        format!("{message}\n")
    } else {
        format!(
            "{} {}Z {} - - - - {}\n",
            SYSLOG_PRI_VERSION,
            now.format(TIMESTAMP_FORMAT),
            SENDER_NAME,
            message
        )
    }
}

/// Strip one trailing `\n` or `\r\n` from a line read off disk.
pub fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
