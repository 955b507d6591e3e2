//! Single-message and file-replay drivers.
//!
//! Both drivers talk to a [`Sink`] and always close it before returning.
//! Replay streams the input line by line, optionally skipping a CSV header,
//! pausing between lines, and rewinding to the top in wrap mode until the
//! line limit is met.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crate::format::trim_line_ending;
use crate::transport::Sink;

/// Upper bound of `--delay`.
pub const MAX_DELAY: u16 = 1000;

/// Line limit applied when wrap is requested without one.
pub const WRAP_DEFAULT_LINES: u64 = 1000;

/// Per-line pause in microseconds for each unit of `delay`.
const DELAY_UNIT_MICROS: u64 = 100;

/// Replay policy knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Pause after each line, in tenths of a millisecond (0..=1000).
    pub delay: u16,
    /// Stop after this many lines in total; `0` means no limit.
    pub lines: u64,
    /// Skip the first line of every pass.
    pub csv: bool,
    /// Send lines without the syslog header.
    pub raw: bool,
    /// Rewind at end of input until `lines` is reached.
    pub wrap: bool,
}

impl ReplayOptions {
    /// Give wrap mode a finite line limit.
    ///
    /// Returns `true` when the limit was changed.
    pub fn normalize(&mut self) -> bool {
        if self.wrap && self.lines == 0 {
            self.lines = WRAP_DEFAULT_LINES;
            true
        } else {
            false
        }
    }

    /// Time to sleep after each sent line.
    pub fn pause(&self) -> Duration {
        Duration::from_micros(u64::from(self.delay) * DELAY_UNIT_MICROS)
    }
}

/// Outcome of a replay run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayReport {
    pub lines_sent: u64,
    pub elapsed: Duration,
}

impl ReplayReport {
    /// One-line summary printed after a replay, seconds to 4 decimals.
    pub fn summary(&self, path: &Path) -> String {
        format!(
            "Replayed [{}] lines from [{}] in [{:.4}] seconds",
            self.lines_sent,
            path.display(),
            self.elapsed.as_secs_f64()
        )
    }
}

/// Send exactly one message, then close the sink.
pub fn send_single<S: Sink + ?Sized>(sink: &mut S, message: &str, raw: bool) {
    sink.send(message, raw);
    sink.close();
}

/// Open `path` and replay it through `sink`.
pub fn replay_file<S: Sink + ?Sized>(
    sink: &mut S,
    path: &Path,
    options: &ReplayOptions,
) -> io::Result<ReplayReport> {
    let file = File::open(path)?;
    replay(sink, BufReader::new(file), options)
}

/// Replay every line of `input` through `sink` according to `options`.
///
/// The sink is closed even when reading fails part-way.
pub fn replay<S, R>(sink: &mut S, mut input: R, options: &ReplayOptions) -> io::Result<ReplayReport>
where
    S: Sink + ?Sized,
    R: BufRead + Seek,
{
    if options.wrap {
        log::info!("wrap enabled");
    }
    if options.raw {
        log::info!("sending raw line");
    }

    let started = Instant::now();
    let result = run_passes(sink, &mut input, options);
    sink.close();

    Ok(ReplayReport {
        lines_sent: result?,
        elapsed: started.elapsed(),
    })
}

fn run_passes<S, R>(sink: &mut S, input: &mut R, options: &ReplayOptions) -> io::Result<u64>
where
    S: Sink + ?Sized,
    R: BufRead + Seek,
{
    let pause = options.pause();
    let mut sent: u64 = 0;
    let mut buf = Vec::new();

    loop {
        input.rewind()?;

        if options.csv {
            buf.clear();
            input.read_until(b'\n', &mut buf)?;
        }

        let mut sent_this_pass: u64 = 0;
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }

            // Bytes that are not UTF-8 become U+FFFD instead of ending the run.
            let line = String::from_utf8_lossy(&buf);
            sink.send(trim_line_ending(&line), options.raw);
            if !pause.is_zero() {
                thread::sleep(pause);
            }
            sent += 1;
            sent_this_pass += 1;

            if sent == options.lines {
                return Ok(sent);
            }
        }

        if !options.wrap {
            return Ok(sent);
        }
        if sent_this_pass == 0 {
            log::warn!("input has no lines to send; not wrapping");
            return Ok(sent);
        }
        log::debug!("end of input after {sent} lines, rewinding");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Default)]
    struct RecordingSink {
        lines: Vec<(String, bool)>,
        closes: usize,
    }

    impl Sink for RecordingSink {
        fn send(&mut self, line: &str, raw: bool) {
            self.lines.push((line.to_string(), raw));
        }

        fn close(&mut self) {
            self.closes += 1;
        }
    }

    impl RecordingSink {
        fn texts(&self) -> Vec<&str> {
            self.lines.iter().map(|(l, _)| l.as_str()).collect()
        }
    }

    fn input(text: &str) -> Cursor<Vec<u8>> {
        Cursor::new(text.as_bytes().to_vec())
    }

    /// A reader that yields one line and then fails.
    struct FailingReader {
        inner: Cursor<Vec<u8>>,
    }

    impl io::Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
        }
    }

    impl BufRead for FailingReader {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            if self.inner.position() as usize >= self.inner.get_ref().len() {
                return Err(io::Error::new(io::ErrorKind::Other, "disk gone"));
            }
            self.inner.fill_buf()
        }

        fn consume(&mut self, amt: usize) {
            self.inner.consume(amt)
        }
    }

    impl Seek for FailingReader {
        fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn single_message_sends_once_and_closes() {
        let mut sink = RecordingSink::default();
        send_single(&mut sink, "hello", true);
        assert_eq!(sink.lines, vec![("hello".to_string(), true)]);
        assert_eq!(sink.closes, 1);
    }

    #[test]
    fn one_pass_sends_every_line() {
        let mut sink = RecordingSink::default();
        let report = replay(&mut sink, input("a\nb\nc\n"), &ReplayOptions::default()).unwrap();

        assert_eq!(report.lines_sent, 3);
        assert_eq!(sink.texts(), vec!["a", "b", "c"]);
        assert_eq!(sink.closes, 1);
    }

    #[test]
    fn last_line_without_newline_is_sent() {
        let mut sink = RecordingSink::default();
        replay(&mut sink, input("a\r\nb"), &ReplayOptions::default()).unwrap();
        assert_eq!(sink.texts(), vec!["a", "b"]);
    }

    #[test]
    fn csv_skips_header() {
        let mut sink = RecordingSink::default();
        let opts = ReplayOptions {
            csv: true,
            ..Default::default()
        };
        let report = replay(&mut sink, input("h1,h2\n1,2\n3,4\n"), &opts).unwrap();

        assert_eq!(report.lines_sent, 2);
        assert_eq!(sink.texts(), vec!["1,2", "3,4"]);
    }

    #[test]
    fn limit_stops_mid_file() {
        let mut sink = RecordingSink::default();
        let opts = ReplayOptions {
            lines: 2,
            ..Default::default()
        };
        let report = replay(&mut sink, input("a\nb\nc\nd\n"), &opts).unwrap();
        assert_eq!(report.lines_sent, 2);
        assert_eq!(sink.texts(), vec!["a", "b"]);
    }

    #[test]
    fn limit_above_file_length_without_wrap_sends_one_pass() {
        let mut sink = RecordingSink::default();
        let opts = ReplayOptions {
            lines: 10,
            ..Default::default()
        };
        let report = replay(&mut sink, input("a\nb\n"), &opts).unwrap();
        assert_eq!(report.lines_sent, 2);
    }

    #[test]
    fn wrap_loops_until_limit() {
        let mut sink = RecordingSink::default();
        let opts = ReplayOptions {
            lines: 5,
            wrap: true,
            ..Default::default()
        };
        let report = replay(&mut sink, input("x\ny\n"), &opts).unwrap();

        assert_eq!(report.lines_sent, 5);
        assert_eq!(sink.texts(), vec!["x", "y", "x", "y", "x"]);
        assert_eq!(sink.closes, 1);
    }

    #[test]
    fn wrap_with_csv_skips_header_every_pass() {
        let mut sink = RecordingSink::default();
        let opts = ReplayOptions {
            lines: 4,
            wrap: true,
            csv: true,
            ..Default::default()
        };
        replay(&mut sink, input("hdr\n1\n2\n"), &opts).unwrap();
        assert_eq!(sink.texts(), vec!["1", "2", "1", "2"]);
    }

    #[test]
    fn wrap_over_empty_input_terminates() {
        let mut sink = RecordingSink::default();
        let opts = ReplayOptions {
            lines: 5,
            wrap: true,
            ..Default::default()
        };
        let report = replay(&mut sink, input(""), &opts).unwrap();
        assert_eq!(report.lines_sent, 0);
        assert_eq!(sink.closes, 1);
    }

    #[test]
    fn wrap_over_header_only_csv_terminates() {
        let mut sink = RecordingSink::default();
        let opts = ReplayOptions {
            lines: 5,
            wrap: true,
            csv: true,
            ..Default::default()
        };
        let report = replay(&mut sink, input("only,header\n"), &opts).unwrap();
        assert_eq!(report.lines_sent, 0);
    }

    #[test]
    fn raw_flag_is_forwarded() {
        let mut sink = RecordingSink::default();
        let opts = ReplayOptions {
            raw: true,
            ..Default::default()
        };
        replay(&mut sink, input("a\n"), &opts).unwrap();
        assert_eq!(sink.lines, vec![("a".to_string(), true)]);
    }

    #[test]
    fn read_error_still_closes_sink() {
        let mut sink = RecordingSink::default();
        let reader = FailingReader {
            inner: Cursor::new(b"first\n".to_vec()),
        };
        let err = replay(&mut sink, reader, &ReplayOptions::default()).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(sink.texts(), vec!["first"]);
        assert_eq!(sink.closes, 1);
    }

    #[test]
    fn delay_slows_replay() {
        let mut sink = RecordingSink::default();
        let opts = ReplayOptions {
            delay: 100, // 10 ms per line
            ..Default::default()
        };
        let report = replay(&mut sink, input("a\nb\nc\n"), &opts).unwrap();
        assert!(report.elapsed >= Duration::from_millis(30), "{:?}", report.elapsed);
    }

    #[test]
    fn pause_is_tenth_of_a_millisecond_per_unit() {
        let opts = ReplayOptions {
            delay: MAX_DELAY,
            ..Default::default()
        };
        assert_eq!(opts.pause(), Duration::from_millis(100));
        assert_eq!(ReplayOptions::default().pause(), Duration::ZERO);
    }

    #[test]
    fn normalize_sets_wrap_default() {
        let mut opts = ReplayOptions {
            wrap: true,
            ..Default::default()
        };
        assert!(opts.normalize());
        assert_eq!(opts.lines, WRAP_DEFAULT_LINES);
        assert!(!opts.normalize());
    }

    #[test]
    fn normalize_keeps_explicit_limit_and_non_wrap() {
        let mut wrapped = ReplayOptions {
            wrap: true,
            lines: 7,
            ..Default::default()
        };
        assert!(!wrapped.normalize());
        assert_eq!(wrapped.lines, 7);

        let mut plain = ReplayOptions::default();
        assert!(!plain.normalize());
        assert_eq!(plain.lines, 0);
    }

    #[test]
    fn invalid_utf8_line_is_sent_lossily_and_replay_continues() {
        let mut sink = RecordingSink::default();
        let bytes = b"ok\nbad\xff\nlast\n".to_vec();
        let report = replay(&mut sink, Cursor::new(bytes), &ReplayOptions::default()).unwrap();

        assert_eq!(report.lines_sent, 3);
        assert_eq!(sink.texts(), vec!["ok", "bad\u{FFFD}", "last"]);
    }

    #[test]
    fn summary_rounds_to_four_decimals() {
        let report = ReplayReport {
            lines_sent: 42,
            elapsed: Duration::from_micros(1_234_567),
        };
        assert_eq!(
            report.summary(Path::new("in.log")),
            "Replayed [42] lines from [in.log] in [1.2346] seconds"
        );

        let instant = ReplayReport {
            lines_sent: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(
            instant.summary(Path::new("empty.log")),
            "Replayed [0] lines from [empty.log] in [0.0000] seconds"
        );
    }
}
