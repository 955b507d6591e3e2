//! Outbound TCP/UDP transport.
//!
//! A [`Transport`] owns at most one blocking socket to a fixed [`Target`].
//! The socket is opened lazily on the first [`Transport::send`], reused for
//! every later line, and dropped on [`Transport::close`] or on the first
//! write error.  Failures never propagate: they are logged and counted in
//! [`SendStats`], and the next send reconnects.

use std::fmt;
use std::io::{self, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};

use crate::format;

/// Default syslog port.
pub const DEFAULT_PORT: u16 = 514;

/// Transport-layer protocol used to reach the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// Where lines are sent.  Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub server: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl Target {
    pub fn new(server: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            server: server.into(),
            port,
            protocol,
        }
    }

    /// Resolve to every candidate address (IPv4 and IPv6), in resolver order.
    pub fn resolve(&self) -> io::Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (self.server.as_str(), self.port).to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses for {}", self),
            ));
        }
        Ok(addrs)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.server, self.port)
    }
}

/// Counters describing what happened to each line handed to the transport.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SendStats {
    /// Lines fully written to the socket.
    pub sent: u64,
    /// Lines dropped because no connection could be established.
    pub skipped: u64,
    /// Lines whose write failed; the socket was closed afterwards.
    pub failed: u64,
}

/// Anything that accepts framed lines.  [`Transport`] is the real one; the
/// replay driver only depends on this trait.
pub trait Sink {
    /// Deliver `line`, framed as syslog unless `raw`.  Never fails loudly.
    fn send(&mut self, line: &str, raw: bool);

    /// Release any held resources.  Must be safe to call repeatedly.
    fn close(&mut self);
}

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

/// An open socket of either protocol.
#[derive(Debug)]
enum Conn {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

impl Conn {
    fn open(addr: SocketAddr, protocol: Protocol) -> io::Result<Self> {
        match protocol {
            Protocol::Tcp => Ok(Conn::Tcp(TcpStream::connect(addr)?)),
            Protocol::Udp => {
                let local = if addr.is_ipv4() {
                    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
                } else {
                    SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
                };
                let socket = UdpSocket::bind(local)?;
                socket.connect(addr)?;
                Ok(Conn::Udp(socket))
            }
        }
    }

    fn write_line(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            Conn::Tcp(stream) => {
                stream.write_all(bytes)?;
                stream.flush()
            }
            Conn::Udp(socket) => {
                let n = socket.send(bytes)?;
                if n != bytes.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("short datagram: {n} of {} bytes", bytes.len()),
                    ));
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
enum Link {
    Disconnected,
    Connected(Conn),
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Lazily-connected, single-socket sender for one [`Target`].
///
/// Connection problems are logged at `debug` only; callers that want to
/// surface them read [`Transport::stats`] once at the end of a run.
#[derive(Debug)]
pub struct Transport {
    target: Target,
    link: Link,
    stats: SendStats,
}

impl Transport {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            link: Link::Disconnected,
            stats: SendStats::default(),
        }
    }

    pub fn stats(&self) -> SendStats {
        self.stats
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.link, Link::Connected(_))
    }

    /// Open the socket if it is not already open.
    ///
    /// Tries each resolved address in order and keeps the first one that
    /// connects.  Returns `false` when resolution fails or every candidate
    /// is refused.
    pub fn connect(&mut self) -> bool {
        self.conn().is_some()
    }

    /// The live connection, opened on demand.
    fn conn(&mut self) -> Option<&mut Conn> {
        if let Link::Disconnected = self.link {
            self.link = Link::Connected(self.open()?);
        }
        match &mut self.link {
            Link::Connected(conn) => Some(conn),
            Link::Disconnected => None,
        }
    }

    fn open(&self) -> Option<Conn> {
        let addrs = match self.target.resolve() {
            Ok(addrs) => addrs,
            Err(e) => {
                log::debug!("cannot resolve {}: {e}", self.target);
                return None;
            }
        };

        for addr in addrs {
            match Conn::open(addr, self.target.protocol) {
                Ok(conn) => {
                    log::debug!("connected to {addr} ({})", self.target.protocol);
                    return Some(conn);
                }
                Err(e) => log::debug!("connect to {addr} failed: {e}"),
            }
        }

        log::debug!("could not connect to {}", self.target);
        None
    }

    /// Frame and write one line, connecting first if needed.
    ///
    /// A line that cannot be delivered is dropped and counted; a write error
    /// closes the socket so the next call starts from a fresh connection.
    pub fn send(&mut self, line: &str, raw: bool) {
        let framed = format::frame(line, raw);

        let Some(conn) = self.conn() else {
            self.stats.skipped += 1;
            return;
        };

        match conn.write_line(framed.as_bytes()) {
            Ok(()) => self.stats.sent += 1,
            Err(e) => {
                log::debug!("send to {} failed: {e}; closing", self.target);
                self.stats.failed += 1;
                self.close();
            }
        }
    }

    /// Drop the socket if one is open.
    pub fn close(&mut self) {
        if let Link::Connected(_) = std::mem::replace(&mut self.link, Link::Disconnected) {
            log::debug!("closed connection to {}", self.target);
        }
    }
}

impl Sink for Transport {
    fn send(&mut self, line: &str, raw: bool) {
        Transport::send(self, line, raw)
    }

    fn close(&mut self) {
        Transport::close(self)
    }
}
