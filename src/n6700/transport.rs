use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use log::{debug, warn};

use crate::error::N6700Error;

/// Line-oriented SCPI session.
///
/// One request in flight at a time: `query` blocks until the reply line
/// arrives. Timeouts, if any, belong to the implementation.
pub trait ScpiTransport {
    /// Send one command line.
    fn write(&mut self, command: &str) -> Result<(), N6700Error>;

    /// Send one query line and return the reply line.
    fn query(&mut self, command: &str) -> Result<String, N6700Error>;
}

impl<T: ScpiTransport + ?Sized> ScpiTransport for Box<T> {
    fn write(&mut self, command: &str) -> Result<(), N6700Error> {
        (**self).write(command)
    }

    fn query(&mut self, command: &str) -> Result<String, N6700Error> {
        (**self).query(command)
    }
}

impl<T: ScpiTransport + ?Sized> ScpiTransport for &mut T {
    fn write(&mut self, command: &str) -> Result<(), N6700Error> {
        (**self).write(command)
    }

    fn query(&mut self, command: &str) -> Result<String, N6700Error> {
        (**self).query(command)
    }
}

/// Timeouts for the raw-socket transport.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use agilent_n6700::ConnectionConfig;
///
/// let config = ConnectionConfig {
///     read_timeout: Duration::from_secs(30),
///     ..ConnectionConfig::default()
/// };
/// assert_eq!(config.connect_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for establishing the TCP connection
    pub connect_timeout: Duration,
    /// Timeout for reading a reply line
    pub read_timeout: Duration,
    /// Timeout for writing a command line
    pub write_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// Default SCPI raw-socket port of the mainframe's LAN interface.
pub const DEFAULT_SCPI_PORT: u16 = 5025;

/// Builder for [`TcpTransport`].
///
/// ```no_run
/// use std::time::Duration;
/// use agilent_n6700::TcpTransport;
///
/// let transport = TcpTransport::builder()
///     .address("192.168.1.108")
///     .read_timeout(Duration::from_secs(20))
///     .build()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Default)]
pub struct TcpTransportBuilder {
    address: Option<String>,
    port: Option<u16>,
    config: ConnectionConfig,
}

impl TcpTransportBuilder {
    pub fn address(mut self, addr: &str) -> Self {
        self.address = Some(addr.to_string());
        self
    }

    /// Defaults to [`DEFAULT_SCPI_PORT`].
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<TcpTransport, N6700Error> {
        let address = self
            .address
            .ok_or_else(|| {
                N6700Error::InvalidCommand("Address must be specified".to_string())
            })?;
        let port = self.port.unwrap_or(DEFAULT_SCPI_PORT);

        let socket_addr: SocketAddr = format!("{address}:{port}")
            .parse()
            .map_err(|_| N6700Error::InvalidAddress(address.clone()))?;

        debug!("Connecting to N6700 at {socket_addr}");

        let stream = TcpStream::connect_timeout(&socket_addr, self.config.connect_timeout)
            .map_err(|e| {
                warn!("Failed to connect to {socket_addr}: {e}");
                if e.kind() == std::io::ErrorKind::TimedOut {
                    N6700Error::Timeout
                } else {
                    N6700Error::Io {
                        source: e,
                        context: format!("Failed to connect to {socket_addr}"),
                    }
                }
            })?;

        stream.set_read_timeout(Some(self.config.read_timeout))?;
        stream.set_write_timeout(Some(self.config.write_timeout))?;
        stream.set_nodelay(true)?;

        debug!("Successfully connected to N6700");

        Ok(TcpTransport {
            reader: BufReader::new(stream),
            config: self.config,
        })
    }
}

/// SCPI over a raw TCP socket, newline terminated.
pub struct TcpTransport {
    reader: BufReader<TcpStream>,
    config: ConnectionConfig,
}

impl TcpTransport {
    pub fn new(addr: &str, port: u16) -> Result<Self, N6700Error> {
        Self::builder().address(addr).port(port).build()
    }

    pub fn builder() -> TcpTransportBuilder {
        TcpTransportBuilder::default()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

impl ScpiTransport for TcpTransport {
    fn write(&mut self, command: &str) -> Result<(), N6700Error> {
        let stream = self.reader.get_mut();
        stream
            .write_all(command.as_bytes())
            .and_then(|_| stream.write_all(b"\n"))
            .and_then(|_| stream.flush())
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                    N6700Error::Timeout
                }
                _ => N6700Error::Io {
                    source: e,
                    context: format!("Writing {command}"),
                },
            })
    }

    fn query(&mut self, command: &str) -> Result<String, N6700Error> {
        self.write(command)?;
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => N6700Error::Timeout,
            _ => N6700Error::Io {
                source: e,
                context: format!("Reading reply to {command}"),
            },
        })?;
        if read == 0 {
            return Err(N6700Error::Protocol(format!(
                "Connection closed while waiting for reply to {command}"
            )));
        }
        Ok(line.trim_end().to_string())
    }
}

/// In-memory transport that records traffic and serves scripted replies.
///
/// Replies are matched on the exact query text. A query can be scripted
/// with a fixed reply (served every time) or with a queue of one-shot
/// replies (served first, in order).
#[derive(Debug, Default)]
pub struct MockTransport {
    writes: Vec<String>,
    queries: Vec<String>,
    fixed: HashMap<String, String>,
    queued: HashMap<String, VecDeque<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `reply` every time `query` is asked.
    pub fn with_reply(mut self, query: &str, reply: &str) -> Self {
        self.set_reply(query, reply);
        self
    }

    pub fn set_reply(&mut self, query: &str, reply: &str) {
        self.fixed.insert(query.to_string(), reply.to_string());
    }

    /// Serve `reply` once, before any fixed reply.
    pub fn push_reply(&mut self, query: &str, reply: &str) {
        self.queued
            .entry(query.to_string())
            .or_default()
            .push_back(reply.to_string());
    }

    /// Every command line written, in order (queries excluded).
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    /// Every query line sent, in order.
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
        self.queries.clear();
    }
}

impl ScpiTransport for MockTransport {
    fn write(&mut self, command: &str) -> Result<(), N6700Error> {
        self.writes.push(command.to_string());
        Ok(())
    }

    fn query(&mut self, command: &str) -> Result<String, N6700Error> {
        self.queries.push(command.to_string());
        if let Some(reply) = self.queued.get_mut(command).and_then(VecDeque::pop_front) {
            return Ok(reply);
        }
        self.fixed
            .get(command)
            .cloned()
            .ok_or_else(|| {
                N6700Error::Protocol(format!("No scripted reply for {command}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_and_replies() {
        let mut mock = MockTransport::new().with_reply("SYST:CHAN?", "+2");
        mock.push_reply("SYST:CHAN?", "+4");
        mock.write("OUTP 1").unwrap();
        assert_eq!(mock.query("SYST:CHAN?").unwrap(), "+4");
        assert_eq!(mock.query("SYST:CHAN?").unwrap(), "+2");
        assert!(mock.query("*IDN?").is_err());
        assert_eq!(mock.writes(), &["OUTP 1".to_string()]);
        assert_eq!(mock.queries().len(), 3);
    }

    #[test]
    fn builder_requires_address() {
        let result = TcpTransport::builder().port(5025).build();
        assert!(matches!(result, Err(N6700Error::InvalidCommand(_))));
    }

    #[test]
    fn builder_rejects_bad_address() {
        let result = TcpTransport::builder().address("not an address").build();
        assert!(matches!(result, Err(N6700Error::InvalidAddress(_))));
    }

    #[test]
    fn tcp_round_trip() {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut lines = Vec::new();
            for _ in 0..2 {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                lines.push(line.trim_end().to_string());
            }
            writer.write_all(b"+4\n").unwrap();
            lines
        });

        let mut transport = TcpTransport::new("127.0.0.1", port).unwrap();
        transport.write("DISP:VIEW METER4").unwrap();
        assert_eq!(transport.query("SYST:CHAN?").unwrap(), "+4");
        let seen = server.join().unwrap();
        assert_eq!(
            seen,
            vec!["DISP:VIEW METER4".to_string(), "SYST:CHAN?".to_string()]
        );
    }
}
