//! Device-control client for the experiment controller
//!
//! Each command opens a connection, writes one frame and performs a single
//! read of at most [`RESPONSE_BUFFER_LEN`] bytes. Responses carry no framing:
//! whatever that read returns is the reply. Controllers are expected to answer
//! with short literals such as `OK`; longer replies may be cut at the buffer
//! boundary.
//!
//! Connection failures, write failures, empty reads and read timeouts all
//! collapse into "no response" (`None`). Callers decide whether that is a
//! failure, usually by comparing against an expected reply.

use crate::protocol::frame::{self, CommandEnvelope};
use crate::protocol::ProtocolError;
use std::fmt;
use std::net::SocketAddr;
#[cfg(unix)]
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Fixed size of the single response read
pub const RESPONSE_BUFFER_LEN: usize = 1024;

/// Bound on connecting and on waiting for a reply
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Address of the device-control socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Literal socket address
    Tcp(SocketAddr),
    /// `host:port` resolved at connect time
    Host(String),
    /// Filesystem path of a Unix domain socket
    #[cfg(unix)]
    Unix(PathBuf),
}

impl Endpoint {
    /// Parse an endpoint
    ///
    /// Socket addresses and `host:port` pairs are TCP. Anything else is a
    /// socket path, which only Unix targets can connect to.
    pub fn parse(endpoint: &str) -> Self {
        let endpoint = endpoint.trim();
        if let Ok(addr) = endpoint.parse::<SocketAddr>() {
            return Endpoint::Tcp(addr);
        }
        if is_host_port(endpoint) {
            return Endpoint::Host(endpoint.to_string());
        }

        #[cfg(unix)]
        {
            Endpoint::Unix(PathBuf::from(endpoint))
        }
        #[cfg(not(unix))]
        {
            Endpoint::Host(endpoint.to_string())
        }
    }
}

fn is_host_port(endpoint: &str) -> bool {
    match endpoint.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !host.contains(['/', '\\']) && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "{}", addr),
            Endpoint::Host(host) => f.write_str(host),
            #[cfg(unix)]
            Endpoint::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Client sending command envelopes to the controller
#[derive(Debug, Clone)]
pub struct ControllerClient {
    endpoint: Endpoint,
    read_timeout: Duration,
}

impl ControllerClient {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send an envelope and return the raw reply
    ///
    /// # Errors
    /// Only framing errors propagate; transport problems yield `Ok(None)`.
    pub async fn send(&self, envelope: &CommandEnvelope) -> Result<Option<String>, ProtocolError> {
        let frame = frame::encode(envelope)?;
        debug!(endpoint = %self.endpoint, command = %envelope.command, "sending command");

        let response = match &self.endpoint {
            Endpoint::Tcp(addr) => {
                let connect = timeout(self.read_timeout, TcpStream::connect(addr)).await;
                self.after_connect(connect, &frame).await
            }
            Endpoint::Host(host) => {
                // tokio resolves the name and tries each address in turn
                let connect = timeout(self.read_timeout, TcpStream::connect(host.as_str())).await;
                self.after_connect(connect, &frame).await
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let connect = timeout(self.read_timeout, tokio::net::UnixStream::connect(path)).await;
                self.after_connect(connect, &frame).await
            }
        };

        debug!(command = %envelope.command, response = ?response, "command finished");
        Ok(response)
    }

    /// Send an envelope and require an exact reply
    pub async fn expect(&self, envelope: &CommandEnvelope, expected: &str) -> Result<(), ProtocolError> {
        match self.send(envelope).await? {
            Some(reply) if reply == expected => Ok(()),
            Some(reply) => Err(ProtocolError::UnexpectedReply {
                command: envelope.command.clone(),
                expected: expected.to_string(),
                actual: reply,
            }),
            None => Err(ProtocolError::NoResponse {
                command: envelope.command.clone(),
            }),
        }
    }

    /// Round-trip a `status` command; any reply counts as ready
    pub async fn probe(&self) -> bool {
        matches!(self.send(&CommandEnvelope::new("status")).await, Ok(Some(_)))
    }

    async fn after_connect<S>(
        &self,
        connect: Result<std::io::Result<S>, tokio::time::error::Elapsed>,
        frame: &[u8],
    ) -> Option<String>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match connect {
            Ok(Ok(stream)) => self.exchange(stream, frame).await,
            Ok(Err(e)) => {
                warn!(endpoint = %self.endpoint, "connection failed: {}", e);
                None
            }
            Err(_) => {
                warn!(endpoint = %self.endpoint, "connection timed out");
                None
            }
        }
    }

    async fn exchange<S>(&self, mut stream: S, frame: &[u8]) -> Option<String>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if let Err(e) = stream.write_all(frame).await {
            warn!(endpoint = %self.endpoint, "write failed: {}", e);
            return None;
        }

        let mut buf = [0u8; RESPONSE_BUFFER_LEN];
        match timeout(self.read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) => None,
            Ok(Ok(n)) => Some(String::from_utf8_lossy(&buf[..n]).into_owned()),
            Ok(Err(e)) => {
                warn!(endpoint = %self.endpoint, "read failed: {}", e);
                None
            }
            Err(_) => {
                debug!(endpoint = %self.endpoint, "no response within {:?}", self.read_timeout);
                None
            }
        }
    }
}
