//! Instrument simulators
//!
//! Stand-ins for lab-instrument firmware. Every simulator speaks the same
//! line protocol: read a line, dispatch on the case-folded command name, write
//! one reply, keep the connection open for the next line. Each connection is
//! served by its own task.

pub mod spectrometer;
pub mod valve;

pub use spectrometer::Spectrometer;
pub use valve::Valve;

use crate::protocol::line;
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Well-known port of the valve simulator
pub const VALVE_PORT: u16 = 8000;

/// Well-known port of the spectrometer simulator
pub const SPECTROMETER_PORT: u16 = 8001;

/// Command table of one simulated instrument
#[async_trait]
pub trait InstrumentProtocol: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Handle a supported command, or return `None` when `command` is not in the table
    ///
    /// `command` is already lowercased.
    async fn dispatch(&self, command: &str, argument: &str) -> Option<String>;
}

/// Produce the reply to one request line
pub async fn respond<P>(protocol: &P, request: &str) -> String
where
    P: InstrumentProtocol + ?Sized,
{
    let request = line::parse(request);
    match protocol.dispatch(&request.key(), &request.argument).await {
        Some(reply) => reply,
        None => line::invalid_command(request.command),
    }
}

/// TCP server exposing one simulator
pub struct SimulatorServer<P> {
    protocol: Arc<P>,
    listener: TcpListener,
}

impl<P: InstrumentProtocol> SimulatorServer<P> {
    /// Bind a simulator to `addr`
    ///
    /// All connections share the one `protocol` instance, and therefore its state.
    pub async fn bind(protocol: P, addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            protocol: Arc::new(protocol),
            listener,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped
    ///
    /// A failed `accept` only loses that one connection.
    pub async fn serve(self) -> io::Result<()> {
        info!(
            simulator = self.protocol.name(),
            addr = %self.listener.local_addr()?,
            "simulator listening"
        );

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(simulator = self.protocol.name(), "error accepting connection: {}", e);
                    continue;
                }
            };
            debug!(simulator = self.protocol.name(), %peer, "connection opened");

            let protocol = Arc::clone(&self.protocol);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(protocol.as_ref(), stream).await {
                    warn!(simulator = protocol.name(), %peer, "connection error: {}", e);
                }
            });
        }
    }
}

async fn handle_connection<P: InstrumentProtocol>(protocol: &P, stream: TcpStream) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(request) = lines.next_line().await? {
        let request = request.trim_end_matches('\r');
        let reply = respond(protocol, request).await;
        debug!(simulator = protocol.name(), "{} response ==> {}", request, reply);

        writer.write_all(reply.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    Ok(())
}

/// Serve the valve and spectrometer simulators
pub async fn serve_all(host: [u8; 4], valve_port: u16, spectrometer_port: u16) -> io::Result<()> {
    let valve = SimulatorServer::bind(Valve, SocketAddr::from((host, valve_port))).await?;
    let spectrometer =
        SimulatorServer::bind(Spectrometer::new(), SocketAddr::from((host, spectrometer_port))).await?;

    tokio::try_join!(valve.serve(), spectrometer.serve())?;
    Ok(())
}
