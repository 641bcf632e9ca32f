//! TCP transport for the simulator channel.
//!
//! Single-client server speaking length-prefixed JSON:
//!
//! ```text
//! +------------------+---------------------+
//! | Length (4 bytes) | JSON payload        |
//! | Big-endian u32   | (variable size)     |
//! +------------------+---------------------+
//! ```
//!
//! The simulator connects to us; the accept is surfaced as a synthetic
//! [`InboundMessage::Connect`] so the bridge sees the same event stream over
//! any transport. Frames above the size cap and half-delivered frames that
//! stall past the frame deadline drop the client; a malformed JSON payload
//! only drops the message.

use super::channel::SimulatorChannel;
use super::messages::{InboundMessage, OutboundMessage};
use crate::error::{Error, Result};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on one wire frame; camera images dominate the budget
const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// How long a partially received frame may stall before the client is
/// considered gone
const FRAME_DEADLINE: Duration = Duration::from_secs(10);

/// Sleep between accept attempts while no simulator is connected
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// TCP-backed simulator channel
pub struct TcpChannel {
    listener: TcpListener,
    client: Option<TcpStream>,
}

impl TcpChannel {
    /// Bind the listening socket the simulator will connect to
    pub fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        log::info!("TcpChannel: listening on {}", addr);
        Ok(Self {
            listener,
            client: None,
        })
    }

    /// Local address of the listener, useful when bound to port 0
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    fn drop_client(&mut self, why: &str) {
        if let Some(stream) = self.client.take() {
            log::info!("TcpChannel: dropping client: {}", why);
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

impl SimulatorChannel for TcpChannel {
    fn poll_inbound(&mut self, timeout: Duration) -> Result<Option<InboundMessage>> {
        if let Some(stream) = self.client.as_mut() {
            stream.set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;
            return match read_frame(stream) {
                Ok(Some(payload)) => match serde_json::from_slice::<InboundMessage>(&payload) {
                    Ok(message) => Ok(Some(message)),
                    Err(e) => {
                        log::warn!("TcpChannel: dropping undecodable frame: {}", e);
                        Ok(None)
                    }
                },
                Ok(None) => Ok(None),
                Err(e) => {
                    self.drop_client(&e.to_string());
                    Err(Error::Disconnected)
                }
            };
        }

        // No client yet: wait for the simulator to connect
        let deadline = Instant::now() + timeout;
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    log::info!("TcpChannel: simulator connected from {}", addr);
                    stream.set_nonblocking(false)?;
                    self.client = Some(stream);
                    return Ok(Some(InboundMessage::Connect));
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        let Some(stream) = self.client.as_mut() else {
            // Mirrors an emit with nobody listening: silently dropped
            log::debug!("TcpChannel: no client connected, dropping outbound message");
            return Ok(());
        };

        let payload =
            serde_json::to_vec(message).map_err(|e| Error::Serialization(e.to_string()))?;

        if let Err(e) = write_frame(stream, &payload) {
            self.drop_client(&e.to_string());
            return Err(Error::Disconnected);
        }
        Ok(())
    }
}

/// Write one length-prefixed frame
fn write_frame(stream: &mut TcpStream, payload: &[u8]) -> std::io::Result<()> {
    let prefix = (payload.len() as u32).to_be_bytes();
    stream.write_all(&prefix)?;
    stream.write_all(payload)?;
    stream.flush()
}

/// Read one length-prefixed frame.
///
/// `Ok(None)` means the read timed out before the first byte of a frame;
/// once a frame has started, short reads are retried until [`FRAME_DEADLINE`]
/// passes.
fn read_frame(stream: &mut TcpStream) -> Result<Option<Vec<u8>>> {
    let mut prefix = [0u8; 4];
    let started = Instant::now();
    let mut filled = 0usize;
    while filled < 4 {
        match stream.read(&mut prefix[filled..]) {
            Ok(0) => return Err(Error::Disconnected),
            Ok(n) => filled += n,
            Err(ref e) if is_timeout(e) => {
                if filled == 0 {
                    return Ok(None);
                }
                if started.elapsed() > FRAME_DEADLINE {
                    return Err(Error::Disconnected);
                }
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(Error::Serialization(format!(
            "frame too large: {} bytes",
            len
        )));
    }

    let mut payload = vec![0u8; len];
    let mut filled = 0usize;
    while filled < len {
        match stream.read(&mut payload[filled..]) {
            Ok(0) => return Err(Error::Disconnected),
            Ok(n) => filled += n,
            Err(ref e) if is_timeout(e) => {
                if started.elapsed() > FRAME_DEADLINE {
                    return Err(Error::Disconnected);
                }
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(Some(payload))
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
