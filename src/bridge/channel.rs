//! Telemetry channel abstraction.
//!
//! The bridge never talks to a socket directly; it drives a
//! [`SimulatorChannel`], so the transport can be swapped or mocked. The
//! in-process [`MockChannel`] backs the test suite: a handle injects inbound
//! messages and drains whatever the bridge sent, mirroring how a real
//! simulator would behave on the far end.

use super::messages::{InboundMessage, OutboundMessage};
use crate::error::{Error, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Bidirectional message channel to the simulator
pub trait SimulatorChannel: Send {
    /// Wait up to `timeout` for one inbound message.
    ///
    /// `Ok(None)` means the wait elapsed quietly; errors mean the channel
    /// itself failed and the caller should react.
    fn poll_inbound(&mut self, timeout: Duration) -> Result<Option<InboundMessage>>;

    /// Send one message to the simulator
    fn send(&mut self, message: &OutboundMessage) -> Result<()>;
}

/// In-process channel endpoint handed to the bridge
pub struct MockChannel {
    inbound_rx: Receiver<InboundMessage>,
    outbound_tx: Sender<OutboundMessage>,
}

/// Test-side handle playing the simulator role
#[derive(Clone)]
pub struct MockChannelHandle {
    inbound_tx: Sender<InboundMessage>,
    outbound_rx: Receiver<OutboundMessage>,
}

/// Create a connected mock channel and its simulator-side handle
pub fn mock_channel() -> (MockChannel, MockChannelHandle) {
    let (inbound_tx, inbound_rx) = unbounded();
    let (outbound_tx, outbound_rx) = unbounded();
    (
        MockChannel {
            inbound_rx,
            outbound_tx,
        },
        MockChannelHandle {
            inbound_tx,
            outbound_rx,
        },
    )
}

impl SimulatorChannel for MockChannel {
    fn poll_inbound(&mut self, timeout: Duration) -> Result<Option<InboundMessage>> {
        match self.inbound_rx.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::ChannelClosed),
        }
    }

    fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        self.outbound_tx
            .send(message.clone())
            .map_err(|_| Error::ChannelClosed)
    }
}

impl MockChannelHandle {
    /// Inject a message as if the simulator had sent it
    pub fn send_inbound(&self, message: InboundMessage) {
        // A dropped bridge just means nobody is listening any more
        let _ = self.inbound_tx.send(message);
    }

    /// Wait for the next message the bridge sent to the simulator
    pub fn recv_outbound(&self, timeout: Duration) -> Option<OutboundMessage> {
        self.outbound_rx.recv_timeout(timeout).ok()
    }

    /// Drain everything the bridge has sent so far
    pub fn drain_outbound(&self) -> Vec<OutboundMessage> {
        self.outbound_rx.try_iter().collect()
    }
}
