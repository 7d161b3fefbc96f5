//! Command/event seam between the protocol client and its host process.
//!
//! Inbound send-commands ride a bounded mpsc queue toward a single fan-out
//! consumer. Outbound events use a broadcast channel so the operator tail,
//! an archiver, and tests can subscribe independently; a subscriber that
//! falls behind loses the oldest events instead of stalling the client.

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::types::{ClientEvent, SendCommand};

/// Subscription handle yielding client events in emission order.
pub type EventStream = broadcast::Receiver<ClientEvent>;

/// Errors returned by channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The fan-out side of the command queue is gone; the host process is
    /// shutting down or its fan-out task died.
    #[error("command channel is closed")]
    CommandChannelClosed,
}

/// Paired channel handles for one client instance.
///
/// Cloning is cheap and safe: every clone feeds the same command queue and
/// the same event bus, so broker glue can hold one clone per connection.
#[derive(Clone, Debug)]
pub struct ClientChannels {
    command_tx: mpsc::Sender<SendCommand>,
    event_tx: broadcast::Sender<ClientEvent>,
}

impl ClientChannels {
    /// Build the pair. The returned receiver belongs to the fan-out task;
    /// zero buffer sizes are bumped to one.
    pub fn new(
        command_buffer: usize,
        event_buffer: usize,
    ) -> (Self, mpsc::Receiver<SendCommand>) {
        let (command_tx, command_rx) = mpsc::channel(command_buffer.max(1));
        let (event_tx, _) = broadcast::channel(event_buffer.max(1));

        (
            Self {
                command_tx,
                event_tx,
            },
            command_rx,
        )
    }

    /// Event sender handed to the client at construction.
    pub fn event_sender(&self) -> broadcast::Sender<ClientEvent> {
        self.event_tx.clone()
    }

    /// Open a fresh event subscription. Events emitted before the
    /// subscription existed are not replayed.
    pub fn subscribe(&self) -> EventStream {
        self.event_tx.subscribe()
    }

    /// Queue one send command toward the fan-out task, waiting for queue
    /// space if it is full.
    pub async fn send_command(&self, command: SendCommand) -> Result<(), ChannelError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ChannelError::CommandChannelClosed)
    }

    /// Publish one event. A send with no live subscribers is dropped, not
    /// an error.
    pub fn emit(&self, event: ClientEvent) {
        let _ = self.event_tx.send(event);
    }
}
