//! # Command publisher
//!
//! Publishes the loop's effort commands on the `command` topic.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::finger::FingerMsg,
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};
use log::{info, warn};

use crate::sink::CommandSink;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A PUB socket acting as the control loop's [`CommandSink`].
///
/// Sending never blocks the loop. If nobody is subscribed the command is simply not delivered.
pub struct CommandPublisher {
    socket: MonitoredSocket,

    /// Number of commands the socket refused
    num_send_errors: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CommandPublisherError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CommandPublisher {
    /// Bind a new publisher to `endpoint`.
    pub fn new(ctx: &zmq::Context, endpoint: &str) -> Result<Self, CommandPublisherError> {
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 0,
            send_timeout: 0,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, endpoint)
            .map_err(CommandPublisherError::SocketError)?;

        info!("Command publisher bound to {}", endpoint);

        Ok(Self {
            socket,
            num_send_errors: 0,
        })
    }

    /// Number of commands that could not be sent.
    pub fn num_send_errors(&self) -> u64 {
        self.num_send_errors
    }

    /// Whether a subscriber is currently connected.
    pub fn connected(&self) -> bool {
        self.socket.connected()
    }
}

impl CommandSink for CommandPublisher {
    fn emit(&mut self, command: f64) {
        let frame = FingerMsg::command(command).to_frame();

        if let Err(e) = self.socket.send(frame.as_str(), zmq::DONTWAIT) {
            self.num_send_errors += 1;
            warn!("Could not publish command {}: {}", command, e);
        }
    }
}
