//! # Target subscriber
//!
//! Listens on the `target` topic and writes each received value into the [`SetpointRegister`].
//! Receiving happens on a background thread so the control loop never waits on the network.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::finger::{FingerMsg, FingerTopic, TARGET_TOPIC},
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};
use log::{debug, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread,
};

use crate::setpoint::SetpointRegister;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout, bounds how long shutting the subscriber down can take.
const RECV_TIMEOUT_MS: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Subscribes to target messages and keeps the setpoint register up to date.
pub struct TargetSubscriber {
    endpoint: String,
    shutdown: Arc<AtomicBool>,
    counters: Arc<Counters>,
    join_handle: Option<thread::JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    rejected: AtomicU64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TargetSubscriberError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to the target topic: {0}")]
    SubscribeError(zmq::Error),

    #[error("Could not spawn the subscriber thread: {0}")]
    SpawnError(std::io::Error),

    #[error("The subscriber thread panicked")]
    ThreadPanicked,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TargetSubscriber {
    /// Connect to the target publisher at `endpoint` and start feeding `register`.
    ///
    /// Does not wait for the publisher to be available.
    pub fn new(
        ctx: &zmq::Context,
        endpoint: &str,
        register: Arc<SetpointRegister>,
    ) -> Result<Self, TargetSubscriberError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            recv_timeout: RECV_TIMEOUT_MS,
            linger: 0,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, endpoint)
            .map_err(TargetSubscriberError::SocketError)?;

        socket
            .set_subscribe(TARGET_TOPIC.as_bytes())
            .map_err(TargetSubscriberError::SubscribeError)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());

        let shutdown_clone = shutdown.clone();
        let counters_clone = counters.clone();
        let endpoint_clone = endpoint.to_string();

        let join_handle = thread::Builder::new()
            .name("target_sub".into())
            .spawn(move || {
                receive(socket, endpoint_clone, register, shutdown_clone, counters_clone)
            })
            .map_err(TargetSubscriberError::SpawnError)?;

        info!("Target subscriber connected to {}", endpoint);

        Ok(Self {
            endpoint: endpoint.to_string(),
            shutdown,
            counters,
            join_handle: Some(join_handle),
        })
    }

    /// Number of targets written into the register.
    pub fn num_accepted(&self) -> u64 {
        self.counters.accepted.load(Ordering::Relaxed)
    }

    /// Number of frames dropped because they couldn't be parsed.
    pub fn num_rejected(&self) -> u64 {
        self.counters.rejected.load(Ordering::Relaxed)
    }

    /// Stop receiving. The register keeps the last value written.
    pub fn stop(mut self) -> Result<(), TargetSubscriberError> {
        self.signal_and_join()?;

        info!(
            "Target subscriber on {} stopped ({} accepted, {} rejected)",
            self.endpoint,
            self.num_accepted(),
            self.num_rejected()
        );

        Ok(())
    }

    fn signal_and_join(&mut self) -> Result<(), TargetSubscriberError> {
        self.shutdown.store(true, Ordering::Relaxed);

        match self.join_handle.take() {
            Some(jh) => jh.join().map_err(|_| TargetSubscriberError::ThreadPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for TargetSubscriber {
    fn drop(&mut self) {
        if self.signal_and_join().is_err() {
            warn!("Target subscriber thread for {} panicked", self.endpoint);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn receive(
    socket: MonitoredSocket,
    endpoint: String,
    register: Arc<SetpointRegister>,
    shutdown: Arc<AtomicBool>,
    counters: Arc<Counters>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        let msg = match socket.recv_msg(0) {
            Ok(m) => m,
            Err(zmq::Error::EAGAIN) => continue,
            Err(zmq::Error::ETERM) => {
                warn!("Context terminated, target subscriber on {} exiting", endpoint);
                break;
            }
            Err(e) => {
                warn!("Could not receive from {}: {}", endpoint, e);
                continue;
            }
        };

        match FingerMsg::from_bytes(&msg).and_then(|m| m.expect_topic(FingerTopic::Target)) {
            Ok(target_rad) => {
                register.set(target_rad);
                counters.accepted.fetch_add(1, Ordering::Relaxed);
                debug!("New target: {} rad", target_rad);
            }
            Err(e) => {
                counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping target frame: {}", e);
            }
        }
    }
}
