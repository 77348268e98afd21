//
// mod.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! The message-queue transport the client speaks through.
//!
//! A transport owns one endpoint per Jupyter channel and moves ordered
//! binary frames over it. A logical message is a run of frames where every
//! frame but the last is sent with `more` set; on the receiving side
//! `has_more` reports whether the message being read has frames left.

use std::time::Duration;

use jkshared::jupyter_message::JupyterChannel;

pub mod memory;
pub mod zmq;

pub use memory::MemoryTransport;
pub use zmq::ZmqTransport;

/// How long a readiness poll may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTimeout {
    /// Block until something is ready
    Forever,

    /// Return immediately if nothing is ready
    Immediate,

    /// Block for at most the given duration
    After(Duration),
}

impl PollTimeout {
    /// Map a timeout in milliseconds: negative blocks indefinitely, zero
    /// returns immediately, positive bounds the wait.
    pub fn from_millis(millis: i64) -> Self {
        if millis < 0 {
            PollTimeout::Forever
        } else if millis == 0 {
            PollTimeout::Immediate
        } else {
            PollTimeout::After(Duration::from_millis(millis as u64))
        }
    }
}

/// Errors raised by a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("No {0} endpoint is connected")]
    NotConnected(JupyterChannel),

    #[error("Failed to connect {channel} endpoint to {address}: {reason}")]
    Connect {
        channel: JupyterChannel,
        address: String,
        reason: String,
    },

    #[error("The {0} endpoint is receive-only")]
    ReceiveOnly(JupyterChannel),

    #[error("No message is queued on the {0} endpoint")]
    NothingQueued(JupyterChannel),

    #[error("{channel} endpoint failed: {reason}")]
    Socket {
        channel: JupyterChannel,
        reason: String,
    },

    #[error("Failed to start transport runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// A message-queue transport with one endpoint per channel.
pub trait Transport {
    /// Open the endpoint for `channel` and connect it to `address`.
    fn connect(&mut self, channel: JupyterChannel, address: &str) -> Result<(), TransportError>;

    /// Subscribe a broadcast endpoint to a topic; the empty topic matches
    /// everything.
    fn subscribe(&mut self, channel: JupyterChannel, topic: &str) -> Result<(), TransportError>;

    /// Send one frame. `more` marks that further frames of the same message
    /// follow.
    fn send(
        &mut self,
        channel: JupyterChannel,
        frame: Vec<u8>,
        more: bool,
    ) -> Result<(), TransportError>;

    /// Receive the next frame, blocking until one is available.
    fn recv(&mut self, channel: JupyterChannel) -> Result<Vec<u8>, TransportError>;

    /// Whether the message currently being received has more frames.
    fn has_more(&self, channel: JupyterChannel) -> bool;

    /// Wait up to `timeout` for any of `channels` to have a message ready,
    /// and return the ones that do.
    fn poll(
        &mut self,
        channels: &[JupyterChannel],
        timeout: PollTimeout,
    ) -> Result<Vec<JupyterChannel>, TransportError>;

    /// Release every endpoint.
    fn close(&mut self);
}
