//
// memory.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! An in-process loopback transport.
//!
//! Clones of a `MemoryTransport` share the same endpoints, so one clone can
//! be handed to a `KernelConnection` while another plays the kernel: it
//! queues inbound messages with `deliver` and inspects what the client sent
//! with `take_sent`. Nothing can arrive while a poll waits, so `poll` never
//! blocks regardless of the timeout.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use jkshared::jupyter_message::JupyterChannel;

use super::{PollTimeout, Transport, TransportError};

#[derive(Default)]
struct MemoryEndpoint {
    /// The address the endpoint was connected to, if any
    address: Option<String>,

    /// Topics subscribed to (broadcast endpoints only)
    subscriptions: Vec<String>,

    /// Whole messages waiting to be received
    inbound: VecDeque<Vec<Vec<u8>>>,

    /// Remaining frames of the message being received
    reading: VecDeque<Vec<u8>>,

    /// Frames of the message being sent
    writing: Vec<Vec<u8>>,

    /// Whole messages sent and not yet taken
    sent: Vec<Vec<Vec<u8>>>,
}

#[derive(Default)]
struct MemoryState {
    endpoints: [MemoryEndpoint; 4],
    closed: bool,
}

#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for the client to receive on `channel`.
    pub fn deliver(&self, channel: JupyterChannel, frames: Vec<Vec<u8>>) {
        let mut state = self.state.borrow_mut();
        state.endpoints[channel.index()].inbound.push_back(frames);
    }

    /// Take every complete message the client has sent on `channel`.
    pub fn take_sent(&self, channel: JupyterChannel) -> Vec<Vec<Vec<u8>>> {
        let mut state = self.state.borrow_mut();
        std::mem::take(&mut state.endpoints[channel.index()].sent)
    }

    /// The number of messages waiting to be received on `channel`.
    pub fn queued(&self, channel: JupyterChannel) -> usize {
        let state = self.state.borrow();
        let endpoint = &state.endpoints[channel.index()];
        endpoint.inbound.len() + usize::from(!endpoint.reading.is_empty())
    }

    /// The address `channel` was connected to.
    pub fn address(&self, channel: JupyterChannel) -> Option<String> {
        self.state.borrow().endpoints[channel.index()].address.clone()
    }

    /// The topics `channel` is subscribed to.
    pub fn subscriptions(&self, channel: JupyterChannel) -> Vec<String> {
        self.state.borrow().endpoints[channel.index()]
            .subscriptions
            .clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self, channel: JupyterChannel, address: &str) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        state.closed = false;
        state.endpoints[channel.index()].address = Some(address.to_string());
        log::trace!("Connected in-memory {} endpoint to {}", channel, address);
        Ok(())
    }

    fn subscribe(&mut self, channel: JupyterChannel, topic: &str) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        let endpoint = &mut state.endpoints[channel.index()];
        if endpoint.address.is_none() {
            return Err(TransportError::NotConnected(channel));
        }
        endpoint.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn send(
        &mut self,
        channel: JupyterChannel,
        frame: Vec<u8>,
        more: bool,
    ) -> Result<(), TransportError> {
        if channel == JupyterChannel::IOPub {
            return Err(TransportError::ReceiveOnly(channel));
        }
        let mut state = self.state.borrow_mut();
        let endpoint = &mut state.endpoints[channel.index()];
        if endpoint.address.is_none() {
            return Err(TransportError::NotConnected(channel));
        }
        endpoint.writing.push(frame);
        if !more {
            let message = std::mem::take(&mut endpoint.writing);
            endpoint.sent.push(message);
        }
        Ok(())
    }

    fn recv(&mut self, channel: JupyterChannel) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.borrow_mut();
        let endpoint = &mut state.endpoints[channel.index()];
        if endpoint.address.is_none() {
            return Err(TransportError::NotConnected(channel));
        }
        if endpoint.reading.is_empty() {
            if let Some(message) = endpoint.inbound.pop_front() {
                endpoint.reading = message.into();
            }
        }
        endpoint
            .reading
            .pop_front()
            .ok_or(TransportError::NothingQueued(channel))
    }

    fn has_more(&self, channel: JupyterChannel) -> bool {
        !self.state.borrow().endpoints[channel.index()]
            .reading
            .is_empty()
    }

    fn poll(
        &mut self,
        channels: &[JupyterChannel],
        _timeout: PollTimeout,
    ) -> Result<Vec<JupyterChannel>, TransportError> {
        let state = self.state.borrow();
        Ok(channels
            .iter()
            .copied()
            .filter(|channel| {
                let endpoint = &state.endpoints[channel.index()];
                endpoint.address.is_some()
                    && (!endpoint.reading.is_empty() || !endpoint.inbound.is_empty())
            })
            .collect())
    }

    fn close(&mut self) {
        let mut state = self.state.borrow_mut();
        for endpoint in state.endpoints.iter_mut() {
            endpoint.address = None;
            endpoint.reading.clear();
            endpoint.writing.clear();
        }
        state.closed = true;
    }
}
