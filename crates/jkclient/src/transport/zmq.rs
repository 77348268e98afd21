//
// zmq.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! ZeroMQ transport: DEALER sockets for shell, stdin and control, and a SUB
//! socket for IOPub.
//!
//! The sockets are asynchronous; the transport owns a small Tokio runtime
//! and drives every socket operation to completion on the caller's thread.
//! It must not be used from inside another Tokio runtime.

use std::collections::VecDeque;
use std::str::FromStr;

use futures::FutureExt;
use jkshared::jupyter_message::JupyterChannel;
use tokio::runtime::Runtime;
use zeromq::{
    util::PeerIdentity, DealerSocket, Socket, SocketOptions, SocketRecv, SocketSend, SubSocket,
    ZmqError, ZmqMessage, ZmqResult,
};

use super::{PollTimeout, Transport, TransportError};

enum ZmqSocket {
    Dealer(DealerSocket),
    Sub(SubSocket),
}

impl ZmqSocket {
    async fn recv(&mut self) -> ZmqResult<ZmqMessage> {
        match self {
            ZmqSocket::Dealer(socket) => socket.recv().await,
            ZmqSocket::Sub(socket) => socket.recv().await,
        }
    }

    async fn close(self) {
        match self {
            ZmqSocket::Dealer(socket) => {
                let _ = socket.close().await;
            }
            ZmqSocket::Sub(socket) => {
                let _ = socket.close().await;
            }
        }
    }
}

struct ZmqEndpoint {
    socket: ZmqSocket,

    /// A message that arrived during a poll and has not been read yet
    ready: Option<ZmqMessage>,

    /// Remaining frames of the message being received
    reading: VecDeque<Vec<u8>>,

    /// Frames of the message being sent
    writing: Vec<Vec<u8>>,
}

impl ZmqEndpoint {
    fn new(socket: ZmqSocket) -> Self {
        Self {
            socket,
            ready: None,
            reading: VecDeque::new(),
            writing: Vec::new(),
        }
    }

    fn is_ready(&self) -> bool {
        self.ready.is_some() || !self.reading.is_empty()
    }
}

pub struct ZmqTransport {
    runtime: Runtime,

    /// The peer identity given to DEALER sockets; the session ID
    identity: String,

    endpoints: [Option<ZmqEndpoint>; 4],
}

fn socket_error(channel: JupyterChannel, err: ZmqError) -> TransportError {
    TransportError::Socket {
        channel,
        reason: err.to_string(),
    }
}

impl ZmqTransport {
    /// Create a transport whose DEALER sockets identify themselves as
    /// `identity`.
    pub fn new(identity: &str) -> Result<Self, TransportError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("jkclient-zmq")
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            identity: identity.to_string(),
            endpoints: Default::default(),
        })
    }

    /// Creates the socket options for DEALER sockets to set the peer identity
    /// to the session ID.
    fn dealer_peer_opts(&self) -> Result<SocketOptions, String> {
        let mut peer_opts = SocketOptions::default();
        let peer_id = PeerIdentity::from_str(self.identity.as_str())
            .map_err(|err| format!("invalid peer identity: {:?}", err))?;
        peer_opts.peer_identity(peer_id);
        Ok(peer_opts)
    }

    fn endpoint(&mut self, channel: JupyterChannel) -> Result<&mut ZmqEndpoint, TransportError> {
        self.endpoints[channel.index()]
            .as_mut()
            .ok_or(TransportError::NotConnected(channel))
    }

    /// Pick up every message that can be received without waiting.
    fn sweep(&mut self, channels: &[JupyterChannel]) -> Result<Vec<JupyterChannel>, TransportError> {
        let mut ready = Vec::new();
        for &channel in channels {
            let Some(endpoint) = self.endpoints[channel.index()].as_mut() else {
                continue;
            };
            if !endpoint.is_ready() {
                let received = self
                    .runtime
                    .block_on(async { endpoint.socket.recv().now_or_never() });
                match received {
                    Some(Ok(message)) => endpoint.ready = Some(message),
                    Some(Err(err)) => return Err(socket_error(channel, err)),
                    None => {}
                }
            }
            if endpoint.is_ready() {
                ready.push(channel);
            }
        }
        Ok(ready)
    }

    /// Block until one of `channels` receives a message or `timeout` passes.
    /// Returns whether a message arrived.
    fn wait(
        &mut self,
        channels: &[JupyterChannel],
        timeout: PollTimeout,
    ) -> Result<bool, TransportError> {
        let ZmqTransport {
            runtime, endpoints, ..
        } = self;

        let arrived = runtime.block_on(async {
            let waits: Vec<_> = endpoints
                .iter_mut()
                .enumerate()
                .filter(|(index, _)| channels.contains(&JupyterChannel::ALL[*index]))
                .filter_map(|(index, endpoint)| endpoint.as_mut().map(|e| (index, e)))
                .map(|(index, endpoint)| {
                    Box::pin(async move { (index, endpoint.socket.recv().await) })
                })
                .collect();
            if waits.is_empty() {
                return None;
            }
            let first = futures::future::select_all(waits);
            let outcome = match timeout {
                PollTimeout::After(duration) => tokio::time::timeout(duration, first).await.ok(),
                PollTimeout::Forever | PollTimeout::Immediate => Some(first.await),
            };
            outcome.map(|(arrival, _, _)| arrival)
        });

        match arrived {
            Some((index, result)) => {
                let channel = JupyterChannel::ALL[index];
                let message = result.map_err(|err| socket_error(channel, err))?;
                self.endpoint(channel)?.ready = Some(message);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Transport for ZmqTransport {
    fn connect(&mut self, channel: JupyterChannel, address: &str) -> Result<(), TransportError> {
        let connect_error = |reason: String| TransportError::Connect {
            channel,
            address: address.to_string(),
            reason,
        };

        let socket = match channel {
            JupyterChannel::IOPub => {
                let mut socket = SubSocket::new();
                self.runtime
                    .block_on(socket.connect(address))
                    .map_err(|err| connect_error(err.to_string()))?;
                ZmqSocket::Sub(socket)
            }
            _ => {
                let opts = self.dealer_peer_opts().map_err(connect_error)?;
                let mut socket = DealerSocket::with_options(opts);
                self.runtime
                    .block_on(socket.connect(address))
                    .map_err(|err| connect_error(err.to_string()))?;
                ZmqSocket::Dealer(socket)
            }
        };

        log::trace!(
            "[session {}] Connected to {} socket at {}",
            self.identity,
            channel,
            address
        );
        self.endpoints[channel.index()] = Some(ZmqEndpoint::new(socket));
        Ok(())
    }

    fn subscribe(&mut self, channel: JupyterChannel, topic: &str) -> Result<(), TransportError> {
        let ZmqTransport {
            runtime, endpoints, ..
        } = self;
        let endpoint = endpoints[channel.index()]
            .as_mut()
            .ok_or(TransportError::NotConnected(channel))?;
        match &mut endpoint.socket {
            ZmqSocket::Sub(socket) => runtime
                .block_on(socket.subscribe(topic))
                .map_err(|err| socket_error(channel, err)),
            ZmqSocket::Dealer(_) => Err(TransportError::Socket {
                channel,
                reason: String::from("only broadcast sockets can subscribe"),
            }),
        }
    }

    fn send(
        &mut self,
        channel: JupyterChannel,
        frame: Vec<u8>,
        more: bool,
    ) -> Result<(), TransportError> {
        let ZmqTransport {
            runtime, endpoints, ..
        } = self;
        let endpoint = endpoints[channel.index()]
            .as_mut()
            .ok_or(TransportError::NotConnected(channel))?;
        let socket = match &mut endpoint.socket {
            ZmqSocket::Dealer(socket) => socket,
            ZmqSocket::Sub(_) => return Err(TransportError::ReceiveOnly(channel)),
        };

        endpoint.writing.push(frame);
        if more {
            return Ok(());
        }

        let mut frames = std::mem::take(&mut endpoint.writing).into_iter();
        let Some(first) = frames.next() else {
            return Ok(());
        };
        let mut message = ZmqMessage::from(first);
        for frame in frames {
            message.push_back(frame.into());
        }
        runtime
            .block_on(socket.send(message))
            .map_err(|err| socket_error(channel, err))
    }

    fn recv(&mut self, channel: JupyterChannel) -> Result<Vec<u8>, TransportError> {
        let ZmqTransport {
            runtime, endpoints, ..
        } = self;
        let endpoint = endpoints[channel.index()]
            .as_mut()
            .ok_or(TransportError::NotConnected(channel))?;

        if endpoint.reading.is_empty() {
            let message = match endpoint.ready.take() {
                Some(message) => message,
                None => runtime
                    .block_on(endpoint.socket.recv())
                    .map_err(|err| socket_error(channel, err))?,
            };
            endpoint.reading = message
                .into_vec()
                .into_iter()
                .map(|frame| frame.to_vec())
                .collect();
        }

        endpoint
            .reading
            .pop_front()
            .ok_or(TransportError::NothingQueued(channel))
    }

    fn has_more(&self, channel: JupyterChannel) -> bool {
        match &self.endpoints[channel.index()] {
            Some(endpoint) => !endpoint.reading.is_empty(),
            None => false,
        }
    }

    fn poll(
        &mut self,
        channels: &[JupyterChannel],
        timeout: PollTimeout,
    ) -> Result<Vec<JupyterChannel>, TransportError> {
        let ready = self.sweep(channels)?;
        if !ready.is_empty() || timeout == PollTimeout::Immediate {
            return Ok(ready);
        }
        if self.wait(channels, timeout)? {
            // Something arrived; collect it along with anything that came in
            // on the other channels meanwhile
            return self.sweep(channels);
        }
        Ok(Vec::new())
    }

    fn close(&mut self) {
        for slot in self.endpoints.iter_mut() {
            if let Some(endpoint) = slot.take() {
                self.runtime.block_on(endpoint.socket.close());
            }
        }
        log::trace!("[session {}] Closed all sockets", self.identity);
    }
}
