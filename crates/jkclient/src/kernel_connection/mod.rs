//
// mod.rs
//
// Copyright (C) 2024 Posit Software, PBC. All rights reserved.
//
//

//! A connection to a running Jupyter kernel.
//!
//! All protocol work happens on the caller's thread, inside a request
//! method or inside `poll`. Callbacks run synchronously from `poll`, in
//! channel order (shell, iopub, stdin, control) and, within a channel, in
//! arrival order. A connection is not `Send`; a multi-threaded host must
//! confine it to one thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use jkshared::connection_info::ConnectionInfo;
use jkshared::jupyter_message::{JupyterChannel, JupyterMessage, JupyterMessageHeader};
use serde_json::Value;

use crate::comm::Comm;
use crate::connection_file::{ConnectionFileProvider, RuntimeDirectories};
use crate::error::KernelError;
use crate::message_router::MessageRouter;
use crate::session::{SendOptions, Session};
use crate::transport::{PollTimeout, Transport, ZmqTransport};

pub mod callbacks;
mod dispatch;
pub mod pending;
mod requests;

pub use callbacks::{InputReply, KernelEvents, ReplyCallbacks};
pub use pending::{PendingRequests, PendingTable, ReplyFamily};

use callbacks::NoEvents;
use dispatch::Handler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// The endpoints are being opened
    Connecting,

    /// Requests can be made and messages polled
    Open,

    /// `close()` was called; the endpoints are released
    Closed,
}

/// The mutable state of a connection, shared with the comms and input
/// replies it hands out.
pub(crate) struct ConnectionInner {
    state: ConnectionState,
    info: ConnectionInfo,
    session: Session,
    transport: Box<dyn Transport>,

    /// Whether the kernel last reported itself busy
    busy: bool,

    /// Set while `poll` is dispatching
    polling: bool,

    pending: PendingRequests,
    comms: HashMap<String, Comm>,

    /// One router per channel, in `JupyterChannel::ALL` order
    routers: [MessageRouter<Handler>; 4],
}

impl ConnectionInner {
    pub(crate) fn ensure_open(&self) -> Result<(), KernelError> {
        match self.state {
            ConnectionState::Open => Ok(()),
            _ => Err(KernelError::ConnectionClosed),
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Send a new message; returns its ID.
    pub(crate) fn send(
        &mut self,
        channel: JupyterChannel,
        msg_type: &str,
        content: Value,
        parent: Option<&JupyterMessageHeader>,
    ) -> Result<String, KernelError> {
        let msg = self
            .session
            .send(
                self.transport.as_mut(),
                channel,
                msg_type,
                content,
                parent,
                SendOptions::default(),
            )?;
        Ok(msg.header.msg_id)
    }

    pub(crate) fn has_comm(&self, comm_id: &str) -> bool {
        self.comms.contains_key(comm_id)
    }

    pub(crate) fn register_comm(&mut self, comm: Comm) {
        if let Some(previous) = self.comms.insert(comm.comm_id().to_string(), comm) {
            log::debug!(
                "[session {}] Replaced comm {} ({})",
                self.session.session_id(),
                previous.comm_id(),
                previous.target_name()
            );
        }
    }

    pub(crate) fn remove_comm(&mut self, comm_id: &str) -> Option<Comm> {
        self.comms.remove(comm_id)
    }

    /// Connect every channel and subscribe IOPub to all topics.
    fn connect(&mut self) -> Result<(), KernelError> {
        for channel in JupyterChannel::ALL {
            let address = self.info.address(channel);
            self.transport.connect(channel, &address)?;
        }
        self.transport.subscribe(JupyterChannel::IOPub, "")?;
        Ok(())
    }

    fn receive(
        &mut self,
        channel: JupyterChannel,
    ) -> Result<(Vec<String>, JupyterMessage), KernelError> {
        self.session.receive(self.transport.as_mut(), channel)
    }

    fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;
        self.transport.close();
        for (_, comm) in self.comms.drain() {
            comm.mark_closed();
        }
        log::debug!(
            "[session {}] Closed connection ({} requests never answered)",
            self.session.session_id(),
            self.pending.len()
        );
    }
}

/// Marks the connection as polling for as long as it lives.
struct PollGuard<'a> {
    inner: &'a RefCell<ConnectionInner>,
}

impl<'a> PollGuard<'a> {
    fn enter(inner: &'a RefCell<ConnectionInner>) -> Result<Self, KernelError> {
        let mut state = inner.try_borrow_mut().map_err(|_| KernelError::ReentrantPoll)?;
        if state.polling {
            return Err(KernelError::ReentrantPoll);
        }
        state.ensure_open()?;
        state.polling = true;
        Ok(Self { inner })
    }
}

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.try_borrow_mut() {
            state.polling = false;
        }
    }
}

pub struct KernelConnection {
    inner: Rc<RefCell<ConnectionInner>>,
    events: RefCell<Option<Box<dyn KernelEvents>>>,
}

impl KernelConnection {
    /// Open a connection to the kernel described by `info` over `transport`.
    ///
    /// Connects all four channels and subscribes IOPub to every topic. If any
    /// step fails, whatever was opened is released again.
    pub fn open(
        info: ConnectionInfo,
        session: Session,
        transport: impl Transport + 'static,
    ) -> Result<Self, KernelError> {
        let session_id = session.session_id().to_string();
        log::debug!(
            "[session {}] Connecting to kernel at {}://{}",
            session_id,
            info.transport,
            info.ip
        );

        let mut inner = ConnectionInner {
            state: ConnectionState::Connecting,
            info,
            session,
            transport: Box::new(transport),
            busy: false,
            polling: false,
            pending: PendingRequests::default(),
            comms: HashMap::new(),
            routers: dispatch::routers(),
        };
        if let Err(err) = inner.connect() {
            log::error!(
                "[session {}] Failed to connect to kernel: {}",
                session_id,
                err
            );
            inner.close();
            return Err(err);
        }
        inner.state = ConnectionState::Open;
        log::info!("[session {}] Connected to kernel", session_id);

        Ok(Self {
            inner: Rc::new(RefCell::new(inner)),
            events: RefCell::new(Some(Box::new(NoEvents))),
        })
    }

    /// Connect to a running kernel over ZeroMQ, finding its connection file
    /// in the usual runtime directories.
    pub fn connect(kernel_id: &str, username: &str) -> Result<Self, KernelError> {
        Self::connect_with(&RuntimeDirectories::new(), kernel_id, username)
    }

    /// Connect to a running kernel over ZeroMQ, using `provider` to find its
    /// connection file.
    pub fn connect_with(
        provider: &dyn ConnectionFileProvider,
        kernel_id: &str,
        username: &str,
    ) -> Result<Self, KernelError> {
        let info = provider.connection_info(kernel_id)?;
        let session = Session::new(&info.key, username)?;
        let transport = ZmqTransport::new(session.session_id())?;
        Self::open(info, session, transport)
    }

    /// Install the listener for unsolicited messages, replacing any earlier
    /// one. A listener may call this on its own connection; the new listener
    /// takes over from the next message.
    pub fn set_events(&self, events: impl KernelEvents + 'static) {
        *self.events.borrow_mut() = Some(Box::new(events));
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.borrow().state
    }

    /// Whether the kernel last reported itself busy.
    pub fn is_busy(&self) -> bool {
        self.inner.borrow().busy
    }

    pub fn session_id(&self) -> String {
        self.inner.borrow().session.session_id().to_string()
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        self.inner.borrow().info.clone()
    }

    /// The number of requests still waiting for a reply callback.
    pub fn pending_requests(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Whether callbacks are registered for the request `msg_id`.
    pub fn is_pending(&self, msg_id: &str) -> bool {
        self.inner.borrow().pending.contains(msg_id)
    }

    /// The open comm with the given ID.
    pub fn comm(&self, comm_id: &str) -> Option<Comm> {
        self.inner.borrow().comms.get(comm_id).cloned()
    }

    pub fn comm_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.borrow().comms.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Open a comm to `target_name` in the kernel.
    pub fn open_comm(&self, target_name: &str, data: Option<Value>) -> Result<Comm, KernelError> {
        Comm::open(self, target_name, data)
    }

    /// The message types that arrived on `channel` with no handler.
    pub fn unhandled_message_types(&self, channel: JupyterChannel) -> Vec<String> {
        self.inner.borrow().routers[channel.index()].unhandled()
    }

    /// Wait up to `timeout` for traffic from the kernel, then dispatch it
    /// and everything else already queued. Returns the number of messages
    /// dispatched.
    ///
    /// Fails with `ReentrantPoll` when called from one of its own callbacks.
    pub fn poll(&self, timeout: PollTimeout) -> Result<usize, KernelError> {
        let _guard = PollGuard::enter(&self.inner)?;

        let mut dispatched = 0;
        let mut wait = timeout;
        loop {
            let ready = {
                let mut inner = self.inner.borrow_mut();
                if !inner.is_open() {
                    break;
                }
                inner.transport.poll(&JupyterChannel::ALL, wait)?
            };
            if ready.is_empty() {
                break;
            }

            for channel in ready {
                let (identities, msg) = {
                    let mut inner = self.inner.borrow_mut();
                    if !inner.is_open() {
                        // Closed from a callback
                        return Ok(dispatched);
                    }
                    inner.receive(channel)?
                };
                self.dispatch(channel, &identities, msg)?;
                dispatched += 1;
            }

            // Drain whatever else is already queued without waiting again
            wait = PollTimeout::Immediate;
        }
        Ok(dispatched)
    }

    fn dispatch(
        &self,
        channel: JupyterChannel,
        identities: &[String],
        msg: JupyterMessage,
    ) -> Result<(), KernelError> {
        let handler = self.inner.borrow_mut().routers[channel.index()].resolve(msg.msg_type());
        match handler {
            Some(handler) => handler(self, identities, msg),
            None => Ok(()),
        }
    }

    /// Release all endpoints. Afterwards requests and `poll` fail with
    /// `ConnectionClosed`, and comm operations do nothing.
    pub fn close(&self) {
        self.inner.borrow_mut().close();
    }

    pub(crate) fn inner(&self) -> &Rc<RefCell<ConnectionInner>> {
        &self.inner
    }

    fn with_events(&self, notify: impl FnOnce(&mut dyn KernelEvents)) {
        // Taken out while it runs so the listener may replace itself
        let Some(mut events) = self.events.borrow_mut().take() else {
            return;
        };
        notify(events.as_mut());
        let mut slot = self.events.borrow_mut();
        if slot.is_none() {
            *slot = Some(events);
        }
    }
}

impl Drop for KernelConnection {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.close();
        }
    }
}
