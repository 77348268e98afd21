//
// comm.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Comms: named, bidirectional message streams layered on the shell and
//! IOPub channels.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use jkshared::comm_messages::{CommClose, CommMsg, CommOpen};
use jkshared::jupyter_message::JupyterChannel;
use serde_json::{Map, Value};

use crate::error::KernelError;
use crate::kernel_connection::{ConnectionInner, KernelConnection};

type MessageHandler = Box<dyn FnMut(&Comm, Value)>;
type CloseHandler = Box<dyn FnOnce(&Comm, Value)>;

struct CommInner {
    comm_id: String,
    target_name: String,

    /// Used only to send; a comm never keeps its connection alive
    connection: Weak<RefCell<ConnectionInner>>,

    closed: Cell<bool>,
    on_message: RefCell<Option<MessageHandler>>,
    on_close: RefCell<Option<CloseHandler>>,
}

/// One end of a comm. Clones refer to the same comm.
#[derive(Clone)]
pub struct Comm {
    inner: Rc<CommInner>,
}

impl Comm {
    pub(crate) fn new(
        comm_id: String,
        target_name: String,
        connection: Weak<RefCell<ConnectionInner>>,
    ) -> Self {
        Self {
            inner: Rc::new(CommInner {
                comm_id,
                target_name,
                connection,
                closed: Cell::new(false),
                on_message: RefCell::new(None),
                on_close: RefCell::new(None),
            }),
        }
    }

    /// Open a new comm to `target_name` in the kernel: registers it with the
    /// connection and sends `comm_open` on the shell channel.
    pub fn open(
        connection: &KernelConnection,
        target_name: &str,
        data: Option<Value>,
    ) -> Result<Comm, KernelError> {
        let comm_id = uuid::Uuid::new_v4().to_string();
        let comm = Comm::new(
            comm_id.clone(),
            target_name.to_string(),
            Rc::downgrade(connection.inner()),
        );

        let mut inner = connection.inner().borrow_mut();
        inner.ensure_open()?;
        let content = serde_json::to_value(CommOpen {
            comm_id,
            target_name: target_name.to_string(),
            data: data.unwrap_or_else(|| Value::Object(Map::new())),
        })?;
        inner.register_comm(comm.clone());
        if let Err(err) = inner.send(JupyterChannel::Shell, "comm_open", content, None) {
            inner.remove_comm(comm.comm_id());
            return Err(err);
        }
        Ok(comm)
    }

    pub fn comm_id(&self) -> &str {
        &self.inner.comm_id
    }

    pub fn target_name(&self) -> &str {
        &self.inner.target_name
    }

    /// Whether the comm was closed by either side, or its connection closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// Run `handler` for every message the kernel sends on this comm.
    pub fn on_message(&self, handler: impl FnMut(&Comm, Value) + 'static) {
        *self.inner.on_message.borrow_mut() = Some(Box::new(handler));
    }

    /// Run `handler` if the kernel closes this comm.
    pub fn on_close(&self, handler: impl FnOnce(&Comm, Value) + 'static) {
        *self.inner.on_close.borrow_mut() = Some(Box::new(handler));
    }

    /// Send `data` to the kernel side of the comm. Does nothing once the comm
    /// or its connection is closed.
    pub fn message(&self, data: Value) -> Result<(), KernelError> {
        self.send("comm_msg", |comm_id| {
            serde_json::to_value(CommMsg { comm_id, data })
        })
    }

    /// Close the comm, sending `data` with the notice. Does nothing once the
    /// comm or its connection is closed.
    pub fn close(&self, data: Value) -> Result<(), KernelError> {
        self.send("comm_close", |comm_id| {
            serde_json::to_value(CommClose { comm_id, data })
        })?;
        if let Some(connection) = self.inner.connection.upgrade() {
            connection.borrow_mut().remove_comm(self.comm_id());
        }
        self.mark_closed();
        Ok(())
    }

    fn send(
        &self,
        msg_type: &str,
        content: impl FnOnce(String) -> Result<Value, serde_json::Error>,
    ) -> Result<(), KernelError> {
        if self.is_closed() {
            return Ok(());
        }
        let Some(connection) = self.inner.connection.upgrade() else {
            return Ok(());
        };
        let mut connection = connection.borrow_mut();
        if !connection.is_open() || !connection.has_comm(self.comm_id()) {
            return Ok(());
        }
        let content = content(self.comm_id().to_string())?;
        connection.send(JupyterChannel::Shell, msg_type, content, None)?;
        Ok(())
    }

    pub(crate) fn mark_closed(&self) {
        self.inner.closed.set(true);
    }

    pub(crate) fn handle_message(&self, data: Value) {
        // Taken out while it runs so the handler may use this comm freely
        let handler = self.inner.on_message.borrow_mut().take();
        match handler {
            Some(mut handler) => {
                handler(self, data);
                let mut slot = self.inner.on_message.borrow_mut();
                if slot.is_none() {
                    *slot = Some(handler);
                }
            }
            None => log::debug!(
                "Comm {} ({}) has no message handler; dropping message",
                self.comm_id(),
                self.target_name()
            ),
        }
    }

    pub(crate) fn handle_close(&self, data: Value) {
        self.mark_closed();
        let handler = self.inner.on_close.borrow_mut().take();
        if let Some(handler) = handler {
            handler(self, data);
        }
    }
}

impl std::fmt::Debug for Comm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comm")
            .field("comm_id", &self.inner.comm_id)
            .field("target_name", &self.inner.target_name)
            .field("closed", &self.inner.closed.get())
            .finish()
    }
}
