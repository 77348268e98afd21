//
// callbacks.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

use std::cell::RefCell;
use std::rc::Weak;

use jkshared::iopub_messages::{
    DisplayData, ErrorOutput, ExecuteInput, ExecuteResult, Stream,
};
use jkshared::jupyter_message::{JupyterChannel, JupyterMessageHeader};
use jkshared::shell_messages::ReplyError;
use jkshared::stdin_messages;
use serde_json::Value;

use super::ConnectionInner;
use crate::comm::Comm;
use crate::error::KernelError;

/// The callbacks to run when the reply to one request arrives. Each is
/// optional; a request made with none of them registers nothing and its
/// reply is dropped.
pub struct ReplyCallbacks<T> {
    on_ok: Option<Box<dyn FnOnce(T)>>,
    on_error: Option<Box<dyn FnOnce(ReplyError)>>,
    on_abort: Option<Box<dyn FnOnce()>>,
}

impl<T> Default for ReplyCallbacks<T> {
    fn default() -> Self {
        Self {
            on_ok: None,
            on_error: None,
            on_abort: None,
        }
    }
}

impl<T> ReplyCallbacks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` with the reply body when the status is `ok`.
    pub fn on_ok(mut self, callback: impl FnOnce(T) + 'static) -> Self {
        self.on_ok = Some(Box::new(callback));
        self
    }

    /// Run `callback` with the exception details when the status is `error`.
    pub fn on_error(mut self, callback: impl FnOnce(ReplyError) + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Run `callback` when the kernel aborted the request.
    pub fn on_abort(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_abort = Some(Box::new(callback));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_ok.is_none() && self.on_error.is_none() && self.on_abort.is_none()
    }

    pub(crate) fn wants_ok(&self) -> bool {
        self.on_ok.is_some()
    }

    pub(crate) fn wants_error(&self) -> bool {
        self.on_error.is_some()
    }

    pub(crate) fn ok(self, body: T) {
        if let Some(callback) = self.on_ok {
            callback(body);
        }
    }

    pub(crate) fn error(self, error: ReplyError) {
        if let Some(callback) = self.on_error {
            callback(error);
        }
    }

    pub(crate) fn abort(self) {
        if let Some(callback) = self.on_abort {
            callback();
        }
    }
}

/// Receives the messages the kernel sends without being asked: output and
/// status on IOPub, comm traffic, and input prompts on stdin.
///
/// Every method does nothing by default; implement the ones you need.
#[allow(unused_variables)]
pub trait KernelEvents {
    /// Text written to one of the kernel's output streams
    fn on_stream(&mut self, stream: &Stream) {}

    /// The kernel became busy (`true`) or idle (`false`)
    fn on_status(&mut self, busy: bool) {}

    /// The kernel is about to execute code
    fn on_execute_input(&mut self, input: &ExecuteInput) {}

    /// The result of an execution
    fn on_execute_result(&mut self, result: &ExecuteResult) {}

    /// An execution raised an error
    fn on_error(&mut self, error: &ErrorOutput) {}

    fn on_display_data(&mut self, display: &DisplayData) {}

    fn on_clear_output(&mut self, wait: bool) {}

    /// The kernel opened a comm. The comm is already registered with the
    /// connection; attach handlers to it here.
    fn on_comm_open(&mut self, comm: Comm, data: Value) {}

    /// The kernel is waiting for input. Answer with `reply.send(..)`, now
    /// or later.
    fn on_input_request(&mut self, prompt: &str, password: bool, reply: InputReply) {}
}

/// Listener used until one is installed.
pub(crate) struct NoEvents;

impl KernelEvents for NoEvents {}

/// The answer to one `input_request`, sent on the stdin channel with the
/// request as its parent.
pub struct InputReply {
    connection: Weak<RefCell<ConnectionInner>>,
    parent: JupyterMessageHeader,
}

impl InputReply {
    pub(crate) fn new(
        connection: Weak<RefCell<ConnectionInner>>,
        parent: JupyterMessageHeader,
    ) -> Self {
        Self { connection, parent }
    }

    /// The ID of the `input_request` being answered.
    pub fn request_id(&self) -> &str {
        &self.parent.msg_id
    }

    /// Send `value` to the kernel.
    pub fn send(self, value: impl Into<String>) -> Result<(), KernelError> {
        let connection = self
            .connection
            .upgrade()
            .ok_or(KernelError::ConnectionClosed)?;
        let mut inner = connection.borrow_mut();
        inner.ensure_open()?;
        let content = serde_json::to_value(stdin_messages::InputReply {
            value: value.into(),
        })?;
        inner.send(JupyterChannel::Stdin, "input_reply", content, Some(&self.parent))?;
        Ok(())
    }
}
