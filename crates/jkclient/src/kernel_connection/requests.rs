//
// requests.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Requests sent on the shell channel.
//!
//! Every request returns the ID of the message sent, whether or not
//! callbacks were registered for its reply.

use jkshared::jupyter_message::JupyterChannel;
use jkshared::kernel_info::KernelInfoReply;
use jkshared::shell_messages::{
    CompleteOk, CompleteRequest, ConnectReply, ConnectRequest, ExecuteOk, ExecuteRequest,
    HistoryAccess, HistoryReply, HistoryRequest, InspectOk, InspectRequest, KernelInfoRequest,
    ShutdownReply, ShutdownRequest,
};
use serde::Serialize;

use super::callbacks::ReplyCallbacks;
use super::pending::ReplyFamily;
use super::KernelConnection;
use crate::error::KernelError;

impl KernelConnection {
    fn request<C: Serialize, T: ReplyFamily>(
        &self,
        msg_type: &str,
        content: &C,
        callbacks: ReplyCallbacks<T>,
    ) -> Result<String, KernelError> {
        let mut inner = self.inner.borrow_mut();
        inner.ensure_open()?;
        let content = serde_json::to_value(content)?;
        let msg_id = inner.send(JupyterChannel::Shell, msg_type, content, None)?;
        if !callbacks.is_empty() {
            T::table(&mut inner.pending).insert(msg_id.clone(), callbacks);
        }
        Ok(msg_id)
    }

    pub fn execute_request(
        &self,
        request: ExecuteRequest,
        callbacks: ReplyCallbacks<ExecuteOk>,
    ) -> Result<String, KernelError> {
        self.request("execute_request", &request, callbacks)
    }

    /// Ask for information about the object at `cursor_pos` in `code`.
    /// `detail_level` is 0 or 1.
    pub fn inspect_request(
        &self,
        code: &str,
        cursor_pos: usize,
        detail_level: u8,
        callbacks: ReplyCallbacks<InspectOk>,
    ) -> Result<String, KernelError> {
        let request = InspectRequest {
            code: code.to_string(),
            cursor_pos,
            detail_level,
        };
        self.request("inspect_request", &request, callbacks)
    }

    pub fn complete_request(
        &self,
        code: &str,
        cursor_pos: usize,
        callbacks: ReplyCallbacks<CompleteOk>,
    ) -> Result<String, KernelError> {
        let request = CompleteRequest {
            code: code.to_string(),
            cursor_pos,
        };
        self.request("complete_request", &request, callbacks)
    }

    /// Ask for lines `start..stop` of the history of `session`.
    pub fn history_request_range(
        &self,
        output: bool,
        raw: bool,
        session: i64,
        start: i64,
        stop: i64,
        callbacks: ReplyCallbacks<HistoryReply>,
    ) -> Result<String, KernelError> {
        self.history_request(
            output,
            raw,
            HistoryAccess::Range {
                session,
                start,
                stop,
            },
            callbacks,
        )
    }

    /// Ask for the last `n` lines of history.
    pub fn history_request_tail(
        &self,
        output: bool,
        raw: bool,
        n: i64,
        callbacks: ReplyCallbacks<HistoryReply>,
    ) -> Result<String, KernelError> {
        self.history_request(output, raw, HistoryAccess::Tail { n }, callbacks)
    }

    /// Ask for up to `n` history lines matching the glob `pattern`.
    pub fn history_request_search(
        &self,
        output: bool,
        raw: bool,
        pattern: &str,
        unique: bool,
        n: i64,
        callbacks: ReplyCallbacks<HistoryReply>,
    ) -> Result<String, KernelError> {
        self.history_request(
            output,
            raw,
            HistoryAccess::Search {
                pattern: pattern.to_string(),
                unique,
                n,
            },
            callbacks,
        )
    }

    fn history_request(
        &self,
        output: bool,
        raw: bool,
        access: HistoryAccess,
        callbacks: ReplyCallbacks<HistoryReply>,
    ) -> Result<String, KernelError> {
        let request = HistoryRequest {
            output,
            raw,
            access,
        };
        self.request("history_request", &request, callbacks)
    }

    pub fn connect_request(
        &self,
        callbacks: ReplyCallbacks<ConnectReply>,
    ) -> Result<String, KernelError> {
        self.request("connect_request", &ConnectRequest {}, callbacks)
    }

    pub fn kernel_info_request(
        &self,
        callbacks: ReplyCallbacks<KernelInfoReply>,
    ) -> Result<String, KernelError> {
        self.request("kernel_info_request", &KernelInfoRequest {}, callbacks)
    }

    /// Ask the kernel to shut down, and to start again if `restart` is set.
    pub fn shutdown_request(
        &self,
        restart: bool,
        callbacks: ReplyCallbacks<ShutdownReply>,
    ) -> Result<String, KernelError> {
        self.request("shutdown_request", &ShutdownRequest { restart }, callbacks)
    }
}
