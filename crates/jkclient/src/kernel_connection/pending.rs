//
// pending.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Callbacks waiting for the reply to a request, keyed by request ID.

use std::collections::HashMap;

use jkshared::kernel_info::KernelInfoReply;
use jkshared::shell_messages::{
    CompleteOk, ConnectReply, ExecuteOk, HistoryReply, InspectOk, ShutdownReply,
};
use serde::de::DeserializeOwned;

use super::callbacks::ReplyCallbacks;

/// The pending requests of one request family.
pub struct PendingTable<T> {
    entries: HashMap<String, ReplyCallbacks<T>>,
}

impl<T> Default for PendingTable<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> PendingTable<T> {
    pub fn insert(&mut self, msg_id: String, callbacks: ReplyCallbacks<T>) {
        self.entries.insert(msg_id, callbacks);
    }

    /// Remove and return the callbacks for `msg_id`. A reply is delivered at
    /// most once.
    pub fn remove(&mut self, msg_id: &str) -> Option<ReplyCallbacks<T>> {
        self.entries.remove(msg_id)
    }

    pub fn contains(&self, msg_id: &str) -> bool {
        self.entries.contains_key(msg_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One pending table per request family.
#[derive(Default)]
pub struct PendingRequests {
    pub execute: PendingTable<ExecuteOk>,
    pub inspect: PendingTable<InspectOk>,
    pub complete: PendingTable<CompleteOk>,
    pub history: PendingTable<HistoryReply>,
    pub connect: PendingTable<ConnectReply>,
    pub kernel_info: PendingTable<KernelInfoReply>,
    pub shutdown: PendingTable<ShutdownReply>,
}

impl PendingRequests {
    /// The total number of requests awaiting a reply.
    pub fn len(&self) -> usize {
        self.execute.len()
            + self.inspect.len()
            + self.complete.len()
            + self.history.len()
            + self.connect.len()
            + self.kernel_info.len()
            + self.shutdown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, msg_id: &str) -> bool {
        self.execute.contains(msg_id)
            || self.inspect.contains(msg_id)
            || self.complete.contains(msg_id)
            || self.history.contains(msg_id)
            || self.connect.contains(msg_id)
            || self.kernel_info.contains(msg_id)
            || self.shutdown.contains(msg_id)
    }
}

/// The successful body of a reply, tied to the table its requests wait in.
pub trait ReplyFamily: DeserializeOwned + 'static {
    fn table(pending: &mut PendingRequests) -> &mut PendingTable<Self>;
}

impl ReplyFamily for ExecuteOk {
    fn table(pending: &mut PendingRequests) -> &mut PendingTable<Self> {
        &mut pending.execute
    }
}

impl ReplyFamily for InspectOk {
    fn table(pending: &mut PendingRequests) -> &mut PendingTable<Self> {
        &mut pending.inspect
    }
}

impl ReplyFamily for CompleteOk {
    fn table(pending: &mut PendingRequests) -> &mut PendingTable<Self> {
        &mut pending.complete
    }
}

impl ReplyFamily for HistoryReply {
    fn table(pending: &mut PendingRequests) -> &mut PendingTable<Self> {
        &mut pending.history
    }
}

impl ReplyFamily for ConnectReply {
    fn table(pending: &mut PendingRequests) -> &mut PendingTable<Self> {
        &mut pending.connect
    }
}

impl ReplyFamily for KernelInfoReply {
    fn table(pending: &mut PendingRequests) -> &mut PendingTable<Self> {
        &mut pending.kernel_info
    }
}

impl ReplyFamily for ShutdownReply {
    fn table(pending: &mut PendingRequests) -> &mut PendingTable<Self> {
        &mut pending.shutdown
    }
}
