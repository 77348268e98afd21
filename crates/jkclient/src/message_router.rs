//
// message_router.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Per-channel mapping from message type to handler.

use std::collections::HashMap;

use jkshared::jupyter_message::JupyterChannel;

/// Resolves the handler for messages arriving on one channel.
///
/// Handlers are registered up front. Every resolution, including "no
/// handler", is remembered, so an unhandled message type is reported once
/// as a warning and afterwards only at debug level. An unhandled type is
/// never an error: kernels add message types over time.
pub struct MessageRouter<H: Copy> {
    channel: JupyterChannel,
    handlers: HashMap<String, H>,
    resolved: HashMap<String, Option<H>>,
}

impl<H: Copy> MessageRouter<H> {
    pub fn new(channel: JupyterChannel) -> Self {
        Self {
            channel,
            handlers: HashMap::new(),
            resolved: HashMap::new(),
        }
    }

    pub fn channel(&self) -> JupyterChannel {
        self.channel
    }

    /// Register the handler for `msg_type`, replacing any earlier one.
    pub fn register(&mut self, msg_type: &str, handler: H) {
        self.handlers.insert(msg_type.to_string(), handler);
        self.resolved.remove(msg_type);
    }

    /// Find the handler for `msg_type`.
    pub fn resolve(&mut self, msg_type: &str) -> Option<H> {
        if let Some(resolution) = self.resolved.get(msg_type) {
            if resolution.is_none() {
                log::debug!(
                    "Ignoring unhandled {} message '{}'",
                    self.channel,
                    msg_type
                );
            }
            return *resolution;
        }

        let resolution = self.handlers.get(msg_type).copied();
        if resolution.is_none() {
            log::warn!(
                "No handler for {} message '{}'; ignoring it",
                self.channel,
                msg_type
            );
        }
        self.resolved.insert(msg_type.to_string(), resolution);
        resolution
    }

    /// Whether a resolution for `msg_type` has been remembered.
    pub fn is_resolved(&self, msg_type: &str) -> bool {
        self.resolved.contains_key(msg_type)
    }

    /// The message types seen on this channel that have no handler.
    pub fn unhandled(&self) -> Vec<String> {
        let mut unhandled: Vec<String> = self
            .resolved
            .iter()
            .filter(|(_, resolution)| resolution.is_none())
            .map(|(msg_type, _)| msg_type.clone())
            .collect();
        unhandled.sort();
        unhandled
    }
}
