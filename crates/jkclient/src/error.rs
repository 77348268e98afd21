//
// error.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

use std::path::PathBuf;

use log::error;

use crate::transport::TransportError;

/// Errors raised by the kernel client.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// No connection file could be found for the kernel
    #[error("Could not find connection file for kernel {0}")]
    DescriptorNotFound(String),

    /// A connection file was found but could not be read
    #[error("Invalid connection file {}: {reason}", path.display())]
    InvalidDescriptor { path: PathBuf, reason: String },

    /// The connection file asks for a signature scheme we don't implement
    #[error("Unsupported signature scheme '{0}'")]
    UnsupportedSignatureScheme(String),

    /// A message had fewer frames than the protocol requires
    #[error("Message too short: expected at least 5 frames after the delimiter, got {0}")]
    TruncatedMessage(usize),

    /// A received message had no `<IDS|MSG>` delimiter frame
    #[error("Message has no delimiter frame ({0} frames received)")]
    MissingDelimiter(usize),

    /// The HMAC signature of a received message did not match
    #[error("Invalid signature on received message")]
    SignatureMismatch,

    /// A frame or message content could not be decoded
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// A reply carried a status outside the supported set
    #[error("Unknown {msg_type} status '{status}'")]
    UnknownReplyStatus { msg_type: String, status: String },

    /// The kernel referenced a comm this side never opened or already closed
    #[error("Received {msg_type} for unknown comm {comm_id}")]
    UnknownComm { msg_type: String, comm_id: String },

    /// The connection was used after being closed
    #[error("Connection to kernel is closed")]
    ConnectionClosed,

    /// `poll` was called from inside a callback it dispatched
    #[error("poll() called re-entrantly from a message callback")]
    ReentrantPoll,

    /// The underlying transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl KernelError {
    /// Whether this error means the peer can no longer be trusted: the
    /// message stream is corrupt, forged, or from an incompatible kernel.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            KernelError::TruncatedMessage(_)
                | KernelError::MissingDelimiter(_)
                | KernelError::SignatureMismatch
                | KernelError::MalformedPayload(_)
                | KernelError::UnknownReplyStatus { .. }
                | KernelError::UnknownComm { .. }
        )
    }

    pub fn log(&self) {
        error!("{}", self);
    }
}

impl From<serde_json::Error> for KernelError {
    fn from(err: serde_json::Error) -> Self {
        KernelError::MalformedPayload(err.to_string())
    }
}
