//! A client for the Jupyter kernel wire protocol: connects to a running
//! kernel's shell, IOPub, stdin and control channels, sends signed requests,
//! and dispatches replies, output and comm traffic to callbacks.

#![allow(missing_docs)]

pub mod comm;
pub mod connection_file;
pub mod error;
pub mod kernel_connection;
pub mod message_router;
pub mod session;
pub mod transport;
pub mod wire_codec;
pub mod wire_message;
pub mod wire_message_header;

pub use comm::Comm;
pub use error::KernelError;
pub use kernel_connection::{
    ConnectionState, InputReply, KernelConnection, KernelEvents, ReplyCallbacks,
};
pub use session::{SendOptions, Session};
pub use transport::PollTimeout;
