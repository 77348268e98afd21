//! Jupyter kernel protocol message types shared by the jkclient crates.

/// Connection file contents
pub mod connection_info;

/// Jupyter message and header types
pub mod jupyter_message;

/// Comm message content
pub mod comm_messages;

/// IOPub message content
pub mod iopub_messages;

/// Kernel info reply content
pub mod kernel_info;

/// Shell request and reply content
pub mod shell_messages;

/// Stdin message content
pub mod stdin_messages;
