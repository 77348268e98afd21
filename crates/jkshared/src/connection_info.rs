//
// connection_info.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

use serde::{Deserialize, Serialize};

use crate::jupyter_message::JupyterChannel;

/// The only signature scheme the protocol defines.
pub const HMAC_SHA256: &str = "hmac-sha256";

fn default_signature_scheme() -> String {
    HMAC_SHA256.to_string()
}

fn default_transport() -> String {
    "tcp".to_string()
}

/// The contents of a Jupyter connection file: where the kernel's sockets
/// live and the key used to sign messages.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConnectionInfo {
    /// The transport, usually "tcp"
    #[serde(default = "default_transport")]
    pub transport: String,

    /// The address the kernel's sockets are bound to
    pub ip: String,

    /// The port for the shell channel
    pub shell_port: u16,

    /// The port for the IOPub channel
    pub iopub_port: u16,

    /// The port for the stdin channel
    pub stdin_port: u16,

    /// The port for the control channel
    pub control_port: u16,

    /// The port for the heartbeat channel
    pub hb_port: u16,

    /// The key used to sign messages; empty disables signing
    #[serde(default)]
    pub key: String,

    /// The signature scheme (e.g. "hmac-sha256")
    #[serde(default = "default_signature_scheme")]
    pub signature_scheme: String,

    /// The name of the kernel, when the launcher recorded it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_name: Option<String>,
}

impl ConnectionInfo {
    /// The port for the given channel.
    pub fn port(&self, channel: JupyterChannel) -> u16 {
        match channel {
            JupyterChannel::Shell => self.shell_port,
            JupyterChannel::IOPub => self.iopub_port,
            JupyterChannel::Stdin => self.stdin_port,
            JupyterChannel::Control => self.control_port,
        }
    }

    /// Given a port, return a URI-like string that can be used to connect to
    /// the port, given the other parameters in the connection file.
    ///
    /// Example: `32` => `"tcp://127.0.0.1:32"`
    pub fn endpoint(&self, port: u16) -> String {
        format!("{}://{}:{}", self.transport, self.ip, port)
    }

    /// The address of the socket backing the given channel.
    pub fn address(&self, channel: JupyterChannel) -> String {
        self.endpoint(self.port(channel))
    }
}
