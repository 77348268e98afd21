//
// jupyter_message.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The version of the Jupyter messaging protocol stamped on every header we
/// produce.
pub const PROTOCOL_VERSION: &str = "5.3";

/// The header of a Jupyter message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JupyterMessageHeader {
    /// The message ID; unique per message, used to correlate replies
    pub msg_id: String,

    /// The type of the message
    pub msg_type: String,

    /// The user who sent the message
    #[serde(default)]
    pub username: String,

    /// The ID of the session that sent the message
    #[serde(default)]
    pub session: String,

    /// The date/time the message was created, in ISO 8601 format
    #[serde(default)]
    pub date: String,

    /// The version of the Jupyter protocol
    #[serde(default)]
    pub version: String,
}

/// The set of Jupyter sockets ("channels") a client talks to. The heartbeat
/// channel carries no protocol messages and is not represented here.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JupyterChannel {
    /// The shell channel
    Shell,

    /// The iopub channel
    IOPub,

    /// The stdin channel
    Stdin,

    /// The control channel
    Control,
}

impl JupyterChannel {
    /// Every channel, in the order inbound traffic is scanned.
    pub const ALL: [JupyterChannel; 4] = [
        JupyterChannel::Shell,
        JupyterChannel::IOPub,
        JupyterChannel::Stdin,
        JupyterChannel::Control,
    ];

    /// The protocol name of the channel.
    pub fn name(&self) -> &'static str {
        match self {
            JupyterChannel::Shell => "shell",
            JupyterChannel::IOPub => "iopub",
            JupyterChannel::Stdin => "stdin",
            JupyterChannel::Control => "control",
        }
    }

    /// The position of the channel in `ALL`.
    pub fn index(&self) -> usize {
        match self {
            JupyterChannel::Shell => 0,
            JupyterChannel::IOPub => 1,
            JupyterChannel::Stdin => 2,
            JupyterChannel::Control => 3,
        }
    }
}

impl std::fmt::Display for JupyterChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A deserialized Jupyter message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JupyterMessage {
    /// The header of the message
    pub header: JupyterMessageHeader,

    /// The header of the message's parent (the message that caused this
    /// message). Transmitted as an empty mapping when absent.
    #[serde(with = "parent_header")]
    pub parent_header: Option<JupyterMessageHeader>,

    /// Additional metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// The message payload
    pub content: Value,

    /// Raw binary buffers trailing the message; never signed
    #[serde(skip)]
    pub buffers: Vec<Vec<u8>>,
}

impl JupyterMessage {
    /// The message type, from the header.
    pub fn msg_type(&self) -> &str {
        &self.header.msg_type
    }

    /// The message ID, from the header.
    pub fn msg_id(&self) -> &str {
        &self.header.msg_id
    }

    /// The ID of the message this one replies to, if any.
    pub fn parent_msg_id(&self) -> Option<&str> {
        self.parent_header.as_ref().map(|p| p.msg_id.as_str())
    }
}

/// Serde adapter mapping `None` to and from the empty mapping `{}`, which is
/// how the protocol spells "no parent".
pub mod parent_header {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::{Map, Value};

    use super::JupyterMessageHeader;

    pub fn serialize<S>(
        parent: &Option<JupyterMessageHeader>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match parent {
            Some(header) => header.serialize(serializer),
            None => Map::new().serialize(serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<JupyterMessageHeader>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        from_value(value).map_err(serde::de::Error::custom)
    }

    /// Interpret a decoded parent header value.
    pub fn from_value(value: Value) -> Result<Option<JupyterMessageHeader>, serde_json::Error> {
        match value {
            Value::Null => Ok(None),
            Value::Object(ref map) if map.is_empty() => Ok(None),
            other => serde_json::from_value(other).map(Some),
        }
    }
}
