//
// comm_messages.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Content of the messages that open, use and close comms.

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Content of a `comm_open` message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommOpen {
    pub comm_id: String,

    /// The name of the comm target the other side should attach to
    pub target_name: String,

    #[serde(default = "empty_object")]
    pub data: Value,
}

/// Content of a `comm_msg` message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommMsg {
    pub comm_id: String,

    #[serde(default = "empty_object")]
    pub data: Value,
}

/// Content of a `comm_close` message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommClose {
    pub comm_id: String,

    #[serde(default = "empty_object")]
    pub data: Value,
}
