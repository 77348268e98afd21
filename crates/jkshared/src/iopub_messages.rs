//
// iopub_messages.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Content of the messages the kernel broadcasts on the IOPub channel.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content of a `stream` message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Stream {
    /// The stream name, e.g. "stdout" or "stderr"
    pub name: String,

    /// The text written to the stream. Protocol 5 kernels call this field
    /// `text`.
    #[serde(alias = "text")]
    pub data: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Busy,
    Idle,
    Starting,

    /// Any state newer kernels report that isn't listed above
    #[serde(other)]
    Unknown,
}

/// Content of a `status` message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Status {
    pub execution_state: ExecutionState,
}

impl Status {
    /// Only `busy` counts as busy; every other state, known or not, is idle.
    pub fn is_busy(&self) -> bool {
        self.execution_state == ExecutionState::Busy
    }
}

/// Content of an `execute_input` message (`pyin` in older kernels).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecuteInput {
    pub execution_count: u32,
    pub code: String,
}

/// Content of an `execute_result` message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecuteResult {
    pub execution_count: u32,

    /// MIME bundle of the result
    #[serde(default)]
    pub data: Map<String, Value>,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Content of an `error` message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorOutput {
    pub ename: String,
    pub evalue: String,

    #[serde(default)]
    pub traceback: Vec<String>,
}

/// Content of a `display_data` message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DisplayData {
    /// Who produced the data; dropped from the protocol in version 5
    #[serde(default)]
    pub source: Option<String>,

    /// MIME bundle to display
    #[serde(default)]
    pub data: Map<String, Value>,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Content of a `clear_output` message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClearOutput {
    /// Wait to clear until new output is available
    #[serde(default)]
    pub wait: bool,
}
