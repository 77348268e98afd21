//
// shell_messages.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Content of the request/reply messages exchanged on the shell channel.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content of an `execute_request`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecuteRequest {
    /// The code to execute
    pub code: String,

    /// Run without broadcasting output or incrementing the execution count
    pub silent: bool,

    /// Record the code in the kernel's history
    pub store_history: bool,

    /// Expressions to evaluate after the code runs
    pub user_expressions: Map<String, Value>,

    /// Whether the kernel may prompt for input on the stdin channel
    pub allow_stdin: bool,
}

impl ExecuteRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            silent: false,
            store_history: true,
            user_expressions: Map::new(),
            allow_stdin: true,
        }
    }
}

/// Content of an `inspect_request`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InspectRequest {
    pub code: String,

    /// Cursor position, in unicode characters, where inspection is requested
    pub cursor_pos: usize,

    /// 0 or 1
    pub detail_level: u8,
}

/// Content of a `complete_request`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompleteRequest {
    pub code: String,
    pub cursor_pos: usize,
}

/// Content of a `history_request`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryRequest {
    /// Also return the output history
    pub output: bool,

    /// Return the raw input rather than the transformed input
    pub raw: bool,

    #[serde(flatten)]
    pub access: HistoryAccess,
}

/// The variant-specific fields of a `history_request`, keyed by
/// `hist_access_type`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "hist_access_type", rename_all = "lowercase")]
pub enum HistoryAccess {
    /// A range of lines from a given session
    Range { session: i64, start: i64, stop: i64 },

    /// The last `n` lines
    Tail { n: i64 },

    /// Lines matching a glob pattern
    Search {
        pattern: String,
        unique: bool,
        n: i64,
    },
}

/// Content of a `connect_request`; always empty.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ConnectRequest {}

/// Content of a `kernel_info_request`; always empty.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct KernelInfoRequest {}

/// Content of a `shutdown_request`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ShutdownRequest {
    pub restart: bool,
}

/// The `status` field of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok,
    Error,
    Abort,
}

impl ReplyStatus {
    /// Parse a status value. Older kernels spell the aborted status `abort`;
    /// current ones use `aborted`.
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "ok" => Some(ReplyStatus::Ok),
            "error" => Some(ReplyStatus::Error),
            "abort" | "aborted" => Some(ReplyStatus::Abort),
            _ => None,
        }
    }
}

/// The error fields shared by every reply whose status is `error`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ReplyError {
    /// Exception name
    #[serde(default)]
    pub ename: String,

    /// Exception value
    #[serde(default)]
    pub evalue: String,

    /// Traceback lines
    #[serde(default)]
    pub traceback: Vec<String>,
}

/// The successful content of an `execute_reply`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecuteOk {
    pub execution_count: u32,

    #[serde(default)]
    pub payload: Vec<Value>,

    #[serde(default)]
    pub user_expressions: Map<String, Value>,
}

/// The successful content of an `inspect_reply`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InspectOk {
    /// Whether an object was found; absent in older kernels
    #[serde(default)]
    pub found: bool,

    /// MIME bundle describing the object
    #[serde(default)]
    pub data: Map<String, Value>,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// The successful content of a `complete_reply`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompleteOk {
    pub matches: Vec<String>,
    pub cursor_start: usize,
    pub cursor_end: usize,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// One line of history: `(session, line_number, input)`, or with output
/// requested, `(session, line_number, [input, output])`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryEntry(pub i64, pub i64, pub Value);

/// Content of a `history_reply`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryReply {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// Content of a `connect_reply`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConnectReply {
    pub shell_port: u16,
    pub iopub_port: u16,
    pub stdin_port: u16,
    pub hb_port: u16,

    /// Only reported by newer kernels
    #[serde(default)]
    pub control_port: Option<u16>,
}

/// Content of a `shutdown_reply`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ShutdownReply {
    #[serde(default)]
    pub restart: bool,
}
