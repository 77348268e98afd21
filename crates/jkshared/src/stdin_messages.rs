//
// stdin_messages.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

use serde::{Deserialize, Serialize};

/// Content of an `input_request`, sent by the kernel when code asks for
/// input.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InputRequest {
    /// The prompt to show the user
    pub prompt: String,

    /// If true, the input should not be echoed
    #[serde(default)]
    pub password: bool,
}

/// Content of an `input_reply`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InputReply {
    pub value: String,
}
