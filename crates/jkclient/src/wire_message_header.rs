//
// wire_message_header.rs
//
// Copyright (C) 2024 Posit Software, PBC. All rights reserved.
//
//

use jkshared::jupyter_message::{JupyterMessageHeader, PROTOCOL_VERSION};

/// Generate a fresh, unique message ID.
pub fn make_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Create a header for a new message of the given type.
pub fn make_header(msg_type: &str, session_id: &str, username: &str) -> JupyterMessageHeader {
    // Create an ISO 8601 date string
    let date = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    JupyterMessageHeader {
        msg_id: make_message_id(),
        msg_type: msg_type.to_string(),
        username: username.to_string(),
        session: session_id.to_string(),
        date,
        version: String::from(PROTOCOL_VERSION),
    }
}
