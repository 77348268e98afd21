//
// stdin_test.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

#[path = "common/mod.rs"]
mod common;

use common::{connect, Event, Recorder};
use jkclient::error::KernelError;
use jkclient::PollTimeout;
use jkshared::jupyter_message::JupyterChannel;
use serde_json::json;

#[test]
fn test_input_request_and_reply() {
    let (connection, kernel) = connect();
    let recorder = Recorder::install(&connection);

    let request = kernel.send(
        JupyterChannel::Stdin,
        "input_request",
        json!({"prompt": "Name: ", "password": false}),
        None,
    );
    connection.poll(PollTimeout::Immediate).unwrap();
    assert_eq!(
        recorder.events(),
        vec![Event::InputRequest(String::from("Name: "), false)]
    );

    let reply = recorder.input_replies.borrow_mut().remove(0);
    assert_eq!(reply.request_id(), request.header.msg_id);
    reply.send("Ada").unwrap();

    let sent = kernel.received_one(JupyterChannel::Stdin);
    assert_eq!(sent.header.msg_type, "input_reply");
    assert_eq!(sent.content, json!({"value": "Ada"}));
    assert_eq!(
        sent.parent_header.map(|parent| parent.msg_id),
        Some(request.header.msg_id)
    );
    assert!(kernel.received(JupyterChannel::Shell).is_empty());
}

#[test]
fn test_password_prompt() {
    let (connection, kernel) = connect();
    let recorder = Recorder::install(&connection);

    kernel.send(
        JupyterChannel::Stdin,
        "input_request",
        json!({"prompt": "Password: ", "password": true}),
        None,
    );
    connection.poll(PollTimeout::Immediate).unwrap();
    assert_eq!(
        recorder.events(),
        vec![Event::InputRequest(String::from("Password: "), true)]
    );
}

#[test]
fn test_input_reply_after_close() {
    let (connection, kernel) = connect();
    let recorder = Recorder::install(&connection);

    kernel.send(
        JupyterChannel::Stdin,
        "input_request",
        json!({"prompt": "> "}),
        None,
    );
    connection.poll(PollTimeout::Immediate).unwrap();
    let reply = recorder.input_replies.borrow_mut().remove(0);

    connection.close();
    assert!(matches!(reply.send("late"), Err(KernelError::ConnectionClosed)));
}

#[test]
fn test_input_reply_after_drop() {
    let (connection, kernel) = connect();
    let recorder = Recorder::install(&connection);

    kernel.send(
        JupyterChannel::Stdin,
        "input_request",
        json!({"prompt": "> "}),
        None,
    );
    connection.poll(PollTimeout::Immediate).unwrap();
    let reply = recorder.input_replies.borrow_mut().remove(0);

    drop(connection);
    assert!(matches!(reply.send("late"), Err(KernelError::ConnectionClosed)));
}
