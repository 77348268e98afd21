//
// mod.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use jkclient::kernel_connection::{InputReply, KernelEvents};
use jkclient::transport::MemoryTransport;
use jkclient::wire_message::WireMessage;
use jkclient::{Comm, KernelConnection, Session};
use jkshared::connection_info::ConnectionInfo;
use jkshared::iopub_messages::{
    DisplayData, ErrorOutput, ExecuteInput, ExecuteResult, Stream,
};
use jkshared::jupyter_message::{JupyterChannel, JupyterMessage, JupyterMessageHeader};
use serde_json::Value;

pub const KEY: &str = "a0436f6c-1916-498b-8eb9-e81ab9368e84";

pub fn connection_info(key: &str) -> ConnectionInfo {
    ConnectionInfo {
        transport: String::from("tcp"),
        ip: String::from("127.0.0.1"),
        shell_port: 50001,
        iopub_port: 50002,
        stdin_port: 50003,
        control_port: 50004,
        hb_port: 50005,
        key: key.to_string(),
        signature_scheme: String::from("hmac-sha256"),
        kernel_name: Some(String::from("python3")),
    }
}

/// Plays the kernel side of an in-memory connection.
pub struct FakeKernel {
    pub transport: MemoryTransport,
    pub session: Session,
}

impl FakeKernel {
    pub fn new(key: &str) -> Self {
        Self {
            transport: MemoryTransport::new(),
            session: Session::new(key, "kernel").expect("kernel session"),
        }
    }

    /// Queue a message for the client on `channel`.
    pub fn send(
        &self,
        channel: JupyterChannel,
        msg_type: &str,
        content: Value,
        parent: Option<&JupyterMessageHeader>,
    ) -> JupyterMessage {
        let msg = self.session.build(msg_type, Some(content), parent, None);
        let frames = self
            .session
            .serialize(&msg, &[])
            .expect("serialize kernel message");
        self.transport.deliver(channel, frames);
        msg
    }

    /// Queue a shell reply to `request`.
    pub fn reply(&self, request: &JupyterMessage, msg_type: &str, content: Value) {
        self.send(JupyterChannel::Shell, msg_type, content, Some(&request.header));
    }

    /// Queue an IOPub broadcast.
    pub fn publish(&self, msg_type: &str, content: Value) {
        self.send(JupyterChannel::IOPub, msg_type, content, None);
    }

    /// Decode every message the client has sent on `channel`.
    pub fn received(&self, channel: JupyterChannel) -> Vec<JupyterMessage> {
        self.transport
            .take_sent(channel)
            .into_iter()
            .map(|frames| {
                let wire = WireMessage::from_frames(frames).expect("delimiter");
                self.session
                    .deserialize(wire.parts)
                    .expect("client message verifies")
            })
            .collect()
    }

    /// The single message the client sent on `channel`.
    pub fn received_one(&self, channel: JupyterChannel) -> JupyterMessage {
        let mut received = self.received(channel);
        assert_eq!(received.len(), 1, "expected exactly one message on {}", channel);
        received.remove(0)
    }
}

/// Open a client connection to a fresh fake kernel.
pub fn connect() -> (KernelConnection, FakeKernel) {
    let kernel = FakeKernel::new(KEY);
    let session = Session::new(KEY, "tester").expect("client session");
    let connection = KernelConnection::open(connection_info(KEY), session, kernel.transport.clone())
        .expect("open connection");
    (connection, kernel)
}

/// What a `Recorder` saw.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Stream(String, String),
    Status(bool),
    ExecuteInput(u32, String),
    ExecuteResult(u32, Value),
    Error(String, String),
    DisplayData(Value),
    ClearOutput(bool),
    CommOpen(String, String, Value),
    InputRequest(String, bool),
}

/// Records every event, and keeps the comms and input replies handed to it.
#[derive(Clone, Default)]
pub struct Recorder {
    pub events: Rc<RefCell<Vec<Event>>>,
    pub comms: Rc<RefCell<Vec<Comm>>>,
    pub input_replies: Rc<RefCell<Vec<InputReply>>>,
}

impl Recorder {
    pub fn install(connection: &KernelConnection) -> Self {
        let recorder = Recorder::default();
        connection.set_events(recorder.clone());
        recorder
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl KernelEvents for Recorder {
    fn on_stream(&mut self, stream: &Stream) {
        self.push(Event::Stream(stream.name.clone(), stream.data.clone()));
    }

    fn on_status(&mut self, busy: bool) {
        self.push(Event::Status(busy));
    }

    fn on_execute_input(&mut self, input: &ExecuteInput) {
        self.push(Event::ExecuteInput(input.execution_count, input.code.clone()));
    }

    fn on_execute_result(&mut self, result: &ExecuteResult) {
        self.push(Event::ExecuteResult(
            result.execution_count,
            Value::Object(result.data.clone()),
        ));
    }

    fn on_error(&mut self, error: &ErrorOutput) {
        self.push(Event::Error(error.ename.clone(), error.evalue.clone()));
    }

    fn on_display_data(&mut self, display: &DisplayData) {
        self.push(Event::DisplayData(Value::Object(display.data.clone())));
    }

    fn on_clear_output(&mut self, wait: bool) {
        self.push(Event::ClearOutput(wait));
    }

    fn on_comm_open(&mut self, comm: Comm, data: Value) {
        self.push(Event::CommOpen(
            comm.comm_id().to_string(),
            comm.target_name().to_string(),
            data,
        ));
        self.comms.borrow_mut().push(comm);
    }

    fn on_input_request(&mut self, prompt: &str, password: bool, reply: InputReply) {
        self.push(Event::InputRequest(prompt.to_string(), password));
        self.input_replies.borrow_mut().push(reply);
    }
}
