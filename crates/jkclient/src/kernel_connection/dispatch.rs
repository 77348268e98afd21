//
// dispatch.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Handlers for the messages the kernel sends, and the routing tables that
//! select them.

use std::rc::Rc;

use jkshared::comm_messages::{CommClose, CommMsg, CommOpen};
use jkshared::iopub_messages::{
    ClearOutput, DisplayData, ErrorOutput, ExecuteInput, ExecuteResult, Status, Stream,
};
use jkshared::jupyter_message::{JupyterChannel, JupyterMessage};
use jkshared::kernel_info::KernelInfoReply;
use jkshared::shell_messages::{
    CompleteOk, ConnectReply, ExecuteOk, HistoryReply, InspectOk, ReplyError, ReplyStatus,
    ShutdownReply,
};
use jkshared::stdin_messages::InputRequest;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::callbacks::InputReply;
use super::pending::ReplyFamily;
use super::KernelConnection;
use crate::comm::Comm;
use crate::error::KernelError;
use crate::message_router::MessageRouter;

/// Handles one decoded message. Receives the connection, the message's
/// identity frames, and the message.
pub(crate) type Handler = fn(&KernelConnection, &[String], JupyterMessage) -> Result<(), KernelError>;

/// Build the routing table for every channel, in `JupyterChannel::ALL`
/// order.
pub(crate) fn routers() -> [MessageRouter<Handler>; 4] {
    JupyterChannel::ALL.map(|channel| {
        let mut router: MessageRouter<Handler> = MessageRouter::new(channel);
        match channel {
            JupyterChannel::Shell => {
                router.register("execute_reply", handle_reply::<ExecuteOk>);
                router.register("inspect_reply", handle_reply::<InspectOk>);
                router.register("complete_reply", handle_reply::<CompleteOk>);
                router.register("history_reply", handle_reply::<HistoryReply>);
                router.register("connect_reply", handle_reply::<ConnectReply>);
                router.register("kernel_info_reply", handle_reply::<KernelInfoReply>);
                router.register("shutdown_reply", handle_reply::<ShutdownReply>);
            }
            JupyterChannel::IOPub => {
                router.register("stream", handle_stream);
                router.register("status", handle_status);
                router.register("execute_input", handle_execute_input);
                router.register("pyin", handle_execute_input);
                router.register("execute_result", handle_execute_result);
                router.register("error", handle_error);
                router.register("display_data", handle_display_data);
                router.register("clear_output", handle_clear_output);
                router.register("comm_open", handle_comm_open);
                router.register("comm_msg", handle_comm_msg);
                router.register("comm_close", handle_comm_close);
            }
            JupyterChannel::Stdin => {
                router.register("input_request", handle_input_request);
            }
            // Nothing is requested on control, so nothing is expected back
            JupyterChannel::Control => {}
        }
        router
    })
}

/// Decode the content of `msg` into its typed form.
fn content<T: DeserializeOwned>(msg: &JupyterMessage) -> Result<T, KernelError> {
    serde_json::from_value(msg.content.clone()).map_err(|err| {
        KernelError::MalformedPayload(format!("invalid {} content: {}", msg.msg_type(), err))
    })
}

/// Read the `status` of a reply. Replies without one are successes.
fn reply_status(msg: &JupyterMessage) -> Result<ReplyStatus, KernelError> {
    match msg.content.get("status") {
        None | Some(Value::Null) => Ok(ReplyStatus::Ok),
        Some(Value::String(status)) => {
            ReplyStatus::parse(status).ok_or_else(|| KernelError::UnknownReplyStatus {
                msg_type: msg.msg_type().to_string(),
                status: status.clone(),
            })
        }
        Some(other) => Err(KernelError::UnknownReplyStatus {
            msg_type: msg.msg_type().to_string(),
            status: other.to_string(),
        }),
    }
}

/// Deliver a reply to the callbacks registered for its request, if any.
fn handle_reply<T: ReplyFamily>(
    connection: &KernelConnection,
    _identities: &[String],
    msg: JupyterMessage,
) -> Result<(), KernelError> {
    // Checked before the lookup so that an incompatible kernel is noticed
    // even when nobody is waiting for the reply
    let status = reply_status(&msg)?;

    let callbacks = {
        let mut inner = connection.inner().borrow_mut();
        msg.parent_msg_id()
            .and_then(|parent_id| T::table(&mut inner.pending).remove(parent_id))
    };
    let Some(callbacks) = callbacks else {
        log::debug!(
            "Dropping {} for request {}; no callbacks are waiting for it",
            msg.msg_type(),
            msg.parent_msg_id().unwrap_or("<none>")
        );
        return Ok(());
    };

    match status {
        ReplyStatus::Ok => {
            if callbacks.wants_ok() {
                let body: T = content(&msg)?;
                callbacks.ok(body);
            }
        }
        ReplyStatus::Error => {
            if callbacks.wants_error() {
                let error: ReplyError = content(&msg)?;
                callbacks.error(error);
            }
        }
        ReplyStatus::Abort => callbacks.abort(),
    }
    Ok(())
}

fn handle_stream(
    connection: &KernelConnection,
    _identities: &[String],
    msg: JupyterMessage,
) -> Result<(), KernelError> {
    let stream: Stream = content(&msg)?;
    connection.with_events(|events| events.on_stream(&stream));
    Ok(())
}

fn handle_status(
    connection: &KernelConnection,
    _identities: &[String],
    msg: JupyterMessage,
) -> Result<(), KernelError> {
    let status: Status = content(&msg)?;
    let busy = status.is_busy();
    connection.inner().borrow_mut().busy = busy;
    connection.with_events(|events| events.on_status(busy));
    Ok(())
}

fn handle_execute_input(
    connection: &KernelConnection,
    _identities: &[String],
    msg: JupyterMessage,
) -> Result<(), KernelError> {
    let input: ExecuteInput = content(&msg)?;
    connection.with_events(|events| events.on_execute_input(&input));
    Ok(())
}

fn handle_execute_result(
    connection: &KernelConnection,
    _identities: &[String],
    msg: JupyterMessage,
) -> Result<(), KernelError> {
    let result: ExecuteResult = content(&msg)?;
    connection.with_events(|events| events.on_execute_result(&result));
    Ok(())
}

fn handle_error(
    connection: &KernelConnection,
    _identities: &[String],
    msg: JupyterMessage,
) -> Result<(), KernelError> {
    let error: ErrorOutput = content(&msg)?;
    connection.with_events(|events| events.on_error(&error));
    Ok(())
}

fn handle_display_data(
    connection: &KernelConnection,
    _identities: &[String],
    msg: JupyterMessage,
) -> Result<(), KernelError> {
    let display: DisplayData = content(&msg)?;
    connection.with_events(|events| events.on_display_data(&display));
    Ok(())
}

fn handle_clear_output(
    connection: &KernelConnection,
    _identities: &[String],
    msg: JupyterMessage,
) -> Result<(), KernelError> {
    let clear: ClearOutput = content(&msg)?;
    connection.with_events(|events| events.on_clear_output(clear.wait));
    Ok(())
}

fn handle_comm_open(
    connection: &KernelConnection,
    _identities: &[String],
    msg: JupyterMessage,
) -> Result<(), KernelError> {
    let open: CommOpen = content(&msg)?;
    let comm = Comm::new(
        open.comm_id,
        open.target_name,
        Rc::downgrade(connection.inner()),
    );
    connection.inner().borrow_mut().register_comm(comm.clone());
    log::debug!(
        "Kernel opened comm {} ({})",
        comm.comm_id(),
        comm.target_name()
    );
    connection.with_events(|events| events.on_comm_open(comm, open.data));
    Ok(())
}

fn handle_comm_msg(
    connection: &KernelConnection,
    _identities: &[String],
    msg: JupyterMessage,
) -> Result<(), KernelError> {
    let comm_msg: CommMsg = content(&msg)?;
    let comm = connection.comm(&comm_msg.comm_id).ok_or_else(|| KernelError::UnknownComm {
        msg_type: msg.msg_type().to_string(),
        comm_id: comm_msg.comm_id.clone(),
    })?;
    comm.handle_message(comm_msg.data);
    Ok(())
}

fn handle_comm_close(
    connection: &KernelConnection,
    _identities: &[String],
    msg: JupyterMessage,
) -> Result<(), KernelError> {
    let close: CommClose = content(&msg)?;
    let comm = connection
        .inner()
        .borrow_mut()
        .remove_comm(&close.comm_id)
        .ok_or_else(|| KernelError::UnknownComm {
            msg_type: msg.msg_type().to_string(),
            comm_id: close.comm_id.clone(),
        })?;
    log::debug!(
        "Kernel closed comm {} ({})",
        comm.comm_id(),
        comm.target_name()
    );
    comm.handle_close(close.data);
    Ok(())
}

fn handle_input_request(
    connection: &KernelConnection,
    _identities: &[String],
    msg: JupyterMessage,
) -> Result<(), KernelError> {
    let request: InputRequest = content(&msg)?;
    let reply = InputReply::new(Rc::downgrade(connection.inner()), msg.header);
    connection.with_events(|events| {
        events.on_input_request(&request.prompt, request.password, reply)
    });
    Ok(())
}
