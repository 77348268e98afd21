//
// session.rs
//
// Copyright (C) 2024 Posit Software, PBC. All rights reserved.
//
//

//! Builds, signs, sends and receives Jupyter messages on behalf of one
//! client session.

use jkshared::jupyter_message::{parent_header, JupyterChannel, JupyterMessage, JupyterMessageHeader};
use serde_json::{Map, Value};

use crate::error::KernelError;
use crate::transport::Transport;
use crate::wire_codec::{self, Signer};
use crate::wire_message::WireMessage;
use crate::wire_message_header::make_header;

/// The optional parts of an outgoing message.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Message metadata; empty when absent
    pub metadata: Option<Map<String, Value>>,

    /// Routing identities placed before the delimiter
    pub identities: Vec<Vec<u8>>,

    /// Binary buffers sent after the content frame
    pub buffers: Vec<Vec<u8>>,
}

/// A client session: the identity stamped on every outgoing header and the
/// key used to sign and verify messages. Shared by all four channels.
#[derive(Clone)]
pub struct Session {
    /// The ID of the session
    session_id: String,

    /// The username of the user who owns the session
    username: String,

    /// The signing key, prepared once
    signer: Signer,

    /// The packed form of an empty content mapping
    empty_content: Vec<u8>,
}

impl Session {
    /// Create a session with a fresh random ID.
    pub fn new(key: &str, username: &str) -> Result<Self, KernelError> {
        Self::with_id(uuid::Uuid::new_v4().to_string(), key, username)
    }

    /// Create a session with a known ID.
    pub fn with_id(session_id: String, key: &str, username: &str) -> Result<Self, KernelError> {
        Ok(Self {
            session_id,
            username: username.to_string(),
            signer: Signer::new(key.as_bytes())?,
            empty_content: wire_codec::pack(&Map::new())?,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Whether outgoing messages are signed and incoming ones verified.
    pub fn is_signing(&self) -> bool {
        self.signer.is_enabled()
    }

    /// Build a new message. Omitted content and metadata become empty
    /// mappings; an omitted parent becomes "no parent".
    pub fn build(
        &self,
        msg_type: &str,
        content: Option<Value>,
        parent: Option<&JupyterMessageHeader>,
        metadata: Option<Map<String, Value>>,
    ) -> JupyterMessage {
        JupyterMessage {
            header: make_header(msg_type, &self.session_id, &self.username),
            parent_header: parent.cloned(),
            metadata: metadata.unwrap_or_default(),
            content: content.unwrap_or_else(|| Value::Object(Map::new())),
            buffers: Vec::new(),
        }
    }

    /// Turn a message into the frames to send, signature included.
    pub fn serialize(
        &self,
        msg: &JupyterMessage,
        identities: &[Vec<u8>],
    ) -> Result<Vec<Vec<u8>>, KernelError> {
        let content = match &msg.content {
            Value::Null => self.empty_content.clone(),
            Value::Object(map) if map.is_empty() => self.empty_content.clone(),
            content => wire_codec::pack(content)?,
        };
        let parent = match &msg.parent_header {
            Some(parent) => wire_codec::pack(parent)?,
            None => wire_codec::pack(&Map::new())?,
        };
        let payload = [
            wire_codec::pack(&msg.header)?,
            parent,
            wire_codec::pack(&msg.metadata)?,
            content,
        ];

        let mut parts = Vec::with_capacity(payload.len() + 1 + msg.buffers.len());
        parts.push(self.signer.sign(&payload));
        parts.extend(payload);
        parts.extend(msg.buffers.iter().cloned());

        Ok(WireMessage {
            identities: identities.to_vec(),
            parts,
        }
        .into_frames())
    }

    /// Decode the frames following the delimiter: the signature, the four
    /// JSON frames, then any buffers.
    pub fn deserialize(&self, mut parts: Vec<Vec<u8>>) -> Result<JupyterMessage, KernelError> {
        if parts.len() < 5 {
            return Err(KernelError::TruncatedMessage(parts.len()));
        }
        if !self.signer.verify(&parts[0], &parts[1..5]) {
            return Err(KernelError::SignatureMismatch);
        }

        let buffers = parts.split_off(5);
        let header: JupyterMessageHeader = wire_codec::unpack(&parts[1])?;
        let parent: Value = wire_codec::unpack(&parts[2])?;
        let metadata: Value = wire_codec::unpack(&parts[3])?;
        let content: Value = wire_codec::unpack(&parts[4])?;

        let metadata = match metadata {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(KernelError::MalformedPayload(format!(
                    "metadata of {} message is not a mapping: {}",
                    header.msg_type, other
                )))
            }
        };

        Ok(JupyterMessage {
            parent_header: parent_header::from_value(parent)?,
            header,
            metadata,
            content,
            buffers,
        })
    }

    /// Build a message and send it on `channel`. Returns the message sent;
    /// its ID correlates any reply.
    pub fn send<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        channel: JupyterChannel,
        msg_type: &str,
        content: Value,
        parent: Option<&JupyterMessageHeader>,
        options: SendOptions,
    ) -> Result<JupyterMessage, KernelError> {
        let mut msg = self.build(msg_type, Some(content), parent, options.metadata);
        msg.buffers = options.buffers;
        self.send_message(transport, channel, &msg, &options.identities)?;
        Ok(msg)
    }

    /// Send an already built message on `channel`, every frame but the last
    /// marked as having more to follow.
    pub fn send_message<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        channel: JupyterChannel,
        msg: &JupyterMessage,
        identities: &[Vec<u8>],
    ) -> Result<(), KernelError> {
        let frames = self.serialize(msg, identities)?;
        let last = frames.len() - 1;
        for (index, frame) in frames.into_iter().enumerate() {
            transport.send(channel, frame, index < last)?;
        }
        log::trace!(
            "[session {}] Sent {} on {} ({})",
            self.session_id,
            msg.header.msg_type,
            channel,
            msg.header.msg_id
        );
        Ok(())
    }

    /// Receive one message from `channel`, with its identity frames decoded
    /// as text.
    pub fn receive<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        channel: JupyterChannel,
    ) -> Result<(Vec<String>, JupyterMessage), KernelError> {
        let mut frames = vec![transport.recv(channel)?];
        while transport.has_more(channel) {
            frames.push(transport.recv(channel)?);
        }

        let wire = WireMessage::from_frames(frames)?;
        let identities = wire.identity_strings();
        let msg = self.deserialize(wire.parts)?;
        log::trace!(
            "[session {}] Received {} on {} ({})",
            self.session_id,
            msg.header.msg_type,
            channel,
            msg.header.msg_id
        );
        Ok((identities, msg))
    }
}
