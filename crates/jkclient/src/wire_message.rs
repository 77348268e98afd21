//
// wire_message.rs
//
// Copyright (C) 2024 Posit Software, PBC. All rights reserved.
//
//

use crate::error::KernelError;
use crate::wire_codec::DELIMITER;

/// A message as it travels over a socket: routing identities, then the
/// delimiter, then the signature, the four JSON frames and any buffers.
pub struct WireMessage {
    /// Opaque routing frames preceding the delimiter
    pub identities: Vec<Vec<u8>>,

    /// The parts of the message after the delimiter, as an array of byte
    /// arrays
    pub parts: Vec<Vec<u8>>,
}

impl WireMessage {
    /// Split raw frames at the delimiter.
    pub fn from_frames(mut frames: Vec<Vec<u8>>) -> Result<Self, KernelError> {
        let position = frames
            .iter()
            .position(|frame| frame.as_slice() == DELIMITER)
            .ok_or(KernelError::MissingDelimiter(frames.len()))?;
        let parts = frames.split_off(position + 1);
        frames.truncate(position);
        Ok(WireMessage {
            identities: frames,
            parts,
        })
    }

    /// Flatten into the frames to send, in order.
    pub fn into_frames(self) -> Vec<Vec<u8>> {
        let mut frames = self.identities;
        frames.reserve(self.parts.len() + 1);
        frames.push(DELIMITER.to_vec());
        frames.extend(self.parts);
        frames
    }

    /// The identity frames decoded as text.
    pub fn identity_strings(&self) -> Vec<String> {
        self.identities
            .iter()
            .map(|identity| String::from_utf8_lossy(identity).into_owned())
            .collect()
    }
}
