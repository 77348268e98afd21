//
// wire_codec.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Encoding of message frames and their HMAC signatures.

use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;

use crate::error::KernelError;

/// The frame separating routing identities from the signed payload.
pub const DELIMITER: &[u8] = b"<IDS|MSG>";

pub type HmacSha256 = Hmac<Sha256>;

/// Encode a value as UTF-8 JSON.
pub fn pack<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, KernelError> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode a UTF-8 JSON frame.
pub fn unpack<T: DeserializeOwned>(frame: &[u8]) -> Result<T, KernelError> {
    let text = std::str::from_utf8(frame)
        .map_err(|err| KernelError::MalformedPayload(format!("frame is not UTF-8: {}", err)))?;
    Ok(serde_json::from_str(text)?)
}

/// Sign `frames` with `key`: the lowercase hex HMAC-SHA256 of the frames
/// concatenated in order. An empty key disables signing and yields an empty
/// signature.
pub fn sign<F: AsRef<[u8]>>(key: &[u8], frames: &[F]) -> Result<Vec<u8>, KernelError> {
    Ok(Signer::new(key)?.sign(frames))
}

/// A prepared signing key. The HMAC state is keyed once and cloned for each
/// signature.
#[derive(Clone)]
pub struct Signer {
    hmac: Option<HmacSha256>,
}

impl Signer {
    pub fn new(key: &[u8]) -> Result<Self, KernelError> {
        if key.is_empty() {
            return Ok(Self { hmac: None });
        }
        let hmac = HmacSha256::new_from_slice(key)
            .map_err(|err| KernelError::MalformedPayload(format!("invalid signing key: {}", err)))?;
        Ok(Self { hmac: Some(hmac) })
    }

    /// Whether messages are signed and verified.
    pub fn is_enabled(&self) -> bool {
        self.hmac.is_some()
    }

    pub fn sign<F: AsRef<[u8]>>(&self, frames: &[F]) -> Vec<u8> {
        let Some(hmac) = &self.hmac else {
            return Vec::new();
        };
        let mut signature = hmac.clone();
        for frame in frames {
            signature.update(frame.as_ref());
        }
        hex::encode(signature.finalize().into_bytes()).into_bytes()
    }

    /// Check the hex `signature` against `frames` in constant time. Always
    /// succeeds when signing is disabled.
    pub fn verify<F: AsRef<[u8]>>(&self, signature: &[u8], frames: &[F]) -> bool {
        let Some(hmac) = &self.hmac else {
            return true;
        };
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let mut digest = hmac.clone();
        for frame in frames {
            digest.update(frame.as_ref());
        }
        digest.verify_slice(&expected).is_ok()
    }
}
