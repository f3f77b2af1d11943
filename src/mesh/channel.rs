//! Channel identity: the (name, key) pair and its 8-bit hash.
//!
//! Every MeshPacket carries `channel`, an XOR fold of the channel name and the
//! raw key bytes. Peers drop packets whose hash does not match their own
//! channel, so this value must reproduce the firmware computation exactly.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::mesh::MeshError;

/// A named, key-scoped broadcast domain on the mesh.
///
/// The key is kept in its textual base64 form; [`Channel::key_bytes`] performs
/// normalization and decoding on demand so the hash is always a pure function
/// of the current (name, key) pair.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    /// Base64 channel key. URL-safe alphabet and missing padding are accepted
    /// and normalized before decoding. Empty means the channel is unencrypted.
    pub key: String,
}

impl Channel {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }

    /// Decode the channel key to raw bytes.
    ///
    /// Accepts the URL-safe alphabet (`-`/`_` swapped for `+`/`/`) and pads
    /// with `=` to a multiple of 4 before decoding. Valid lengths are 0
    /// (unencrypted channel), 16 (AES-128) and 32 (AES-256) bytes.
    pub fn key_bytes(&self) -> Result<Vec<u8>, MeshError> {
        let mut normalized = self.key.replace('-', "+").replace('_', "/");
        while normalized.len() % 4 != 0 {
            normalized.push('=');
        }
        let bytes = BASE64
            .decode(normalized.as_bytes())
            .map_err(|e| MeshError::InvalidKey(format!("bad base64: {e}")))?;
        match bytes.len() {
            0 | 16 | 32 => Ok(bytes),
            n => Err(MeshError::InvalidKey(format!(
                "key must decode to 0, 16 or 32 bytes, got {n}"
            ))),
        }
    }

    /// The 8-bit channel hash carried in every MeshPacket:
    /// XOR-fold of the UTF-8 name bytes XOR the XOR-fold of the raw key bytes.
    pub fn hash(&self) -> Result<u8, MeshError> {
        let key = self.key_bytes()?;
        Ok(xor_fold(self.name.as_bytes()) ^ xor_fold(&key))
    }
}

fn xor_fold(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}
