//! # Mesh Packet Codec Module
//!
//! Everything needed to turn MQTT transport bytes into a classified Meshtastic
//! inner message and back:
//!
//! - [`identity`] - this node's numeric address and its `"!hex"` rendering
//! - [`channel`] - channel key normalization and the 8-bit XOR channel hash
//! - [`crypto`] - AES-CTR packet cipher with the Meshtastic nonce layout
//! - [`codec`] - ServiceEnvelope encode/decode pipeline
//!
//! Decode failures are routine on a shared topic (other channels, other keys,
//! corrupt gateways), so the whole pipeline is expressed as `Result` values
//! the caller can skip on, never as panics.

pub mod channel;
pub mod codec;
pub mod crypto;
pub mod identity;

pub use channel::Channel;
pub use codec::Codec;
pub use identity::Identity;

use thiserror::Error;

/// Reserved destination meaning "every node on the channel".
pub const BROADCAST_ID: u32 = 0xFFFF_FFFF;

/// Hop limit stamped on every outbound packet. Pass-through only; the bot
/// performs no routing.
pub const HOP_LIMIT: u32 = 3;

/// Errors from the packet codec layer.
///
/// `InvalidKey` is fatal at startup (no channel can be formed without a valid
/// key) but degrades to a skipped message if it somehow surfaces per-packet.
/// The other variants are expected, non-fatal outcomes of listening on a
/// shared topic and must never halt the inbound loop.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Channel key is not valid base64 or decodes to a length other than
    /// 0, 16, or 32 bytes.
    #[error("invalid channel key: {0}")]
    InvalidKey(String),

    /// The transport payload does not parse as a ServiceEnvelope.
    #[error("malformed service envelope: {0}")]
    MalformedEnvelope(prost::DecodeError),

    /// The packet cannot be decrypted into a valid inner message on this
    /// channel (wrong key, corruption, or traffic for another channel).
    #[error("packet not decodable on this channel")]
    NotDecodable,

    /// A node id string is not of the form `!hex`.
    #[error("invalid node id {0:?}")]
    InvalidNodeId(String),
}
