//! AES-CTR packet cipher.
//!
//! Meshtastic channel encryption is AES in counter mode with a 16-byte
//! initial counter block built from the packet id and sender node number,
//! each zero-extended to a little-endian u64. Counter mode carries no
//! authentication tag: decrypting with the wrong key yields garbage rather
//! than an error, and the only failure signal is the plaintext not parsing
//! as a protobuf Data message downstream.
//!
//! Nonce uniqueness per (key, packet id, sender) rests entirely on packet
//! ids being drawn uniformly at random from the full 32-bit range.

use aes::{Aes128, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};

use crate::mesh::MeshError;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Build the 16-byte initial counter block for a packet.
fn nonce(packet_id: u32, from_node: u32) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(&u64::from(packet_id).to_le_bytes());
    iv[8..].copy_from_slice(&u64::from(from_node).to_le_bytes());
    iv
}

/// Apply the CTR keystream for `(key, packet_id, from_node)` in place.
/// CTR is an involution, so the same call performs both directions.
fn apply_keystream(
    key: &[u8],
    packet_id: u32,
    from_node: u32,
    buf: &mut [u8],
) -> Result<(), MeshError> {
    let iv = nonce(packet_id, from_node);
    match key.len() {
        16 => {
            let mut cipher = Aes128Ctr::new_from_slices(key, &iv)
                .map_err(|e| MeshError::InvalidKey(e.to_string()))?;
            cipher.apply_keystream(buf);
            Ok(())
        }
        32 => {
            let mut cipher = Aes256Ctr::new_from_slices(key, &iv)
                .map_err(|e| MeshError::InvalidKey(e.to_string()))?;
            cipher.apply_keystream(buf);
            Ok(())
        }
        n => Err(MeshError::InvalidKey(format!(
            "cipher requires a 16 or 32 byte key, got {n}"
        ))),
    }
}

/// Encrypt a serialized inner message.
pub fn encrypt(
    key: &[u8],
    packet_id: u32,
    from_node: u32,
    plaintext: &[u8],
) -> Result<Vec<u8>, MeshError> {
    let mut buf = plaintext.to_vec();
    apply_keystream(key, packet_id, from_node, &mut buf)?;
    Ok(buf)
}

/// Decrypt ciphertext carried in a MeshPacket. Tampering is undetectable
/// here; callers must validate the result by parsing it.
pub fn decrypt(
    key: &[u8],
    packet_id: u32,
    from_node: u32,
    ciphertext: &[u8],
) -> Result<Vec<u8>, MeshError> {
    encrypt(key, packet_id, from_node, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY16: [u8; 16] = [
        0xd4, 0xf1, 0xbb, 0x3a, 0x20, 0x29, 0x07, 0x59, 0xf0, 0xbc, 0xff, 0xab, 0xcf, 0x4e, 0x69,
        0x01,
    ];

    #[test]
    fn nonce_layout_is_le_id_then_le_from() {
        let iv = nonce(0x0102_0304, 0xAABB_CCDD);
        assert_eq!(
            iv,
            [
                0x04, 0x03, 0x02, 0x01, 0, 0, 0, 0, // packet id, little-endian u64
                0xDD, 0xCC, 0xBB, 0xAA, 0, 0, 0, 0, // from node, little-endian u64
            ]
        );
    }

    #[test]
    fn pinned_ciphertext_matches_reference() {
        // Golden vector produced by a reference AES-128-CTR run with the
        // default LongFast key.
        let pt = [0x08, 0x01, 0x12, 0x05, b'h', b'e', b'l', b'l', b'o'];
        let ct = encrypt(&KEY16, 0x1234_5678, 0xABCD_E1E2, &pt).unwrap();
        assert_eq!(
            ct,
            [0xbc, 0xa7, 0x06, 0x75, 0x38, 0xcf, 0x78, 0x53, 0x30]
        );
    }

    #[test]
    fn round_trip_aes128() {
        let msg = b"the quick brown fox";
        let ct = encrypt(&KEY16, 42, 7, msg).unwrap();
        assert_ne!(&ct[..], &msg[..]);
        assert_eq!(decrypt(&KEY16, 42, 7, &ct).unwrap(), msg);
    }

    #[test]
    fn round_trip_aes256() {
        let key: Vec<u8> = (0u8..32).collect();
        let msg = b"\xf0\x9f\xa6\x9c parrot payload";
        let ct = encrypt(&key, u32::MAX, u32::MAX, msg).unwrap();
        assert_eq!(decrypt(&key, u32::MAX, u32::MAX, &ct).unwrap(), msg);
    }

    #[test]
    fn different_nonce_fields_change_keystream() {
        let msg = [0u8; 16];
        let a = encrypt(&KEY16, 1, 2, &msg).unwrap();
        let b = encrypt(&KEY16, 2, 2, &msg).unwrap();
        let c = encrypt(&KEY16, 1, 3, &msg).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn invalid_key_length_rejected() {
        let err = encrypt(&[0u8; 8], 1, 2, b"x").unwrap_err();
        assert!(matches!(err, MeshError::InvalidKey(_)));
    }
}
