//! This node's identity: numeric address plus display metadata.
//!
//! The textual node id is always derived from the numeric address so the two
//! can never diverge.

use crate::mesh::MeshError;

/// Immutable identity of this bot on the mesh, constructed once at startup.
#[derive(Debug, Clone)]
pub struct Identity {
    /// 32-bit numeric address.
    pub node_number: u32,
    /// Display name broadcast in node info.
    pub long_name: String,
    /// Short (up to 4 char) name broadcast in node info.
    pub short_name: String,
    /// Hardware model string from the config, mapped onto the protobuf enum
    /// when announced.
    pub hw_model: String,
}

impl Identity {
    /// Textual node id: `"!"` followed by the lowercase hex of the node
    /// number, without zero padding (matches firmware rendering).
    pub fn node_id(&self) -> String {
        format_node_id(self.node_number)
    }
}

/// Render a node number as its `"!hex"` id.
pub fn format_node_id(node_number: u32) -> String {
    format!("!{:x}", node_number)
}

/// Parse a `"!hex"` node id back into a node number.
pub fn parse_node_id(id: &str) -> Result<u32, MeshError> {
    let hex = id
        .strip_prefix('!')
        .ok_or_else(|| MeshError::InvalidNodeId(id.to_string()))?;
    u32::from_str_radix(hex, 16).map_err(|_| MeshError::InvalidNodeId(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_is_bang_lowercase_hex() {
        let ident = Identity {
            node_number: 0xABCD_E1E2,
            long_name: "MQTT-PARROT".into(),
            short_name: "\u{1F99C}".into(),
            hw_model: "PRIVATE_HW".into(),
        };
        assert_eq!(ident.node_id(), "!abcde1e2");
    }

    #[test]
    fn parse_round_trips_format() {
        for n in [0u32, 1, 0xDEAD_BEEF, u32::MAX] {
            assert_eq!(parse_node_id(&format_node_id(n)).unwrap(), n);
        }
    }

    #[test]
    fn parse_rejects_missing_bang() {
        assert!(parse_node_id("abcde1e2").is_err());
    }

    #[test]
    fn parse_rejects_non_hex() {
        assert!(parse_node_id("!zzzz").is_err());
        assert!(parse_node_id("!").is_err());
        // wider than 32 bits
        assert!(parse_node_id("!1ffffffff").is_err());
    }
}
