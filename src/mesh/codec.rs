//! ServiceEnvelope encode/decode pipeline.
//!
//! Outbound: inner Data message -> (optionally encrypted) MeshPacket ->
//! ServiceEnvelope -> transport bytes. Inbound is the reverse, with every
//! failure mapped to a skippable [`MeshError`] instead of an abort: a shared
//! MQTT topic routinely carries traffic for other channels and keys.

use bytes::Bytes;
use log::debug;
use prost::Message;
use rand::Rng;

use crate::mesh::{channel::Channel, crypto, identity::Identity, MeshError, HOP_LIMIT};
use crate::protobuf::meshtastic as proto;

/// Stateless packet codec bound to one channel and one identity.
#[derive(Debug, Clone)]
pub struct Codec {
    channel: Channel,
    identity: Identity,
}

impl Codec {
    /// Validates the channel key eagerly so a bad key fails at startup, not
    /// on the first packet.
    pub fn new(channel: Channel, identity: Identity) -> Result<Self, MeshError> {
        channel.key_bytes()?;
        Ok(Self { channel, identity })
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Build a text-message Data payload.
    pub fn text_data(text: &str) -> proto::Data {
        proto::Data {
            portnum: proto::PortNum::TextMessageApp as i32,
            payload: Bytes::copy_from_slice(text.as_bytes()),
            want_response: false,
        }
    }

    /// Build the node-info Data payload announcing this identity.
    /// `want_response` asks peers to introduce themselves back.
    pub fn node_info_data(&self) -> proto::Data {
        let hw_model = match self.identity.hw_model.as_str() {
            "PRIVATE_HW" => proto::HardwareModel::PrivateHw,
            _ => proto::HardwareModel::Unset,
        };
        let user = proto::User {
            id: self.identity.node_id(),
            long_name: self.identity.long_name.clone(),
            short_name: self.identity.short_name.clone(),
            hw_model: hw_model as i32,
        };
        proto::Data {
            portnum: proto::PortNum::NodeinfoApp as i32,
            payload: Bytes::from(user.encode_to_vec()),
            want_response: true,
        }
    }

    /// Wrap an inner message in a MeshPacket and ServiceEnvelope bound for
    /// `destination`. The packet id is drawn uniformly from the full 32-bit
    /// range; it doubles as half of the cipher nonce.
    pub fn encode(
        &self,
        destination: u32,
        data: proto::Data,
    ) -> Result<proto::ServiceEnvelope, MeshError> {
        let key = self.channel.key_bytes()?;
        let packet_id: u32 = rand::thread_rng().gen();
        let from = self.identity.node_number;

        let payload_variant = if key.is_empty() {
            proto::mesh_packet::PayloadVariant::Decoded(data)
        } else {
            let ciphertext = crypto::encrypt(&key, packet_id, from, &data.encode_to_vec())?;
            proto::mesh_packet::PayloadVariant::Encrypted(Bytes::from(ciphertext))
        };

        let packet = proto::MeshPacket {
            from,
            to: destination,
            channel: u32::from(self.channel.hash()?),
            id: packet_id,
            rx_time: 0,
            rx_snr: 0.0,
            hop_limit: HOP_LIMIT,
            want_ack: false,
            payload_variant: Some(payload_variant),
        };

        Ok(proto::ServiceEnvelope {
            packet: Some(packet),
            channel_id: self.channel.name.clone(),
            gateway_id: self.identity.node_id(),
        })
    }

    /// [`Codec::encode`] plus serialization to transport bytes.
    pub fn encode_bytes(&self, destination: u32, data: proto::Data) -> Result<Vec<u8>, MeshError> {
        Ok(self.encode(destination, data)?.encode_to_vec())
    }

    /// Parse transport bytes into a packet and its inner message.
    ///
    /// `MalformedEnvelope` means the frame is not a ServiceEnvelope at all;
    /// `NotDecodable` covers everything that parses as an envelope but does
    /// not yield a valid Data on this channel. Both are routine skips.
    pub fn decode(
        &self,
        envelope_bytes: &[u8],
    ) -> Result<(proto::MeshPacket, proto::Data), MeshError> {
        let envelope = proto::ServiceEnvelope::decode(envelope_bytes)
            .map_err(MeshError::MalformedEnvelope)?;
        let packet = envelope.packet.ok_or(MeshError::NotDecodable)?;

        match packet.payload_variant.clone() {
            // Already cleartext on the wire. Not expected on an encrypted
            // channel, but third-party gateways do forward such packets.
            Some(proto::mesh_packet::PayloadVariant::Decoded(data)) => Ok((packet, data)),
            Some(proto::mesh_packet::PayloadVariant::Encrypted(ciphertext)) => {
                let key = self.channel.key_bytes()?;
                if key.is_empty() {
                    debug!("encrypted packet {:08x} on keyless channel", packet.id);
                    return Err(MeshError::NotDecodable);
                }
                let plaintext = crypto::decrypt(&key, packet.id, packet.from, &ciphertext)?;
                // Wrong key or corruption surfaces here as a parse failure.
                let data = proto::Data::decode(plaintext.as_slice())
                    .map_err(|_| MeshError::NotDecodable)?;
                Ok((packet, data))
            }
            None => Err(MeshError::NotDecodable),
        }
    }
}
