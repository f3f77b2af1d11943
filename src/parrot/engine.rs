//! The reaction decision for each decoded packet.
//!
//! The engine is pure state + clock-in-argument: the caller passes `now`, so
//! the throttle and dedup window are fully testable without sleeping. Sending
//! (and the pacing delay before it) belongs to the server.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::logutil::escape_log;
use crate::mesh::BROADCAST_ID;
use crate::parrot::dedup::DedupCache;
use crate::parrot::TRIGGER;
use crate::protobuf::meshtastic as proto;

/// A reply the engine has decided to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Destination node number, or [`BROADCAST_ID`].
    pub to: u32,
    pub text: String,
}

/// Classifies decoded packets and applies the dedup cache and the single
/// global reply throttle.
///
/// The throttle timestamp is shared by both reply kinds: a direct reply
/// consumes the window for a broadcast trigger arriving inside it. That
/// coupling is intentional (one global pacing gate, not per-destination).
#[derive(Debug)]
pub struct ParrotEngine {
    node_number: u32,
    reply_delay: Duration,
    seen: DedupCache,
    last_reply_at: Option<Instant>,
}

impl ParrotEngine {
    pub fn new(node_number: u32, reply_delay: Duration, dedup_ttl: Duration) -> Self {
        Self {
            node_number,
            reply_delay,
            seen: DedupCache::new(dedup_ttl),
            last_reply_at: None,
        }
    }

    /// Evaluate one decoded packet. Returns the reply to emit, if any.
    ///
    /// Every fresh packet is recorded in the dedup cache regardless of port
    /// type; only text messages can trigger a reply. Non-UTF-8 text payloads
    /// are a non-fatal skip (still marked seen).
    pub fn on_message(
        &mut self,
        packet: &proto::MeshPacket,
        data: &proto::Data,
        now: Instant,
    ) -> Option<Reply> {
        if !self.seen.insert(packet.id, now) {
            debug!("duplicate packet {:08x}, ignoring", packet.id);
            return None;
        }

        if data.portnum() != proto::PortNum::TextMessageApp {
            debug!(
                "packet {:08x} port {:?}: recorded, no reaction",
                packet.id,
                data.portnum()
            );
            return None;
        }

        let text = match std::str::from_utf8(&data.payload) {
            Ok(t) => t,
            Err(_) => {
                debug!("packet {:08x}: text payload is not UTF-8, skipping", packet.id);
                return None;
            }
        };

        let from_parrot = packet.from == self.node_number;
        let is_broadcast = packet.to == BROADCAST_ID;
        let is_direct = packet.to == self.node_number;
        let is_trigger = text.starts_with(TRIGGER);
        debug!(
            "packet {:08x} from {:08x}: direct={} broadcast={} trigger={} self={} text=\"{}\"",
            packet.id,
            packet.from,
            is_direct,
            is_broadcast,
            is_trigger,
            from_parrot,
            escape_log(text)
        );

        if is_direct {
            if self.throttle_open(now) {
                self.last_reply_at = Some(now);
                info!(
                    "echoing direct message from {:08x}: \"{}\"",
                    packet.from,
                    escape_log(text)
                );
                return Some(Reply {
                    to: packet.from,
                    text: format!("PARROT:{text}"),
                });
            }
            debug!("direct reply to {:08x} suppressed by throttle", packet.from);
        } else if is_broadcast && is_trigger && !from_parrot {
            if self.throttle_open(now) {
                self.last_reply_at = Some(now);
                info!("trigger broadcast from {:08x}, squawking back", packet.from);
                return Some(Reply {
                    to: BROADCAST_ID,
                    text: TRIGGER.to_string(),
                });
            }
            debug!("broadcast trigger reply suppressed by throttle");
        }

        None
    }

    fn throttle_open(&self, now: Instant) -> bool {
        match self.last_reply_at {
            Some(last) => now.duration_since(last) > self.reply_delay,
            None => true,
        }
    }

    /// The pacing delay the server must observe before transmitting a reply.
    pub fn reply_delay(&self) -> Duration {
        self.reply_delay
    }

    #[cfg(test)]
    pub(crate) fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const NODE: u32 = 0xABCD_E1E2;
    const PEER: u32 = 0x1234_5678;

    fn engine() -> ParrotEngine {
        ParrotEngine::new(
            NODE,
            Duration::from_secs(1),
            Duration::from_secs(600),
        )
    }

    fn text_packet(id: u32, from: u32, to: u32, text: &str) -> (proto::MeshPacket, proto::Data) {
        let data = proto::Data {
            portnum: proto::PortNum::TextMessageApp as i32,
            payload: Bytes::copy_from_slice(text.as_bytes()),
            want_response: false,
        };
        let packet = proto::MeshPacket {
            from,
            to,
            channel: 8,
            id,
            rx_time: 0,
            rx_snr: 0.0,
            hop_limit: 3,
            want_ack: false,
            payload_variant: None,
        };
        (packet, data)
    }

    #[test]
    fn direct_message_is_echoed() {
        let mut eng = engine();
        let (packet, data) = text_packet(1, PEER, NODE, "ping");
        let reply = eng.on_message(&packet, &data, Instant::now()).unwrap();
        assert_eq!(reply.to, PEER);
        assert_eq!(reply.text, "PARROT:ping");
    }

    #[test]
    fn broadcast_trigger_gets_one_squawk() {
        let mut eng = engine();
        let (packet, data) = text_packet(2, PEER, BROADCAST_ID, "\u{1F99C} hello");
        let reply = eng.on_message(&packet, &data, Instant::now()).unwrap();
        assert_eq!(reply.to, BROADCAST_ID);
        assert_eq!(reply.text, "\u{1F99C}");
    }

    #[test]
    fn duplicate_packet_id_never_replies_twice() {
        let mut eng = engine();
        let now = Instant::now();
        let (packet, data) = text_packet(3, PEER, NODE, "ping");
        assert!(eng.on_message(&packet, &data, now).is_some());
        // Same id again, well past the throttle window.
        assert!(eng
            .on_message(&packet, &data, now + Duration::from_secs(5))
            .is_none());
    }

    #[test]
    fn own_broadcast_trigger_is_ignored() {
        let mut eng = engine();
        let (packet, data) = text_packet(4, NODE, BROADCAST_ID, "\u{1F99C}");
        assert!(eng.on_message(&packet, &data, Instant::now()).is_none());
    }

    #[test]
    fn plain_broadcast_without_trigger_is_ignored() {
        let mut eng = engine();
        let (packet, data) = text_packet(5, PEER, BROADCAST_ID, "just chatting");
        assert!(eng.on_message(&packet, &data, Instant::now()).is_none());
    }

    #[test]
    fn trigger_must_be_leading() {
        let mut eng = engine();
        let (packet, data) = text_packet(6, PEER, BROADCAST_ID, "look a \u{1F99C}");
        assert!(eng.on_message(&packet, &data, Instant::now()).is_none());
    }

    #[test]
    fn throttle_suppresses_second_reply_in_window() {
        let mut eng = engine();
        let t0 = Instant::now();
        let (p1, d1) = text_packet(7, PEER, NODE, "one");
        assert!(eng.on_message(&p1, &d1, t0).is_some());
        // 0.1s later: qualifying message, throttled.
        let (p2, d2) = text_packet(8, PEER, NODE, "two");
        assert!(eng
            .on_message(&p2, &d2, t0 + Duration::from_millis(100))
            .is_none());
        // Past the window it replies again.
        let (p3, d3) = text_packet(9, PEER, NODE, "three");
        assert!(eng
            .on_message(&p3, &d3, t0 + Duration::from_millis(1500))
            .is_some());
    }

    #[test]
    fn direct_reply_consumes_window_for_broadcast_trigger() {
        // The single global throttle is deliberate: both branches gate on the
        // same timestamp.
        let mut eng = engine();
        let t0 = Instant::now();
        let (p1, d1) = text_packet(10, PEER, NODE, "ping");
        assert!(eng.on_message(&p1, &d1, t0).is_some());
        let (p2, d2) = text_packet(11, PEER, BROADCAST_ID, "\u{1F99C}");
        assert!(eng
            .on_message(&p2, &d2, t0 + Duration::from_millis(200))
            .is_none());
    }

    #[test]
    fn throttled_message_is_still_marked_seen() {
        let mut eng = engine();
        let t0 = Instant::now();
        let (p1, d1) = text_packet(12, PEER, NODE, "one");
        assert!(eng.on_message(&p1, &d1, t0).is_some());
        let (p2, d2) = text_packet(13, PEER, NODE, "two");
        assert!(eng
            .on_message(&p2, &d2, t0 + Duration::from_millis(10))
            .is_none());
        // The throttled packet must not get a second chance later.
        assert!(eng
            .on_message(&p2, &d2, t0 + Duration::from_secs(3))
            .is_none());
        assert_eq!(eng.seen_count(), 2);
    }

    #[test]
    fn non_text_ports_are_recorded_but_silent() {
        let mut eng = engine();
        let (packet, mut data) = text_packet(14, PEER, NODE, "");
        data.portnum = proto::PortNum::NodeinfoApp as i32;
        assert!(eng.on_message(&packet, &data, Instant::now()).is_none());
        assert_eq!(eng.seen_count(), 1);
    }

    #[test]
    fn non_utf8_text_is_skipped_but_seen() {
        let mut eng = engine();
        let (packet, mut data) = text_packet(15, PEER, NODE, "");
        data.payload = Bytes::from_static(&[0xff, 0xfe, 0xfd]);
        assert!(eng.on_message(&packet, &data, Instant::now()).is_none());
        assert_eq!(eng.seen_count(), 1);
    }
}
