// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use std::collections::HashMap;

use codec::packet::PublishPacket;
use codec::{PacketId, QoS};
use rand::Rng;

/// Allocates packet identifiers: a rotating 16-bit counter that skips zero
/// and wraps back to 1 at `u16::MAX`, seeded randomly per engine instance
/// rather than always starting at 1, so two engines racing against the same
/// broker don't hand out colliding ids after a reconnect.
#[derive(Debug)]
pub struct PacketIdAllocator {
    next: u16,
}

impl Default for PacketIdAllocator {
    fn default() -> Self {
        let seed = rand::thread_rng().gen_range(1..=u16::MAX);
        Self { next: seed }
    }
}

impl PacketIdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next identifier and advances the counter, skipping 0.
    pub fn alloc(&mut self) -> PacketId {
        let id = self.next;
        self.next = if self.next == u16::MAX {
            1
        } else {
            self.next + 1
        };
        PacketId::new(id)
    }
}

/// The stage a QoS 2 publish we sent is waiting in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundQos2Stage {
    /// Sent PUBLISH, waiting for PUBREC.
    AwaitingReceived,
    /// Sent PUBREL after receiving PUBREC, waiting for PUBCOMP.
    AwaitingComplete,
}

/// Tracks publishes this engine has sent but not yet had fully
/// acknowledged, so retransmission and completion bookkeeping have
/// somewhere to live. QoS 0 publishes are never tracked: they are fired
/// and forgotten.
#[derive(Debug, Default)]
pub struct InflightTracker {
    allocator: PacketIdAllocator,
    outbound_qos1: HashMap<PacketId, PublishPacket>,
    outbound_qos2: HashMap<PacketId, (PublishPacket, OutboundQos2Stage)>,
    /// Packet ids of QoS 2 PUBLISH packets we have received and already
    /// delivered to the application; retained until PUBCOMP so a
    /// retransmitted PUBLISH with the same id is not delivered twice.
    inbound_qos2: HashMap<PacketId, ()>,
}

impl InflightTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a packet id for a non-PUBLISH packet (SUBSCRIBE,
    /// UNSUBSCRIBE) that needs one but isn't tracked by this struct's
    /// publish tables.
    pub fn alloc_id(&mut self) -> PacketId {
        self.allocator.alloc()
    }

    /// Allocates a fresh packet id and, for QoS > 0, records `packet` as
    /// inflight under it.
    pub fn track_outbound(&mut self, mut packet: PublishPacket) -> PublishPacket {
        if packet.qos == QoS::AtMostOnce {
            return packet;
        }
        let id = self.allocator.alloc();
        packet.packet_id = Some(id);
        match packet.qos {
            QoS::AtLeastOnce => {
                self.outbound_qos1.insert(id, packet.clone());
            }
            QoS::ExactlyOnce => {
                self.outbound_qos2
                    .insert(id, (packet.clone(), OutboundQos2Stage::AwaitingReceived));
            }
            QoS::AtMostOnce => unreachable!(),
        }
        packet
    }

    /// A PUBACK arrived for `id`. Returns whether we had it tracked.
    pub fn complete_qos1(&mut self, id: PacketId) -> bool {
        self.outbound_qos1.remove(&id).is_some()
    }

    /// A PUBREC arrived for `id`. Advances the QoS 2 handshake and returns
    /// whether we had it tracked (the caller still sends PUBREL either way
    /// per MQTT-4.3.3-1, but only a tracked id is a legitimate transition).
    pub fn receive_qos2_ack(&mut self, id: PacketId) -> bool {
        if let Some(entry) = self.outbound_qos2.get_mut(&id) {
            entry.1 = OutboundQos2Stage::AwaitingComplete;
            true
        } else {
            false
        }
    }

    /// A PUBCOMP arrived for `id`. Returns whether we had it tracked.
    pub fn complete_qos2(&mut self, id: PacketId) -> bool {
        self.outbound_qos2.remove(&id).is_some()
    }

    /// Records that a QoS 2 PUBLISH with `id` was received and delivered,
    /// so a retransmit can be recognized as a duplicate.
    pub fn note_inbound_qos2(&mut self, id: PacketId) -> bool {
        self.inbound_qos2.insert(id, ()).is_some()
    }

    /// The peer's PUBREL for `id` arrived; we respond with PUBCOMP and can
    /// forget about this inbound id.
    pub fn finish_inbound_qos2(&mut self, id: PacketId) {
        self.inbound_qos2.remove(&id);
    }

    #[must_use]
    pub fn outbound_len(&self) -> usize {
        self.outbound_qos1.len() + self.outbound_qos2.len()
    }

    /// Drops all inflight bookkeeping. Called on disconnect when the new
    /// session will be a clean one; a persistent session would instead
    /// resend these on reconnect, which this engine does not implement.
    pub fn clear(&mut self) {
        self.outbound_qos1.clear();
        self.outbound_qos2.clear();
        self.inbound_qos2.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::topic::TopicName;

    #[test]
    fn allocator_skips_zero_and_wraps() {
        let mut allocator = PacketIdAllocator { next: u16::MAX };
        assert_eq!(allocator.alloc().value(), u16::MAX);
        assert_eq!(allocator.alloc().value(), 1);
    }

    #[test]
    fn qos0_publish_is_never_tracked() {
        let mut tracker = InflightTracker::new();
        let packet = PublishPacket::new(
            TopicName::parse("a/b").unwrap(),
            QoS::AtMostOnce,
            b"hi".to_vec(),
            false,
        );
        let sent = tracker.track_outbound(packet);
        assert!(sent.packet_id.is_none());
        assert_eq!(tracker.outbound_len(), 0);
    }

    #[test]
    fn qos1_round_trip() {
        let mut tracker = InflightTracker::new();
        let packet = PublishPacket::new(
            TopicName::parse("a/b").unwrap(),
            QoS::AtLeastOnce,
            b"hi".to_vec(),
            false,
        );
        let sent = tracker.track_outbound(packet);
        let id = sent.packet_id.unwrap();
        assert_eq!(tracker.outbound_len(), 1);
        assert!(tracker.complete_qos1(id));
        assert_eq!(tracker.outbound_len(), 0);
    }

    #[test]
    fn qos2_handshake_round_trip() {
        let mut tracker = InflightTracker::new();
        let packet = PublishPacket::new(
            TopicName::parse("a/b").unwrap(),
            QoS::ExactlyOnce,
            b"hi".to_vec(),
            false,
        );
        let sent = tracker.track_outbound(packet);
        let id = sent.packet_id.unwrap();
        assert!(tracker.receive_qos2_ack(id));
        assert!(tracker.complete_qos2(id));
        assert_eq!(tracker.outbound_len(), 0);
    }

    #[test]
    fn duplicate_inbound_qos2_is_recognized() {
        let mut tracker = InflightTracker::new();
        let id = PacketId::new(42);
        assert!(!tracker.note_inbound_qos2(id));
        assert!(tracker.note_inbound_qos2(id));
        tracker.finish_inbound_qos2(id);
    }
}
