// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use crate::builder::PacketBuilder;
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::packet_id::PacketId;
use crate::qos::QoS;
use crate::topic::TopicName;

/// Transports an application message from the client to the broker, or
/// vice versa. `packet_id` is only meaningful for QoS 1 and QoS 2.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishPacket {
    pub dup: bool,
    pub qos: QoS,
    pub retain: bool,
    pub topic: String,
    pub packet_id: Option<PacketId>,
    pub payload: Vec<u8>,
}

impl PublishPacket {
    #[must_use]
    pub fn new(topic: TopicName, qos: QoS, payload: Vec<u8>, retain: bool) -> Self {
        Self {
            dup: false,
            qos,
            retain,
            topic: topic.as_str().to_string(),
            packet_id: None,
            payload,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        if self.qos != QoS::AtMostOnce && self.packet_id.is_none() {
            return Err(EncodeError::MissingPacketId);
        }
        let packet_type = PacketType::Publish {
            dup: self.dup,
            qos: self.qos,
            retain: self.retain,
        };
        let mut builder = PacketBuilder::new(packet_type);
        builder.append_length_prefixed_utf8(&self.topic)?;
        if let Some(id) = self.packet_id {
            builder.append_u16_be(id.value());
        }
        builder.append_raw_bytes(&self.payload);
        builder.serialize()
    }

    pub fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        let (dup, qos, retain) = match fixed_header.packet_type() {
            PacketType::Publish { dup, qos, retain } => (dup, qos, retain),
            _ => return Err(DecodeError::UnexpectedPacketType),
        };
        // MQTT-3.3.1-2: DUP must be 0 for all QoS 0 messages.
        if dup && qos == QoS::AtMostOnce {
            return Err(DecodeError::InvalidPacketFlags(0));
        }

        let body_start = ba.offset();
        let topic_len = ba.read_u16()? as usize;
        let topic = ba.read_string(topic_len)?;

        let packet_id = if qos == QoS::AtMostOnce {
            None
        } else {
            Some(PacketId::decode(ba)?)
        };

        let consumed = ba.offset() - body_start;
        if fixed_header.remaining_length() < consumed {
            return Err(DecodeError::InvalidRemainingLength(
                fixed_header.remaining_length(),
            ));
        }
        let payload_len = fixed_header.remaining_length() - consumed;
        let payload = ba.read_bytes(payload_len)?.to_vec();

        Ok(Self {
            dup,
            qos,
            retain,
            topic,
            packet_id,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet_id::PacketId;

    #[test]
    fn qos1_publish_matches_spec_bytes() {
        let mut packet = PublishPacket::new(
            TopicName::parse("t").unwrap(),
            QoS::AtLeastOnce,
            b"m".to_vec(),
            false,
        );
        packet.packet_id = Some(PacketId::new(1));
        let bytes = packet.encode().unwrap();
        assert_eq!(
            bytes,
            vec![0x32, 0x06, 0x00, 0x01, 0x74, 0x00, 0x01, 0x6d]
        );
    }

    #[test]
    fn qos0_publish_round_trips() {
        let packet = PublishPacket::new(
            TopicName::parse("a/b/c").unwrap(),
            QoS::AtMostOnce,
            b"X".to_vec(),
            false,
        );
        let bytes = packet.encode().unwrap();
        let mut ba = ByteArray::new(&bytes);
        let decoded = PublishPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded.topic, "a/b/c");
        assert_eq!(decoded.payload, b"X");
        assert!(decoded.packet_id.is_none());
    }

    #[test]
    fn matches_subscribed_message_bytes() {
        let mut packet = PublishPacket::new(
            TopicName::parse("a/b/c").unwrap(),
            QoS::AtLeastOnce,
            b"X".to_vec(),
            false,
        );
        packet.packet_id = Some(PacketId::new(9));
        let bytes = packet.encode().unwrap();
        let mut ba = ByteArray::new(&bytes);
        let decoded = PublishPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded.topic, "a/b/c");
        assert_eq!(decoded.packet_id.unwrap().value(), 9);
        assert_eq!(decoded.payload, b"X");
    }
}
