// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;

use crate::builder::PacketBuilder;
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::packet_id::PacketId;
use crate::qos::QoS;

/// A SUBSCRIBE packet carrying exactly one topic filter, so that every
/// packet identifier maps to exactly one subscription (see topic filter
/// scope in the crate's top-level design notes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribePacket {
    pub packet_id: PacketId,
    pub filter: String,
    pub qos: QoS,
}

impl SubscribePacket {
    #[must_use]
    pub fn new(packet_id: PacketId, filter: &str, qos: QoS) -> Self {
        Self {
            packet_id,
            filter: filter.to_string(),
            qos,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut builder = PacketBuilder::new(PacketType::Subscribe);
        builder.append_u16_be(self.packet_id.value());
        builder.append_length_prefixed_utf8(&self.filter)?;
        builder.append_byte(self.qos.into());
        builder.serialize()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscribeReturnCode {
    Success(QoS),
    Failure,
    /// Byte was neither 0x80 nor a valid QoS (0/1/2). A malformed broker
    /// reply, not a decode error: the SUBACK frame itself is well-formed.
    Invalid(u8),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeAckPacket {
    pub packet_id: PacketId,
    pub return_code: SubscribeReturnCode,
}

impl SubscribeAckPacket {
    pub fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::SubscribeAck {
            return Err(DecodeError::UnexpectedPacketType);
        }
        if fixed_header.remaining_length() != PacketId::bytes() + 1 {
            return Err(DecodeError::InvalidRemainingLength(
                fixed_header.remaining_length(),
            ));
        }
        let packet_id = PacketId::decode(ba)?;
        let code_byte = ba.read_byte()?;
        let return_code = match code_byte {
            0x80 => SubscribeReturnCode::Failure,
            _ => match QoS::try_from(code_byte) {
                Ok(qos) => SubscribeReturnCode::Success(qos),
                Err(_) => SubscribeReturnCode::Invalid(code_byte),
            },
        };
        Ok(Self {
            packet_id,
            return_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_sets_reserved_flags() {
        let packet = SubscribePacket::new(PacketId::new(3), "a/+/c", QoS::AtLeastOnce);
        let bytes = packet.encode().unwrap();
        assert_eq!(bytes[0], 0b1000_0010);
    }

    #[test]
    fn suback_granted_qos() {
        let buf = [0x90, 0x03, 0x00, 0x03, 0x01];
        let mut ba = ByteArray::new(&buf);
        let ack = SubscribeAckPacket::decode(&mut ba).unwrap();
        assert_eq!(ack.packet_id.value(), 3);
        assert_eq!(ack.return_code, SubscribeReturnCode::Success(QoS::AtLeastOnce));
    }

    #[test]
    fn suback_failure_code() {
        let buf = [0x90, 0x03, 0x00, 0x03, 0x80];
        let mut ba = ByteArray::new(&buf);
        let ack = SubscribeAckPacket::decode(&mut ba).unwrap();
        assert_eq!(ack.return_code, SubscribeReturnCode::Failure);
    }

    #[test]
    fn suback_invalid_code_decodes_without_error() {
        let buf = [0x90, 0x03, 0x00, 0x03, 0x03];
        let mut ba = ByteArray::new(&buf);
        let ack = SubscribeAckPacket::decode(&mut ba).unwrap();
        assert_eq!(ack.return_code, SubscribeReturnCode::Invalid(0x03));
    }
}
