// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::packet_id::PacketId;

/// Shared shape for the four "identifier-only" acknowledgement packets:
/// PUBACK, PUBREC, PUBREL and PUBCOMP each carry nothing but a 2-byte
/// packet identifier.
fn encode_id_only(packet_type: PacketType, id: PacketId) -> Result<Vec<u8>, EncodeError> {
    let fixed_header = FixedHeader::new(packet_type, PacketId::bytes())?;
    let mut buf = Vec::with_capacity(fixed_header.bytes() + PacketId::bytes());
    fixed_header.encode(&mut buf)?;
    buf.extend_from_slice(&id.value().to_be_bytes());
    Ok(buf)
}

fn decode_id_only(ba: &mut ByteArray, expected: PacketType) -> Result<PacketId, DecodeError> {
    let fixed_header = FixedHeader::decode(ba)?;
    if fixed_header.packet_type() != expected {
        return Err(DecodeError::UnexpectedPacketType);
    }
    if fixed_header.remaining_length() != PacketId::bytes() {
        return Err(DecodeError::InvalidRemainingLength(
            fixed_header.remaining_length(),
        ));
    }
    PacketId::decode(ba)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublishAckPacket {
    pub packet_id: PacketId,
}

impl PublishAckPacket {
    #[must_use]
    pub const fn new(packet_id: PacketId) -> Self {
        Self { packet_id }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        encode_id_only(PacketType::PublishAck, self.packet_id)
    }

    pub fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        Ok(Self {
            packet_id: decode_id_only(ba, PacketType::PublishAck)?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublishReceivedPacket {
    pub packet_id: PacketId,
}

impl PublishReceivedPacket {
    #[must_use]
    pub const fn new(packet_id: PacketId) -> Self {
        Self { packet_id }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        encode_id_only(PacketType::PublishReceived, self.packet_id)
    }

    pub fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        Ok(Self {
            packet_id: decode_id_only(ba, PacketType::PublishReceived)?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublishReleasePacket {
    pub packet_id: PacketId,
}

impl PublishReleasePacket {
    #[must_use]
    pub const fn new(packet_id: PacketId) -> Self {
        Self { packet_id }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        encode_id_only(PacketType::PublishRelease, self.packet_id)
    }

    pub fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        Ok(Self {
            packet_id: decode_id_only(ba, PacketType::PublishRelease)?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublishCompletePacket {
    pub packet_id: PacketId,
}

impl PublishCompletePacket {
    #[must_use]
    pub const fn new(packet_id: PacketId) -> Self {
        Self { packet_id }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        encode_id_only(PacketType::PublishComplete, self.packet_id)
    }

    pub fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        Ok(Self {
            packet_id: decode_id_only(ba, PacketType::PublishComplete)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn puback_matches_spec_bytes() {
        let packet = PublishAckPacket::new(PacketId::new(1));
        assert_eq!(packet.encode().unwrap(), vec![0x40, 0x02, 0x00, 0x01]);
    }

    #[test]
    fn qos2_handshake_matches_spec_bytes() {
        let id = PacketId::new(7);
        assert_eq!(
            PublishReceivedPacket::new(id).encode().unwrap(),
            vec![0x50, 0x02, 0x00, 0x07]
        );
        assert_eq!(
            PublishReleasePacket::new(id).encode().unwrap(),
            vec![0x62, 0x02, 0x00, 0x07]
        );
        assert_eq!(
            PublishCompletePacket::new(id).encode().unwrap(),
            vec![0x70, 0x02, 0x00, 0x07]
        );
    }

    #[test]
    fn decode_round_trips() {
        let packet = PublishAckPacket::new(PacketId::new(9));
        let bytes = packet.encode().unwrap();
        let mut ba = ByteArray::new(&bytes);
        let decoded = PublishAckPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded.packet_id.value(), 9);
    }
}
