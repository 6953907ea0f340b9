// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;

use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::qos::QoS;
use crate::var_int::VarInt;

/// The 4-bit type nibble together with whatever flags a given packet type
/// mandates in the remaining 4 bits of the first fixed-header byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PacketType {
    #[default]
    Connect,
    ConnectAck,
    Publish {
        dup: bool,
        qos: QoS,
        retain: bool,
    },
    PublishAck,
    PublishReceived,
    PublishRelease,
    PublishComplete,
    Subscribe,
    SubscribeAck,
    Unsubscribe,
    UnsubscribeAck,
    PingRequest,
    PingResponse,
    Disconnect,
}

impl PacketType {
    #[must_use]
    pub const fn bytes() -> usize {
        1
    }
}

impl From<PacketType> for u8 {
    fn from(packet_type: PacketType) -> Self {
        let type_bits: u8 = match packet_type {
            PacketType::Connect => 1,
            PacketType::ConnectAck => 2,
            PacketType::Publish { .. } => 3,
            PacketType::PublishAck => 4,
            PacketType::PublishReceived => 5,
            PacketType::PublishRelease => 6,
            PacketType::PublishComplete => 7,
            PacketType::Subscribe => 8,
            PacketType::SubscribeAck => 9,
            PacketType::Unsubscribe => 10,
            PacketType::UnsubscribeAck => 11,
            PacketType::PingRequest => 12,
            PacketType::PingResponse => 13,
            PacketType::Disconnect => 14,
        };

        // Bits 3,2,1,0 are reserved for most packet types and MUST be set to
        // the values mandated by the protocol [MQTT-2.2.2-1].
        let flag_bits: u8 = match packet_type {
            PacketType::Publish { dup, qos, retain } => {
                let dup = if dup { 0b0000_1000 } else { 0 };
                let qos: u8 = u8::from(qos) << 1;
                let retain = if retain { 0b0000_0001 } else { 0 };
                dup | qos | retain
            }
            PacketType::PublishRelease | PacketType::Subscribe | PacketType::Unsubscribe => {
                0b0000_0010
            }
            _ => 0,
        };

        (type_bits << 4) | flag_bits
    }
}

impl TryFrom<u8> for PacketType {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        let type_bits = (v & 0b1111_0000) >> 4;
        let flags = v & 0b0000_1111;

        match type_bits {
            1 if flags == 0 => Ok(Self::Connect),
            2 if flags == 0 => Ok(Self::ConnectAck),
            3 => {
                let dup = flags & 0b0000_1000 != 0;
                let retain = flags & 0b0000_0001 != 0;
                let qos = QoS::try_from((flags & 0b0000_0110) >> 1)?;
                Ok(Self::Publish { dup, qos, retain })
            }
            4 if flags == 0 => Ok(Self::PublishAck),
            5 if flags == 0 => Ok(Self::PublishReceived),
            6 if flags == 0b0000_0010 => Ok(Self::PublishRelease),
            7 if flags == 0 => Ok(Self::PublishComplete),
            8 if flags == 0b0000_0010 => Ok(Self::Subscribe),
            9 if flags == 0 => Ok(Self::SubscribeAck),
            10 if flags == 0b0000_0010 => Ok(Self::Unsubscribe),
            11 if flags == 0 => Ok(Self::UnsubscribeAck),
            12 if flags == 0 => Ok(Self::PingRequest),
            13 if flags == 0 => Ok(Self::PingResponse),
            14 if flags == 0 => Ok(Self::Disconnect),
            1..=14 => {
                log::error!("header: invalid flags {flags:#06b} for type {type_bits}");
                Err(DecodeError::InvalidPacketFlags(flags))
            }
            other => Err(DecodeError::InvalidPacketType(other)),
        }
    }
}

/// Fixed header part of a control packet.
///
/// ```txt
///  7 6 5 4 3 2 1 0
/// +-------+-------+
/// | Type  | Flags |
/// +-------+-------+
/// | Remaining Len |
/// +-------+-------+
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedHeader {
    packet_type: PacketType,
    remaining_length: VarInt,
}

impl FixedHeader {
    pub fn new(packet_type: PacketType, remaining_length: usize) -> Result<Self, EncodeError> {
        Ok(Self {
            packet_type,
            remaining_length: VarInt::from(remaining_length)?,
        })
    }

    #[must_use]
    pub const fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    #[must_use]
    pub const fn remaining_length(&self) -> usize {
        self.remaining_length.value()
    }

    #[must_use]
    pub const fn bytes(&self) -> usize {
        PacketType::bytes() + self.remaining_length.bytes()
    }

    pub fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let first_byte = ba.read_byte()?;
        let packet_type = PacketType::try_from(first_byte)?;
        let remaining_length = VarInt::decode(ba)?;
        Ok(Self {
            packet_type,
            remaining_length,
        })
    }

    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let type_byte: u8 = self.packet_type.into();
        buf.push(type_byte);
        let used = self.remaining_length.encode(buf)?;
        Ok(PacketType::bytes() + used)
    }
}
