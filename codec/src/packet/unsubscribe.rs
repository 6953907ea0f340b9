// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use crate::builder::PacketBuilder;
use crate::byte_array::ByteArray;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::packet_id::PacketId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsubscribePacket {
    pub packet_id: PacketId,
    pub filter: String,
}

impl UnsubscribePacket {
    #[must_use]
    pub fn new(packet_id: PacketId, filter: &str) -> Self {
        Self {
            packet_id,
            filter: filter.to_string(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut builder = PacketBuilder::new(PacketType::Unsubscribe);
        builder.append_u16_be(self.packet_id.value());
        builder.append_length_prefixed_utf8(&self.filter)?;
        builder.serialize()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnsubscribeAckPacket {
    pub packet_id: PacketId,
}

impl UnsubscribeAckPacket {
    pub fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::UnsubscribeAck {
            return Err(DecodeError::UnexpectedPacketType);
        }
        if fixed_header.remaining_length() != PacketId::bytes() {
            return Err(DecodeError::InvalidRemainingLength(
                fixed_header.remaining_length(),
            ));
        }
        Ok(Self {
            packet_id: PacketId::decode(ba)?,
        })
    }
}
