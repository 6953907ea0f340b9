// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;

use crate::builder::PacketBuilder;
use crate::byte_array::ByteArray;
use crate::connect_flags::ConnectFlags;
use crate::error::{DecodeError, EncodeError};
use crate::header::{FixedHeader, PacketType};
use crate::qos::QoS;
use crate::utils::truncate_client_id;

pub const PROTOCOL_NAME_V3: &str = "MQIsdp";
pub const PROTOCOL_NAME_V4: &str = "MQTT";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProtocolLevel {
    V3,
    #[default]
    V4,
}

impl TryFrom<u8> for ProtocolLevel {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            3 => Ok(Self::V3),
            4 => Ok(Self::V4),
            other => Err(DecodeError::InvalidProtocolLevel(other)),
        }
    }
}

impl From<ProtocolLevel> for u8 {
    fn from(level: ProtocolLevel) -> Self {
        match level {
            ProtocolLevel::V3 => 3,
            ProtocolLevel::V4 => 4,
        }
    }
}

/// Optional last-will-and-testament carried in a CONNECT packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Will {
    pub topic: String,
    pub message: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectPacket {
    pub protocol_level: ProtocolLevel,
    pub clean_session: bool,
    pub keep_alive: u16,
    pub client_id: String,
    pub will: Option<Will>,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
}

impl ConnectPacket {
    #[must_use]
    pub fn new(client_id: &str, keep_alive: u16) -> Self {
        Self {
            protocol_level: ProtocolLevel::V4,
            clean_session: true,
            keep_alive,
            client_id: truncate_client_id(client_id).to_string(),
            will: None,
            username: None,
            password: None,
        }
    }

    fn connect_flags(&self) -> ConnectFlags {
        ConnectFlags {
            has_username: self.username.is_some(),
            has_password: self.password.is_some(),
            will_retain: self.will.as_ref().is_some_and(|w| w.retain),
            will_qos: self.will.as_ref().map_or(QoS::AtMostOnce, |w| w.qos),
            has_will: self.will.is_some(),
            clean_session: self.clean_session,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut builder = PacketBuilder::new(PacketType::Connect);
        let protocol_name = match self.protocol_level {
            ProtocolLevel::V3 => PROTOCOL_NAME_V3,
            ProtocolLevel::V4 => PROTOCOL_NAME_V4,
        };
        builder.append_length_prefixed_utf8(protocol_name)?;
        builder.append_byte(self.protocol_level.into());
        let mut flags_buf = Vec::with_capacity(ConnectFlags::bytes());
        self.connect_flags().encode(&mut flags_buf)?;
        builder.append_raw_bytes(&flags_buf);
        builder.append_u16_be(self.keep_alive);
        builder.append_length_prefixed_utf8(&self.client_id)?;

        if let Some(will) = &self.will {
            builder.append_length_prefixed_utf8(&will.topic)?;
            builder.append_length_prefixed_bytes(&will.message)?;
        }
        if let Some(username) = &self.username {
            builder.append_length_prefixed_utf8(username)?;
        }
        if let Some(password) = &self.password {
            builder.append_length_prefixed_bytes(password)?;
        }

        builder.serialize()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectAckPacket {
    pub session_present: bool,
    pub return_code: u8,
}

impl ConnectAckPacket {
    pub fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::ConnectAck {
            return Err(DecodeError::UnexpectedPacketType);
        }
        if fixed_header.remaining_length() != 2 {
            return Err(DecodeError::InvalidRemainingLength(
                fixed_header.remaining_length(),
            ));
        }
        let ack_flags = ba.read_byte()?;
        if ack_flags & 0b1111_1110 != 0 {
            return Err(DecodeError::InvalidConnAckFlags(ack_flags));
        }
        let session_present = ack_flags & 0b0000_0001 != 0;
        let return_code = ba.read_byte()?;
        Ok(Self {
            session_present,
            return_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_connect_matches_spec_bytes() {
        let packet = ConnectPacket::new("abc", 60);
        let bytes = packet.encode().unwrap();
        let expected: Vec<u8> = vec![
            0x10, 0x10, 0x00, 0x04, 0x4d, 0x51, 0x54, 0x54, 0x04, 0x02, 0x00, 0x3c, 0x00, 0x03,
            0x61, 0x62, 0x63,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn connack_accepted() {
        let buf = [0x20, 0x02, 0x00, 0x00];
        let mut ba = ByteArray::new(&buf);
        let ack = ConnectAckPacket::decode(&mut ba).unwrap();
        assert!(!ack.session_present);
        assert_eq!(ack.return_code, 0);
    }

    #[test]
    fn connack_refused() {
        let buf = [0x20, 0x02, 0x00, 0x05];
        let mut ba = ByteArray::new(&buf);
        let ack = ConnectAckPacket::decode(&mut ba).unwrap();
        assert_eq!(ack.return_code, 5);
    }

    #[test]
    fn client_id_longer_than_23_bytes_is_truncated() {
        let packet = ConnectPacket::new(&"x".repeat(40), 60);
        assert_eq!(packet.client_id.len(), 23);
    }
}
