// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use byteorder::{BigEndian, ByteOrder};

use crate::error::EncodeError;
use crate::header::{FixedHeader, PacketType};

/// Accumulates a control packet's variable header and payload bytes, then
/// prepends the fixed header (type/flags byte + remaining-length varint)
/// once the body is complete.
///
/// Every packet encoder in `crate::packet` is built on top of this.
pub struct PacketBuilder {
    packet_type: PacketType,
    body: Vec<u8>,
}

impl PacketBuilder {
    #[must_use]
    pub fn new(packet_type: PacketType) -> Self {
        Self {
            packet_type,
            body: Vec::new(),
        }
    }

    pub fn append_byte(&mut self, byte: u8) -> &mut Self {
        self.body.push(byte);
        self
    }

    pub fn append_u16_be(&mut self, value: u16) -> &mut Self {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, value);
        self.body.extend_from_slice(&buf);
        self
    }

    /// Appends a 2-byte big-endian length prefix followed by `s`'s UTF-8 bytes.
    pub fn append_length_prefixed_utf8(&mut self, s: &str) -> Result<&mut Self, EncodeError> {
        self.append_length_prefixed_bytes(s.as_bytes())
    }

    /// Appends a 2-byte big-endian length prefix followed by `bytes`.
    pub fn append_length_prefixed_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, EncodeError> {
        if bytes.len() > u16::MAX as usize {
            return Err(EncodeError::BytesTooLong(bytes.len()));
        }
        self.append_u16_be(bytes.len() as u16);
        self.body.extend_from_slice(bytes);
        Ok(self)
    }

    /// Appends raw bytes with no length prefix. Used only for the trailing
    /// application payload of a PUBLISH packet.
    pub fn append_raw_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.body.extend_from_slice(bytes);
        self
    }

    /// Prepends the fixed header and returns the complete wire bytes.
    pub fn serialize(&self) -> Result<Vec<u8>, EncodeError> {
        let header = FixedHeader::new(self.packet_type, self.body.len())?;
        let mut out = Vec::with_capacity(header.bytes() + self.body.len());
        header.encode(&mut out)?;
        out.extend_from_slice(&self.body);
        Ok(out)
    }
}
