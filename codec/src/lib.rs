// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Control packet codec for the MQTT 3.1 / 3.1.1 protocol.
//!
//! This crate has no I/O and no protocol-level semantics of its own: it
//! turns typed packet structs into wire bytes and back. The connection
//! engine in `mqtt_engine` is what gives those bytes meaning.

mod builder;
mod byte_array;
mod connect_flags;
mod error;
mod header;
pub mod packet;
mod packet_id;
mod qos;
pub mod topic;
pub mod utils;
mod var_int;

pub use byte_array::ByteArray;
pub use connect_flags::ConnectFlags;
pub use error::{DecodeError, EncodeError};
pub use header::{FixedHeader, PacketType};
pub use packet_id::PacketId;
pub use qos::QoS;
pub use var_int::VarInt;
