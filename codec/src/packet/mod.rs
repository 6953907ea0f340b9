// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Typed encoders/decoders for every control packet the client emits or
//! receives, built on top of [`crate::builder::PacketBuilder`] and
//! [`crate::byte_array::ByteArray`].

mod connect;
mod disconnect;
mod ping;
mod publish;
mod publish_ack;
mod subscribe;
mod unsubscribe;

pub use connect::{ConnectAckPacket, ConnectPacket, ProtocolLevel, Will};
pub use disconnect::DisconnectPacket;
pub use ping::{PingRequestPacket, PingResponsePacket};
pub use publish::PublishPacket;
pub use publish_ack::{
    PublishAckPacket, PublishCompletePacket, PublishReceivedPacket, PublishReleasePacket,
};
pub use subscribe::{SubscribeAckPacket, SubscribePacket, SubscribeReturnCode};
pub use unsubscribe::{UnsubscribeAckPacket, UnsubscribePacket};
