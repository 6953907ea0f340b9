// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

//! End-to-end scenarios driven over an in-memory duplex transport, standing
//! in for a broker on the other end.

use std::time::Duration;

use codec::packet::{
    PublishAckPacket, PublishCompletePacket, PublishPacket, PublishReceivedPacket,
    PublishReleasePacket,
};
use codec::topic::TopicName;
use codec::PacketId;
use mqtt_engine::{ClientConfig, ConnectionState, Engine, ErrorKind, Event, QoS, SubscriptionState};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const IO_TIMEOUT: Duration = Duration::from_millis(200);
const CONNECT_ABC: [u8; 17] = [
    0x10, 0x10, 0x00, 0x04, 0x4d, 0x51, 0x54, 0x54, 0x04, 0x02, 0x00, 0x3c, 0x00, 0x03, 0x61,
    0x62, 0x63,
];

async fn read_written(test_io: &mut DuplexStream) -> Vec<u8> {
    let mut buf = vec![0u8; 4096];
    let n = timeout(IO_TIMEOUT, test_io.read(&mut buf))
        .await
        .expect("engine did not write in time")
        .expect("duplex read failed");
    buf.truncate(n);
    buf
}

fn drain_events(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Builds an engine wired to a duplex transport, drives it through
/// `connect_to_host()`/CONNACK and returns it already `Connected`.
async fn connected_engine(
    client_id: &str,
    keep_alive: u16,
) -> (Engine, UnboundedReceiver<Event>, DuplexStream) {
    let mut config = ClientConfig::new("broker.example", 1883);
    config
        .set_client_id(client_id)
        .set_keep_alive(keep_alive)
        .set_clean_session(true);
    let (mut engine, events_rx) = Engine::new(config);
    let (engine_io, mut test_io) = duplex(4096);
    engine.set_raw_transport(engine_io);

    engine.connect_to_host().await.unwrap();
    let written = read_written(&mut test_io).await;
    assert_eq!(written, CONNECT_ABC);

    test_io.write_all(&[0x20, 0x02, 0x00, 0x00]).await.unwrap();
    assert!(engine.poll_transport().await.unwrap());
    assert_eq!(engine.state(), ConnectionState::Connected);

    (engine, events_rx, test_io)
}

#[tokio::test]
async fn s1_connect_accepted_emits_connected_once() {
    let (_engine, mut events_rx, _test_io) = connected_engine("abc", 60).await;
    let events = drain_events(&mut events_rx);
    let connected: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, Event::Connected { .. }))
        .collect();
    assert_eq!(connected.len(), 1);
    assert!(matches!(
        connected[0],
        Event::Connected {
            session_present: false
        }
    ));
}

#[tokio::test]
async fn s2_connect_refused_closes_transport_and_errors() {
    let mut config = ClientConfig::new("broker.example", 1883);
    config.set_client_id("abc");
    let (mut engine, mut events_rx) = Engine::new(config);
    let (engine_io, mut test_io) = duplex(4096);
    engine.set_raw_transport(engine_io);

    engine.connect_to_host().await.unwrap();
    let _ = read_written(&mut test_io).await;

    test_io.write_all(&[0x20, 0x02, 0x00, 0x05]).await.unwrap();
    assert!(engine.poll_transport().await.unwrap());

    assert_eq!(engine.state(), ConnectionState::Disconnected);
    assert!(!engine.has_transport());
    let events = drain_events(&mut events_rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Error(ErrorKind::ConnectionRefused))));
}

#[tokio::test]
async fn s3_qos1_publish_round_trip() {
    let (mut engine, mut events_rx, mut test_io) = connected_engine("abc", 60).await;
    let _ = drain_events(&mut events_rx);

    let packet_id = engine
        .publish("t", b"m".to_vec(), QoS::AtLeastOnce, false)
        .await
        .unwrap()
        .expect("qos1 publish carries a packet id");

    let written = read_written(&mut test_io).await;
    let mut expected = vec![0x32, 0x06, 0x00, 0x01, b't'];
    expected.extend_from_slice(&packet_id.value().to_be_bytes());
    expected.push(b'm');
    assert_eq!(written, expected);

    let puback = PublishAckPacket::new(packet_id).encode().unwrap();
    test_io.write_all(&puback).await.unwrap();
    assert!(engine.poll_transport().await.unwrap());

    let events = drain_events(&mut events_rx);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::MessageSent { packet_id: Some(id) } if *id == packet_id
    )));
}

#[tokio::test]
async fn s4_qos2_publish_round_trip() {
    let (mut engine, mut events_rx, mut test_io) = connected_engine("abc", 60).await;
    let _ = drain_events(&mut events_rx);

    let packet_id = engine
        .publish("t", b"m".to_vec(), QoS::ExactlyOnce, false)
        .await
        .unwrap()
        .expect("qos2 publish carries a packet id");
    let _ = read_written(&mut test_io).await; // the PUBLISH itself

    let pubrec = PublishReceivedPacket::new(packet_id).encode().unwrap();
    test_io.write_all(&pubrec).await.unwrap();
    assert!(engine.poll_transport().await.unwrap());

    let pubrel = read_written(&mut test_io).await;
    assert_eq!(
        pubrel,
        PublishReleasePacket::new(packet_id).encode().unwrap()
    );
    assert!(drain_events(&mut events_rx)
        .iter()
        .all(|e| !matches!(e, Event::MessageSent { .. })));

    let pubcomp = PublishCompletePacket::new(packet_id).encode().unwrap();
    test_io.write_all(&pubcomp).await.unwrap();
    assert!(engine.poll_transport().await.unwrap());

    let events = drain_events(&mut events_rx);
    let sent: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, Event::MessageSent { .. }))
        .collect();
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        sent[0],
        Event::MessageSent { packet_id: Some(id) } if *id == packet_id
    ));
}

#[tokio::test]
async fn s5_subscribe_receive_unsubscribe() {
    let (mut engine, mut events_rx, mut test_io) = connected_engine("abc", 60).await;
    let _ = drain_events(&mut events_rx);

    let subscription = engine.subscribe("a/+/c", QoS::AtLeastOnce).await.unwrap();
    assert_eq!(subscription.state(), SubscriptionState::Pending);

    let written = read_written(&mut test_io).await;
    assert_eq!(written[0], 0b1000_0010);
    assert_eq!(written[1], 10); // remaining length: id(2) + len(2) + "a/+/c"(5) + qos(1)
    let sub_id = u16::from_be_bytes([written[2], written[3]]);
    assert_eq!(&written[4..6], &[0x00, 0x05]);
    assert_eq!(&written[6..11], b"a/+/c");
    assert_eq!(written[11], 0x01);

    test_io
        .write_all(&[0x90, 0x03, written[2], written[3], 0x01])
        .await
        .unwrap();
    assert!(engine.poll_transport().await.unwrap());
    assert_eq!(subscription.state(), SubscriptionState::Subscribed);
    assert_eq!(engine.granted_qos("a/+/c"), Some(QoS::AtLeastOnce));

    let mut publish_from_broker = PublishPacket::new(
        TopicName::parse("a/b/c").unwrap(),
        QoS::AtLeastOnce,
        b"X".to_vec(),
        false,
    );
    publish_from_broker.packet_id = Some(PacketId::new(9));
    test_io
        .write_all(&publish_from_broker.encode().unwrap())
        .await
        .unwrap();
    assert!(engine.poll_transport().await.unwrap());

    let puback = read_written(&mut test_io).await;
    assert_eq!(
        puback,
        PublishAckPacket::new(PacketId::new(9)).encode().unwrap()
    );
    let events = drain_events(&mut events_rx);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::MessageReceived { topic, payload, matched_filters, .. }
            if topic == "a/b/c" && payload == b"X" && matched_filters == &["a/+/c".to_string()]
    )));

    engine.unsubscribe("a/+/c").await.unwrap();
    assert_eq!(subscription.state(), SubscriptionState::UnsubscriptionPending);
    let unsub_written = read_written(&mut test_io).await;
    let unsub_id = u16::from_be_bytes([unsub_written[2], unsub_written[3]]);
    assert_ne!(unsub_id, sub_id);

    test_io
        .write_all(&[0xb0, 0x02, unsub_written[2], unsub_written[3]])
        .await
        .unwrap();
    assert!(engine.poll_transport().await.unwrap());
    assert_eq!(subscription.state(), SubscriptionState::Unsubscribed);
}

#[tokio::test]
async fn s6_keep_alive_sends_pingreq_after_interval() {
    tokio::time::pause();
    let (mut engine, mut events_rx, mut test_io) = connected_engine("abc", 1).await;
    let _ = drain_events(&mut events_rx);

    {
        let tick = engine.tick_keep_alive();
        tokio::pin!(tick);
        tokio::time::advance(Duration::from_secs(1)).await;
        (&mut tick).await;
    }
    engine.send_ping().await.unwrap();

    let written = read_written(&mut test_io).await;
    assert_eq!(written, vec![0xc0, 0x00]);

    test_io.write_all(&[0xd0, 0x00]).await.unwrap();
    assert!(engine.poll_transport().await.unwrap());
    let events = drain_events(&mut events_rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::PingResponseReceived)));
}

#[tokio::test]
async fn dropped_subscription_handle_triggers_auto_unsubscribe() {
    let (mut engine, mut events_rx, mut test_io) = connected_engine("abc", 60).await;
    let _ = drain_events(&mut events_rx);

    let subscription = engine.subscribe("x/y", QoS::AtMostOnce).await.unwrap();
    let written = read_written(&mut test_io).await;
    test_io
        .write_all(&[0x90, 0x03, written[2], written[3], 0x00])
        .await
        .unwrap();
    assert!(engine.poll_transport().await.unwrap());
    assert_eq!(subscription.state(), SubscriptionState::Subscribed);

    drop(subscription);
    engine.drain_subscription_commands().await.unwrap();

    let unsub_written = read_written(&mut test_io).await;
    assert_eq!(unsub_written[0], 0b1010_0010);
    assert_eq!(&unsub_written[6..9], b"x/y");
}
