// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use std::collections::HashMap;
use std::sync::atomic::AtomicU8;
use std::sync::Arc;
use std::time::Duration;

use codec::packet::{
    ConnectAckPacket, ConnectPacket, DisconnectPacket, PingRequestPacket, PingResponsePacket,
    ProtocolLevel, PublishAckPacket, PublishCompletePacket, PublishPacket, PublishReceivedPacket,
    PublishReleasePacket, SubscribeAckPacket, SubscribePacket, SubscribeReturnCode, UnsubscribeAckPacket,
    UnsubscribePacket, Will,
};
use codec::topic::{TopicError, TopicFilter, TopicName};
use codec::{ByteArray, DecodeError, FixedHeader, PacketId, PacketType, QoS};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{interval, timeout, Interval};

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind};
use crate::event::Event;
use crate::inflight::InflightTracker;
use crate::state::ConnectionState;
use crate::subscription::{self, Subscription, SubscriptionCommand, SubscriptionState};
use crate::transport::{Transport, TransportKind};

const DISCONNECT_FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// Engine-side bookkeeping for one active or pending subscription filter.
/// Indexed both by filter (for PUBLISH delivery) and by the SUBSCRIBE
/// packet id that is still awaiting a SUBACK.
struct SubscriptionEntry {
    filter: TopicFilter,
    requested_qos: QoS,
    granted_qos: Option<QoS>,
    subscribe_packet_id: PacketId,
    state: Arc<AtomicU8>,
}

/// The client-side MQTT connection engine: owns at most one transport, the
/// connection state machine, the inflight QoS tables and the subscription
/// registry, and drives all three from a single run loop.
///
/// All mutation happens on whichever task calls `run_once`/`connect_to_host`
/// etc. — there is no internal locking, per this crate's single-threaded
/// cooperative concurrency model.
pub struct Engine {
    config: ClientConfig,
    transport: Option<Transport>,
    transport_kind: TransportKind,
    state: ConnectionState,
    buffer: Vec<u8>,
    inflight: InflightTracker,
    subscriptions: HashMap<String, SubscriptionEntry>,
    pending_subscribes: HashMap<PacketId, String>,
    pending_unsubscribes: HashMap<PacketId, String>,
    events: UnboundedSender<Event>,
    sub_commands_tx: UnboundedSender<SubscriptionCommand>,
    sub_commands_rx: UnboundedReceiver<SubscriptionCommand>,
    keep_alive_timer: Option<Interval>,
}

impl Engine {
    /// Builds a new, disconnected engine. Returns the engine and the
    /// receiving half of its event channel; the caller drains events from
    /// a separate task or alongside its own event loop.
    #[must_use]
    pub fn new(config: ClientConfig) -> (Self, UnboundedReceiver<Event>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (sub_commands_tx, sub_commands_rx) = mpsc::unbounded_channel();
        let engine = Self {
            config,
            transport: None,
            transport_kind: TransportKind::Plain,
            state: ConnectionState::Disconnected,
            buffer: Vec::with_capacity(1024),
            inflight: InflightTracker::new(),
            subscriptions: HashMap::new(),
            pending_subscribes: HashMap::new(),
            pending_unsubscribes: HashMap::new(),
            events: events_tx,
            sub_commands_tx,
            sub_commands_rx,
            keep_alive_timer: None,
        };
        (engine, events_rx)
    }

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ClientConfig {
        &mut self.config
    }

    /// Installs a caller-owned duplex device as the transport. The engine
    /// reads and writes it but never closes it.
    pub fn set_raw_transport(&mut self, device: impl AsyncRead + AsyncWrite + Send + 'static) {
        self.transport = Some(Transport::from_raw_device(device));
        self.transport_kind = TransportKind::RawDevice;
    }

    /// Configures `connect_to_host()` to open a plain TCP socket itself.
    pub fn use_plain_socket(&mut self) {
        self.transport_kind = TransportKind::Plain;
    }

    /// Configures `connect_to_host()` to open a TCP socket and perform a
    /// TLS handshake against `domain` itself.
    pub fn use_tls_socket(&mut self, domain: impl Into<String>) {
        self.transport_kind = TransportKind::Tls {
            domain: domain.into(),
        };
    }

    #[must_use]
    pub const fn transport_kind(&self) -> &TransportKind {
        &self.transport_kind
    }

    #[must_use]
    pub const fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    /// The QoS the broker actually granted for `filter`'s SUBACK, if one
    /// has arrived yet.
    #[must_use]
    pub fn granted_qos(&self, filter: &str) -> Option<QoS> {
        self.subscriptions.get(filter).and_then(|entry| entry.granted_qos)
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        let _ = self.events.send(Event::StateChanged(state));
    }

    /// Opens the transport (if engine-owned) and sends CONNECT.
    ///
    /// # Errors
    ///
    /// Returns `TransportUnavailable` if no transport is configured or the
    /// socket fails to connect, `TlsHandshakeFailed` if the TLS handshake
    /// fails, or `ProtocolError` if called while already connecting or
    /// connected.
    pub async fn connect_to_host(&mut self) -> Result<(), Error> {
        if self.state != ConnectionState::Disconnected {
            return Err(Error::new(
                ErrorKind::ProtocolError,
                "connect_to_host called while not disconnected",
            ));
        }
        self.set_state(ConnectionState::Connecting);

        match &self.transport_kind {
            TransportKind::RawDevice => {
                if self.transport.is_none() {
                    self.set_state(ConnectionState::Disconnected);
                    return Err(Error::new(
                        ErrorKind::TransportUnavailable,
                        "no raw device installed",
                    ));
                }
            }
            TransportKind::Plain => {
                match Transport::connect_plain(self.config.hostname(), self.config.port()).await {
                    Ok(transport) => self.transport = Some(transport),
                    Err(err) => {
                        self.set_state(ConnectionState::Disconnected);
                        return Err(Error::new(
                            ErrorKind::TransportUnavailable,
                            format!("failed to open plain socket: {err}"),
                        ));
                    }
                }
            }
            TransportKind::Tls { domain } => {
                let domain = domain.clone();
                match Transport::connect_tls(&domain, self.config.port()).await {
                    Ok(transport) => self.transport = Some(transport),
                    Err(err) => {
                        self.set_state(ConnectionState::Disconnected);
                        return Err(Error::new(
                            ErrorKind::TlsHandshakeFailed,
                            format!("tls handshake failed: {err}"),
                        ));
                    }
                }
            }
        }

        self.set_state(ConnectionState::WaitingForConnectAck);
        let connect_packet = self.build_connect_packet()?;
        let bytes = connect_packet.encode()?;
        self.write_bytes(&bytes).await
    }

    fn build_connect_packet(&self) -> Result<ConnectPacket, Error> {
        let protocol_level = match self.config.protocol_version() {
            3 => ProtocolLevel::V3,
            4 => ProtocolLevel::V4,
            other => {
                return Err(Error::new(
                    ErrorKind::InvalidConfiguration,
                    format!("unsupported protocol version {other}"),
                ))
            }
        };
        let mut packet = ConnectPacket::new(self.config.client_id(), self.config.keep_alive());
        packet.protocol_level = protocol_level;
        packet.clean_session = self.config.clean_session();
        packet.username = self.config.username().map(str::to_string);
        packet.password = self.config.password().map(<[u8]>::to_vec);
        if let Some(will) = self.config.will() {
            packet.will = Some(Will {
                topic: will.topic.clone(),
                message: will.message.clone(),
                qos: will.qos,
                retain: will.retain,
            });
        }
        Ok(packet)
    }

    /// Stops the keep-alive timer, locally tears down every subscription,
    /// sends DISCONNECT and closes the transport. Idempotent when already
    /// disconnected.
    ///
    /// # Errors
    ///
    /// Returns an error if DISCONNECT could not be written.
    pub async fn disconnect_from_host(&mut self) -> Result<(), Error> {
        self.keep_alive_timer = None;
        for entry in self.subscriptions.values() {
            subscription::set_shared_state(&entry.state, SubscriptionState::Unsubscribed);
        }
        self.subscriptions.clear();
        self.pending_subscribes.clear();
        self.pending_unsubscribes.clear();

        if self.state == ConnectionState::Connected {
            self.set_state(ConnectionState::Disconnecting);
            let bytes = DisconnectPacket.encode()?;
            self.write_bytes(&bytes).await?;
            if let Some(transport) = self.transport.as_mut() {
                let _ = timeout(DISCONNECT_FLUSH_TIMEOUT, transport.shutdown()).await;
            }
        }
        self.close_transport();
        self.buffer.clear();
        self.inflight.clear();
        self.set_state(ConnectionState::Disconnected);
        let _ = self.events.send(Event::Disconnected);
        Ok(())
    }

    /// Drops the engine's reference to the transport. For engine-owned
    /// transports this closes the underlying socket; a caller-supplied
    /// `RawDevice` is simply let go, never closed, per this crate's
    /// transport ownership rule.
    fn close_transport(&mut self) {
        self.transport = None;
    }

    /// Subscribes to `filter` at `requested_qos`. Returns the existing
    /// handle, unchanged, if this filter is already pending or active.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTopic` if `filter` is malformed, or propagates a
    /// transport write failure.
    pub async fn subscribe(
        &mut self,
        filter: &str,
        requested_qos: QoS,
    ) -> Result<Subscription, Error> {
        let topic_filter = TopicFilter::parse(filter)?;
        if let Some(entry) = self.subscriptions.get(topic_filter.as_str()) {
            return Ok(Subscription::with_shared_state(
                topic_filter,
                entry.requested_qos,
                entry.subscribe_packet_id,
                Arc::clone(&entry.state),
                self.sub_commands_tx.clone(),
            ));
        }

        let packet_id = self.inflight.alloc_id();
        let packet = SubscribePacket::new(packet_id, topic_filter.as_str(), requested_qos);
        let bytes = packet.encode()?;
        self.write_bytes(&bytes).await?;

        let state = subscription::new_shared_state();
        self.subscriptions.insert(
            topic_filter.as_str().to_string(),
            SubscriptionEntry {
                filter: topic_filter.clone(),
                requested_qos,
                granted_qos: None,
                subscribe_packet_id: packet_id,
                state: Arc::clone(&state),
            },
        );
        self.pending_subscribes
            .insert(packet_id, topic_filter.as_str().to_string());

        Ok(Subscription::with_shared_state(
            topic_filter,
            requested_qos,
            packet_id,
            state,
            self.sub_commands_tx.clone(),
        ))
    }

    /// Unsubscribes `filter`. Called while disconnected, the handle (if
    /// any) is dropped locally and the call returns ok.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSubscription` if connected and `filter` has no
    /// recorded subscription, or propagates a transport write failure.
    pub async fn unsubscribe(&mut self, filter: &str) -> Result<(), Error> {
        let topic_filter = TopicFilter::parse(filter)?;
        if self.state != ConnectionState::Connected {
            if let Some(entry) = self.subscriptions.remove(topic_filter.as_str()) {
                subscription::set_shared_state(&entry.state, SubscriptionState::Unsubscribed);
            }
            return Ok(());
        }
        let Some(state) = self
            .subscriptions
            .get(topic_filter.as_str())
            .map(|entry| Arc::clone(&entry.state))
        else {
            return Err(Error::new(
                ErrorKind::UnknownSubscription,
                format!("no subscription recorded for filter {}", topic_filter.as_str()),
            ));
        };
        let packet_id = self.inflight.alloc_id();
        let packet = UnsubscribePacket::new(packet_id, topic_filter.as_str());
        let bytes = packet.encode()?;
        self.write_bytes(&bytes).await?;
        subscription::set_shared_state(&state, SubscriptionState::UnsubscriptionPending);
        self.pending_unsubscribes
            .insert(packet_id, topic_filter.as_str().to_string());
        Ok(())
    }

    /// Publishes `payload` to `topic`. QoS 0 publishes are fired without
    /// tracking; QoS 1/2 publishes are assigned a packet id and tracked
    /// until their handshake completes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTopic` if `topic` contains a wildcard, or
    /// propagates a transport write failure.
    pub async fn publish(
        &mut self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    ) -> Result<Option<PacketId>, Error> {
        let topic_name = match TopicName::parse(topic) {
            Ok(name) => name,
            Err(TopicError::TooLong(_)) => TopicName::truncated(topic),
            Err(err) => return Err(Error::from(err)),
        };
        let packet = PublishPacket::new(topic_name, qos, payload, retain);
        let packet = self.inflight.track_outbound(packet);
        let bytes = packet.encode()?;
        self.write_bytes(&bytes).await?;
        if qos == QoS::AtMostOnce {
            let _ = self.events.send(Event::MessageSent { packet_id: None });
        }
        Ok(packet.packet_id)
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| Error::new(ErrorKind::TransportUnavailable, "no transport installed"))?;
        transport.write_all(bytes).await.map_err(Error::from)
    }

    /// Reads whatever bytes are available from the transport and runs the
    /// dispatcher over the accumulation buffer until it cannot make
    /// progress. Returns `false` when the transport reported a clean
    /// close, in which case the caller should treat the engine as
    /// externally disconnected.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport read itself fails (not to be
    /// confused with a protocol decode error, which tears down the
    /// connection internally but does not propagate to the caller).
    pub async fn poll_transport(&mut self) -> Result<bool, Error> {
        let n = {
            let transport = self.transport.as_mut().ok_or_else(|| {
                Error::new(ErrorKind::TransportUnavailable, "no transport installed")
            })?;
            transport.read_buf(&mut self.buffer).await?
        };
        if n == 0 {
            self.handle_transport_closed().await;
            return Ok(false);
        }
        self.dispatch_buffer().await;
        Ok(true)
    }

    async fn handle_transport_closed(&mut self) {
        self.keep_alive_timer = None;
        self.buffer.clear();
        self.close_transport();
        self.set_state(ConnectionState::Disconnected);
        let _ = self.events.send(Event::Disconnected);
    }

    /// Parses and dispatches every complete frame currently buffered. A
    /// bounded loop, never recursive: it stops as soon as the remaining
    /// bytes don't form a full frame.
    async fn dispatch_buffer(&mut self) {
        loop {
            let frame_len = match self.peek_frame_len() {
                Some(len) => len,
                None => break,
            };
            let frame = self.buffer[..frame_len].to_vec();
            self.buffer.drain(..frame_len);
            if let Err(err) = self.dispatch_frame(&frame).await {
                log::error!("protocol error: {err}");
                self.buffer.clear();
                self.close_transport();
                self.set_state(ConnectionState::Disconnected);
                let _ = self.events.send(Event::Error(err.kind().clone()));
                break;
            }
        }
    }

    /// Returns the full length of the next frame in `self.buffer` (fixed
    /// header + remaining length), or `None` if not enough bytes have
    /// arrived yet to know that length.
    fn peek_frame_len(&self) -> Option<usize> {
        let mut ba = ByteArray::new(&self.buffer);
        let fixed_header = match FixedHeader::decode(&mut ba) {
            Ok(header) => header,
            Err(DecodeError::Incomplete) => return None,
            Err(_) => return Some(self.buffer.len().max(1)),
        };
        let total = fixed_header.bytes() + fixed_header.remaining_length();
        if self.buffer.len() < total {
            None
        } else {
            Some(total)
        }
    }

    async fn dispatch_frame(&mut self, frame: &[u8]) -> Result<(), Error> {
        let mut ba = ByteArray::new(frame);
        let fixed_header = FixedHeader::decode(&mut ba)?;
        match fixed_header.packet_type() {
            PacketType::ConnectAck => self.on_connect_ack(frame).await,
            PacketType::Publish { .. } => self.on_publish(frame).await,
            PacketType::PublishAck => self.on_publish_ack(frame),
            PacketType::PublishReceived => self.on_publish_received(frame).await,
            PacketType::PublishRelease => self.on_publish_release(frame).await,
            PacketType::PublishComplete => self.on_publish_complete(frame),
            PacketType::SubscribeAck => self.on_subscribe_ack(frame),
            PacketType::UnsubscribeAck => self.on_unsubscribe_ack(frame),
            PacketType::PingResponse => self.on_ping_response(frame),
            other => {
                log::warn!("unhandled packet type: {other:?}");
                Ok(())
            }
        }
    }

    async fn on_connect_ack(&mut self, frame: &[u8]) -> Result<(), Error> {
        let mut ba = ByteArray::new(frame);
        let ack = ConnectAckPacket::decode(&mut ba)?;
        if ack.return_code != 0 {
            log::warn!("broker refused connection, return code {}", ack.return_code);
            self.close_transport();
            self.set_state(ConnectionState::Disconnected);
            let _ = self.events.send(Event::Error(ErrorKind::ConnectionRefused));
            return Ok(());
        }
        self.set_state(ConnectionState::Connected);
        let _ = self.events.send(Event::Connected {
            session_present: ack.session_present,
        });
        if ack.session_present {
            let _ = self.events.send(Event::BrokerSessionRestored);
        }
        self.start_keep_alive();
        Ok(())
    }

    fn start_keep_alive(&mut self) {
        let keep_alive = self.config.keep_alive();
        if keep_alive == 0 {
            self.keep_alive_timer = None;
            return;
        }
        self.keep_alive_timer = Some(interval(Duration::from_secs(u64::from(keep_alive))));
    }

    /// Waits for the next keep-alive tick, if a timer is running. Used by
    /// the caller's `tokio::select!` loop alongside `poll_transport`.
    pub async fn tick_keep_alive(&mut self) {
        match self.keep_alive_timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Sends a PINGREQ. Called when `tick_keep_alive()` resolves while
    /// `Connected`.
    ///
    /// # Errors
    ///
    /// Propagates a transport write failure.
    pub async fn send_ping(&mut self) -> Result<(), Error> {
        if self.state != ConnectionState::Connected {
            return Ok(());
        }
        let bytes = PingRequestPacket.encode()?;
        self.write_bytes(&bytes).await
    }

    fn on_ping_response(&mut self, frame: &[u8]) -> Result<(), Error> {
        let mut ba = ByteArray::new(frame);
        PingResponsePacket::decode(&mut ba)?;
        let _ = self.events.send(Event::PingResponseReceived);
        Ok(())
    }

    fn on_subscribe_ack(&mut self, frame: &[u8]) -> Result<(), Error> {
        let mut ba = ByteArray::new(frame);
        let ack = SubscribeAckPacket::decode(&mut ba)?;
        let Some(filter) = self.pending_subscribes.remove(&ack.packet_id) else {
            log::warn!("SUBACK for unknown packet id {}", ack.packet_id.value());
            let _ = self.events.send(Event::Error(ErrorKind::IdentifierUnknown));
            return Ok(());
        };
        let Some(entry) = self.subscriptions.get_mut(&filter) else {
            return Ok(());
        };
        match ack.return_code {
            SubscribeReturnCode::Success(granted) => {
                entry.granted_qos = Some(granted);
                subscription::set_shared_state(&entry.state, SubscriptionState::Subscribed);
            }
            SubscribeReturnCode::Failure => {
                subscription::set_shared_state(&entry.state, SubscriptionState::Error);
            }
            SubscribeReturnCode::Invalid(code) => {
                log::warn!("SUBACK carried invalid return code {code:#04x}");
                subscription::set_shared_state(&entry.state, SubscriptionState::Error);
            }
        }
        Ok(())
    }

    fn on_unsubscribe_ack(&mut self, frame: &[u8]) -> Result<(), Error> {
        let mut ba = ByteArray::new(frame);
        let ack = UnsubscribeAckPacket::decode(&mut ba)?;
        let Some(filter) = self.pending_unsubscribes.remove(&ack.packet_id) else {
            log::warn!("UNSUBACK for unknown packet id {}", ack.packet_id.value());
            let _ = self.events.send(Event::Error(ErrorKind::IdentifierUnknown));
            return Ok(());
        };
        if let Some(entry) = self.subscriptions.remove(&filter) {
            subscription::set_shared_state(&entry.state, SubscriptionState::Unsubscribed);
        }
        Ok(())
    }

    async fn on_publish(&mut self, frame: &[u8]) -> Result<(), Error> {
        let mut ba = ByteArray::new(frame);
        let packet = PublishPacket::decode(&mut ba)?;

        let mut already_delivered = false;
        if packet.qos == QoS::ExactlyOnce {
            if let Some(id) = packet.packet_id {
                already_delivered = self.inflight.note_inbound_qos2(id);
            }
        }
        if !already_delivered {
            let matched_filters: Vec<String> = self
                .subscriptions
                .values()
                .filter(|entry| entry.filter.is_match(&packet.topic))
                .map(|entry| entry.filter.as_str().to_string())
                .collect();
            let _ = self.events.send(Event::MessageReceived {
                topic: packet.topic.clone(),
                payload: packet.payload.clone(),
                qos: packet.qos,
                retain: packet.retain,
                matched_filters,
            });
        }

        match packet.qos {
            QoS::AtMostOnce => {}
            QoS::AtLeastOnce => {
                if let Some(id) = packet.packet_id {
                    let bytes = PublishAckPacket::new(id).encode()?;
                    self.write_bytes(&bytes).await?;
                }
            }
            QoS::ExactlyOnce => {
                if let Some(id) = packet.packet_id {
                    let bytes = PublishReceivedPacket::new(id).encode()?;
                    self.write_bytes(&bytes).await?;
                }
            }
        }
        Ok(())
    }

    fn on_publish_ack(&mut self, frame: &[u8]) -> Result<(), Error> {
        let mut ba = ByteArray::new(frame);
        let ack = PublishAckPacket::decode(&mut ba)?;
        if self.inflight.complete_qos1(ack.packet_id) {
            let _ = self.events.send(Event::MessageSent {
                packet_id: Some(ack.packet_id),
            });
        } else {
            log::warn!("PUBACK for unknown packet id {}", ack.packet_id.value());
            let _ = self.events.send(Event::Error(ErrorKind::IdentifierUnknown));
        }
        Ok(())
    }

    async fn on_publish_received(&mut self, frame: &[u8]) -> Result<(), Error> {
        let mut ba = ByteArray::new(frame);
        let ack = PublishReceivedPacket::decode(&mut ba)?;
        if self.inflight.receive_qos2_ack(ack.packet_id) {
            let bytes = PublishReleasePacket::new(ack.packet_id).encode()?;
            self.write_bytes(&bytes).await?;
        } else {
            log::warn!("PUBREC for unknown packet id {}", ack.packet_id.value());
            let _ = self.events.send(Event::Error(ErrorKind::IdentifierUnknown));
        }
        Ok(())
    }

    async fn on_publish_release(&mut self, frame: &[u8]) -> Result<(), Error> {
        let mut ba = ByteArray::new(frame);
        let release = PublishReleasePacket::decode(&mut ba)?;
        self.inflight.finish_inbound_qos2(release.packet_id);
        let bytes = PublishCompletePacket::new(release.packet_id).encode()?;
        self.write_bytes(&bytes).await
    }

    fn on_publish_complete(&mut self, frame: &[u8]) -> Result<(), Error> {
        let mut ba = ByteArray::new(frame);
        let ack = PublishCompletePacket::decode(&mut ba)?;
        if self.inflight.complete_qos2(ack.packet_id) {
            let _ = self.events.send(Event::MessageSent {
                packet_id: Some(ack.packet_id),
            });
        } else {
            log::warn!("PUBCOMP for unknown packet id {}", ack.packet_id.value());
            let _ = self.events.send(Event::Error(ErrorKind::IdentifierUnknown));
        }
        Ok(())
    }

    /// Drains and applies any commands queued by dropped `Subscription`
    /// handles (currently just auto-unsubscribe). Called alongside
    /// `poll_transport`/`tick_keep_alive` in the caller's run loop.
    pub async fn drain_subscription_commands(&mut self) -> Result<(), Error> {
        while let Ok(command) = self.sub_commands_rx.try_recv() {
            match command {
                SubscriptionCommand::Unsubscribe { filter } => {
                    self.unsubscribe(filter.as_str()).await?;
                }
            }
        }
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.state == ConnectionState::Connected {
            log::warn!("engine dropped while connected; transport will not be cleanly closed");
        }
    }
}
