// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use codec::{PacketId, QoS};

use crate::error::ErrorKind;
use crate::state::ConnectionState;

/// Notifications the engine emits on its event channel. This replaces the
/// teacher's ad hoc per-event callback fields with a single typed stream,
/// so the caller decides how to dispatch (match, forward to another
/// channel, log and ignore) rather than registering closures up front.
#[derive(Debug, Clone)]
pub enum Event {
    /// The CONNACK accepted the connection.
    Connected { session_present: bool },
    /// The CONNACK that just produced `Connected` also had its
    /// session-present bit set: the broker resumed an existing session
    /// rather than starting a clean one. Delivered right after `Connected`.
    BrokerSessionRestored,
    /// The transport closed, or `disconnect_from_host()` completed.
    Disconnected,
    /// `state()` changed; delivered in addition to the more specific
    /// events above so callers that only care about state transitions
    /// don't need to infer them from the others.
    StateChanged(ConnectionState),
    /// A non-fatal or fatal error occurred; see `ErrorKind` for whether
    /// the connection survives it.
    Error(ErrorKind),
    /// A PINGRESP arrived for an outstanding PINGREQ.
    PingResponseReceived,
    /// A message arrived on a subscribed topic, with QoS 2 duplicates
    /// already filtered out. `matched_filters` lists every currently
    /// active subscription filter this topic satisfies.
    MessageReceived {
        topic: String,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
        matched_filters: Vec<String>,
    },
    /// An outbound publish's delivery guarantee is now fully satisfied
    /// (immediately for QoS 0, after PUBACK/PUBCOMP for QoS 1/2).
    MessageSent { packet_id: Option<PacketId> },
}
