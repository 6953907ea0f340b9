// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use codec::topic::TopicFilter;
use codec::{PacketId, QoS};
use tokio::sync::mpsc::UnboundedSender;

/// Lifecycle of a single subscription, as seen from the handle the
/// application holds. `Error` is terminal: the broker refused the filter
/// and no further state change will happen for this handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Pending,
    Subscribed,
    UnsubscriptionPending,
    Unsubscribed,
    Error,
}

impl SubscriptionState {
    const fn to_tag(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Subscribed => 1,
            Self::UnsubscriptionPending => 2,
            Self::Unsubscribed => 3,
            Self::Error => 4,
        }
    }

    const fn from_tag(tag: u8) -> Self {
        match tag {
            0 => Self::Pending,
            1 => Self::Subscribed,
            2 => Self::UnsubscriptionPending,
            3 => Self::Unsubscribed,
            _ => Self::Error,
        }
    }
}

/// Commands a `Subscription` handle can send back to the engine after the
/// handle is created; currently only the auto-unsubscribe-on-drop path.
#[derive(Debug)]
pub enum SubscriptionCommand {
    Unsubscribe { filter: TopicFilter },
}

pub(crate) fn new_shared_state() -> Arc<AtomicU8> {
    Arc::new(AtomicU8::new(SubscriptionState::Pending.to_tag()))
}

pub(crate) fn set_shared_state(state: &Arc<AtomicU8>, new_state: SubscriptionState) {
    state.store(new_state.to_tag(), Ordering::Release);
}

pub(crate) fn read_shared_state(state: &Arc<AtomicU8>) -> SubscriptionState {
    SubscriptionState::from_tag(state.load(Ordering::Acquire))
}

/// A handle to a filter this engine has asked the broker to subscribe to.
/// Dropping a handle that is still `Subscribed` sends an unsubscribe
/// request for it, mirroring the original client library's destructor
/// behavior. A handle whose engine has already gone away drops silently.
pub struct Subscription {
    filter: TopicFilter,
    qos: QoS,
    packet_id: PacketId,
    state: Arc<AtomicU8>,
    commands: UnboundedSender<SubscriptionCommand>,
}

impl Subscription {
    pub(crate) fn new(
        filter: TopicFilter,
        qos: QoS,
        packet_id: PacketId,
        commands: UnboundedSender<SubscriptionCommand>,
    ) -> Self {
        Self::with_shared_state(filter, qos, packet_id, new_shared_state(), commands)
    }

    /// Builds a second handle onto an already-registered subscription,
    /// sharing its state cell. Used when `subscribe()` is called again for
    /// a filter that is already pending or subscribed.
    pub(crate) fn with_shared_state(
        filter: TopicFilter,
        qos: QoS,
        packet_id: PacketId,
        state: Arc<AtomicU8>,
        commands: UnboundedSender<SubscriptionCommand>,
    ) -> Self {
        Self {
            filter,
            qos,
            packet_id,
            state,
            commands,
        }
    }

    #[must_use]
    pub fn filter(&self) -> &TopicFilter {
        &self.filter
    }

    #[must_use]
    pub const fn requested_qos(&self) -> QoS {
        self.qos
    }

    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        read_shared_state(&self.state)
    }

    /// The packet id the SUBSCRIBE carrying this filter was sent under,
    /// for correlating with broker-side logs.
    #[must_use]
    pub const fn packet_id(&self) -> PacketId {
        self.packet_id
    }

    pub(crate) fn shared_state(&self) -> Arc<AtomicU8> {
        Arc::clone(&self.state)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.state() == SubscriptionState::Subscribed {
            let _ = self.commands.send(SubscriptionCommand::Unsubscribe {
                filter: self.filter.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_subscription_is_pending() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let filter = TopicFilter::parse("a/b").unwrap();
        let subscription = Subscription::new(filter, QoS::AtLeastOnce, PacketId::new(1), tx);
        assert_eq!(subscription.state(), SubscriptionState::Pending);
    }

    #[test]
    fn drop_while_subscribed_sends_unsubscribe() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let filter = TopicFilter::parse("a/b").unwrap();
        let subscription = Subscription::new(filter, QoS::AtLeastOnce, PacketId::new(5), tx);
        set_shared_state(&subscription.shared_state(), SubscriptionState::Subscribed);
        drop(subscription);
        let command = rx.try_recv().expect("unsubscribe command sent");
        match command {
            SubscriptionCommand::Unsubscribe { filter } => {
                assert_eq!(filter.as_str(), "a/b");
            }
        }
    }

    #[test]
    fn drop_while_pending_sends_nothing() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let filter = TopicFilter::parse("a/b").unwrap();
        let subscription = Subscription::new(filter, QoS::AtLeastOnce, PacketId::new(5), tx);
        drop(subscription);
        assert!(rx.try_recv().is_err());
    }
}
