use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::debug;

use devicehub_core::models::DeviceId;

use super::broker::BrokerCommand;
use super::events::DeviceEvent;

/// Process-unique subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Active,
    Closed,
}

/// A stream consumer's handle on one device's records.
///
/// Owned by exactly one reader. The broker keeps only the sending half of the
/// delivery queue. Closing the handle (explicitly, via `Broker::unsubscribe`,
/// or by dropping it) closes the queue for further deliveries and asks the
/// broker to deregister it; closing twice is a no-op.
pub struct Subscription {
    id: SubscriptionId,
    device_id: DeviceId,
    receiver: mpsc::Receiver<Arc<DeviceEvent>>,
    dropped: Arc<AtomicU64>,
    commands: mpsc::WeakSender<BrokerCommand>,
    state: SubscriptionState,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        device_id: DeviceId,
        receiver: mpsc::Receiver<Arc<DeviceEvent>>,
        dropped: Arc<AtomicU64>,
        commands: mpsc::WeakSender<BrokerCommand>,
    ) -> Self {
        Self {
            id,
            device_id,
            receiver,
            dropped,
            commands,
            state: SubscriptionState::Active,
        }
    }

    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    #[must_use]
    pub const fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    #[must_use]
    pub const fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Wait for the next record.
    ///
    /// Returns `None` once the subscription is closed and its queue drained,
    /// or when the broker has shut down.
    pub async fn recv(&mut self) -> Option<Arc<DeviceEvent>> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Arc<DeviceEvent>, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Records waiting in the delivery queue
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Records the broker discarded for this subscriber because its queue was full
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Deregister without waiting for the broker.
    ///
    /// If the broker's command channel is momentarily full the request is
    /// finished on a spawned task; the queue itself is closed immediately in
    /// any case, so the broker prunes it on its next delivery attempt.
    pub fn close(&mut self) {
        let Some(command) = self.begin_close() else {
            return;
        };
        let Some(commands) = self.commands.upgrade() else {
            return;
        };

        match commands.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        let _ = commands.send(command).await;
                    });
                }
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Transition to `Closed`, returning the deregistration request on the first call only
    pub(crate) fn begin_close(&mut self) -> Option<BrokerCommand> {
        if self.state == SubscriptionState::Closed {
            return None;
        }
        self.state = SubscriptionState::Closed;
        self.receiver.close();

        debug!(
            device_id = %self.device_id,
            subscription_id = %self.id,
            dropped = self.dropped(),
            "Subscription closed"
        );

        Some(BrokerCommand::Unsubscribe {
            device_id: self.device_id.clone(),
            id: self.id,
        })
    }

    /// Adapt into a `Stream` for transport relays; dropping the stream unsubscribes
    #[must_use]
    pub fn into_stream(self) -> SubscriptionStream {
        SubscriptionStream { inner: self }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("device_id", &self.device_id)
            .field("state", &self.state)
            .field("queued", &self.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

/// `Stream` view of a [`Subscription`]
#[derive(Debug)]
pub struct SubscriptionStream {
    inner: Subscription,
}

impl Stream for SubscriptionStream {
    type Item = Arc<DeviceEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.receiver.poll_recv(cx)
    }
}
