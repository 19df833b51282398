//! Device subscription registry
//!
//! Owned exclusively by the broker loop, so none of this is synchronized.
//! Invariant: a device key is present only while it has at least one
//! subscriber.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

use devicehub_core::models::DeviceId;

use super::events::DeviceEvent;
use super::subscription::SubscriptionId;

/// The broker's half of one subscription
#[derive(Debug)]
pub(crate) struct Subscriber {
    pub id: SubscriptionId,
    pub sender: mpsc::Sender<Arc<DeviceEvent>>,
    pub dropped: Arc<AtomicU64>,
}

/// Outcome of delivering one record to a device's subscribers
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct FanOut {
    pub delivered: usize,
    /// Subscribers whose queue was full, with their running drop totals
    pub dropped: Vec<(SubscriptionId, u64)>,
    /// Subscribers found closed and pruned
    pub pruned: usize,
}

/// Point-in-time view of the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    pub device_count: usize,
    pub subscription_count: usize,
    /// Subscriber count per device id
    pub devices: BTreeMap<String, usize>,
}

impl RegistrySnapshot {
    #[must_use]
    pub fn subscribers(&self, device_id: &str) -> usize {
        self.devices.get(device_id).copied().unwrap_or(0)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    devices: HashMap<DeviceId, Vec<Subscriber>>,
    subscriptions: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, device_id: DeviceId, subscriber: Subscriber) {
        self.devices.entry(device_id).or_default().push(subscriber);
        self.subscriptions += 1;
    }

    /// Remove one subscription; unknown device or id is a no-op returning `false`
    pub fn remove(&mut self, device_id: &DeviceId, id: SubscriptionId) -> bool {
        let Some(subscribers) = self.devices.get_mut(device_id) else {
            return false;
        };
        let Some(pos) = subscribers.iter().position(|s| s.id == id) else {
            return false;
        };

        subscribers.swap_remove(pos);
        self.subscriptions -= 1;
        if subscribers.is_empty() {
            self.devices.remove(device_id);
        }
        true
    }

    /// Offer `event` to every subscriber of its device without waiting.
    ///
    /// Full queues lose this record only; closed queues are removed.
    pub fn fan_out(&mut self, event: &Arc<DeviceEvent>) -> FanOut {
        let device_id = event.device_id();
        let mut outcome = FanOut::default();

        let Some(subscribers) = self.devices.get_mut(device_id) else {
            return outcome;
        };

        subscribers.retain(|subscriber| match subscriber.sender.try_send(Arc::clone(event)) {
            Ok(()) => {
                outcome.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                let total = subscriber.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                outcome.dropped.push((subscriber.id, total));
                true
            }
            Err(TrySendError::Closed(_)) => {
                outcome.pruned += 1;
                false
            }
        });

        self.subscriptions -= outcome.pruned;
        if subscribers.is_empty() {
            self.devices.remove(device_id);
        }
        outcome
    }

    pub fn subscriber_count(&self, device_id: &DeviceId) -> usize {
        self.devices.get(device_id).map_or(0, Vec::len)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub const fn subscription_count(&self) -> usize {
        self.subscriptions
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            device_count: self.devices.len(),
            subscription_count: self.subscriptions,
            devices: self
                .devices
                .iter()
                .map(|(id, subs)| (id.as_str().to_string(), subs.len()))
                .collect(),
        }
    }

    /// Drop every subscriber, closing all delivery queues
    pub fn clear(&mut self) {
        self.devices.clear();
        self.subscriptions = 0;
    }
}
