use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use devicehub_core::config::BrokerConfig;
use devicehub_core::metrics;
use devicehub_core::models::DeviceId;

use super::events::DeviceEvent;
use super::registry::{Registry, RegistrySnapshot, Subscriber};
use super::subscription::{Subscription, SubscriptionId};
use crate::error::{BrokerError, Result};

/// Requests handled by the broker loop, strictly in arrival order
pub(crate) enum BrokerCommand {
    Subscribe {
        device_id: DeviceId,
        subscriber: Subscriber,
    },
    Unsubscribe {
        device_id: DeviceId,
        id: SubscriptionId,
    },
    Publish(Arc<DeviceEvent>),
    Snapshot {
        result_sender: oneshot::Sender<RegistrySnapshot>,
    },
}

/// Cloneable handle on the notification hub.
///
/// All clones talk to the same processing loop. The loop stops when
/// [`Broker::shutdown`] is called or every handle has been dropped.
#[derive(Clone, Debug)]
pub struct Broker {
    commands: mpsc::Sender<BrokerCommand>,
    next_id: Arc<AtomicU64>,
    queue_capacity: usize,
    cancel: CancellationToken,
}

impl Broker {
    /// Spawn the processing loop on the current runtime
    #[must_use]
    pub fn start(config: &BrokerConfig) -> (Self, JoinHandle<()>) {
        let (commands, receiver) = mpsc::channel(config.command_capacity.max(1));
        let cancel = CancellationToken::new();

        let event_loop = BrokerLoop {
            receiver,
            registry: Registry::new(),
            drop_log_interval: config.drop_log_interval.max(1),
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(event_loop.run());

        info!(
            command_capacity = config.command_capacity,
            subscriber_queue_capacity = config.subscriber_queue_capacity,
            "Notification broker started"
        );

        let broker = Self {
            commands,
            next_id: Arc::new(AtomicU64::new(1)),
            queue_capacity: config.subscriber_queue_capacity.max(1),
            cancel,
        };
        (broker, handle)
    }

    /// Register interest in one device's records
    pub async fn subscribe(&self, device_id: impl Into<DeviceId>) -> Result<Subscription> {
        let device_id = device_id.into();
        if device_id.as_str().is_empty() {
            return Err(BrokerError::EmptyDeviceId);
        }
        if self.cancel.is_cancelled() {
            return Err(BrokerError::Closed);
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let dropped = Arc::new(AtomicU64::new(0));

        let subscriber = Subscriber {
            id,
            sender,
            dropped: Arc::clone(&dropped),
        };
        self.commands
            .send(BrokerCommand::Subscribe {
                device_id: device_id.clone(),
                subscriber,
            })
            .await
            .map_err(|_| BrokerError::Closed)?;

        Ok(Subscription::new(
            id,
            device_id,
            receiver,
            dropped,
            self.commands.downgrade(),
        ))
    }

    /// Close `subscription` and wait until the loop has accepted its removal.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub async fn unsubscribe(&self, subscription: &mut Subscription) {
        if let Some(command) = subscription.begin_close() {
            let _ = self.commands.send(command).await;
        }
    }

    /// Hand a record to the loop for fan-out.
    ///
    /// Waits only for room in the command channel, never for subscribers.
    /// Publishing after shutdown is a no-op.
    pub async fn publish(&self, event: impl Into<DeviceEvent>) {
        if self.cancel.is_cancelled() {
            return;
        }
        let event = Arc::new(event.into());
        metrics::broker::EVENTS_PUBLISHED
            .with_label_values(&[event.event_type()])
            .inc();

        if self.commands.send(BrokerCommand::Publish(event)).await.is_err() {
            debug!("Broker closed, record not published");
        }
    }

    /// Registry counters, observed after every previously sent command
    pub async fn snapshot(&self) -> Result<RegistrySnapshot> {
        if self.cancel.is_cancelled() {
            return Err(BrokerError::Closed);
        }
        let (result_sender, result_receiver) = oneshot::channel();
        self.commands
            .send(BrokerCommand::Snapshot { result_sender })
            .await
            .map_err(|_| BrokerError::Closed)?;
        result_receiver.await.map_err(|_| BrokerError::Closed)
    }

    /// Stop the loop; every open subscription sees its queue end
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.commands.is_closed()
    }
}

struct BrokerLoop {
    receiver: mpsc::Receiver<BrokerCommand>,
    registry: Registry,
    drop_log_interval: u64,
    cancel: CancellationToken,
}

impl BrokerLoop {
    async fn run(mut self) {
        loop {
            let command = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    info!("Notification broker shutting down");
                    break;
                }
                command = self.receiver.recv() => command,
            };

            let Some(command) = command else {
                debug!("All broker handles dropped, stopping loop");
                break;
            };
            self.handle(command);
        }

        let remaining = self.registry.subscription_count();
        self.registry.clear();
        self.receiver.close();
        self.update_gauges();

        info!(closed_subscriptions = remaining, "Notification broker stopped");
    }

    fn handle(&mut self, command: BrokerCommand) {
        match command {
            BrokerCommand::Subscribe {
                device_id,
                subscriber,
            } => {
                let id = subscriber.id;
                self.registry.insert(device_id.clone(), subscriber);
                debug!(
                    device_id = %device_id,
                    subscription_id = %id,
                    subscribers = self.registry.subscriber_count(&device_id),
                    "Subscriber registered"
                );
                self.update_gauges();
            }
            BrokerCommand::Unsubscribe { device_id, id } => {
                if self.registry.remove(&device_id, id) {
                    debug!(
                        device_id = %device_id,
                        subscription_id = %id,
                        "Subscriber removed"
                    );
                    self.update_gauges();
                }
            }
            BrokerCommand::Publish(event) => self.publish(&event),
            BrokerCommand::Snapshot { result_sender } => {
                let _ = result_sender.send(self.registry.snapshot());
            }
        }
    }

    fn publish(&mut self, event: &Arc<DeviceEvent>) {
        let outcome = self.registry.fan_out(event);

        metrics::broker::EVENTS_DELIVERED.inc_by(outcome.delivered as u64);
        metrics::broker::EVENTS_DROPPED.inc_by(outcome.dropped.len() as u64);

        for (id, total) in &outcome.dropped {
            if total % self.drop_log_interval == 1 || self.drop_log_interval == 1 {
                warn!(
                    device_id = %event.device_id(),
                    subscription_id = %id,
                    dropped_total = total,
                    "Subscriber queue full, dropping record"
                );
            }
        }

        if outcome.pruned > 0 {
            debug!(
                device_id = %event.device_id(),
                pruned = outcome.pruned,
                "Pruned closed subscribers"
            );
            self.update_gauges();
        }
    }

    fn update_gauges(&self) {
        metrics::broker::ACTIVE_SUBSCRIPTIONS.set(self.registry.subscription_count() as i64);
        metrics::broker::ACTIVE_DEVICES.set(self.registry.device_count() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use devicehub_core::models::DeviceStatus;

    fn status(device: &str, status: &str) -> DeviceStatus {
        DeviceStatus {
            device_id: DeviceId::from(device),
            status: status.to_string(),
            time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscribe_then_publish_delivers() {
        let (broker, _handle) = Broker::start(&BrokerConfig::default());
        let mut sub = broker.subscribe("dev-1").await.unwrap();

        broker.publish(status("dev-1", "online")).await;

        let event = sub.recv().await.unwrap();
        assert_eq!(event.event_type(), "status_changed");
        assert_eq!(event.device_id().as_str(), "dev-1");
    }

    #[tokio::test]
    async fn test_subscription_ids_are_unique() {
        let (broker, _handle) = Broker::start(&BrokerConfig::default());
        let a = broker.subscribe("dev-1").await.unwrap();
        let b = broker.clone().subscribe("dev-1").await.unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_dropping_every_handle_stops_loop() {
        let (broker, handle) = Broker::start(&BrokerConfig::default());
        let sub = broker.subscribe("dev-1").await.unwrap();
        drop(broker);
        drop(sub);

        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("loop should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_zero_capacities_are_clamped() {
        let config = BrokerConfig {
            command_capacity: 0,
            subscriber_queue_capacity: 0,
            drop_log_interval: 0,
        };
        let (broker, _handle) = Broker::start(&config);
        let mut sub = broker.subscribe("dev-1").await.unwrap();

        broker.publish(status("dev-1", "online")).await;
        broker.publish(status("dev-1", "offline")).await;
        broker.snapshot().await.unwrap();

        assert_eq!(sub.recv().await.unwrap().device_id().as_str(), "dev-1");
        assert_eq!(sub.dropped(), 1);
    }
}
