//! Behavioural tests for the notification broker
//!
//! Run with: cargo test -p devicehub-broker --test broker_properties

use chrono::Utc;
use std::time::Duration;

use devicehub_broker::{Broker, BrokerError, DeviceEvent, SubscriptionState};
use devicehub_core::config::BrokerConfig;
use devicehub_core::models::{DeviceId, DeviceStatus, Telemetry, TelemetryId};

fn reading(device: &str, ppm: f64) -> Telemetry {
    Telemetry {
        id: TelemetryId::new(),
        device_id: DeviceId::from(device),
        ppm,
        water_level_on_plant: 12.0,
        water_level_on_condenser: 8.5,
        water_level_on_nutrient_tank: 40.0,
        humidity: 61.0,
        created_at: Utc::now(),
    }
}

fn ppm_of(event: &DeviceEvent) -> f64 {
    match event {
        DeviceEvent::Telemetry(t) => t.ppm,
        DeviceEvent::StatusChanged(_) => panic!("expected telemetry, got {event:?}"),
    }
}

fn config(queue_capacity: usize) -> BrokerConfig {
    BrokerConfig {
        subscriber_queue_capacity: queue_capacity,
        ..BrokerConfig::default()
    }
}

/// Wait until the loop has processed every command sent so far
async fn settle(broker: &Broker) {
    broker.snapshot().await.unwrap();
}

#[tokio::test]
async fn test_delivery_preserves_publish_order() {
    let (broker, _handle) = Broker::start(&config(64));
    let mut sub = broker.subscribe("dev-1").await.unwrap();

    for i in 0..50 {
        broker.publish(reading("dev-1", f64::from(i))).await;
    }

    for i in 0..50 {
        let event = sub.recv().await.unwrap();
        assert_eq!(ppm_of(&event), f64::from(i));
    }
    assert_eq!(sub.dropped(), 0);
}

#[tokio::test]
async fn test_devices_are_isolated() {
    let (broker, _handle) = Broker::start(&config(16));
    let mut a = broker.subscribe("dev-a").await.unwrap();
    let mut b = broker.subscribe("dev-b").await.unwrap();

    for i in 0..10 {
        broker.publish(reading("dev-a", f64::from(i))).await;
        broker
            .publish(DeviceStatus {
                device_id: DeviceId::from("dev-b"),
                status: format!("s{i}"),
                time: Utc::now(),
            })
            .await;
    }
    settle(&broker).await;

    let mut received_a = 0;
    while let Ok(event) = a.try_recv() {
        assert_eq!(event.device_id().as_str(), "dev-a");
        received_a += 1;
    }
    let mut received_b = 0;
    while let Ok(event) = b.try_recv() {
        assert_eq!(event.device_id().as_str(), "dev-b");
        assert_eq!(event.event_type(), "status_changed");
        received_b += 1;
    }
    assert_eq!(received_a, 10);
    assert_eq!(received_b, 10);
}

#[tokio::test]
async fn test_publish_does_not_wait_for_full_queues() {
    let (broker, _handle) = Broker::start(&config(1));
    let mut subs = Vec::new();
    for _ in 0..500 {
        subs.push(broker.subscribe("dev-1").await.unwrap());
    }

    // Fill every queue
    broker.publish(reading("dev-1", 1.0)).await;
    settle(&broker).await;

    let started = tokio::time::Instant::now();
    tokio::time::timeout(Duration::from_secs(2), async {
        for i in 0..20 {
            broker.publish(reading("dev-1", f64::from(i))).await;
        }
        settle(&broker).await;
    })
    .await
    .expect("publishing to saturated subscribers must not block");
    assert!(started.elapsed() < Duration::from_secs(2));

    for sub in &subs {
        assert_eq!(sub.len(), 1);
        assert_eq!(sub.dropped(), 20);
    }
}

#[tokio::test]
async fn test_full_queue_does_not_affect_other_subscribers() {
    let (broker, _handle) = Broker::start(&config(1));
    let mut slow = broker.subscribe("dev-1").await.unwrap();
    let mut fast = broker.subscribe("dev-1").await.unwrap();

    broker.publish(reading("dev-1", 1.0)).await;
    settle(&broker).await;
    assert_eq!(ppm_of(&fast.recv().await.unwrap()), 1.0);

    broker.publish(reading("dev-1", 2.0)).await;
    settle(&broker).await;
    assert_eq!(ppm_of(&fast.recv().await.unwrap()), 2.0);

    // The slow subscriber keeps its first record and lost only the second
    assert_eq!(slow.dropped(), 1);
    assert_eq!(ppm_of(&slow.recv().await.unwrap()), 1.0);
    assert!(slow.try_recv().is_err());

    broker.publish(reading("dev-1", 3.0)).await;
    settle(&broker).await;
    assert_eq!(ppm_of(&slow.recv().await.unwrap()), 3.0);
    assert_eq!(ppm_of(&fast.recv().await.unwrap()), 3.0);
}

#[tokio::test]
async fn test_unsubscribe_removes_device_entry() {
    let (broker, _handle) = Broker::start(&config(4));
    let mut first = broker.subscribe("dev-1").await.unwrap();
    let mut second = broker.subscribe("dev-1").await.unwrap();

    let snapshot = broker.snapshot().await.unwrap();
    assert_eq!(snapshot.subscribers("dev-1"), 2);

    broker.unsubscribe(&mut first).await;
    let snapshot = broker.snapshot().await.unwrap();
    assert_eq!(snapshot.subscribers("dev-1"), 1);

    broker.publish(reading("dev-1", 7.0)).await;
    settle(&broker).await;
    assert!(first.try_recv().is_err());
    assert_eq!(ppm_of(&second.recv().await.unwrap()), 7.0);

    broker.unsubscribe(&mut second).await;
    let snapshot = broker.snapshot().await.unwrap();
    assert_eq!(snapshot.device_count, 0);
    assert_eq!(snapshot.subscription_count, 0);
    assert!(!snapshot.devices.contains_key("dev-1"));
}

#[tokio::test]
async fn test_unsubscribe_twice_is_noop() {
    let (broker, _handle) = Broker::start(&config(4));
    let mut sub = broker.subscribe("dev-1").await.unwrap();
    let _other = broker.subscribe("dev-1").await.unwrap();

    broker.unsubscribe(&mut sub).await;
    broker.unsubscribe(&mut sub).await;
    sub.close();

    assert_eq!(sub.state(), SubscriptionState::Closed);
    let snapshot = broker.snapshot().await.unwrap();
    assert_eq!(snapshot.subscribers("dev-1"), 1);
}

#[tokio::test]
async fn test_dropped_handle_is_deregistered() {
    let (broker, _handle) = Broker::start(&config(4));
    {
        let _sub = broker.subscribe("dev-1").await.unwrap();
        assert_eq!(broker.snapshot().await.unwrap().subscription_count, 1);
    }

    let snapshot = broker.snapshot().await.unwrap();
    assert_eq!(snapshot.subscription_count, 0);
    assert_eq!(snapshot.device_count, 0);
}

#[tokio::test]
async fn test_two_device_scenario() {
    let (broker, _handle) = Broker::start(&BrokerConfig::default());

    let mut s1 = broker.subscribe("dev-1").await.unwrap();
    broker.publish(reading("dev-1", 550.0)).await;
    let first = s1.recv().await.unwrap();
    assert_eq!(ppm_of(&first), 550.0);
    assert_eq!(first.device_id().as_str(), "dev-1");

    let mut s2 = broker.subscribe("dev-2").await.unwrap();
    broker.publish(reading("dev-1", 560.0)).await;
    settle(&broker).await;
    assert!(s2.try_recv().is_err());
    assert_eq!(ppm_of(&s1.recv().await.unwrap()), 560.0);

    broker.unsubscribe(&mut s1).await;
    broker.publish(reading("dev-1", 570.0)).await;
    settle(&broker).await;

    assert_eq!(s1.len(), 0);
    assert!(s1.recv().await.is_none());
    assert!(s2.try_recv().is_err());
}

#[tokio::test]
async fn test_shutdown_ends_open_streams() {
    let (broker, handle) = Broker::start(&config(4));
    let mut sub = broker.subscribe("dev-1").await.unwrap();
    broker.publish(reading("dev-1", 1.0)).await;
    settle(&broker).await;

    broker.shutdown();
    handle.await.unwrap();

    // Buffered records drain, then the stream ends
    assert!(sub.recv().await.is_some());
    assert!(sub.recv().await.is_none());

    assert!(broker.is_closed());
    assert_eq!(broker.subscribe("dev-1").await.unwrap_err(), BrokerError::Closed);
    assert_eq!(broker.snapshot().await.unwrap_err(), BrokerError::Closed);
    broker.publish(reading("dev-1", 2.0)).await;
}

#[tokio::test]
async fn test_empty_device_id_is_rejected() {
    let (broker, _handle) = Broker::start(&BrokerConfig::default());

    assert_eq!(broker.subscribe("").await.unwrap_err(), BrokerError::EmptyDeviceId);
    assert_eq!(broker.snapshot().await.unwrap().subscription_count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_subscribe_and_publish() {
    let (broker, _handle) = Broker::start(&config(8));

    let publisher = {
        let broker = broker.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                broker.publish(reading("dev-1", f64::from(i))).await;
            }
        })
    };

    let mut subscribers = Vec::new();
    for _ in 0..8 {
        let broker = broker.clone();
        subscribers.push(tokio::spawn(async move {
            let mut sub = broker.subscribe("dev-1").await.unwrap();
            let mut last = -1.0;
            while let Ok(Some(event)) =
                tokio::time::timeout(Duration::from_millis(200), sub.recv()).await
            {
                assert_eq!(event.device_id().as_str(), "dev-1");
                let ppm = ppm_of(&event);
                assert!(ppm > last, "records must arrive in publish order");
                last = ppm;
            }
        }));
    }

    publisher.await.unwrap();
    for task in subscribers {
        task.await.unwrap();
    }

    let snapshot = broker.snapshot().await.unwrap();
    assert_eq!(snapshot.subscription_count, 0);
}
