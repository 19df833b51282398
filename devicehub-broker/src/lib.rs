//! Real-time notification broker
//!
//! A process-internal pub/sub hub that fans device records out to long-lived
//! stream consumers, each interested in a single device. One task owns the
//! subscriber registry; every subscribe, unsubscribe and publish request is
//! handed to it over a channel and processed in arrival order. Delivery into a
//! subscriber's bounded queue never blocks: a full queue drops that one record
//! for that one subscriber.

pub mod error;
pub mod sync;

pub use error::{BrokerError, Result};
pub use sync::{
    Broker, DeviceEvent, RegistrySnapshot, Subscription, SubscriptionId, SubscriptionState,
    SubscriptionStream,
};
