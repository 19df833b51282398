// Module: sync

pub mod broker;
pub mod events;
pub mod publisher;
pub mod registry;
pub mod subscription;

pub use broker::Broker;
pub use events::DeviceEvent;
pub use registry::RegistrySnapshot;
pub use subscription::{Subscription, SubscriptionId, SubscriptionState, SubscriptionStream};
