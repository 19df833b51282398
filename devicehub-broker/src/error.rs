//! Error types for the broker

use thiserror::Error;

/// Broker error types
///
/// Saturated queues, devices without subscribers and repeated unsubscribes
/// are not errors and never surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("device id must not be empty")]
    EmptyDeviceId,

    #[error("broker is shut down")]
    Closed,
}

/// Result type for broker operations
pub type Result<T> = std::result::Result<T, BrokerError>;
