pub mod delivery;
pub mod producer;


use crate::Result;
use futures::future::BoxFuture;
use std::future::Future;
use std::time::Duration;

pub use delivery::{report_delivery, DeliveryOutcome, RecordPosition};
pub use producer::KafkaBrokerClient;

/// Resolves once the broker client knows the fate of one submitted message.
pub type PendingDelivery = BoxFuture<'static, DeliveryOutcome>;

/// Message handed to the broker client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub topic: String,
    pub key: String,
    pub value: String,
}

impl OutgoingMessage {
    pub fn new(
        topic: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The operations the publisher needs from a message-broker client.
///
/// `send` only enqueues; the outcome arrives through the returned
/// [`PendingDelivery`]. `flush` resolves once every message submitted so far
/// has reached a terminal state or `timeout` elapses. Neither may block the
/// calling runtime thread.
pub trait BrokerClient {
    fn send(
        &self,
        message: OutgoingMessage,
    ) -> impl Future<Output = Result<PendingDelivery>> + Send;

    fn flush(&self, timeout: Duration) -> impl Future<Output = Result<()>> + Send;
}
